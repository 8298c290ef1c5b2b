use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use trellis_core::{ListenerId, NodeId};

use super::{ContainerLoc, LContainer, ParentRef, TViewId, ViewId};
use crate::def::Instance;
use crate::di::{InjectorRef, NodeInjectorFactory, RelativeInjectorLocation};
use crate::flags::LViewFlags;
use crate::hydration::DehydratedView;
use crate::runtime::Runtime;

/// One entry of a view's slot array.
#[derive(Clone, Default)]
pub enum Slot {
    #[default]
    Empty,
    Native(NodeId),
    /// Component host: the component's own view.
    Component(ViewId),
    Container(Box<LContainer>),
    /// Last value seen by a binding.
    Value(Value),
    /// Resolved directive or provider.
    Instance(Instance),
    /// Directive or provider not instantiated yet.
    Factory(Rc<NodeInjectorFactory>),
    /// One 32-bit bucket of a cumulative (ancestor) bloom filter.
    Bloom(u32),
    InjectorParent(RelativeInjectorLocation),
    /// Active ICU case; negative values are `!case` for a case not yet populated.
    Case(i32),
}

impl Slot {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_container(&self) -> Option<&LContainer> {
        match self {
            Self::Container(c) => Some(c),
            _ => None,
        }
    }

    pub(crate) fn as_container_mut(&mut self) -> Option<&mut LContainer> {
        match self {
            Self::Container(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Native(n) => write!(f, "Native({n:?})"),
            Self::Component(v) => write!(f, "Component({v:?})"),
            Self::Container(c) => write!(f, "Container({:?})", c.views),
            Self::Value(v) => write!(f, "Value({v})"),
            Self::Instance(_) => f.write_str("Instance"),
            Self::Factory(_) => f.write_str("Factory"),
            Self::Bloom(b) => write!(f, "Bloom({b:#x})"),
            Self::InjectorParent(l) => write!(f, "InjectorParent({l:?})"),
            Self::Case(c) => write!(f, "Case({c})"),
        }
    }
}

pub(crate) enum Cleanup {
    Listener(ListenerId),
    Callback(Box<dyn FnOnce(&mut Runtime)>),
}

/// Per-instance view state.
pub struct LView {
    pub(crate) id: ViewId,
    pub(crate) tview: TViewId,
    pub(crate) flags: LViewFlags,
    pub(crate) data: Vec<Slot>,
    /// Host element of a component view.
    pub(crate) host: Option<NodeId>,
    /// Node this view hangs off in its declaration view: the component host
    /// or the template container.
    pub(crate) t_host: Option<usize>,
    pub(crate) parent: Option<ParentRef>,
    pub(crate) declaration_view: Option<ViewId>,
    pub(crate) declaration_component_view: ViewId,
    /// Container the template was declared at, for embedded views.
    pub(crate) declaration_container: Option<ContainerLoc>,
    pub(crate) context: Option<Instance>,
    /// Environment injector consulted after node injectors.
    pub(crate) injector: Option<InjectorRef>,
    /// Injector supplied when the embedded view was created.
    pub(crate) embedded_injector: Option<InjectorRef>,
    pub(crate) hydration: Option<DehydratedView>,
    pub(crate) cleanup: Vec<Cleanup>,
}

impl LView {
    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn tview(&self) -> TViewId {
        self.tview
    }

    pub fn flags(&self) -> LViewFlags {
        self.flags
    }

    pub fn slot(&self, index: usize) -> &Slot {
        self.data.get(index).unwrap_or(&Slot::Empty)
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut Slot {
        if index >= self.data.len() {
            self.data.resize(index + 1, Slot::Empty);
        }
        &mut self.data[index]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn host(&self) -> Option<NodeId> {
        self.host
    }

    pub fn t_host(&self) -> Option<usize> {
        self.t_host
    }

    pub fn parent(&self) -> Option<ParentRef> {
        self.parent
    }

    pub fn declaration_view(&self) -> Option<ViewId> {
        self.declaration_view
    }

    pub fn declaration_component_view(&self) -> ViewId {
        self.declaration_component_view
    }

    pub fn context(&self) -> Option<&Instance> {
        self.context.as_ref()
    }

    pub fn hydration(&self) -> Option<&DehydratedView> {
        self.hydration.as_ref()
    }

    /// Whether the view currently sits inside a container.
    pub fn is_attached_to_container(&self) -> bool {
        matches!(self.parent, Some(ParentRef::Container(_)))
    }

    pub fn is_destroyed(&self) -> bool {
        self.flags.contains(LViewFlags::DESTROYED)
    }
}
