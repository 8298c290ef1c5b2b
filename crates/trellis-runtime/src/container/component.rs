use std::any::Any;
use std::rc::Rc;

use serde_json::Value;
use trellis_core::NodeId;

use super::{ElementRef, ViewRef};
use crate::def::{DirectiveDef, Instance};
use crate::di::{ChainedInjector, InjectorRef, NodeInjector};
use crate::error::{Result, RuntimeError};
use crate::flags::{LViewFlags, TNodeType};
use crate::runtime::{NewView, Runtime};
use crate::view::{HEADER_OFFSET, Slot, TViewKind, ViewId};

/// Creates instances of one component, each in its own root view.
#[derive(Clone)]
pub struct ComponentFactory {
    def: Rc<DirectiveDef>,
}

impl ComponentFactory {
    pub fn new(def: Rc<DirectiveDef>) -> Self {
        Self { def }
    }

    pub fn def(&self) -> &Rc<DirectiveDef> {
        &self.def
    }

    /// Run the create pass of a new component instance.
    ///
    /// `host` is an existing element to render into; otherwise one is
    /// created from the component's tag. With an environment injector,
    /// lookups that miss the element injectors continue there.
    pub fn create(
        &self,
        rt: &mut Runtime,
        injector: InjectorRef,
        host: Option<NodeId>,
        environment: Option<InjectorRef>,
    ) -> Result<ComponentRef> {
        if !self.def.is_component() {
            return Err(RuntimeError::NotATemplate { index: 0 });
        }
        let root_injector = match environment {
            Some(environment) => InjectorRef::Module(Rc::new(ChainedInjector {
                element: injector,
                environment,
            })),
            None => injector,
        };
        let tag = self.def.host_tag().unwrap_or("div").to_string();
        let host = host.unwrap_or_else(|| rt.renderer.create_element(&tag));

        let root_tview = rt.create_tview(TViewKind::Root, None, 1, 0, Rc::from(vec![self.def.clone()]), None);
        let root_view = rt.create_lview(NewView {
            flags: LViewFlags::IS_ROOT,
            injector: Some(root_injector),
            ..NewView::new(root_tview)
        })?;

        let bindings_start = rt.tview(root_tview).bindings_start_index;
        rt.state.enter_view(root_view, root_tview, bindings_start);
        let result = self.init_host(rt, root_view, host, &tag);
        rt.state.leave_view();
        result?;

        let component_view = rt
            .component_view_at(root_view, HEADER_OFFSET)?
            .ok_or(RuntimeError::MissingView(root_view))?;
        let directive_start = rt
            .tview(root_tview)
            .tnode(HEADER_OFFSET)
            .map(|t| t.directive_start)
            .ok_or(RuntimeError::MissingNode { index: HEADER_OFFSET })?;
        let instance = rt.node_injectable(root_view, directive_start, HEADER_OFFSET)?;
        rt.render_view(root_view)?;
        tracing::debug!(component = self.def.name(), ?root_view, "component created");

        Ok(ComponentRef {
            def: self.def.clone(),
            root_view,
            component_view,
            host,
            instance,
        })
    }

    fn init_host(&self, rt: &mut Runtime, root_view: ViewId, host: NodeId, tag: &str) -> Result<()> {
        let root_tview = rt.lview(root_view)?.tview;
        rt.get_or_create_tnode(root_tview, HEADER_OFFSET, TNodeType::ELEMENT, Some(tag), Vec::new())?;
        rt.resolve_directives(root_view, HEADER_OFFSET, std::slice::from_ref(&self.def))?;
        *rt.lview_mut(root_view)?.slot_mut(HEADER_OFFSET) = Slot::Native(host);
        rt.create_directives_instances(root_view, HEADER_OFFSET)
    }
}

/// A component instance with its host element and views.
pub struct ComponentRef {
    def: Rc<DirectiveDef>,
    root_view: ViewId,
    component_view: ViewId,
    host: NodeId,
    instance: Instance,
}

impl ComponentRef {
    /// View holding the host element; this is what containers insert.
    pub fn host_view(&self) -> ViewRef {
        ViewRef::new(self.root_view)
    }

    /// The component's own template view.
    pub fn change_detector_ref(&self) -> ViewRef {
        ViewRef::new(self.component_view)
    }

    pub fn component_view(&self) -> ViewId {
        self.component_view
    }

    pub fn location(&self) -> ElementRef {
        ElementRef { node: self.host }
    }

    pub fn host(&self) -> NodeId {
        self.host
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn instance_as<T: Any>(&self) -> Result<Rc<T>> {
        self.instance
            .clone()
            .downcast::<T>()
            .map_err(|_| RuntimeError::ContextType(std::any::type_name::<T>()))
    }

    /// Injector of the host element.
    pub fn injector(&self) -> InjectorRef {
        InjectorRef::Node(NodeInjector {
            view: self.root_view,
            tnode: HEADER_OFFSET,
        })
    }

    pub fn component_name(&self) -> &'static str {
        self.def.name()
    }

    /// Write an input and mark the component for refresh.
    pub fn set_input(&self, rt: &mut Runtime, name: &str, value: impl Into<Value>) -> Result<bool> {
        let found = rt.set_directive_input(self.root_view, HEADER_OFFSET, name, &value.into())?;
        if found {
            rt.lview_mut(self.component_view)?.flags |= LViewFlags::DIRTY;
        } else {
            tracing::warn!(component = self.def.name(), input = name, "component has no such input");
        }
        Ok(found)
    }

    pub fn detect_changes(&self, rt: &mut Runtime) -> Result<()> {
        rt.detect_changes(self.root_view)
    }

    pub fn destroy(&self, rt: &mut Runtime) -> Result<()> {
        self.host_view().destroy(rt)
    }
}

impl Runtime {
    /// Render `def` into `host` and run a first change detection.
    ///
    /// With hydration enabled, a host carrying an `ngh` descriptor claims
    /// its server-rendered content instead of creating it.
    pub fn bootstrap(&mut self, def: &Rc<DirectiveDef>, host: NodeId) -> Result<ComponentRef> {
        let injector = self.root_injector.clone();
        let component = ComponentFactory::new(def.clone()).create(self, injector, Some(host), None)?;
        component.detect_changes(self)?;
        Ok(component)
    }
}
