use std::rc::Rc;

use trellis_core::{NodeId, NodeKind};

use super::{ComponentFactory, ComponentRef, ElementRef, TemplateRef, ViewRef};
use crate::def::{DirectiveDef, Instance};
use crate::di::{InjectorRef, NodeInjector, Token};
use crate::error::{Result, RuntimeError};
use crate::flags::{InjectFlags, TNodeType};
use crate::hydration::DehydratedView;
use crate::runtime::Runtime;
use crate::view::{ContainerHost, ContainerLoc, HEADER_OFFSET, LContainer, ParentRef, Slot, ViewId};

/// Where and with what injector an embedded view is created.
#[derive(Clone, Default)]
pub struct EmbeddedViewOptions {
    /// Position in the container; appended when `None`.
    pub index: Option<usize>,
    pub injector: Option<InjectorRef>,
}

/// Where and with what injectors a component is created.
#[derive(Clone, Default)]
pub struct CreateComponentOptions {
    pub index: Option<usize>,
    /// Injector the component resolves element-level dependencies from.
    pub injector: Option<InjectorRef>,
    pub environment_injector: Option<InjectorRef>,
}

/// An anchor in the DOM where views can be inserted, moved and removed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ViewContainerRef {
    loc: ContainerLoc,
}

impl ViewContainerRef {
    pub fn location(self) -> ContainerLoc {
        self.loc
    }

    /// The element or template comment the container is declared on.
    pub fn element(self, rt: &Runtime) -> Result<ElementRef> {
        let node = rt
            .native_at(self.loc.view, self.loc.index)?
            .ok_or(RuntimeError::MissingNode { index: self.loc.index })?;
        Ok(ElementRef { node })
    }

    /// Comment that views are inserted in front of.
    pub fn anchor(self, rt: &Runtime) -> Result<Option<NodeId>> {
        Ok(rt.container(self.loc)?.anchor)
    }

    pub fn injector(self) -> InjectorRef {
        InjectorRef::Node(NodeInjector {
            view: self.loc.view,
            tnode: self.loc.index,
        })
    }

    /// Injector of the nearest node above the container's host that has one.
    pub fn parent_injector(self, rt: &Runtime) -> Result<InjectorRef> {
        let ContainerLoc { view, index } = self.loc;
        let location = rt.parent_injector_location(view, index)?;
        if location.has_parent() {
            let parent_view = rt.parent_injector_view(location, view)?;
            if let Some(owner) = rt.window_owner(rt.lview(parent_view)?.tview, location.index()) {
                return Ok(InjectorRef::Node(NodeInjector {
                    view: parent_view,
                    tnode: owner,
                }));
            }
        }
        Ok(rt
            .lview(view)?
            .injector
            .clone()
            .unwrap_or_else(|| rt.root_injector.clone()))
    }

    pub fn len(self, rt: &Runtime) -> Result<usize> {
        Ok(rt.container(self.loc)?.len())
    }

    pub fn is_empty(self, rt: &Runtime) -> Result<bool> {
        Ok(rt.container(self.loc)?.is_empty())
    }

    pub fn get(self, rt: &Runtime, index: usize) -> Result<Option<ViewRef>> {
        let container = rt.container(self.loc)?;
        if let Some(refs) = &container.view_refs
            && let Some(view_ref) = refs.get(index)
        {
            return Ok(Some(*view_ref));
        }
        Ok(container.views.get(index).copied().map(ViewRef::new))
    }

    pub fn index_of(self, rt: &Runtime, view_ref: ViewRef) -> Result<Option<usize>> {
        Ok(rt
            .container(self.loc)?
            .views
            .iter()
            .position(|v| *v == view_ref.view()))
    }

    /// Render a view of `template` and insert it.
    ///
    /// When the container still holds a server-rendered view of the same
    /// template, the new view claims its nodes and is not inserted into
    /// the DOM again.
    pub fn create_embedded_view(
        self,
        rt: &mut Runtime,
        template: TemplateRef,
        context: Option<Instance>,
        options: EmbeddedViewOptions,
    ) -> Result<ViewRef> {
        let ssr_id = rt
            .tview_of(template.declaration_view)?
            .tnode(template.tnode)
            .and_then(|t| t.tview)
            .and_then(|tview| rt.tview(tview).ssr_id.clone());
        let dehydrated = rt.find_matching_dehydrated_view(self.loc, ssr_id.as_deref())?;
        let add_to_dom = should_add_to_dom(dehydrated.as_ref());
        let view_ref = template.create_embedded_view_impl(rt, context, options.injector, dehydrated)?;
        self.insert_impl(rt, view_ref, options.index, add_to_dom)
    }

    /// Create `def` and insert its host view.
    pub fn create_component(self, rt: &mut Runtime, def: &Rc<DirectiveDef>, options: CreateComponentOptions) -> Result<ComponentRef> {
        self.create_component_from_factory(
            rt,
            &ComponentFactory::new(def.clone()),
            options.index,
            options.injector,
            options.environment_injector,
        )
    }

    /// Create a component from a factory, with positional options.
    pub fn create_component_from_factory(
        self,
        rt: &mut Runtime,
        factory: &ComponentFactory,
        index: Option<usize>,
        injector: Option<InjectorRef>,
        environment_injector: Option<InjectorRef>,
    ) -> Result<ComponentRef> {
        let parent_injector = self.parent_injector(rt)?;
        let context_injector = injector.unwrap_or_else(|| parent_injector.clone());
        let environment = match environment_injector {
            Some(env) => Some(env),
            None => parent_injector
                .get(rt, Token::EnvironmentInjector, None, InjectFlags::OPTIONAL)?
                .and_then(|value| value.downcast::<InjectorRef>().ok())
                .map(|env| (*env).clone()),
        };

        let dehydrated = rt.find_matching_dehydrated_view(self.loc, factory.def().component_id())?;
        let add_to_dom = should_add_to_dom(dehydrated.as_ref());
        let host = dehydrated.and_then(|d| d.first_child);
        let component = factory.create(rt, context_injector, host, environment)?;
        self.insert_impl(rt, component.host_view(), index, add_to_dom)?;
        Ok(component)
    }

    /// Insert `view_ref` at `index`, moving it when it sits in a container already.
    pub fn insert(self, rt: &mut Runtime, view_ref: ViewRef, index: Option<usize>) -> Result<ViewRef> {
        self.insert_impl(rt, view_ref, index, true)
    }

    pub fn move_view(self, rt: &mut Runtime, view_ref: ViewRef, index: usize) -> Result<ViewRef> {
        if view_ref.destroyed(rt) {
            return Err(RuntimeError::DestroyedView);
        }
        self.insert(rt, view_ref, Some(index))
    }

    fn insert_impl(self, rt: &mut Runtime, view_ref: ViewRef, index: Option<usize>, add_to_dom: bool) -> Result<ViewRef> {
        let view = view_ref.view();
        if rt.is_destroyed(view) {
            return Err(RuntimeError::DestroyedView);
        }
        if let Some(ParentRef::Container(previous)) = rt.lview(view)?.parent {
            let owner = ViewContainerRef { loc: previous };
            if let Some(at) = owner.index_of(rt, view_ref)? {
                owner.detach(rt, Some(at))?;
            }
        }

        let adjusted = self
            .adjust_index(rt, index, 0)?
            .ok_or(RuntimeError::IndexOutOfRange { index: 0, length: 0 })?;
        rt.insert_view(self.loc, view, adjusted, add_to_dom)?;
        rt.container_mut(self.loc)?
            .view_refs
            .get_or_insert_with(Vec::new)
            .insert(adjusted, view_ref);
        tracing::trace!(?view, index = adjusted, "view inserted");
        Ok(view_ref)
    }

    /// Detach the view at `index` (the last one by default) and destroy it.
    pub fn remove(self, rt: &mut Runtime, index: Option<usize>) -> Result<()> {
        if let Some(view_ref) = self.detach(rt, index)? {
            rt.destroy_lview(view_ref.view())?;
        }
        Ok(())
    }

    /// Detach the view at `index` (the last one by default) without destroying it.
    pub fn detach(self, rt: &mut Runtime, index: Option<usize>) -> Result<Option<ViewRef>> {
        let Some(adjusted) = self.adjust_index(rt, index, -1)? else {
            return Ok(None);
        };
        let Some(view) = rt.detach_view(self.loc, adjusted)? else {
            return Ok(None);
        };
        let container = rt.container_mut(self.loc)?;
        let view_ref = match &mut container.view_refs {
            Some(refs) if adjusted < refs.len() => refs.remove(adjusted),
            _ => ViewRef::new(view),
        };
        Ok(Some(view_ref))
    }

    /// Destroy every view, last first.
    pub fn clear(self, rt: &mut Runtime) -> Result<()> {
        while let Some(last) = self.len(rt)?.checked_sub(1) {
            self.remove(rt, Some(last))?;
        }
        Ok(())
    }

    /// An omitted index means the end; an explicit one must be below `len + 1 + shift`.
    fn adjust_index(self, rt: &Runtime, index: Option<usize>, shift: isize) -> Result<Option<usize>> {
        let length = self.len(rt)?;
        let limit = length as isize + shift;
        match index {
            None => Ok(usize::try_from(limit).ok()),
            Some(index) if (index as isize) <= limit => Ok(Some(index)),
            Some(index) => Err(RuntimeError::IndexOutOfRange { index, length }),
        }
    }
}

fn should_add_to_dom(dehydrated: Option<&DehydratedView>) -> bool {
    dehydrated.is_none_or(|d| d.first_child.is_none())
}

impl Runtime {
    /// The container at node `index` (no header offset) of `view`, created on first use.
    pub fn view_container_ref(&mut self, view: ViewId, index: usize) -> Result<ViewContainerRef> {
        self.create_container_ref(view, HEADER_OFFSET + index)
    }

    /// Turn the node's slot into a container.
    ///
    /// Templates already have one. An element container uses its own
    /// comment as the anchor; any other node gets a fresh comment right
    /// after it, or the server-rendered one when hydrating.
    pub(crate) fn create_container_ref(&mut self, view: ViewId, tnode: usize) -> Result<ViewContainerRef> {
        let loc = ContainerLoc { view, index: tnode };
        let host = match self.lview(view)?.slot(tnode) {
            Slot::Container(_) => return Ok(ViewContainerRef { loc }),
            Slot::Component(component) => ContainerHost::Component(*component),
            Slot::Native(node) => ContainerHost::Node(*node),
            _ => return Err(RuntimeError::MissingNode { index: tnode }),
        };
        let host_node = self
            .native_at(view, tnode)?
            .ok_or(RuntimeError::MissingNode { index: tnode })?;
        let is_element_container = self
            .tview_of(view)?
            .tnode(tnode)
            .is_some_and(|t| t.is(TNodeType::ELEMENT_CONTAINER));

        let (anchor, dehydrated) = if is_element_container {
            (host_node, Vec::new())
        } else {
            match self.locate_container_anchor(view, tnode, host_node)? {
                Some(found) => found,
                None => {
                    let comment = self.renderer.create_comment("container");
                    if let Some(parent) = self.renderer.parent_node(host_node) {
                        let next = self.renderer.next_sibling(host_node);
                        self.renderer.insert_before(parent, comment, next, false);
                    }
                    (comment, Vec::new())
                }
            }
        };
        let mut container = LContainer::new(host, Some(anchor), view, tnode);
        container.dehydrated_views = dehydrated;
        *self.lview_mut(view)?.slot_mut(tnode) = Slot::Container(Box::new(container));
        tracing::trace!(?view, index = tnode - HEADER_OFFSET, "container created");
        Ok(ViewContainerRef { loc })
    }

    /// Server-rendered anchor and views of a container on an element.
    fn locate_container_anchor(&self, view: ViewId, tnode: usize, host: NodeId) -> Result<Option<(NodeId, Vec<DehydratedView>)>> {
        let Some(info) = &self.lview(view)?.hydration else {
            return Ok(None);
        };
        let Some(serialized) = info.data.containers.get(&(tnode - HEADER_OFFSET)) else {
            return Ok(None);
        };
        let Some(start) = self.renderer.next_sibling(host) else {
            return Ok(None);
        };
        match self.locate_dehydrated_views(start, &serialized.views) {
            (Some(anchor), views) if self.renderer.node_kind(anchor) == NodeKind::Comment => Ok(Some((anchor, views))),
            _ => {
                tracing::warn!(index = tnode - HEADER_OFFSET, "container anchor not found, creating it");
                Ok(None)
            }
        }
    }
}
