//! Per-view `ngh` descriptors.
//!
//! A descriptor only records what the client cannot work out from the
//! template alone. For every node the serializer replays the client's
//! structural inference (first root node, previous sibling's next
//! sibling, parent's first child) against the rendered DOM and writes an
//! explicit path where the inference would land elsewhere. Nodes owned by
//! i18n blocks always get a path.
//!
//! Containers record their views in order, each with its template id and
//! the number of sibling DOM nodes it occupies. Element containers record
//! how many nodes precede their closing comment.

use trellis_core::{NGH_ATTR, NodeId, NodePath, PathReference, SKIP_HYDRATION_ATTR, SerializedContainer, SerializedView};
use trellis_runtime::view::{ContainerHost, LContainer, Slot, TViewKind};
use trellis_runtime::{ComponentRef, HEADER_OFFSET, Runtime, RuntimeError, TData, TNode, TNodeFlags, TNodeType, TViewId, ViewId};

use crate::context::HydrationContext;
use crate::navigate::find_path;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SerializeError {
    #[error("node {index} is not attached to the document")]
    Disconnected { index: usize },

    #[error("node {index} cannot be reached from its reference node")]
    Unreachable { index: usize },

    #[error("element container {index} hosts views, which cannot be hydrated")]
    ViewsInElementContainer { index: usize },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T, E = SerializeError> = std::result::Result<T, E>;

/// Write an `ngh` descriptor on the host of `component` and of every component below it.
///
/// Hosts carrying `ngSkipHydration` are left alone together with their
/// subtree. A component view that cannot be described (a node outside the
/// document, or unreachable from its reference) is left unannotated, so
/// the client renders it from scratch. Returns the number of annotated hosts.
pub fn annotate_for_hydration(rt: &mut Runtime, component: &ComponentRef, ctx: &mut HydrationContext) -> Result<usize> {
    let annotations = {
        let mut serializer = Serializer::new(rt, ctx);
        serializer.component(component.component_view())?;
        serializer.annotations
    };
    let renderer = rt.renderer_mut();
    for (host, data) in &annotations {
        renderer.set_attribute(*host, NGH_ATTR, &data.to_json());
    }
    tracing::debug!(hosts = annotations.len(), "annotated for hydration");
    Ok(annotations.len())
}

/// Descriptor of a single view, without annotating component hosts inside it.
pub fn serialize_lview(rt: &Runtime, view: ViewId, ctx: &mut HydrationContext) -> Result<SerializedView> {
    Serializer::new(rt, ctx).view(view)
}

/// Path string locating the node at `index` (no offset) of `view`.
///
/// The path starts at the closest ancestor element of the node, or at the
/// component host. Returns `None` when the node rendered nothing.
pub fn calc_path_for_node(rt: &Runtime, view: ViewId, index: usize) -> Result<Option<String>> {
    let adjusted = HEADER_OFFSET + index;
    let tview = rt.tview_of(view)?;
    let (parent, target) = match tview.tnode(adjusted) {
        Some(tnode) => (tnode.parent, path_target(rt, view, tnode)?),
        None => (None, rt.native_at(view, adjusted)?),
    };
    target.map(|t| path_to(rt, view, adjusted, parent, t)).transpose()
}

/// Node the client claims for `tnode`: containers claim the first node of their run.
fn path_target(rt: &Runtime, view: ViewId, tnode: &TNode) -> Result<Option<NodeId>> {
    if tnode.is(TNodeType::ICU) {
        return Ok(rt.native_at(view, tnode.index)?);
    }
    Ok(rt.first_native_node(view, Some(tnode.index))?)
}

fn path_to(rt: &Runtime, view: ViewId, index: usize, parent: Option<usize>, target: NodeId) -> Result<String> {
    let no_offset = index - HEADER_OFFSET;
    let (reference, start) = match reference_element(rt, view, parent)? {
        Some((parent, native)) => (PathReference::Node(parent - HEADER_OFFSET), native),
        None => {
            let component = rt.lview(view)?.declaration_component_view();
            let host = rt.lview(component)?.host();
            (PathReference::Host, host.ok_or(SerializeError::Unreachable { index: no_offset })?)
        }
    };
    let steps = find_path(rt.renderer(), start, target).ok_or(SerializeError::Unreachable { index: no_offset })?;
    Ok(NodePath::new(reference, steps).to_string())
}

/// Closest ancestor rendered as an element, with its DOM node.
fn reference_element(rt: &Runtime, view: ViewId, mut cursor: Option<usize>) -> Result<Option<(usize, NodeId)>> {
    let tview = rt.tview_of(view)?;
    while let Some(index) = cursor {
        let Some(tnode) = tview.tnode(index) else {
            break;
        };
        if tnode.is(TNodeType::ELEMENT)
            && let Some(native) = rt.native_at(view, index)?
        {
            return Ok(Some((index, native)));
        }
        cursor = tnode.parent;
    }
    Ok(None)
}

struct Serializer<'a> {
    rt: &'a Runtime,
    ctx: &'a mut HydrationContext,
    annotations: Vec<(NodeId, SerializedView)>,
}

impl<'a> Serializer<'a> {
    fn new(rt: &'a Runtime, ctx: &'a mut HydrationContext) -> Self {
        Self {
            rt,
            ctx,
            annotations: Vec::new(),
        }
    }

    fn component(&mut self, view: ViewId) -> Result<()> {
        let Some(host) = self.rt.lview(view)?.host() else {
            return Ok(());
        };
        if self.rt.renderer().get_attribute(host, SKIP_HYDRATION_ATTR).is_some() {
            tracing::debug!(?host, "component opted out of hydration");
            return Ok(());
        }
        let mark = self.annotations.len();
        match self.view(view) {
            Ok(data) => {
                self.annotations.insert(mark, (host, data));
                Ok(())
            }
            Err(SerializeError::Runtime(err)) => Err(err.into()),
            Err(err) => {
                tracing::warn!(%err, ?host, "component left for client-side rendering");
                self.annotations.truncate(mark);
                Ok(())
            }
        }
    }

    fn view(&mut self, view: ViewId) -> Result<SerializedView> {
        let rt = self.rt;
        let tview = rt.tview_of(view)?;
        let lview = rt.lview(view)?;
        let mut out = SerializedView::default();
        for (index, data) in tview.data.iter().enumerate().skip(HEADER_OFFSET) {
            match data {
                TData::Node(tnode) if !tnode.flags.contains(TNodeFlags::IS_DETACHED) => self.node(view, tnode, &mut out)?,
                TData::Node(_) => {}
                // Nodes built by an ICU case have no `TNode`.
                _ => {
                    if let Slot::Native(node) = lview.slot(index)
                        && rt.renderer().is_connected(*node)
                    {
                        let path = path_to(rt, view, index, None, *node)?;
                        out.nodes.insert(index - HEADER_OFFSET, path);
                    }
                }
            }
        }
        Ok(out)
    }

    fn node(&mut self, view: ViewId, tnode: &TNode, out: &mut SerializedView) -> Result<()> {
        let rt = self.rt;
        let index = tnode.index;
        let no_offset = index - HEADER_OFFSET;
        match rt.lview(view)?.slot(index) {
            Slot::Component(child) => self.component(*child)?,
            Slot::Container(container) => {
                if tnode.is(TNodeType::ELEMENT_CONTAINER) && !container.views.is_empty() {
                    return Err(SerializeError::ViewsInElementContainer { index: no_offset });
                }
                if let Some(embedded) = tnode.tview.filter(|_| tnode.is(TNodeType::CONTAINER)) {
                    let id = self.template_id(embedded);
                    out.templates.insert(no_offset, id);
                }
                if let ContainerHost::Component(child) = container.host {
                    self.component(child)?;
                }
                let serialized = self.container(container)?;
                out.containers.insert(no_offset, serialized);
            }
            _ => {}
        }
        if tnode.is(TNodeType::ELEMENT_CONTAINER) {
            let count = rt.element_container_nodes(view, index)?.len();
            if count > 0 {
                out.containers.entry(no_offset).or_default().num_root_nodes = count;
            }
        }

        let Some(target) = path_target(rt, view, tnode)? else {
            return Ok(());
        };
        if !rt.renderer().is_connected(target) {
            return Err(SerializeError::Disconnected { index: no_offset });
        }
        if self.must_record(tnode) || self.inferred_node(view, tnode)? != Some(target) {
            let path = path_to(rt, view, index, tnode.parent, target)?;
            tracing::trace!(index = no_offset, %path, "recorded node path");
            out.nodes.insert(no_offset, path);
        }
        Ok(())
    }

    fn must_record(&self, tnode: &TNode) -> bool {
        self.ctx.records_all_paths() || tnode.flags.contains(TNodeFlags::I18N) || tnode.insert_before_index.is_some()
    }

    /// Node the client finds for `tnode` without a path.
    fn inferred_node(&self, view: ViewId, tnode: &TNode) -> Result<Option<NodeId>> {
        let rt = self.rt;
        let renderer = rt.renderer();
        let tview = rt.tview_of(view)?;
        if tview.first_child == Some(tnode.index) {
            return self.first_view_node(view);
        }
        match (tnode.prev, tnode.parent) {
            (Some(prev), _) => {
                let trailing = match rt.lview(view)?.slot(prev) {
                    Slot::Container(container) if tview.tnode(prev).is_some_and(|p| p.is(TNodeType::ANY_CONTAINER)) => container.anchor,
                    // A container added to an element after its next sibling was claimed.
                    Slot::Container(_) => return Ok(None),
                    _ => rt.native_at(view, prev)?,
                };
                Ok(trailing.and_then(|n| renderer.next_sibling(n)))
            }
            (None, Some(parent)) if tview.tnode(parent).is_some_and(|p| p.is(TNodeType::ELEMENT_CONTAINER)) => {
                Ok(rt.first_native_node(view, Some(parent))?)
            }
            (None, Some(parent)) => Ok(rt.native_at(view, parent)?.and_then(|n| renderer.first_child(n))),
            (None, None) => Ok(None),
        }
    }

    fn first_view_node(&self, view: ViewId) -> Result<Option<NodeId>> {
        let rt = self.rt;
        let tview = rt.tview_of(view)?;
        if tview.kind == TViewKind::Component {
            let host = rt.lview(view)?.host();
            return Ok(host.and_then(|h| rt.renderer().first_child(h)));
        }
        Ok(rt.first_native_node(view, tview.first_child)?)
    }

    fn container(&mut self, container: &LContainer) -> Result<SerializedContainer> {
        let mut views = Vec::with_capacity(container.views.len());
        let mut num_root_nodes = 0;
        for &child in &container.views {
            let data = self.container_view(child)?;
            num_root_nodes += data.num_root_nodes.unwrap_or(0);
            views.push(data);
        }
        Ok(SerializedContainer { views, num_root_nodes })
    }

    fn container_view(&mut self, view: ViewId) -> Result<SerializedView> {
        let rt = self.rt;
        let tview = rt.tview_of(view)?;
        let num_root_nodes = Some(rt.root_nodes(view)?.len());
        if tview.kind == TViewKind::Root {
            // Host view of a component created in the container: matched by component id.
            let component = rt.component_view_at(view, HEADER_OFFSET)?;
            let mut template = None;
            if let Some(component) = component {
                template = rt.tview_of(component)?.ssr_id.clone();
                self.component(component)?;
            }
            return Ok(SerializedView {
                template,
                num_root_nodes,
                ..SerializedView::default()
            });
        }
        let template = Some(self.template_id(tview.id()));
        let mut data = self.view(view)?;
        data.template = template;
        data.num_root_nodes = num_root_nodes;
        Ok(data)
    }

    fn template_id(&mut self, tview: TViewId) -> String {
        match &self.rt.tview(tview).ssr_id {
            Some(id) => id.clone(),
            None => self.ctx.template_id(tview),
        }
    }
}
