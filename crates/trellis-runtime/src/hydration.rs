//! Client side of hydration: claiming server-rendered nodes.
//!
//! A component view whose host carries an `ngh` descriptor claims its
//! nodes instead of creating them. Nodes with a recorded path are found by
//! replaying the path; the rest are the next sibling of their previous
//! node or the first child of their parent. Containers pick up their
//! server-rendered views as dehydrated views, matched by template id when
//! the client creates views. Leftovers are removed by
//! [`Runtime::cleanup_dehydrated_views`].

use indexmap::IndexMap;
use trellis_core::{NGH_ATTR, NodeId, NodePath, PathReference, SKIP_HYDRATION_ATTR, SerializedView, replay, sibling_after};

use crate::error::Result;
use crate::flags::TNodeType;
use crate::runtime::Runtime;
use crate::view::{ContainerLoc, HEADER_OFFSET, Slot, ViewId};

/// A server-rendered view not yet claimed by the client.
#[derive(Clone, Debug, PartialEq)]
pub struct DehydratedView {
    pub data: SerializedView,
    /// First root node of the view; `None` when the view rendered no nodes.
    pub first_child: Option<NodeId>,
    /// First content node of each element container claimed so far.
    pub(crate) segment_heads: IndexMap<usize, NodeId>,
}

impl DehydratedView {
    pub fn new(data: SerializedView, first_child: Option<NodeId>) -> Self {
        Self {
            data,
            first_child,
            segment_heads: IndexMap::new(),
        }
    }

    /// Root DOM nodes the view rendered on the server.
    pub fn num_root_nodes(&self) -> usize {
        self.data.num_root_nodes.unwrap_or(0)
    }
}

impl Runtime {
    /// Read and consume the `ngh` descriptor on a component host.
    pub(crate) fn retrieve_hydration_info(&mut self, host: NodeId) -> Option<DehydratedView> {
        if !self.config.hydration {
            return None;
        }
        let raw = self.renderer.get_attribute(host, NGH_ATTR)?;
        self.renderer.remove_attribute(host, NGH_ATTR);
        match SerializedView::from_json(&raw) {
            Ok(data) => Some(DehydratedView::new(data, self.renderer.first_child(host))),
            Err(err) => {
                tracing::warn!(%err, "ignoring malformed hydration descriptor");
                None
            }
        }
    }

    pub(crate) fn has_skip_hydration_attr(&self, node: NodeId) -> bool {
        self.renderer.get_attribute(node, SKIP_HYDRATION_ATTR).is_some()
    }

    pub(crate) fn clear_element_contents(&mut self, node: NodeId) {
        while let Some(child) = self.renderer.first_child(node) {
            self.renderer.remove_child(Some(node), child, false);
        }
    }

    /// Server node for the node at `index`, when `view` is hydrating.
    pub(crate) fn locate_next_node(&self, view: ViewId, index: usize) -> Result<Option<NodeId>> {
        let lview = self.lview(view)?;
        let Some(info) = &lview.hydration else {
            return Ok(None);
        };
        if let Some(path) = info.data.nodes.get(&(index - HEADER_OFFSET)) {
            return self.locate_by_path(view, path);
        }
        let tview = self.tview(lview.tview);
        if tview.first_child == Some(index) {
            return Ok(info.first_child);
        }
        let Some(tnode) = tview.tnode(index) else {
            return Ok(None);
        };
        Ok(match (tnode.prev, tnode.parent) {
            (Some(prev), _) => self
                .trailing_native_at(view, prev)?
                .and_then(|n| self.renderer.next_sibling(n)),
            (None, Some(parent)) if tview.tnode(parent).is_some_and(|p| p.is(TNodeType::ELEMENT_CONTAINER)) => {
                info.segment_heads.get(&parent).copied()
            }
            (None, Some(parent)) => self
                .native_at(view, parent)?
                .and_then(|n| self.renderer.first_child(n)),
            (None, None) => None,
        })
    }

    /// Claim the comment closing an element container that starts at `first`.
    ///
    /// The container's content is the `numRootNodes` siblings before the comment.
    pub(crate) fn locate_element_container(&mut self, view: ViewId, index: usize, first: NodeId) -> Result<Option<NodeId>> {
        let count = {
            let Some(info) = &mut self.lview_mut(view)?.hydration else {
                return Ok(None);
            };
            let count = info
                .data
                .containers
                .get(&(index - HEADER_OFFSET))
                .map_or(0, |c| c.num_root_nodes);
            if count > 0 {
                info.segment_heads.insert(index, first);
            }
            count
        };
        Ok(sibling_after(self.renderer(), first, count))
    }

    /// Node an explicit path points at, when the path is valid and resolvable.
    pub(crate) fn locate_by_path(&self, view: ViewId, path: &str) -> Result<Option<NodeId>> {
        let path = match NodePath::parse(path) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(%err, path, "ignoring malformed hydration path");
                return Ok(None);
            }
        };
        let start = match path.reference {
            PathReference::Host => {
                let component = self.lview(view)?.declaration_component_view;
                self.lview(component)?.host
            }
            PathReference::Node(index) => self.native_at(view, index + HEADER_OFFSET)?,
        };
        Ok(start.and_then(|s| replay(self.renderer(), s, &path.steps)))
    }

    /// Pair serialized container views with the DOM run starting at `start`.
    ///
    /// Returns the node after the last view (the container anchor) and the views.
    pub(crate) fn locate_dehydrated_views(&self, start: NodeId, views: &[SerializedView]) -> (Option<NodeId>, Vec<DehydratedView>) {
        let mut current = Some(start);
        let mut out = Vec::with_capacity(views.len());
        for data in views {
            let count = data.num_root_nodes.unwrap_or(0);
            let first_child = if count > 0 { current } else { None };
            out.push(DehydratedView::new(data.clone(), first_child));
            if count > 0 {
                current = current.and_then(|c| sibling_after(self.renderer(), c, count));
            }
        }
        (current, out)
    }

    /// Take the first dehydrated view of a container when it was rendered from `template`.
    ///
    /// A mismatch means the client diverged from the server here; the
    /// remaining server views are discarded.
    pub(crate) fn find_matching_dehydrated_view(&mut self, loc: ContainerLoc, template: Option<&str>) -> Result<Option<DehydratedView>> {
        let Some(template) = template else {
            return Ok(None);
        };
        let container = self.container_mut(loc)?;
        let Some(first) = container.dehydrated_views.first() else {
            return Ok(None);
        };
        if first.data.template.as_deref() == Some(template) {
            return Ok(Some(container.dehydrated_views.remove(0)));
        }
        tracing::debug!(template, found = ?first.data.template, "dehydrated view mismatch");
        self.remove_dehydrated_views(loc)?;
        Ok(None)
    }

    pub(crate) fn remove_dehydrated_views(&mut self, loc: ContainerLoc) -> Result<()> {
        let views = std::mem::take(&mut self.container_mut(loc)?.dehydrated_views);
        for view in views {
            self.remove_dehydrated_nodes(&view);
        }
        Ok(())
    }

    fn remove_dehydrated_nodes(&mut self, view: &DehydratedView) {
        let mut current = view.first_child;
        for _ in 0..view.num_root_nodes() {
            let Some(node) = current else { break };
            current = self.renderer.next_sibling(node);
            let parent = self.renderer.parent_node(node);
            self.renderer.remove_child(parent, node, false);
        }
    }

    /// Remove server-rendered views nothing claimed and stop hydrating.
    ///
    /// Call once the application has rendered its initial state.
    pub fn cleanup_dehydrated_views(&mut self) -> Result<usize> {
        let mut removed = 0;
        let views: Vec<ViewId> = self.live_views().collect();
        for view in views {
            let containers: Vec<usize> = self
                .lview(view)?
                .data
                .iter()
                .enumerate()
                .filter_map(|(i, slot)| match slot {
                    Slot::Container(c) if !c.dehydrated_views.is_empty() => Some(i),
                    _ => None,
                })
                .collect();
            for index in containers {
                let loc = ContainerLoc { view, index };
                removed += self.container(loc)?.dehydrated_views.len();
                self.remove_dehydrated_views(loc)?;
            }
            self.lview_mut(view)?.hydration = None;
        }
        if removed > 0 {
            tracing::debug!(removed, "removed unclaimed dehydrated views");
        }
        Ok(removed)
    }
}
