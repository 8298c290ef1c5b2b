//! Moving views in and out of the DOM, and tearing them down.
//!
//! A view's DOM is the run of nodes reached from its root nodes: element
//! containers contribute their children and then their comment, ICUs the
//! nodes of their active case and then their anchor, containers their
//! host, their anchor and the views they hold.

use trellis_core::NodeId;
use trellis_opcodes::RemoveOp;

use crate::error::Result;
use crate::flags::{LViewFlags, TNodeFlags, TNodeType};
use crate::runtime::Runtime;
use crate::view::{CONTAINER_HEADER_OFFSET, Cleanup, ContainerHost, ContainerLoc, LContainer, ParentRef, Slot, ViewId};

/// What a walk over a view's DOM does to each node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum WalkAction {
    Insert,
    Detach,
    Destroy,
}

impl Runtime {
    fn apply_to_node(&mut self, action: WalkAction, parent: Option<NodeId>, node: NodeId, before: Option<NodeId>, is_host: bool) {
        match action {
            WalkAction::Insert => {
                if let Some(parent) = parent {
                    self.renderer.insert_before(parent, node, before, true);
                }
            }
            WalkAction::Detach => {
                let parent = self.renderer.parent_node(node);
                self.renderer.remove_child(parent, node, is_host);
            }
            WalkAction::Destroy => self.renderer.destroy_node(node),
        }
    }

    /// Apply `action` to every root-level DOM node of `view`.
    pub(crate) fn apply_view(&mut self, view: ViewId, action: WalkAction, parent: Option<NodeId>, before: Option<NodeId>) -> Result<()> {
        let first = self.tview_of(view)?.first_child;
        self.apply_nodes(view, first, action, parent, before)
    }

    fn apply_nodes(&mut self, view: ViewId, first: Option<usize>, action: WalkAction, parent: Option<NodeId>, before: Option<NodeId>) -> Result<()> {
        let mut cursor = first;
        while let Some(index) = cursor {
            let tview = self.tview_of(view)?;
            let Some(tnode) = tview.tnode(index) else {
                break;
            };
            let (kind, child, next) = (tnode.kind, tnode.child, tnode.next);
            let detached = tnode.flags.contains(TNodeFlags::IS_DETACHED);
            cursor = next;
            if detached {
                continue;
            }
            if kind.intersects(TNodeType::ELEMENT_CONTAINER) {
                self.apply_nodes(view, child, action, parent, before)?;
                self.apply_slot(view, index, action, parent, before)?;
            } else if kind.intersects(TNodeType::ICU) {
                for node in self.icu_nodes(view, index)? {
                    self.apply_to_node(action, parent, node, before, false);
                }
                self.apply_slot(view, index, action, parent, before)?;
            } else {
                self.apply_slot(view, index, action, parent, before)?;
            }
        }
        Ok(())
    }

    fn apply_slot(&mut self, view: ViewId, index: usize, action: WalkAction, parent: Option<NodeId>, before: Option<NodeId>) -> Result<()> {
        let (node, is_host, container) = match self.lview(view)?.slot(index) {
            Slot::Native(node) => (Some(*node), false, None),
            Slot::Component(component) => (self.lview(*component)?.host, true, None),
            Slot::Container(container) => {
                let host = match container.host {
                    ContainerHost::Node(node) => Some(node),
                    ContainerHost::Component(component) => self.lview(component)?.host,
                };
                (host, false, Some((container.anchor, container.views.clone())))
            }
            _ => (None, false, None),
        };
        if let Some(node) = node {
            self.apply_to_node(action, parent, node, before, is_host);
        }
        if let Some((anchor, views)) = container {
            if let Some(anchor) = anchor
                && Some(anchor) != node
            {
                self.apply_to_node(action, parent, anchor, before, false);
            }
            for child in views {
                self.apply_view(child, action, parent, anchor)?;
            }
        }
        Ok(())
    }

    /// DOM nodes of an ICU's active case, nested ICUs included, in remove-tape order.
    pub(crate) fn icu_nodes(&self, view: ViewId, anchor: usize) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        self.collect_icu_nodes(view, anchor, &mut out)?;
        Ok(out)
    }

    fn collect_icu_nodes(&self, view: ViewId, anchor: usize, out: &mut Vec<NodeId>) -> Result<()> {
        let lview = self.lview(view)?;
        let Some(icu) = self.tview(lview.tview).icu(anchor) else {
            return Ok(());
        };
        let case = match lview.slot(icu.current_case_index) {
            Slot::Case(case) if *case < 0 => !*case,
            Slot::Case(case) => *case,
            _ => return Ok(()),
        };
        let Some(remove) = icu.remove.get(case as usize) else {
            return Ok(());
        };
        for op in remove.ops() {
            match op {
                RemoveOp::Node(index) => {
                    if let Slot::Native(node) = lview.slot(*index) {
                        out.push(*node);
                    }
                }
                RemoveOp::NestedIcu(index) => self.collect_icu_nodes(view, *index, out)?,
            }
        }
        Ok(())
    }

    /// Add `view` to the container at `index`, placing its DOM unless `add_to_dom` is off.
    pub(crate) fn insert_view(&mut self, loc: ContainerLoc, view: ViewId, index: usize, add_to_dom: bool) -> Result<()> {
        self.container_mut(loc)?.views.insert(index, view);
        let lview = self.lview_mut(view)?;
        lview.parent = Some(ParentRef::Container(loc));
        lview.flags |= LViewFlags::ATTACHED;

        if add_to_dom {
            let before = self.before_node_for_view(loc, index)?;
            let anchor = self.container(loc)?.anchor;
            if let Some(parent) = anchor.and_then(|a| self.renderer.parent_node(a)) {
                self.apply_view(view, WalkAction::Insert, Some(parent), before)?;
            }
        }
        if let Some(info) = &mut self.lview_mut(view)?.hydration {
            info.first_child = None;
        }
        Ok(())
    }

    /// Remove the view at `index` from the container and the DOM, without destroying it.
    pub(crate) fn detach_view(&mut self, loc: ContainerLoc, index: usize) -> Result<Option<ViewId>> {
        let container = self.container_mut(loc)?;
        if index >= container.views.len() {
            return Ok(None);
        }
        let view = container.views.remove(index);
        self.apply_view(view, WalkAction::Detach, None, None)?;
        let lview = self.lview_mut(view)?;
        lview.parent = None;
        lview.flags.remove(LViewFlags::ATTACHED);
        Ok(Some(view))
    }

    /// First DOM node after the view at `index`: the next view's first node or the anchor.
    pub(crate) fn before_node_for_view(&self, loc: ContainerLoc, index: usize) -> Result<Option<NodeId>> {
        let container = self.container(loc)?;
        self.before_node_in(container, index + 1)
    }

    fn before_node_in(&self, container: &LContainer, next: usize) -> Result<Option<NodeId>> {
        if let Some(&view) = container.views.get(next)
            && let Some(first) = self.tview_of(view)?.first_child
            && let Some(node) = self.first_native_node(view, Some(first))?
        {
            return Ok(Some(node));
        }
        Ok(container.anchor)
    }

    /// First DOM node of the run starting at `tnode`.
    pub fn first_native_node(&self, view: ViewId, tnode: Option<usize>) -> Result<Option<NodeId>> {
        let Some(index) = tnode else {
            return Ok(None);
        };
        let tview = self.tview_of(view)?;
        let Some(node) = tview.tnode(index) else {
            return Ok(None);
        };
        let lview = self.lview(view)?;
        if node.is(TNodeType::ANY_RNODE) {
            return self.native_at(view, index);
        }
        if node.is(TNodeType::CONTAINER) {
            return match lview.slot(index) {
                Slot::Container(container) => self.before_node_in(container, 0),
                _ => self.native_at(view, index),
            };
        }
        if node.is(TNodeType::ELEMENT_CONTAINER) {
            if node.child.is_some() {
                return self.first_native_node(view, node.child);
            }
            return match lview.slot(index) {
                Slot::Container(container) => self.before_node_in(container, 0),
                _ => self.native_at(view, index),
            };
        }
        if node.is(TNodeType::ICU) {
            if let Some(first) = self.icu_nodes(view, index)?.first() {
                return Ok(Some(*first));
            }
            return self.native_at(view, index);
        }
        Ok(None)
    }

    /// Root DOM nodes of `view`, looking into containers, element containers and ICUs.
    pub fn root_nodes(&self, view: ViewId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        let first = self.tview_of(view)?.first_child;
        self.collect_native_nodes(view, first, &mut out)?;
        Ok(out)
    }

    /// DOM nodes rendered by the children of the element container at `index`.
    pub fn element_container_nodes(&self, view: ViewId, index: usize) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        let child = self.tview_of(view)?.tnode(index).and_then(|t| t.child);
        self.collect_native_nodes(view, child, &mut out)?;
        Ok(out)
    }

    fn collect_native_nodes(&self, view: ViewId, first: Option<usize>, out: &mut Vec<NodeId>) -> Result<()> {
        let tview = self.tview_of(view)?;
        let lview = self.lview(view)?;
        let mut cursor = first;
        while let Some(index) = cursor {
            let Some(tnode) = tview.tnode(index) else {
                break;
            };
            cursor = tnode.next;
            if tnode.flags.contains(TNodeFlags::IS_DETACHED) {
                continue;
            }
            if let Some(node) = self.native_at(view, index)? {
                out.push(node);
            }
            if let Slot::Container(container) = lview.slot(index) {
                for &child in &container.views {
                    let first = self.tview_of(child)?.first_child;
                    self.collect_native_nodes(child, first, out)?;
                }
                if let Some(anchor) = container.anchor
                    && Some(anchor) != self.native_at(view, index)?
                {
                    out.push(anchor);
                }
            }
            if tnode.is(TNodeType::ELEMENT_CONTAINER) {
                self.collect_native_nodes(view, tnode.child, out)?;
            } else if tnode.is(TNodeType::ICU) {
                out.extend(self.icu_nodes(view, index)?);
            }
        }
        Ok(())
    }

    /// Tear down a detached view and everything below it.
    ///
    /// Native nodes are released first, then views are cleaned up from the
    /// bottom: destroy callbacks run and listeners are removed. A destroyed
    /// view leaves the arena.
    pub(crate) fn destroy_lview(&mut self, view: ViewId) -> Result<()> {
        if self.is_destroyed(view) {
            return Ok(());
        }
        self.apply_view(view, WalkAction::Destroy, None, None)?;
        self.clean_up_view(view)
    }

    fn clean_up_view(&mut self, view: ViewId) -> Result<()> {
        let Ok(lview) = self.lview_mut(view) else {
            return Ok(());
        };
        if lview.flags.contains(LViewFlags::DESTROYED) {
            return Ok(());
        }
        lview.flags.remove(LViewFlags::ATTACHED);
        lview.flags |= LViewFlags::DESTROYED;

        let children: Vec<ViewId> = lview
            .data
            .iter()
            .flat_map(|slot| match slot {
                Slot::Component(component) => vec![*component],
                Slot::Container(container) => {
                    let mut views = container.views.clone();
                    if let ContainerHost::Component(component) = container.host {
                        views.push(component);
                    }
                    views
                }
                _ => Vec::new(),
            })
            .collect();
        for child in children {
            self.clean_up_view(child)?;
        }

        let cleanup = std::mem::take(&mut self.lview_mut(view)?.cleanup);
        for entry in cleanup {
            match entry {
                Cleanup::Listener(id) => self.renderer.unlisten(id),
                Cleanup::Callback(callback) => callback(self),
            }
        }
        tracing::trace!(?view, "view destroyed");
        if let Some(slot) = self.views.get_mut(view.index()) {
            *slot = None;
        }
        Ok(())
    }

    /// Length of the container's flat representation, header included.
    pub fn container_raw_len(&self, loc: ContainerLoc) -> Result<usize> {
        Ok(CONTAINER_HEADER_OFFSET + self.container(loc)?.len())
    }
}
