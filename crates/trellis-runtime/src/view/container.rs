use trellis_core::NodeId;

use super::{CONTAINER_HEADER_OFFSET, ViewId};
use crate::container::ViewRef;
use crate::hydration::DehydratedView;

/// What a container is anchored on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ContainerHost {
    /// A template comment or a plain element.
    Node(NodeId),
    /// A component host element; the node is the component view's host.
    Component(ViewId),
}

/// Ordered list of views inserted at one anchor.
#[derive(Clone, Debug)]
pub struct LContainer {
    pub host: ContainerHost,
    /// Comment the views are inserted in front of.
    pub anchor: Option<NodeId>,
    /// View the container slot lives in.
    pub parent: ViewId,
    /// Slot of the node the container is declared on.
    pub t_host: usize,
    pub views: Vec<ViewId>,
    /// Lazily created handles, index-aligned with `views`.
    pub(crate) view_refs: Option<Vec<ViewRef>>,
    /// Server-rendered views not yet claimed by the client.
    pub(crate) dehydrated_views: Vec<DehydratedView>,
}

impl LContainer {
    pub(crate) fn new(host: ContainerHost, anchor: Option<NodeId>, parent: ViewId, t_host: usize) -> Self {
        Self {
            host,
            anchor,
            parent,
            t_host,
            views: Vec::new(),
            view_refs: None,
            dehydrated_views: Vec::new(),
        }
    }

    /// Number of attached views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Length of the container as a flat array, header included.
    pub fn raw_len(&self) -> usize {
        CONTAINER_HEADER_OFFSET + self.views.len()
    }

    pub fn dehydrated_views(&self) -> &[DehydratedView] {
        &self.dehydrated_views
    }
}
