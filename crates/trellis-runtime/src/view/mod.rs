//! Flat view storage.
//!
//! Every rendered view is an [`LView`]: a slot array whose first
//! [`HEADER_OFFSET`] entries are reserved, followed by declared nodes,
//! binding slots and expando slots (injectors, providers, i18n nodes).
//! Its shape is described once per template by a [`TView`], whose `data`
//! array is index-aligned with the `LView` and holds the [`TNode`]s.
//!
//! Views live in the runtime's arena and refer to each other by [`ViewId`].

mod container;
mod lview;
mod tnode;
mod tview;

pub use container::{ContainerHost, LContainer};
pub(crate) use lview::Cleanup;
pub use lview::{LView, Slot};
pub use tnode::TNode;
pub use tview::{TData, TView, TViewKind};

/// Slots reserved at the start of every view.
pub const HEADER_OFFSET: usize = 22;

/// Slots reserved at the start of every container before its views.
pub const CONTAINER_HEADER_OFFSET: usize = 10;

/// Handle to a view in the runtime arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ViewId(pub(crate) u32);

impl ViewId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a template description.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TViewId(pub(crate) u32);

impl TViewId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A container is addressed by the view it lives in and its slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ContainerLoc {
    pub view: ViewId,
    pub index: usize,
}

/// What a view is attached to in the view tree.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParentRef {
    View(ViewId),
    Container(ContainerLoc),
}
