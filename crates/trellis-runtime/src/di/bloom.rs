//! Injector windows and their bloom filters.
//!
//! A node that carries directives or providers owns a window of
//! [`INJECTOR_SIZE`] expando slots. The template's copy of the window holds
//! the node's own 256-bit bloom filter plus a back-pointer to the node; the
//! view's copy holds the cumulative filter of every ancestor injector plus
//! the relative location of the parent injector.

use crate::error::Result;
use crate::runtime::Runtime;
use crate::view::{LView, Slot, TData, TView, ViewId};

/// Bits in a bloom filter.
pub const BLOOM_SIZE: u32 = 256;
/// Buckets are 32 bits wide.
const BLOOM_BUCKET_BITS: u32 = 5;
const BLOOM_BUCKETS: usize = 8;
/// Offset of the parent-location / owning-node slot in a window.
pub(crate) const PARENT_OFFSET: usize = 8;
/// Slots in one injector window.
pub const INJECTOR_SIZE: usize = 9;

/// Encoded pointer to a parent injector window.
///
/// The low 15 bits hold the window index, the bits from 16 up count how many
/// declaration views to walk up. `-1` means there is no parent.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RelativeInjectorLocation(i32);

impl RelativeInjectorLocation {
    pub const NO_PARENT: Self = Self(-1);
    const INDEX_MASK: i32 = 0x7fff;
    const VIEW_OFFSET_SHIFT: i32 = 16;

    pub fn new(index: usize, view_offset: usize) -> Self {
        debug_assert!(index <= Self::INDEX_MASK as usize, "injector index {index} does not fit in 15 bits");
        debug_assert!(view_offset < 1 << 15, "view offset {view_offset} does not fit in 15 bits");
        Self((index as i32 & Self::INDEX_MASK) | ((view_offset as i32) << Self::VIEW_OFFSET_SHIFT))
    }

    pub fn has_parent(self) -> bool {
        self.0 != -1
    }

    pub fn index(self) -> usize {
        (self.0 & Self::INDEX_MASK) as usize
    }

    pub fn view_offset(self) -> usize {
        (self.0 >> Self::VIEW_OFFSET_SHIFT) as usize
    }

    pub fn raw(self) -> i32 {
        self.0
    }
}

#[inline]
fn bucket(bit: u8) -> (usize, u32) {
    ((bit as u32 >> BLOOM_BUCKET_BITS) as usize, 1 << (bit as u32 & 31))
}

/// Whether the node's own filter at `injector_index` has `bit` set.
pub(crate) fn own_bloom_has(tview: &TView, injector_index: usize, bit: u8) -> bool {
    let (offset, mask) = bucket(bit);
    matches!(tview.data.get(injector_index + offset), Some(TData::Bloom(v)) if v & mask != 0)
}

/// Whether any ancestor of the node at `injector_index` has `bit` set.
pub(crate) fn cumulative_bloom_has(lview: &LView, injector_index: usize, bit: u8) -> bool {
    let (offset, mask) = bucket(bit);
    matches!(lview.slot(injector_index + offset), Slot::Bloom(v) if v & mask != 0)
}

pub(crate) fn bloom_add(tview: &mut TView, injector_index: usize, bit: u8) {
    let (offset, mask) = bucket(bit);
    if let Some(TData::Bloom(v)) = tview.data.get_mut(injector_index + offset) {
        *v |= mask;
    }
}

impl Runtime {
    /// Window owned by the node at `tnode_index`, if it has been set up in this view.
    pub(crate) fn injector_index(&self, view: ViewId, tnode_index: usize) -> Result<Option<usize>> {
        let lview = self.lview(view)?;
        let tview = self.tview(lview.tview);
        let Some(tnode) = tview.tnode(tnode_index) else {
            return Ok(None);
        };
        let Some(index) = tnode.injector_index else {
            return Ok(None);
        };
        let inherited = tnode
            .parent
            .and_then(|p| tview.tnode(p))
            .is_some_and(|p| p.injector_index == Some(index));
        if inherited || lview.slot(index + PARENT_OFFSET).is_empty() {
            return Ok(None);
        }
        Ok(Some(index))
    }

    /// Locate the nearest injector above the node, crossing declaration views.
    pub(crate) fn parent_injector_location(&self, view: ViewId, tnode_index: usize) -> Result<RelativeInjectorLocation> {
        let lview = self.lview(view)?;
        let tview = self.tview(lview.tview);
        if let Some(parent) = tview.tnode(tnode_index).and_then(|t| t.parent).and_then(|p| tview.tnode(p))
            && let Some(index) = parent.injector_index
        {
            return Ok(RelativeInjectorLocation::new(index, 0));
        }

        let mut offset = 0;
        let mut cursor = Some(view);
        while let Some(current) = cursor {
            let lview = self.lview(current)?;
            let (Some(host), Some(decl)) = (lview.t_host, lview.declaration_view) else {
                return Ok(RelativeInjectorLocation::NO_PARENT);
            };
            offset += 1;
            cursor = Some(decl);
            let decl_tview = self.tview(self.lview(decl)?.tview);
            if let Some(index) = decl_tview.tnode(host).and_then(|t| t.injector_index) {
                return Ok(RelativeInjectorLocation::new(index, offset));
            }
        }
        Ok(RelativeInjectorLocation::NO_PARENT)
    }

    /// The view `location` points into, counted from `view`.
    pub(crate) fn parent_injector_view(&self, location: RelativeInjectorLocation, view: ViewId) -> Result<ViewId> {
        let mut current = view;
        for _ in 0..location.view_offset() {
            current = self
                .lview(current)?
                .declaration_view
                .ok_or(crate::error::RuntimeError::MissingView(current))?;
        }
        Ok(current)
    }

    /// Set up the node's injector window in `view`, allocating it on the first pass.
    pub(crate) fn get_or_create_node_injector(&mut self, view: ViewId, tnode_index: usize) -> Result<usize> {
        if let Some(index) = self.injector_index(view, tnode_index)? {
            return Ok(index);
        }
        let tview_id = self.lview(view)?.tview;
        if self.tview(tview_id).first_create_pass {
            let index = self.alloc_expando(view, INJECTOR_SIZE, Slot::Bloom(0))?;
            let tview = self.tview_mut(tview_id);
            tview.data[index..index + BLOOM_BUCKETS].fill(TData::Bloom(0));
            tview.data[index + PARENT_OFFSET] = TData::InjectorTNode(tnode_index);
            tview.blueprint[index + PARENT_OFFSET] = Slot::Empty;
            if let Some(tnode) = tview.tnode_mut(tnode_index) {
                tnode.injector_index = Some(index);
            }
        }
        let index = self
            .tview(tview_id)
            .tnode(tnode_index)
            .and_then(|t| t.injector_index)
            .ok_or(crate::error::RuntimeError::MissingNode { index: tnode_index })?;

        let parent = self.parent_injector_location(view, tnode_index)?;
        let mut cumulative = [0u32; BLOOM_BUCKETS];
        if parent.has_parent() {
            let parent_view = self.parent_injector_view(parent, view)?;
            let parent_lview = self.lview(parent_view)?;
            let parent_tview = self.tview(parent_lview.tview);
            for (i, bits) in cumulative.iter_mut().enumerate() {
                let slot = parent.index() + i;
                let own = match parent_tview.data.get(slot) {
                    Some(TData::Bloom(v)) => *v,
                    _ => 0,
                };
                let inherited = match parent_lview.slot(slot) {
                    Slot::Bloom(v) => *v,
                    _ => 0,
                };
                *bits = own | inherited;
            }
        }
        let lview = self.lview_mut(view)?;
        for (i, bits) in cumulative.into_iter().enumerate() {
            *lview.slot_mut(index + i) = Slot::Bloom(bits);
        }
        *lview.slot_mut(index + PARENT_OFFSET) = Slot::InjectorParent(parent);
        Ok(index)
    }
}
