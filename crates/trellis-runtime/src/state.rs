//! Instruction state: the frame stack instructions read their view from.
//!
//! Frames are pooled in an arena with parent/child links. Entering a view
//! reuses the child of the current frame when one exists, so steady-state
//! rendering allocates nothing. Leaving resets the frame and moves the
//! current pointer back to its parent.

use super::di::InjectContext;
use super::view::{TViewId, ViewId};

/// Per-view-entry instruction state.
#[derive(Clone, Debug, Default)]
pub(crate) struct LFrame {
    pub(crate) lview: Option<ViewId>,
    pub(crate) tview: Option<TViewId>,
    /// Last node created or selected.
    pub(crate) current_tnode: Option<usize>,
    /// Whether `current_tnode` is the parent of the next node (an open element).
    pub(crate) is_parent: bool,
    /// Node the next update instruction applies to.
    pub(crate) selected_index: Option<usize>,
    /// Next binding slot to read.
    pub(crate) binding_index: usize,
    pub(crate) in_i18n: bool,
    /// Parent of the open i18n block's root-level nodes.
    pub(crate) i18n_parent: Option<usize>,
    parent: Option<usize>,
    child: Option<usize>,
}

impl LFrame {
    fn reset(&mut self) {
        let (parent, child) = (self.parent, self.child);
        *self = Self {
            is_parent: true,
            parent,
            child,
            ..Self::default()
        };
    }
}

pub(crate) struct InstructionState {
    frames: Vec<LFrame>,
    current: usize,
    /// Verifying refresh: a changed binding is an error.
    pub(crate) check_no_changes: bool,
    /// Whether the factory being run may see component view providers.
    pub(crate) include_view_providers: bool,
    pub(crate) inject_context: Vec<InjectContext>,
    /// Bindings changed since the last `i18n_apply`, one bit per binding.
    pub(crate) i18n_change_mask: u32,
    pub(crate) i18n_exp_counter: usize,
}

impl Default for InstructionState {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionState {
    pub(crate) fn new() -> Self {
        let mut root = LFrame::default();
        root.reset();
        Self {
            frames: vec![root],
            current: 0,
            check_no_changes: false,
            include_view_providers: true,
            inject_context: Vec::new(),
            i18n_change_mask: 0,
            i18n_exp_counter: 0,
        }
    }

    #[inline]
    pub(crate) fn frame(&self) -> &LFrame {
        &self.frames[self.current]
    }

    #[inline]
    pub(crate) fn frame_mut(&mut self) -> &mut LFrame {
        &mut self.frames[self.current]
    }

    /// Nesting depth of entered frames.
    pub(crate) fn depth(&self) -> usize {
        let mut depth = 0;
        let mut idx = self.frames[self.current].parent;
        while let Some(i) = idx {
            depth += 1;
            idx = self.frames[i].parent;
        }
        depth
    }

    /// Frames allocated so far, including idle pooled ones.
    pub(crate) fn pooled(&self) -> usize {
        self.frames.len()
    }

    fn alloc(&mut self) -> &mut LFrame {
        let next = match self.frames[self.current].child {
            Some(child) => child,
            None => {
                let idx = self.frames.len();
                let mut frame = LFrame::default();
                frame.reset();
                frame.parent = Some(self.current);
                self.frames.push(frame);
                self.frames[self.current].child = Some(idx);
                idx
            }
        };
        self.current = next;
        &mut self.frames[next]
    }

    pub(crate) fn enter_view(&mut self, view: ViewId, tview: TViewId, bindings_start: usize) {
        let frame = self.alloc();
        frame.lview = Some(view);
        frame.tview = Some(tview);
        frame.binding_index = bindings_start;
        frame.current_tnode = None;
        frame.is_parent = true;
        frame.in_i18n = false;
        frame.i18n_parent = None;
    }

    pub(crate) fn enter_di(&mut self, view: ViewId, tview: TViewId, tnode: usize) {
        let frame = self.alloc();
        frame.lview = Some(view);
        frame.tview = Some(tview);
        frame.current_tnode = Some(tnode);
    }

    pub(crate) fn leave_view(&mut self) {
        self.leave();
    }

    pub(crate) fn leave_di(&mut self) {
        self.leave();
    }

    fn leave(&mut self) {
        let frame = &mut self.frames[self.current];
        let parent = frame.parent;
        frame.reset();
        if let Some(parent) = parent {
            self.current = parent;
        }
    }

    pub(crate) fn set_current_tnode(&mut self, tnode: Option<usize>, is_parent: bool) {
        let frame = self.frame_mut();
        frame.current_tnode = tnode;
        frame.is_parent = is_parent;
    }

    pub(crate) fn next_binding_index(&mut self) -> usize {
        let frame = self.frame_mut();
        frame.binding_index += 1;
        frame.binding_index - 1
    }
}
