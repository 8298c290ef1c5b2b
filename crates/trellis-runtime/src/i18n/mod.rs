//! Translated content.
//!
//! A template marks a translated block with `i18n_start` / `i18n_end`.
//! The first instance of the template compiles the message into tapes;
//! every instance replays the create tape when it is created and the
//! update tape after the block's bindings were fed through `i18n_exp`.

mod apply;
mod compile;
pub mod plural;

#[cfg(test)]
mod i18n_tests;
#[cfg(test)]
mod plural_tests;

use std::rc::Rc;

use serde_json::Value;
use trellis_opcodes::to_mask_bit;

pub use apply::get_case_index;
pub use plural::{PluralCategory, get_plural_case};

use crate::error::{Result, RuntimeError};
use crate::flags::TNodeType;
use crate::runtime::Runtime;
use crate::view::{HEADER_OFFSET, TData};
use compile::I18nCompiler;

impl Runtime {
    /// Open a translated block whose message is stored at slot `index`.
    pub fn i18n_start(&mut self, index: usize, message: &str) -> Result<()> {
        let (view, tview) = self.current_view("i18n_start")?;
        let adjusted = HEADER_OFFSET + index;
        let decls = self.tview(tview).bindings_start_index - HEADER_OFFSET;
        if index >= decls {
            return Err(RuntimeError::UndeclaredSlot { index, decls });
        }
        let root = self.next_parent(tview);

        if self.tview(tview).first_create_pass && self.tview(tview).i18n(adjusted).is_none() {
            let (current, is_parent) = (self.state.frame().current_tnode, self.state.frame().is_parent);
            self.state.frame_mut().in_i18n = true;
            let compiled = I18nCompiler::new(self, tview, root).compile(message)?;
            let t = self.tview_mut(tview);
            t.ensure_slot(adjusted);
            t.data[adjusted] = TData::I18n(Rc::new(compiled));
            self.state.set_current_tnode(current, is_parent);
        }

        let frame = self.state.frame_mut();
        frame.in_i18n = true;
        frame.i18n_parent = root;

        let i18n = self
            .tview(tview)
            .i18n(adjusted)
            .cloned()
            .ok_or(RuntimeError::MissingNode { index: adjusted })?;
        let parent = self.closest_parent_element(view, root)?;
        let before = match root {
            Some(root) if self.tview(tview).tnode(root).is_some_and(|t| t.is(TNodeType::ELEMENT_CONTAINER)) => {
                self.native_at(view, root)?
            }
            _ => None,
        };
        self.apply_create_tape(view, &i18n.create, parent, before)
    }

    /// Close the open translated block.
    pub fn i18n_end(&mut self) -> Result<()> {
        let (_, tview) = self.current_view("i18n_end")?;
        let root = self.state.frame().i18n_parent;
        let tv = self.tview(tview);
        let first = match root {
            Some(root) => tv.tnode(root).and_then(|t| t.child),
            None => tv.first_child,
        };
        let last = std::iter::successors(first.and_then(|i| tv.tnode(i)), |t| t.next.and_then(|i| tv.tnode(i)))
            .last()
            .map(|t| t.index);

        let frame = self.state.frame_mut();
        frame.in_i18n = false;
        frame.i18n_parent = None;
        match last {
            Some(last) => self.state.set_current_tnode(Some(last), false),
            None => self.state.set_current_tnode(root, true),
        }
        Ok(())
    }

    /// A translated block with no template children.
    pub fn i18n(&mut self, index: usize, message: &str) -> Result<()> {
        self.i18n_start(index, message)?;
        self.i18n_end()
    }

    /// Feed the next binding of a translated block.
    pub fn i18n_exp(&mut self, value: impl Into<Value>) -> Result<()> {
        let changed = self.bind(value.into())?;
        let counter = self.state.i18n_exp_counter;
        if changed {
            self.state.i18n_change_mask |= to_mask_bit(counter);
        }
        self.state.i18n_exp_counter = counter + 1;
        Ok(())
    }

    /// Replay the update tape of the block at slot `index` for the bindings fed since the last apply.
    pub fn i18n_apply(&mut self, index: usize) -> Result<()> {
        let (view, tview) = self.current_view("i18n_apply")?;
        let counter = std::mem::take(&mut self.state.i18n_exp_counter);
        let mask = std::mem::take(&mut self.state.i18n_change_mask);
        if counter == 0 {
            return Ok(());
        }
        let adjusted = HEADER_OFFSET + index;
        let i18n = self
            .tview(tview)
            .i18n(adjusted)
            .cloned()
            .ok_or(RuntimeError::MissingNode { index: adjusted })?;
        let bindings_start = self.state.frame().binding_index - counter - 1;
        tracing::trace!(index, mask, "i18n apply");
        self.apply_update_tape(view, &i18n.update, bindings_start, mask)
    }
}
