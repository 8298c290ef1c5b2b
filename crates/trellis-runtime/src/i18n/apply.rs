//! Tape interpreters.
//!
//! The create tape runs on every create pass of a view. The update tape
//! runs after the block's bindings were evaluated, gated by the change
//! mask; it switches ICU cases, which builds case DOM with the case's
//! mutate tape and tears it down with its remove tape.
//!
//! The active case of an ICU lives in its case slot: empty when no case
//! matched, `!case` right after a switch and `case` once the case's
//! update tape has run.

use std::rc::Rc;

use trellis_core::{NodeId, NodeKind};
use trellis_opcodes::{CreateTape, IcuType, MutateOp, MutateTape, RemoveOp, TIcu, UpdateOp, UpdateTape};

use super::plural::get_plural_case;
use crate::error::Result;
use crate::instructions::render_stringify;
use crate::runtime::Runtime;
use crate::view::{Slot, TData, ViewId};

/// Case to show for `value`: an exact label first, then the plural
/// category, then `other`.
pub fn get_case_index(icu: &TIcu, value: &str, locale: &str) -> Option<usize> {
    if let Some(index) = icu.case_position(value) {
        return Some(index);
    }
    match icu.kind {
        IcuType::Plural => {
            let category = get_plural_case(value, locale).as_str();
            icu.case_position(category).or_else(|| icu.case_position("other"))
        }
        IcuType::Select => icu.case_position("other"),
    }
}

fn current_case(slot: &Slot) -> Option<usize> {
    match slot {
        Slot::Case(case) if *case < 0 => Some(!*case as usize),
        Slot::Case(case) => Some(*case as usize),
        _ => None,
    }
}

impl Runtime {
    /// Server node for an i18n slot, if it is hydrating and the node is of `kind`.
    fn claim_i18n_node(&self, view: ViewId, index: usize, kind: NodeKind) -> Result<Option<NodeId>> {
        if self.lview(view)?.hydration.is_none() {
            return Ok(None);
        }
        match self.locate_next_node(view, index)? {
            Some(node) if self.renderer.node_kind(node) == kind => Ok(Some(node)),
            Some(_) => {
                tracing::warn!(index, "server-rendered i18n node does not match, creating it");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Create (or claim) the block's text and anchor nodes.
    ///
    /// Eager nodes go under `parent` in front of `before`; the rest wait
    /// for the element they belong to.
    pub(crate) fn apply_create_tape(&mut self, view: ViewId, tape: &CreateTape, parent: Option<NodeId>, before: Option<NodeId>) -> Result<()> {
        for op in tape.ops() {
            if !self.lview(view)?.slot(op.index).is_empty() {
                continue;
            }
            let kind = if op.is_comment { NodeKind::Comment } else { NodeKind::Text };
            let claimed = self.claim_i18n_node(view, op.index, kind)?;
            let node = match claimed {
                Some(node) => node,
                None if op.is_comment => self.renderer.create_comment(&op.text),
                None => self.renderer.create_text(&op.text),
            };
            *self.lview_mut(view)?.slot_mut(op.index) = Slot::Native(node);
            if claimed.is_none()
                && op.append_eagerly
                && let Some(parent) = parent
            {
                self.renderer.insert_before(parent, node, before, false);
            }
        }
        Ok(())
    }

    /// Build the DOM of an ICU case in front of `anchor`.
    ///
    /// Appends to the first parent seen go next to the anchor; others go
    /// into the element created for that parent.
    pub(crate) fn apply_mutate_tape(&mut self, view: ViewId, tape: &MutateTape, anchor: NodeId) -> Result<()> {
        let mut root: Option<(usize, Option<NodeId>)> = None;
        let mut claimed = Vec::new();
        for op in tape.ops() {
            match op {
                MutateOp::CreateText { index, text } => self.create_case_node(view, *index, NodeKind::Text, text, &mut claimed)?,
                MutateOp::CreateComment { index, text } => self.create_case_node(view, *index, NodeKind::Comment, text, &mut claimed)?,
                MutateOp::CreateElement { index, tag } => self.create_case_node(view, *index, NodeKind::Element, tag, &mut claimed)?,
                MutateOp::AppendChild { parent, child } => {
                    let (root_index, root_node) = *root.get_or_insert_with(|| (*parent, self.renderer.parent_node(anchor)));
                    let (target, before) = if *parent == root_index {
                        (root_node, Some(anchor))
                    } else {
                        (self.native_at(view, *parent)?, None)
                    };
                    let Some(target) = target else {
                        continue;
                    };
                    let Some(node) = self.native_at(view, *child)? else {
                        continue;
                    };
                    if !claimed.contains(child) {
                        self.renderer.insert_before(target, node, before, false);
                    }
                    // A nested ICU switched before its anchor was attached; build its case now.
                    let nested = self.tview_of(view)?.icu(*child).cloned();
                    if let Some(nested) = nested
                        && let Some(case) = current_case(self.lview(view)?.slot(nested.current_case_index))
                        && let Some(create) = nested.create.get(case)
                    {
                        self.apply_mutate_tape(view, create, node)?;
                    }
                }
                MutateOp::Attr { index, name, value } => {
                    if let Some(node) = self.native_at(view, *index)? {
                        self.renderer.set_attribute(node, name, value);
                    }
                }
            }
        }
        Ok(())
    }

    fn create_case_node(&mut self, view: ViewId, index: usize, kind: NodeKind, text: &str, claimed: &mut Vec<usize>) -> Result<()> {
        if !self.lview(view)?.slot(index).is_empty() {
            return Ok(());
        }
        let node = match self.claim_i18n_node(view, index, kind)? {
            Some(node) => {
                claimed.push(index);
                node
            }
            None => match kind {
                NodeKind::Element => self.renderer.create_element(text),
                NodeKind::Comment => self.renderer.create_comment(text),
                _ => self.renderer.create_text(text),
            },
        };
        *self.lview_mut(view)?.slot_mut(index) = Slot::Native(node);
        Ok(())
    }

    /// Replay an update tape against `view`.
    ///
    /// A group runs when its mask shares a bit with `change_mask`. Binding
    /// `k` is read from slot `bindings_start + 1 + k`. A skipped group that
    /// refreshes a just-switched ICU runs anyway.
    pub fn apply_update_tape(&mut self, view: ViewId, tape: &UpdateTape, bindings_start: usize, change_mask: u32) -> Result<()> {
        for group in tape.groups() {
            if group.mask & change_mask == 0 {
                if let Some(index) = group.leading_icu_update()
                    && let Some(icu) = self.tview_of(view)?.icu(index).cloned()
                    && matches!(self.lview(view)?.slot(icu.current_case_index), Slot::Case(c) if *c < 0)
                {
                    self.apply_icu_update(view, &icu, bindings_start, change_mask)?;
                }
                continue;
            }

            let mut value = String::new();
            for op in &group.ops {
                match op {
                    UpdateOp::Literal(text) => value.push_str(text),
                    UpdateOp::Binding(k) => {
                        if let Slot::Value(bound) = self.lview(view)?.slot(bindings_start + 1 + k) {
                            value.push_str(&render_stringify(bound));
                        }
                    }
                    UpdateOp::Text { index } => {
                        if let Some(node) = self.native_at(view, *index)? {
                            self.renderer.set_value(node, &value);
                        }
                    }
                    UpdateOp::Attr { index, name, sanitizer } => {
                        let value = match sanitizer {
                            Some(sanitizer) => sanitizer.apply(&value),
                            None => value.clone(),
                        };
                        self.apply_i18n_attr(view, *index, name, value)?;
                    }
                    UpdateOp::IcuSwitch { index } => {
                        if let Some(icu) = self.tview_of(view)?.icu(*index).cloned() {
                            self.apply_icu_switch(view, &icu, &value)?;
                        }
                    }
                    UpdateOp::IcuUpdate { index } => {
                        if let Some(icu) = self.tview_of(view)?.icu(*index).cloned() {
                            self.apply_icu_update(view, &icu, bindings_start, change_mask)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Attribute writes on template elements go through directive inputs;
    /// elements created by ICU cases take the raw attribute.
    fn apply_i18n_attr(&mut self, view: ViewId, index: usize, name: &str, value: String) -> Result<()> {
        let is_tnode = matches!(self.tview_of(view)?.data.get(index), Some(TData::Node(_)));
        let value = serde_json::Value::String(value);
        if is_tnode && self.set_directive_input(view, index, name, &value)? {
            return Ok(());
        }
        if let Some(node) = self.native_at(view, index)? {
            self.renderer.set_attribute(node, name, &render_stringify(&value));
        }
        Ok(())
    }

    /// Show the case matching `value`, tearing down the active one first.
    pub(crate) fn apply_icu_switch(&mut self, view: ViewId, icu: &Rc<TIcu>, value: &str) -> Result<()> {
        let case = get_case_index(icu, value, &self.config.locale);
        let active = current_case(self.lview(view)?.slot(icu.current_case_index));
        if active == case {
            return Ok(());
        }
        self.apply_icu_remove(view, icu)?;
        tracing::trace!(anchor = icu.anchor_index, ?case, value, "icu case switch");
        *self.lview_mut(view)?.slot_mut(icu.current_case_index) = match case {
            Some(case) => Slot::Case(!(case as i32)),
            None => Slot::Empty,
        };
        if let Some(case) = case
            && let Some(Slot::Native(anchor)) = self.lview(view).ok().map(|l| l.slot(icu.anchor_index).clone())
            && let Some(create) = icu.create.get(case)
        {
            self.apply_mutate_tape(view, create, anchor)?;
        }
        Ok(())
    }

    /// Run the active case's bindings; a just-switched case runs all of them.
    fn apply_icu_update(&mut self, view: ViewId, icu: &Rc<TIcu>, bindings_start: usize, change_mask: u32) -> Result<()> {
        let (case, mask) = match self.lview(view)?.slot(icu.current_case_index) {
            Slot::Case(case) if *case < 0 => (!*case, u32::MAX),
            Slot::Case(case) => (*case, change_mask),
            _ => return Ok(()),
        };
        *self.lview_mut(view)?.slot_mut(icu.current_case_index) = Slot::Case(case);
        if let Some(update) = icu.update.get(case as usize) {
            self.apply_update_tape(view, update, bindings_start, mask)?;
        }
        Ok(())
    }

    /// Remove the DOM of the active case, nested ICUs included.
    fn apply_icu_remove(&mut self, view: ViewId, icu: &TIcu) -> Result<()> {
        let Some(case) = current_case(self.lview(view)?.slot(icu.current_case_index)) else {
            return Ok(());
        };
        let Some(remove) = icu.remove.get(case) else {
            return Ok(());
        };
        for op in remove.ops() {
            match op {
                RemoveOp::Node(index) => {
                    if let Some(node) = self.native_at(view, *index)? {
                        let parent = self.renderer.parent_node(node);
                        self.renderer.remove_child(parent, node, false);
                    }
                }
                RemoveOp::NestedIcu(index) => {
                    if let Some(nested) = self.tview_of(view)?.icu(*index).cloned() {
                        self.apply_icu_remove(view, &nested)?;
                    }
                }
            }
        }
        Ok(())
    }
}
