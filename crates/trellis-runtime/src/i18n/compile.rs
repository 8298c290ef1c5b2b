//! First-pass compilation of a translated message into a `TI18n`.
//!
//! Runs once per template. Text and ICU anchors get expando slots and
//! node descriptors; element placeholders reserve the template slot the
//! element instruction fills in later. Placeholders rendered in front of
//! eagerly appended text are pointed at that text through
//! `insert_before_index`.

use std::rc::Rc;

use trellis_opcodes::{
    CreateOp, CreateTape, IcuExpression, MessagePart, MutateOp, SlotAllocator, TI18n, TIcu, UpdateTape, ValuePart,
    compile_icu, parse_message,
};

use crate::error::Result;
use crate::flags::TNodeType;
use crate::runtime::Runtime;
use crate::view::{HEADER_OFFSET, Slot, TData, TView, TViewId};

/// Expando allocation over a template, for ICU case tables.
struct TemplateSlots<'a> {
    tview: &'a mut TView,
}

impl SlotAllocator for TemplateSlots<'_> {
    fn alloc_slot(&mut self) -> usize {
        self.tview.alloc_expando(1, Slot::Empty)
    }

    fn register_icu(&mut self, anchor_index: usize, icu: TIcu) {
        tag_case_elements(self.tview, &icu);
        if let Some(data) = self.tview.data.get_mut(anchor_index) {
            *data = TData::Icu(Rc::new(icu));
        }
    }
}

/// Elements an ICU case creates have no node descriptor; remember their tag.
fn tag_case_elements(tview: &mut TView, icu: &TIcu) {
    for op in icu.create.iter().flat_map(|tape| tape.ops()) {
        if let MutateOp::CreateElement { index, tag } = op
            && let Some(data) = tview.data.get_mut(*index)
        {
            *data = TData::IcuTag(tag.clone());
        }
    }
}

/// A node created at one nesting level of the message.
#[derive(Clone, Copy)]
struct Sibling {
    index: usize,
    placeholder: bool,
}

pub(crate) struct I18nCompiler<'rt> {
    rt: &'rt mut Runtime,
    tview: TViewId,
    create: CreateTape,
    update: UpdateTape,
    /// Nodes created so far, one list per open placeholder.
    levels: Vec<Vec<Sibling>>,
    parents: Vec<Option<usize>>,
}

impl<'rt> I18nCompiler<'rt> {
    pub(crate) fn new(rt: &'rt mut Runtime, tview: TViewId, root: Option<usize>) -> Self {
        Self {
            rt,
            tview,
            create: CreateTape::new(),
            update: UpdateTape::new(),
            levels: vec![Vec::new()],
            parents: vec![root],
        }
    }

    fn parent(&self) -> Option<usize> {
        self.parents.last().copied().flatten()
    }

    fn at_root(&self) -> bool {
        self.parents.len() == 1
    }

    pub(crate) fn compile(mut self, message: &str) -> Result<TI18n> {
        for part in parse_message(message)? {
            match part {
                MessagePart::Text(parts) => self.text(&parts),
                MessagePart::ElementStart(n) => self.element_start(HEADER_OFFSET + n),
                MessagePart::ElementEnd(n) => self.element_end(HEADER_OFFSET + n),
                MessagePart::Icu(expr) => self.icu(&expr)?,
            }
        }
        Ok(TI18n {
            create: self.create,
            update: self.update,
        })
    }

    /// Reserve an expando slot and describe it as a node of the current level.
    fn expando_node(&mut self, kind: TNodeType) -> usize {
        let index = self.rt.tview_mut(self.tview).alloc_expando(1, Slot::Empty);
        self.rt.create_tnode_at_index(self.tview, index, kind, None, Vec::new());
        self.rt.state.set_current_tnode(Some(index), false);
        if !self.at_root()
            && let Some(parent) = self.parent()
            && let Some(parent) = self.rt.tview_mut(self.tview).tnode_mut(parent)
        {
            parent.i18n_children.push(index);
        }
        self.add_sibling(Sibling {
            index,
            placeholder: false,
        });
        index
    }

    fn text(&mut self, parts: &[ValuePart]) {
        let index = self.expando_node(TNodeType::TEXT);
        let bound = ValuePart::has_binding(parts);
        let text: String = if bound {
            String::new()
        } else {
            parts
                .iter()
                .filter_map(|p| match p {
                    ValuePart::Literal(s) => Some(s.as_str()),
                    ValuePart::Binding(_) => None,
                })
                .collect()
        };
        if let Some(tnode) = self.rt.tview_mut(self.tview).tnode_mut(index) {
            tnode.value.clone_from(&text);
        }
        self.create.push(CreateOp::text(index, text, self.at_root()));
        if bound {
            self.update.push_text(parts, index);
        }
    }

    fn element_start(&mut self, index: usize) {
        if self.rt.tview(self.tview).tnode(index).is_none() {
            self.rt
                .create_tnode_at_index(self.tview, index, TNodeType::PLACEHOLDER, None, Vec::new());
        }
        self.rt.state.set_current_tnode(Some(index), true);
        self.add_sibling(Sibling {
            index,
            placeholder: true,
        });
        self.levels.push(Vec::new());
        self.parents.push(Some(index));
    }

    fn element_end(&mut self, index: usize) {
        if self.parents.len() > 1 {
            self.levels.pop();
            self.parents.pop();
        }
        self.rt.state.set_current_tnode(Some(index), false);
    }

    fn icu(&mut self, expr: &IcuExpression) -> Result<()> {
        let anchor = self.expando_node(TNodeType::ICU);
        self.create
            .push(CreateOp::comment(anchor, format!("ICU {anchor}"), self.at_root()));
        let tview = self.rt.tview_mut(self.tview);
        let mut slots = TemplateSlots { tview };
        let (icu, _mask) = compile_icu(expr, anchor, &mut slots, &mut self.update)?;
        tag_case_elements(slots.tview, &icu);
        if let Some(tnode) = slots.tview.tnode_mut(anchor) {
            tnode.icu = Some(Rc::new(icu));
        }
        Ok(())
    }

    /// Record `node` at the current level. Placeholders created earlier at
    /// this level render in front of it when it is eager text or when it
    /// was declared ahead of them.
    fn add_sibling(&mut self, node: Sibling) {
        let Some(level) = self.levels.last_mut() else {
            return;
        };
        let earlier: Vec<usize> = level
            .iter()
            .filter(|s| s.placeholder && (!node.placeholder || s.index > node.index))
            .map(|s| s.index)
            .collect();
        level.push(node);
        let tview = self.rt.tview_mut(self.tview);
        for index in earlier {
            if let Some(tnode) = tview.tnode_mut(index)
                && tnode.insert_before_index.is_none()
            {
                tnode.insert_before_index = Some(node.index);
            }
        }
    }
}
