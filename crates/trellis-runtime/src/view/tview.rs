use std::rc::Rc;

use trellis_opcodes::{TI18n, TIcu};

use super::{HEADER_OFFSET, Slot, TNode, TViewId};
use crate::def::{DirectiveDef, TemplateFn};
use crate::di::Token;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TViewKind {
    /// Synthetic view holding a bootstrapped or dynamically created component host.
    Root,
    Component,
    Embedded,
}

/// Per-slot static data, index-aligned with every `LView` of the template.
#[derive(Clone, Debug)]
pub enum TData {
    Empty,
    Node(TNode),
    /// One 32-bit bucket of a node's own bloom filter.
    Bloom(u32),
    /// Last slot of an injector window: the node owning it.
    InjectorTNode(usize),
    /// Provider slot.
    Token(Token),
    Directive(Rc<DirectiveDef>),
    I18n(Rc<TI18n>),
    /// Element created by an ICU case (no `TNode`).
    IcuTag(String),
    /// Case table of a nested ICU (no `TNode`).
    Icu(Rc<TIcu>),
}

/// Shared template description.
pub struct TView {
    pub(crate) id: TViewId,
    pub kind: TViewKind,
    pub(crate) template: Option<TemplateFn>,
    pub data: Vec<TData>,
    pub(crate) blueprint: Vec<Slot>,
    pub bindings_start_index: usize,
    pub expando_start_index: usize,
    /// `true` until the first instance finished its create pass.
    pub first_create_pass: bool,
    pub first_child: Option<usize>,
    /// Container node this embedded template is declared on.
    pub decl_tnode: Option<usize>,
    pub(crate) registry: Rc<[Rc<DirectiveDef>]>,
    /// Slots of component hosts declared in this template.
    pub components: Vec<usize>,
    /// Identifier used to match server-rendered views to this template.
    pub ssr_id: Option<String>,
}

impl TView {
    pub(crate) fn new(
        id: TViewId,
        kind: TViewKind,
        template: Option<TemplateFn>,
        decls: usize,
        vars: usize,
        registry: Rc<[Rc<DirectiveDef>]>,
        decl_tnode: Option<usize>,
    ) -> Self {
        let bindings_start_index = HEADER_OFFSET + decls;
        let len = bindings_start_index + vars;
        Self {
            id,
            kind,
            template,
            data: vec![TData::Empty; len],
            blueprint: vec![Slot::Empty; len],
            bindings_start_index,
            expando_start_index: len,
            first_create_pass: true,
            first_child: None,
            decl_tnode,
            registry,
            components: Vec::new(),
            ssr_id: None,
        }
    }

    pub fn id(&self) -> TViewId {
        self.id
    }

    pub fn tnode(&self, index: usize) -> Option<&TNode> {
        match self.data.get(index) {
            Some(TData::Node(tnode)) => Some(tnode),
            _ => None,
        }
    }

    pub(crate) fn tnode_mut(&mut self, index: usize) -> Option<&mut TNode> {
        match self.data.get_mut(index) {
            Some(TData::Node(tnode)) => Some(tnode),
            _ => None,
        }
    }

    /// Case table anchored at `index`, whether it sits on a `TNode` or is nested.
    pub fn icu(&self, index: usize) -> Option<&Rc<TIcu>> {
        match self.data.get(index) {
            Some(TData::Node(tnode)) => tnode.icu.as_ref(),
            Some(TData::Icu(icu)) => Some(icu),
            _ => None,
        }
    }

    pub fn i18n(&self, index: usize) -> Option<&Rc<TI18n>> {
        match self.data.get(index) {
            Some(TData::I18n(i18n)) => Some(i18n),
            _ => None,
        }
    }

    /// Iterate the root nodes of the template in order.
    pub fn root_nodes(&self) -> impl Iterator<Item = &TNode> + '_ {
        std::iter::successors(self.first_child.and_then(|i| self.tnode(i)), |t| {
            t.next.and_then(|i| self.tnode(i))
        })
    }

    /// Iterate the children of `parent` in order.
    pub fn children(&self, parent: &TNode) -> impl Iterator<Item = &TNode> + '_ {
        std::iter::successors(parent.child.and_then(|i| self.tnode(i)), |t| {
            t.next.and_then(|i| self.tnode(i))
        })
    }

    /// Grow static data and the blueprint together so `index` exists in both.
    pub(crate) fn ensure_slot(&mut self, index: usize) {
        if self.data.len() <= index {
            self.data.resize(index + 1, TData::Empty);
            self.blueprint.resize(index + 1, Slot::Empty);
        }
    }

    /// Append `count` expando slots to the template; the caller grows the live view.
    pub(crate) fn alloc_expando(&mut self, count: usize, initial: Slot) -> usize {
        let start = self.data.len();
        for _ in 0..count {
            self.data.push(TData::Empty);
            self.blueprint.push(initial.clone());
        }
        start
    }
}
