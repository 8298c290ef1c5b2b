//! In-memory DOM.
//!
//! `MemoryDom` is the server-side DOM shim and the renderer used by tests.
//! Clones share the same document, so a test can hand one clone to the
//! runtime and inspect the tree through another.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::renderer::{Event, EventHandler, ListenerId, NodeId, NodeKind, Renderer};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug)]
struct DomNode {
    kind: NodeKind,
    /// Tag name for elements, character data for text and comments.
    name: String,
    attrs: IndexMap<String, String>,
    styles: IndexMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    destroyed: bool,
}

impl DomNode {
    fn new(kind: NodeKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            attrs: IndexMap::new(),
            styles: IndexMap::new(),
            parent: None,
            children: Vec::new(),
            destroyed: false,
        }
    }
}

struct Listener {
    target: NodeId,
    event: String,
    handler: EventHandler,
}

struct DomArena {
    nodes: Vec<DomNode>,
    listeners: Vec<Option<Listener>>,
    document: NodeId,
    body: NodeId,
    /// Nodes created through the `Renderer` interface.
    created: usize,
}

impl DomArena {
    fn new() -> Self {
        let mut arena = Self {
            nodes: Vec::new(),
            listeners: Vec::new(),
            document: NodeId::new(0),
            body: NodeId::new(0),
            created: 0,
        };
        let document = arena.alloc(DomNode::new(NodeKind::Document, "#document"));
        let html = arena.alloc(DomNode::new(NodeKind::Element, "html"));
        let body = arena.alloc(DomNode::new(NodeKind::Element, "body"));
        arena.insert(document, html, None);
        arena.insert(html, body, None);
        arena.document = document;
        arena.body = body;
        arena
    }

    fn alloc(&mut self, node: DomNode) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn node(&self, id: NodeId) -> &DomNode {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut DomNode {
        &mut self.nodes[id.index()]
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.node_mut(child).parent.take() {
            self.node_mut(parent).children.retain(|c| *c != child);
        }
    }

    fn insert(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        self.detach(child);
        let children = &mut self.nodes[parent.index()].children;
        let at = before
            .and_then(|b| children.iter().position(|c| *c == b))
            .unwrap_or(children.len());
        children.insert(at, child);
        self.node_mut(child).parent = Some(parent);
    }

    fn sibling_offset(&self, node: NodeId, offset: usize) -> Option<NodeId> {
        let parent = self.node(node).parent?;
        let siblings = &self.node(parent).children;
        let pos = siblings.iter().position(|c| *c == node)?;
        siblings.get(pos + offset).copied()
    }

    fn copy_from(&mut self, source: &DomArena, node: NodeId) -> NodeId {
        let src = source.node(node);
        let mut copy = DomNode::new(src.kind, &src.name);
        copy.attrs = src.attrs.clone();
        copy.styles = src.styles.clone();
        let id = self.alloc(copy);
        for child in src.children.clone() {
            let child_copy = self.copy_from(source, child);
            self.insert(id, child_copy, None);
        }
        id
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        match node.kind {
            NodeKind::Document => {
                for child in &node.children {
                    self.write_html(*child, out);
                }
            }
            NodeKind::Text => out.push_str(&escape_text(&node.name)),
            NodeKind::Comment => {
                let _ = write!(out, "<!--{}-->", node.name);
            }
            NodeKind::Element => {
                let _ = write!(out, "<{}", node.name);
                for (name, value) in &node.attrs {
                    let _ = write!(out, " {}=\"{}\"", name, escape_attr(value));
                }
                if !node.styles.is_empty() {
                    let style: Vec<String> = node
                        .styles
                        .iter()
                        .map(|(k, v)| format!("{k}: {v};"))
                        .collect();
                    let _ = write!(out, " style=\"{}\"", escape_attr(&style.join(" ")));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&node.name.as_str()) {
                    return;
                }
                for child in &node.children {
                    self.write_html(*child, out);
                }
                let _ = write!(out, "</{}>", node.name);
            }
        }
    }

    fn write_text(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        match node.kind {
            NodeKind::Text => out.push_str(&node.name),
            NodeKind::Comment => {}
            NodeKind::Element | NodeKind::Document => {
                for child in &node.children {
                    self.write_text(*child, out);
                }
            }
        }
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

/// Shared in-memory document.
#[derive(Clone)]
pub struct MemoryDom {
    inner: Rc<RefCell<DomArena>>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// Create a document with an empty `<html><body>` skeleton.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(DomArena::new())),
        }
    }

    pub fn document(&self) -> NodeId {
        self.inner.borrow().document
    }

    pub fn body(&self) -> NodeId {
        self.inner.borrow().body
    }

    /// Number of nodes created through the renderer interface so far.
    pub fn created_count(&self) -> usize {
        self.inner.borrow().created
    }

    /// Character data of a text or comment node, tag name of an element.
    pub fn node_value(&self, node: NodeId) -> String {
        self.inner.borrow().node(node).name.clone()
    }

    pub fn is_destroyed(&self, node: NodeId) -> bool {
        self.inner.borrow().node(node).destroyed
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.inner.borrow().write_html(node, &mut out);
        out
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        let arena = self.inner.borrow();
        let mut out = String::new();
        for child in &arena.node(node).children {
            arena.write_html(*child, &mut out);
        }
        out
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.inner.borrow().write_text(node, &mut out);
        out
    }

    /// Deep-copy a subtree of another document into this one.
    ///
    /// The copy is left detached. Copies do not count as created nodes.
    pub fn import(&self, source: &MemoryDom, node: NodeId) -> NodeId {
        if Rc::ptr_eq(&self.inner, &source.inner) {
            let mut scratch = DomArena::new();
            let copied = scratch.copy_from(&self.inner.borrow(), node);
            return self.inner.borrow_mut().copy_from(&scratch, copied);
        }
        let source = source.inner.borrow();
        self.inner.borrow_mut().copy_from(&source, node)
    }

    /// Deliver an event to the listeners registered on `target`.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, target: NodeId, event: &str) -> usize {
        let handlers: Vec<EventHandler> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .flatten()
            .filter(|l| l.target == target && l.event == event)
            .map(|l| Rc::clone(&l.handler))
            .collect();
        let payload = Event {
            name: event.to_string(),
            target,
        };
        for handler in &handlers {
            handler(&payload);
        }
        handlers.len()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.iter().flatten().count()
    }

    fn create(&mut self, kind: NodeKind, name: &str) -> NodeId {
        let mut arena = self.inner.borrow_mut();
        arena.created += 1;
        arena.alloc(DomNode::new(kind, name))
    }
}

impl Renderer for MemoryDom {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.create(NodeKind::Element, tag)
    }

    fn create_comment(&mut self, value: &str) -> NodeId {
        self.create(NodeKind::Comment, value)
    }

    fn create_text(&mut self, value: &str) -> NodeId {
        self.create(NodeKind::Text, value)
    }

    fn set_attribute(&mut self, el: NodeId, name: &str, value: &str) {
        self.inner
            .borrow_mut()
            .node_mut(el)
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    fn remove_attribute(&mut self, el: NodeId, name: &str) {
        self.inner.borrow_mut().node_mut(el).attrs.shift_remove(name);
    }

    fn get_attribute(&self, el: NodeId, name: &str) -> Option<String> {
        self.inner.borrow().node(el).attrs.get(name).cloned()
    }

    fn set_style(&mut self, el: NodeId, prop: &str, value: &str) {
        self.inner
            .borrow_mut()
            .node_mut(el)
            .styles
            .insert(prop.to_string(), value.to_string());
    }

    fn set_value(&mut self, node: NodeId, value: &str) {
        let mut arena = self.inner.borrow_mut();
        let node = arena.node_mut(node);
        debug_assert!(node.kind != NodeKind::Element, "set_value on an element");
        node.name = value.to_string();
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.inner.borrow_mut().insert(parent, child, None);
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>, _is_move: bool) {
        self.inner.borrow_mut().insert(parent, child, before);
    }

    fn remove_child(&mut self, _parent: Option<NodeId>, child: NodeId, _is_host_element: bool) {
        self.inner.borrow_mut().detach(child);
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().node(node).parent
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().sibling_offset(node, 1)
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().node(node).children.first().copied()
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let arena = self.inner.borrow();
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == arena.document {
                return true;
            }
            cursor = arena.node(id).parent;
        }
        false
    }

    fn node_kind(&self, node: NodeId) -> NodeKind {
        self.inner.borrow().node(node).kind
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        let arena = self.inner.borrow();
        let node = arena.node(node);
        (node.kind == NodeKind::Element).then(|| node.name.clone())
    }

    fn listen(&mut self, target: NodeId, event: &str, handler: EventHandler) -> ListenerId {
        let mut arena = self.inner.borrow_mut();
        let id = ListenerId(arena.listeners.len() as u32);
        arena.listeners.push(Some(Listener {
            target,
            event: event.to_string(),
            handler,
        }));
        id
    }

    fn unlisten(&mut self, listener: ListenerId) {
        if let Some(slot) = self.inner.borrow_mut().listeners.get_mut(listener.0 as usize) {
            *slot = None;
        }
    }

    fn destroy_node(&mut self, node: NodeId) {
        self.inner.borrow_mut().node_mut(node).destroyed = true;
    }
}
