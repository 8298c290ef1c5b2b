//! The renderer capability set.
//!
//! The runtime never touches a host environment directly. Every node it
//! creates, moves or inspects goes through this trait, so the same view
//! engine runs against a browser binding, a server DOM shim or a test double.

use std::fmt;
use std::rc::Rc;

/// Handle to a node owned by a renderer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a host node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Comment,
}

/// Event delivered to a listener.
#[derive(Clone, Debug)]
pub struct Event {
    pub name: String,
    pub target: NodeId,
}

pub type EventHandler = Rc<dyn Fn(&Event)>;

/// Registration handle returned by [`Renderer::listen`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ListenerId(pub u32);

/// Host node operations consumed by the view runtime.
pub trait Renderer {
    fn create_element(&mut self, tag: &str) -> NodeId;
    fn create_comment(&mut self, value: &str) -> NodeId;
    fn create_text(&mut self, value: &str) -> NodeId;

    fn set_attribute(&mut self, el: NodeId, name: &str, value: &str);
    fn remove_attribute(&mut self, el: NodeId, name: &str);
    fn get_attribute(&self, el: NodeId, name: &str) -> Option<String>;
    fn set_style(&mut self, el: NodeId, prop: &str, value: &str);

    /// Replace the content of a text or comment node.
    fn set_value(&mut self, node: NodeId, value: &str);

    fn append_child(&mut self, parent: NodeId, child: NodeId);

    /// Insert `child` into `parent` before `before`, or append when `before` is `None`.
    ///
    /// `is_move` is a hint that `child` is already attached somewhere and is
    /// being relocated rather than inserted for the first time.
    fn insert_before(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>, is_move: bool);

    /// Detach `child`. `parent` may be unknown to the caller.
    fn remove_child(&mut self, parent: Option<NodeId>, child: NodeId, is_host_element: bool);

    fn parent_node(&self, node: NodeId) -> Option<NodeId>;
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
    fn first_child(&self, node: NodeId) -> Option<NodeId>;

    /// Whether the node is reachable from the document root.
    fn is_connected(&self, node: NodeId) -> bool;

    fn node_kind(&self, node: NodeId) -> NodeKind;
    fn tag_name(&self, node: NodeId) -> Option<String>;

    fn listen(&mut self, target: NodeId, event: &str, handler: EventHandler) -> ListenerId;
    fn unlisten(&mut self, listener: ListenerId);

    /// Release a node that belongs to a destroyed view.
    fn destroy_node(&mut self, _node: NodeId) {}
}
