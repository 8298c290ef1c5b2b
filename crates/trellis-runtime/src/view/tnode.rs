use std::rc::Rc;

use trellis_opcodes::TIcu;

use super::TViewId;
use crate::flags::{TNodeFlags, TNodeType};

/// Static description of one node slot, shared by every instance of its template.
///
/// Links (`parent`, `child`, `next`, `prev`) are slot indexes within the same
/// template; a `None` parent means the node is a root of its view.
#[derive(Clone, Debug)]
pub struct TNode {
    pub kind: TNodeType,
    pub index: usize,
    pub tag: Option<String>,
    pub attrs: Vec<(String, String)>,
    /// Static text for text nodes, label for anchors.
    pub value: String,
    pub flags: TNodeFlags,

    pub parent: Option<usize>,
    pub child: Option<usize>,
    pub next: Option<usize>,
    pub prev: Option<usize>,

    /// Slot of the node this one must be inserted in front of (i18n reordering).
    pub insert_before_index: Option<usize>,
    /// i18n text nodes created before this element existed; appended once it is.
    pub i18n_children: Vec<usize>,

    /// Start of this node's injector window, or the inherited parent window.
    pub injector_index: Option<usize>,
    /// First provider slot. Providers run up to `directive_start`.
    pub providers_start: usize,
    /// View providers visible only from the component's own view.
    pub view_providers_count: usize,
    pub directive_start: usize,
    pub directive_end: usize,

    /// Embedded template of a container node.
    pub tview: Option<TViewId>,
    /// Case table of an ICU node.
    pub icu: Option<Rc<TIcu>>,
}

impl TNode {
    pub fn new(kind: TNodeType, index: usize, tag: Option<&str>, parent: Option<usize>) -> Self {
        Self {
            kind,
            index,
            tag: tag.map(str::to_string),
            attrs: Vec::new(),
            value: String::new(),
            flags: TNodeFlags::empty(),
            parent,
            child: None,
            next: None,
            prev: None,
            insert_before_index: None,
            i18n_children: Vec::new(),
            injector_index: None,
            providers_start: 0,
            view_providers_count: 0,
            directive_start: 0,
            directive_end: 0,
            tview: None,
            icu: None,
        }
    }

    #[inline]
    pub fn is(&self, kind: TNodeType) -> bool {
        self.kind.intersects(kind)
    }

    pub fn is_component_host(&self) -> bool {
        self.flags.contains(TNodeFlags::IS_COMPONENT_HOST)
    }

    pub fn has_directives(&self) -> bool {
        self.directive_end > self.directive_start
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}
