use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_core::{MemoryDom, NodeId, Renderer};

use crate::def::{DirectiveDef, Instance, TemplateDef};
use crate::di::Token;
use crate::error::Result;
use crate::flags::RenderFlags;
use crate::runtime::{Runtime, RuntimeBuilder};

pub(crate) fn setup() -> (MemoryDom, Runtime) {
    setup_with(|builder| builder)
}

pub(crate) fn setup_with(configure: impl FnOnce(RuntimeBuilder) -> RuntimeBuilder) -> (MemoryDom, Runtime) {
    let dom = MemoryDom::new();
    let rt = configure(Runtime::builder(dom.clone())).build();
    (dom, rt)
}

/// Append a fresh element to the document body.
pub(crate) fn mount(dom: &MemoryDom, tag: &str) -> NodeId {
    let mut dom = dom.clone();
    let body = dom.body();
    let node = dom.create_element(tag);
    dom.append_child(body, node);
    node
}

/// Component context holding whatever the test template reads.
#[derive(Default)]
pub(crate) struct State {
    pub(crate) count: Cell<i64>,
    pub(crate) name: RefCell<String>,
    pub(crate) show: Cell<bool>,
}

pub(crate) fn component(
    name: &'static str,
    tag: &str,
    decls: usize,
    vars: usize,
    template: impl Fn(&mut Runtime, RenderFlags) -> Result<()> + 'static,
) -> Rc<DirectiveDef> {
    DirectiveDef::component(Token::new(name), tag, TemplateDef::new(decls, vars, template), |_| {
        Ok(Rc::new(State::default()) as Instance)
    })
    .build()
}
