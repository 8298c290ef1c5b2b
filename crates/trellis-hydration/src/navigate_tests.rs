use trellis_core::{MemoryDom, NodeId, NodeNavigationStep, NodePath, PathReference, Renderer, replay};

use crate::navigate::{find_path, navigate_between};

/// `<main><header><h1/><p/></header><section><ul><li/><li/></ul><span/></section>text</main>`
struct Tree {
    dom: MemoryDom,
    main: NodeId,
    header: NodeId,
    h1: NodeId,
    p: NodeId,
    section: NodeId,
    second_li: NodeId,
    span: NodeId,
    text: NodeId,
}

impl Tree {
    fn new() -> Self {
        let mut dom = MemoryDom::new();
        let el = |dom: &mut MemoryDom, parent: NodeId, tag: &str| {
            let node = dom.create_element(tag);
            dom.append_child(parent, node);
            node
        };
        let body = dom.body();
        let main = el(&mut dom, body, "main");
        let header = el(&mut dom, main, "header");
        let h1 = el(&mut dom, header, "h1");
        let p = el(&mut dom, header, "p");
        let section = el(&mut dom, main, "section");
        let ul = el(&mut dom, section, "ul");
        el(&mut dom, ul, "li");
        let second_li = el(&mut dom, ul, "li");
        let span = el(&mut dom, section, "span");
        let text = dom.create_text("text");
        dom.append_child(main, text);
        Self {
            dom,
            main,
            header,
            h1,
            p,
            section,
            second_li,
            span,
            text,
        }
    }

    fn path(&self, start: NodeId, finish: NodeId) -> String {
        NodePath::new(PathReference::Host, navigate_between(&self.dom, start, finish)).to_string()
    }
}

#[test]
fn same_node_is_an_empty_path() {
    let tree = Tree::new();
    assert!(navigate_between(&tree.dom, tree.p, tree.p).is_empty());
}

#[test]
fn third_child_of_host() {
    let mut dom = MemoryDom::new();
    let host = dom.create_element("x-host");
    let children: Vec<NodeId> = (0..3).map(|i| dom.create_text(&i.to_string())).collect();
    for &child in &children {
        dom.append_child(host, child);
    }
    assert_eq!(
        navigate_between(&dom, host, children[2]),
        [NodeNavigationStep::FirstChild, NodeNavigationStep::NextSibling, NodeNavigationStep::NextSibling]
    );
}

#[test]
fn descends_and_moves_right() {
    let tree = Tree::new();
    insta::assert_snapshot!(tree.path(tree.main, tree.second_li), @"host.firstChild.nextSibling.firstChild.firstChild.nextSibling");
    insta::assert_snapshot!(tree.path(tree.main, tree.text), @"host.firstChild.nextSibling.nextSibling");
    insta::assert_snapshot!(tree.path(tree.header, tree.span), @"host.nextSibling.firstChild.nextSibling");
    insta::assert_snapshot!(tree.path(tree.header, tree.p), @"host.firstChild.nextSibling");
}

#[test]
fn replaying_a_path_lands_on_its_target() {
    let tree = Tree::new();
    let targets = [tree.h1, tree.p, tree.section, tree.second_li, tree.span, tree.text];
    for start in [tree.main, tree.header] {
        for finish in targets {
            let steps = navigate_between(&tree.dom, start, finish);
            assert_eq!(replay(&tree.dom, start, &steps), Some(finish), "{start:?} -> {finish:?}");
        }
    }
}

#[test]
fn earlier_or_enclosing_nodes_are_unreachable() {
    let tree = Tree::new();
    assert_eq!(find_path(&tree.dom, tree.span, tree.h1), None);
    // Reaching `span` from inside `header` would need a step up.
    assert_eq!(find_path(&tree.dom, tree.p, tree.span), None);
    assert!(navigate_between(&tree.dom, tree.span, tree.h1).is_empty());
    assert_eq!(find_path(&tree.dom, tree.section, tree.header), None);
}

#[test]
fn node_outside_the_start_subtree_walks_off_the_document() {
    let mut tree = Tree::new();
    let detached = tree.dom.create_element("aside");
    assert_eq!(find_path(&tree.dom, tree.main, detached), None);
}
