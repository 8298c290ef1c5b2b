use std::cell::Cell;
use std::rc::Rc;

use crate::dom::MemoryDom;
use crate::renderer::{Event, NodeKind, Renderer};

#[test]
fn new_document_has_body() {
    let dom = MemoryDom::new();
    insta::assert_snapshot!(dom.outer_html(dom.document()), @"<html><body></body></html>");
    assert!(dom.is_connected(dom.body()));
}

#[test]
fn insert_before_and_serialize() {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    let div = dom.create_element("div");
    let b = dom.create_text("b");
    let a = dom.create_text("a & <c>");
    let anchor = dom.create_comment("container");
    dom.append_child(body, div);
    dom.append_child(div, b);
    dom.append_child(div, anchor);
    dom.insert_before(div, a, Some(b), false);
    dom.set_attribute(div, "title", "x\"y");
    dom.set_style(div, "color", "red");

    insta::assert_snapshot!(
        dom.outer_html(div),
        @r#"<div title="x&quot;y" style="color: red;">a &amp; &lt;c&gt;b<!--container--></div>"#
    );
    assert_eq!(dom.text_content(div), "a & <c>b");
    assert_eq!(dom.first_child(div), Some(a));
    assert_eq!(dom.next_sibling(a), Some(b));
    assert_eq!(dom.next_sibling(anchor), None);
    assert_eq!(dom.parent_node(b), Some(div));
    assert_eq!(dom.node_kind(anchor), NodeKind::Comment);
    assert_eq!(dom.tag_name(div).as_deref(), Some("div"));
    assert_eq!(dom.created_count(), 4);
}

#[test]
fn remove_child_disconnects() {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    let p = dom.create_element("p");
    let t = dom.create_text("x");
    dom.append_child(body, p);
    dom.append_child(p, t);
    assert!(dom.is_connected(t));

    dom.remove_child(Some(body), p, false);
    assert!(!dom.is_connected(t));
    assert_eq!(dom.parent_node(p), None);
    assert_eq!(dom.parent_node(t), Some(p));
}

#[test]
fn void_elements_have_no_closing_tag() {
    let mut dom = MemoryDom::new();
    let p = dom.create_element("p");
    let br = dom.create_element("br");
    dom.append_child(p, br);
    insta::assert_snapshot!(dom.outer_html(p), @"<p><br></p>");
}

#[test]
fn import_copies_subtree_without_counting() {
    let mut server = MemoryDom::new();
    let ul = server.create_element("ul");
    let li = server.create_element("li");
    let t = server.create_text("one");
    server.append_child(ul, li);
    server.append_child(li, t);
    server.set_attribute(ul, "ngh", "{}");

    let mut client = MemoryDom::new();
    let copy = client.import(&server, ul);
    let body = client.body();
    client.append_child(body, copy);

    assert_eq!(client.created_count(), 0);
    insta::assert_snapshot!(client.inner_html(body), @r#"<ul ngh="{}"><li>one</li></ul>"#);
}

#[test]
fn listeners_dispatch_and_unlisten() {
    let mut dom = MemoryDom::new();
    let button = dom.create_element("button");
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    let id = dom.listen(button, "click", Rc::new(move |_: &Event| counter.set(counter.get() + 1)));

    assert_eq!(dom.dispatch(button, "click"), 1);
    assert_eq!(dom.dispatch(button, "keyup"), 0);
    assert_eq!(hits.get(), 1);

    dom.unlisten(id);
    assert_eq!(dom.dispatch(button, "click"), 0);
    assert_eq!(dom.listener_count(), 0);
}

#[test]
fn set_value_updates_text() {
    let mut dom = MemoryDom::new();
    let t = dom.create_text("before");
    dom.set_value(t, "after");
    assert_eq!(dom.node_value(t), "after");
}
