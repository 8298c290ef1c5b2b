use crate::dom::MemoryDom;
use crate::nav::{NodeNavigationStep, NodePath, PathError, PathReference, replay, sibling_after};
use crate::renderer::Renderer;

use NodeNavigationStep::{FirstChild, NextSibling};

#[test]
fn parse_host_path() {
    let path = NodePath::parse("host.firstChild.nextSibling").unwrap();
    assert_eq!(path.reference, PathReference::Host);
    assert_eq!(path.steps, vec![FirstChild, NextSibling]);
}

#[test]
fn parse_index_path_without_steps() {
    let path = NodePath::parse("3").unwrap();
    assert_eq!(path.reference, PathReference::Node(3));
    assert!(path.steps.is_empty());
}

#[test]
fn format_round_trips_text() {
    let text = "7.nextSibling.firstChild.nextSibling";
    assert_eq!(NodePath::parse(text).unwrap().to_string(), text);
}

#[test]
fn parse_errors() {
    assert_eq!(NodePath::parse(""), Err(PathError::Empty));
    assert_eq!(
        NodePath::parse("body.firstChild"),
        Err(PathError::InvalidReference("body".into()))
    );
    assert_eq!(
        NodePath::parse("host.parentNode"),
        Err(PathError::UnknownStep("parentNode".into()))
    );
    assert_eq!(
        PathError::UnknownStep("x".into()).to_string(),
        "unknown navigation step `x`"
    );
}

#[test]
fn replay_follows_steps() {
    let mut dom = MemoryDom::new();
    let host = dom.create_element("div");
    let a = dom.create_element("a");
    let b = dom.create_element("b");
    let c = dom.create_text("c");
    dom.append_child(host, a);
    dom.append_child(host, b);
    dom.append_child(b, c);

    assert_eq!(replay(&dom, host, &[]), Some(host));
    assert_eq!(replay(&dom, host, &[FirstChild, NextSibling, FirstChild]), Some(c));
    assert_eq!(replay(&dom, host, &[FirstChild, FirstChild]), None);
    assert_eq!(sibling_after(&dom, a, 1), Some(b));
    assert_eq!(sibling_after(&dom, a, 2), None);
}
