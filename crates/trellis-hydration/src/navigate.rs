//! Shortest `firstChild`/`nextSibling` walk between two DOM nodes.

use trellis_core::{NodeId, NodeNavigationStep, Renderer};

/// Steps leading from `start` to `finish`.
///
/// `finish` must come after `start` in document order and be reachable
/// by descending and moving right only. When it is not, a warning is
/// logged and the path is empty.
pub fn navigate_between(renderer: &dyn Renderer, start: NodeId, finish: NodeId) -> Vec<NodeNavigationStep> {
    find_path(renderer, start, finish).unwrap_or_default()
}

/// Like [`navigate_between`], but `None` when `finish` cannot be reached.
pub fn find_path(renderer: &dyn Renderer, start: NodeId, finish: NodeId) -> Option<Vec<NodeNavigationStep>> {
    let mut steps = Vec::new();
    walk(renderer, start, finish, &mut steps)?;
    Some(steps)
}

fn walk(renderer: &dyn Renderer, start: NodeId, finish: NodeId, steps: &mut Vec<NodeNavigationStep>) -> Option<()> {
    if start == finish {
        return Some(());
    }
    let parent = renderer.parent_node(finish);
    if parent == renderer.parent_node(start) {
        return walk_siblings(renderer, start, finish, steps);
    }
    let Some(parent) = parent else {
        tracing::warn!(?start, ?finish, "navigation walked off the document");
        return None;
    };
    walk(renderer, start, parent, steps)?;
    steps.push(NodeNavigationStep::FirstChild);
    let first = renderer.first_child(parent)?;
    walk(renderer, first, finish, steps)
}

fn walk_siblings(renderer: &dyn Renderer, start: NodeId, finish: NodeId, steps: &mut Vec<NodeNavigationStep>) -> Option<()> {
    let mut current = start;
    while current != finish {
        let Some(next) = renderer.next_sibling(current) else {
            tracing::warn!(?start, ?finish, "ran out of siblings before reaching the node");
            return None;
        };
        steps.push(NodeNavigationStep::NextSibling);
        current = next;
    }
    Some(())
}
