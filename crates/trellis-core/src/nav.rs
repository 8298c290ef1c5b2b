//! Navigation steps between host nodes.
//!
//! A hydration path is a reference node followed by a run of steps:
//! `host.firstChild.nextSibling` starts at the component host element,
//! `3.firstChild` starts at the node stored in slot 3 of the view
//! (a no-offset index).

use std::fmt;

use crate::renderer::{NodeId, Renderer};

/// Path reference meaning "start from the component host element".
pub const REFERENCE_NODE_HOST: &str = "host";

/// One DOM walking step.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeNavigationStep {
    FirstChild,
    NextSibling,
}

impl NodeNavigationStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstChild => "firstChild",
            Self::NextSibling => "nextSibling",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "firstChild" => Some(Self::FirstChild),
            "nextSibling" => Some(Self::NextSibling),
            _ => None,
        }
    }

    /// Apply this step to `node`.
    pub fn step(self, renderer: &dyn Renderer, node: NodeId) -> Option<NodeId> {
        match self {
            Self::FirstChild => renderer.first_child(node),
            Self::NextSibling => renderer.next_sibling(node),
        }
    }
}

/// Where a path starts.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PathReference {
    Host,
    /// No-offset index of a node in the same view.
    Node(usize),
}

/// Parsed navigation path.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct NodePath {
    pub reference: PathReference,
    pub steps: Vec<NodeNavigationStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty navigation path")]
    Empty,

    #[error("invalid path reference `{0}`")]
    InvalidReference(String),

    #[error("unknown navigation step `{0}`")]
    UnknownStep(String),
}

impl NodePath {
    pub fn new(reference: PathReference, steps: Vec<NodeNavigationStep>) -> Self {
        Self { reference, steps }
    }

    pub fn parse(path: &str) -> Result<Self, PathError> {
        let mut parts = path.split('.');
        let head = parts.next().filter(|h| !h.is_empty()).ok_or(PathError::Empty)?;
        let reference = if head == REFERENCE_NODE_HOST {
            PathReference::Host
        } else {
            let index = head
                .parse::<usize>()
                .map_err(|_| PathError::InvalidReference(head.to_string()))?;
            PathReference::Node(index)
        };
        let steps = parts
            .map(|p| NodeNavigationStep::from_name(p).ok_or_else(|| PathError::UnknownStep(p.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { reference, steps })
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reference {
            PathReference::Host => f.write_str(REFERENCE_NODE_HOST)?,
            PathReference::Node(index) => write!(f, "{index}")?,
        }
        for step in &self.steps {
            write!(f, ".{}", step.as_str())?;
        }
        Ok(())
    }
}

/// Walk `steps` from `start`.
///
/// Returns `None` when a step leaves the tree.
pub fn replay(renderer: &dyn Renderer, start: NodeId, steps: &[NodeNavigationStep]) -> Option<NodeId> {
    steps.iter().try_fold(start, |node, step| step.step(renderer, node))
}

/// Node `count` siblings after `node` (`count == 0` is `node` itself).
pub fn sibling_after(renderer: &dyn Renderer, node: NodeId, count: usize) -> Option<NodeId> {
    (0..count).try_fold(node, |n, _| renderer.next_sibling(n))
}
