//! Runtime error type.

use trellis_opcodes::{MessageError, TapeError};

use crate::view::ViewId;

/// Errors raised by instructions, dependency injection and container operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    /// No injector on the resolution path provides the token.
    #[error("no provider for {token}")]
    ProviderNotFound { token: String },

    /// A factory asked, directly or transitively, for its own token.
    #[error("circular dependency while instantiating {token}")]
    CyclicDependency { token: String },

    #[error("cannot insert a destroyed view into a view container")]
    DestroyedView,

    #[error("index {index} is out of range for a view container of length {length}")]
    IndexOutOfRange { index: usize, length: usize },

    /// A node index past the slots its template declared.
    #[error("node {index} is not among the {decls} slots declared by its template")]
    UndeclaredSlot { index: usize, decls: usize },

    #[error("slot {index} does not hold a view container")]
    NotAContainer { index: usize },

    #[error("node at slot {index} is not a template")]
    NotATemplate { index: usize },

    #[error("slot {index} holds no node")]
    MissingNode { index: usize },

    #[error("view {0:?} does not exist or was destroyed")]
    MissingView(ViewId),

    /// An instruction ran outside the view it needs (no active frame).
    #[error("`{0}` called outside of a template function")]
    NoActiveView(&'static str),

    #[error("invalid instruction tape: {0}")]
    InvalidTape(#[from] TapeError),

    #[error("malformed i18n message: {0}")]
    MalformedMessage(#[from] MessageError),

    /// A second, verifying refresh saw a binding change.
    #[error("expression at slot {index} changed after it was checked: {previous} -> {current}")]
    ExpressionChanged {
        index: usize,
        previous: String,
        current: String,
    },

    /// Context downcast to a type the view was not created with.
    #[error("view context is not a {0}")]
    ContextType(&'static str),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
