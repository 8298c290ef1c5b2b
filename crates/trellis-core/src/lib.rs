#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Shared building blocks for the Trellis view runtime.
//!
//! - **Renderer contract**: the capability set the runtime drives (`Renderer`)
//! - **In-memory DOM**: `MemoryDom`, the server DOM shim and test renderer
//! - **Navigation**: `firstChild`/`nextSibling` steps and their path strings
//! - **Hydration wire format**: the `ngh` descriptor types
//! - **Sanitization**: allow-lists for translated HTML content

pub mod dom;
pub mod hydration;
pub mod nav;
pub mod renderer;
pub mod sanitize;

#[cfg(test)]
mod dom_tests;
#[cfg(test)]
mod nav_tests;
#[cfg(test)]
mod sanitize_tests;

pub use dom::MemoryDom;
pub use hydration::{NGH_ATTR, SKIP_HYDRATION_ATTR, SerializedContainer, SerializedView};
pub use nav::{NodeNavigationStep, NodePath, PathError, PathReference, replay, sibling_after};
pub use renderer::{Event, EventHandler, ListenerId, NodeId, NodeKind, Renderer};
pub use sanitize::Sanitizer;
