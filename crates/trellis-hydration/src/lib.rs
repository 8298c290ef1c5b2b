#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Server side of Trellis hydration.
//!
//! After a server render, [`annotate_for_hydration`] writes an `ngh`
//! descriptor on every component host so the client runtime can claim the
//! rendered DOM instead of creating it again.
//!
//! - **Navigation**: `firstChild`/`nextSibling` paths between DOM nodes
//! - **Serialization**: per-view descriptors with container views and template ids
//! - **Context**: template id assignment shared across one document

pub mod context;
pub mod navigate;
pub mod serialize;

#[cfg(test)]
mod navigate_tests;

pub use context::HydrationContext;
pub use navigate::{find_path, navigate_between};
pub use serialize::{SerializeError, annotate_for_hydration, calc_path_for_node, serialize_lview};
