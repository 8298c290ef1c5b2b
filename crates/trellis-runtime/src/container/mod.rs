//! Handles applications hold on to.
//!
//! - [`ViewRef`]: one view, for change detection and teardown
//! - [`TemplateRef`]: an embedded template, to stamp out views
//! - [`ViewContainerRef`]: an anchor views are inserted at
//! - [`ComponentRef`]: a dynamically created or bootstrapped component
//!
//! Handles are plain ids into the runtime; every operation takes the
//! runtime explicitly.

mod component;
mod vcr;
mod view_ref;

use trellis_core::NodeId;

pub use component::{ComponentFactory, ComponentRef};
pub use vcr::{CreateComponentOptions, EmbeddedViewOptions, ViewContainerRef};
pub use view_ref::{TemplateRef, ViewRef};

/// The DOM node a directive is attached to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ElementRef {
    pub node: NodeId,
}
