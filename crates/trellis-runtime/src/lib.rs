#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! View runtime for Trellis templates.
//!
//! Templates render into flat slot arrays ([`LView`]) described once per
//! template by a [`TView`]. Around that storage sit:
//!
//! - **Instructions**: what compiled template functions call
//! - **Dependency injection**: bloom-filtered node injectors backed by environment injectors
//! - **View containers**: dynamic embedded views and components
//! - **i18n**: replay of translated-message tapes, with ICU case switching
//! - **Hydration**: claiming server-rendered DOM instead of creating it

pub mod config;
pub mod container;
pub mod def;
pub mod di;
mod directives;
pub mod error;
pub mod flags;
pub mod hydration;
pub mod i18n;
pub mod instructions;
pub mod manipulation;
mod render;
pub mod runtime;
mod state;
pub mod view;

#[cfg(test)]
mod container_tests;
#[cfg(test)]
mod render_tests;
#[cfg(test)]
mod test_utils;

// Re-export commonly used items at crate root
pub use config::RuntimeConfig;
pub use container::{
    ComponentFactory, ComponentRef, CreateComponentOptions, ElementRef, EmbeddedViewOptions, TemplateRef,
    ViewContainerRef, ViewRef,
};
pub use def::{DirectiveBuilder, DirectiveDef, Instance, Provider, Selector, TemplateDef};
pub use di::{Injector, InjectorRef, ModuleInjector, NodeInjector, NullInjector, Token};
pub use error::{Result, RuntimeError};
pub use flags::{InjectFlags, LViewFlags, RenderFlags, TNodeFlags, TNodeType};
pub use hydration::DehydratedView;
pub use i18n::{PluralCategory, get_plural_case};
pub use instructions::render_stringify;
pub use runtime::{Runtime, RuntimeBuilder};
pub use view::{HEADER_OFFSET, LView, TData, TNode, TView, TViewId, ViewId};
