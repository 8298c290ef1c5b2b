//! Hierarchical dependency injection.
//!
//! - [`bloom`]: injector windows and their filters
//! - [`node`]: resolution through node injectors
//! - [`injector`]: environment injectors behind the node tree

pub mod bloom;
mod injector;
mod node;
pub(crate) mod token;

pub use bloom::{BLOOM_SIZE, INJECTOR_SIZE, RelativeInjectorLocation};
pub(crate) use injector::InjectContext;
pub use injector::{ChainedInjector, Injector, InjectorRef, ModuleInjector, NodeInjector, NullInjector};
pub use node::NodeInjectorFactory;
pub use token::Token;
