//! Environment injectors.
//!
//! These sit behind the node-injector tree: a [`ModuleInjector`] owns
//! providers registered outside any template, and chains to a parent that
//! ends in the [`NullInjector`].

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::Token;
use crate::def::{FactoryFn, Instance, Provider};
use crate::error::{Result, RuntimeError};
use crate::flags::InjectFlags;
use crate::runtime::Runtime;
use crate::view::ViewId;

/// An injector that can be asked for a token.
///
/// `not_found` is returned when nothing provides the token. Without it,
/// an `OPTIONAL` lookup yields `Ok(None)` and any other lookup fails.
pub trait Injector {
    fn get(&self, rt: &mut Runtime, token: Token, not_found: Option<Instance>, flags: InjectFlags) -> Result<Option<Instance>>;

    fn name(&self) -> &str {
        "Injector"
    }
}

pub(crate) fn not_found_or_err(token: Token, not_found: Option<Instance>, flags: InjectFlags) -> Result<Option<Instance>> {
    match not_found {
        Some(value) => Ok(Some(value)),
        None if flags.contains(InjectFlags::OPTIONAL) => Ok(None),
        None => Err(RuntimeError::ProviderNotFound {
            token: token.name().to_string(),
        }),
    }
}

/// End of every injector chain.
pub struct NullInjector;

impl Injector for NullInjector {
    fn get(&self, _: &mut Runtime, token: Token, not_found: Option<Instance>, flags: InjectFlags) -> Result<Option<Instance>> {
        not_found_or_err(token, not_found, flags)
    }

    fn name(&self) -> &str {
        "NullInjector"
    }
}

struct Record {
    factory: FactoryFn,
    value: Option<Instance>,
    resolving: bool,
}

/// Providers registered outside any template, resolved once and cached.
pub struct ModuleInjector {
    name: String,
    records: RefCell<IndexMap<Token, Record>>,
    parent: Rc<dyn Injector>,
    this: Weak<ModuleInjector>,
}

impl ModuleInjector {
    pub fn new(name: &str, providers: Vec<Provider>, parent: Option<Rc<dyn Injector>>) -> Rc<Self> {
        let records = providers
            .into_iter()
            .map(|p| {
                (
                    p.token,
                    Record {
                        factory: p.factory,
                        value: None,
                        resolving: false,
                    },
                )
            })
            .collect();
        Rc::new_cyclic(|this| Self {
            name: name.to_string(),
            records: RefCell::new(records),
            parent: parent.unwrap_or_else(|| Rc::new(NullInjector)),
            this: this.clone(),
        })
    }

    pub fn has_provider(&self, token: Token) -> bool {
        self.records.borrow().contains_key(&token)
    }

    fn self_ref(&self) -> Option<InjectorRef> {
        self.this.upgrade().map(|rc| InjectorRef::Module(rc as Rc<dyn Injector>))
    }

    fn resolve(&self, rt: &mut Runtime, token: Token) -> Result<Option<Instance>> {
        let factory = {
            let mut records = self.records.borrow_mut();
            let Some(record) = records.get_mut(&token) else {
                return Ok(None);
            };
            if let Some(value) = &record.value {
                return Ok(Some(value.clone()));
            }
            if record.resolving {
                return Err(RuntimeError::CyclicDependency {
                    token: token.name().to_string(),
                });
            }
            record.resolving = true;
            record.factory.clone()
        };
        tracing::trace!(injector = %self.name, token = token.name(), "instantiating provider");
        let this = self.self_ref();
        let result = rt.with_inject_context(this.map(InjectContext::Environment), |rt| factory(rt));
        let mut records = self.records.borrow_mut();
        let Some(record) = records.get_mut(&token) else {
            return result.map(Some);
        };
        record.resolving = false;
        let value = result?;
        record.value = Some(value.clone());
        Ok(Some(value))
    }
}

impl Injector for ModuleInjector {
    fn get(&self, rt: &mut Runtime, token: Token, not_found: Option<Instance>, flags: InjectFlags) -> Result<Option<Instance>> {
        if !flags.contains(InjectFlags::SKIP_SELF) {
            if matches!(token, Token::Injector | Token::EnvironmentInjector)
                && let Some(this) = self.self_ref()
            {
                return Ok(Some(Rc::new(this)));
            }
            if let Some(value) = self.resolve(rt, token)? {
                return Ok(Some(value));
            }
        }
        if flags.contains(InjectFlags::SELF) {
            return not_found_or_err(token, not_found, flags);
        }
        self.parent.get(rt, token, not_found, flags - InjectFlags::SKIP_SELF)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handle on a node injector: a node slot within a live view.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NodeInjector {
    pub view: ViewId,
    pub tnode: usize,
}

/// Any injector a caller can hold on to.
#[derive(Clone)]
pub enum InjectorRef {
    Node(NodeInjector),
    Module(Rc<dyn Injector>),
}

impl fmt::Debug for InjectorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(n) => write!(f, "NodeInjector({:?}, {})", n.view, n.tnode),
            Self::Module(m) => write!(f, "ModuleInjector({})", m.name()),
        }
    }
}

impl InjectorRef {
    pub fn module(injector: Rc<ModuleInjector>) -> Self {
        Self::Module(injector)
    }

    pub fn get(&self, rt: &mut Runtime, token: Token, not_found: Option<Instance>, flags: InjectFlags) -> Result<Option<Instance>> {
        match self {
            Self::Node(node) => rt.get_or_create_injectable(Some(node.tnode), node.view, token, flags, not_found),
            Self::Module(module) => module.get(rt, token, not_found, flags),
        }
    }

    /// Resolve `token`, failing when nothing provides it.
    pub fn require(&self, rt: &mut Runtime, token: Token) -> Result<Instance> {
        self.get(rt, token, None, InjectFlags::empty())?
            .ok_or_else(|| RuntimeError::ProviderNotFound {
                token: token.name().to_string(),
            })
    }

    /// Look only at element injectors; `Ok(None)` when they don't provide it.
    pub(crate) fn get_from_elements(&self, rt: &mut Runtime, token: Token, flags: InjectFlags) -> Result<Option<Instance>> {
        match self {
            Self::Node(node) => rt.lookup_node_only(node.tnode, node.view, token, flags),
            Self::Module(module) => module.get(rt, token, None, flags | InjectFlags::OPTIONAL),
        }
    }
}

/// Injector of a dynamically created component's root view: element
/// injectors of the creation site first, then the environment.
pub struct ChainedInjector {
    pub(crate) element: InjectorRef,
    pub(crate) environment: InjectorRef,
}

impl Injector for ChainedInjector {
    fn get(&self, rt: &mut Runtime, token: Token, not_found: Option<Instance>, flags: InjectFlags) -> Result<Option<Instance>> {
        if let Some(value) = self.element.get_from_elements(rt, token, flags)? {
            return Ok(Some(value));
        }
        self.environment.get(rt, token, not_found, flags)
    }

    fn name(&self) -> &str {
        "ChainedInjector"
    }
}

/// Where `Runtime::inject` resolves from while a factory runs.
#[derive(Clone)]
pub(crate) enum InjectContext {
    /// A node-level factory: the current DI frame.
    Node,
    Environment(InjectorRef),
}
