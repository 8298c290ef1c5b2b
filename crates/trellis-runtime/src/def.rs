//! Directive, component and template definitions.
//!
//! Definitions are what a template compiler would emit: factories,
//! selectors, providers and template functions. They are immutable and
//! shared by every view that uses them.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::di::Token;
use crate::error::Result;
use crate::flags::RenderFlags;
use crate::runtime::Runtime;

/// A resolved injectable or directive instance.
pub type Instance = Rc<dyn Any>;

pub type FactoryFn = Rc<dyn Fn(&mut Runtime) -> Result<Instance>>;

/// Template function: runs its create block, its update block or both.
pub type TemplateFn = Rc<dyn Fn(&mut Runtime, RenderFlags) -> Result<()>>;

pub type InputSetter = Rc<dyn Fn(&Instance, &Value)>;

/// An embedded template with its slot counts.
#[derive(Clone)]
pub struct TemplateDef {
    pub(crate) template: TemplateFn,
    pub(crate) decls: usize,
    pub(crate) vars: usize,
}

impl TemplateDef {
    pub fn new(decls: usize, vars: usize, template: impl Fn(&mut Runtime, RenderFlags) -> Result<()> + 'static) -> Self {
        Self {
            template: Rc::new(template),
            decls,
            vars,
        }
    }
}

/// Directive matching rule.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Selector {
    Tag(String),
    Attr(String),
}

impl Selector {
    pub fn tag(tag: &str) -> Self {
        Self::Tag(tag.to_string())
    }

    pub fn attr(name: &str) -> Self {
        Self::Attr(name.to_string())
    }

    pub fn matches(&self, tag: Option<&str>, attrs: &[(String, String)]) -> bool {
        match self {
            Self::Tag(t) => tag == Some(t.as_str()),
            Self::Attr(a) => attrs.iter().any(|(n, _)| n == a),
        }
    }
}

/// A token bound to the factory producing its value.
#[derive(Clone)]
pub struct Provider {
    pub token: Token,
    pub(crate) factory: FactoryFn,
}

impl Provider {
    pub fn factory(token: Token, factory: impl Fn(&mut Runtime) -> Result<Instance> + 'static) -> Self {
        Self {
            token,
            factory: Rc::new(factory),
        }
    }

    /// Provide a ready-made value.
    pub fn value(token: Token, value: Instance) -> Self {
        Self::factory(token, move |_| Ok(value.clone()))
    }
}

pub(crate) struct ComponentTemplate {
    pub(crate) template: TemplateDef,
    pub(crate) host_tag: String,
    pub(crate) registry: Rc<[Rc<DirectiveDef>]>,
    pub(crate) id: String,
}

/// A directive, or a component when it carries a template.
pub struct DirectiveDef {
    pub token: Token,
    pub selector: Option<Selector>,
    pub(crate) factory: FactoryFn,
    pub(crate) providers: Vec<Provider>,
    pub(crate) view_providers: Vec<Provider>,
    pub(crate) inputs: Vec<(String, InputSetter)>,
    pub(crate) component: Option<ComponentTemplate>,
}

impl fmt::Debug for DirectiveDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveDef")
            .field("token", &self.token)
            .field("selector", &self.selector)
            .field("component", &self.component.as_ref().map(|c| &c.host_tag))
            .finish_non_exhaustive()
    }
}

impl DirectiveDef {
    pub fn directive(
        token: Token,
        selector: Selector,
        factory: impl Fn(&mut Runtime) -> Result<Instance> + 'static,
    ) -> DirectiveBuilder {
        DirectiveBuilder {
            def: DirectiveDef {
                token,
                selector: Some(selector),
                factory: Rc::new(factory),
                providers: Vec::new(),
                view_providers: Vec::new(),
                inputs: Vec::new(),
                component: None,
            },
        }
    }

    /// A component rendered into elements named `tag`.
    pub fn component(
        token: Token,
        tag: &str,
        template: TemplateDef,
        factory: impl Fn(&mut Runtime) -> Result<Instance> + 'static,
    ) -> DirectiveBuilder {
        let mut builder = Self::directive(token, Selector::tag(tag), factory);
        builder.def.component = Some(ComponentTemplate {
            template,
            host_tag: tag.to_string(),
            registry: Rc::from(Vec::new()),
            id: component_id(token.name(), tag),
        });
        builder
    }

    pub fn is_component(&self) -> bool {
        self.component.is_some()
    }

    /// Identifier of a component's template across server and client.
    pub fn component_id(&self) -> Option<&str> {
        self.component.as_ref().map(|c| c.id.as_str())
    }

    pub fn host_tag(&self) -> Option<&str> {
        self.component.as_ref().map(|c| c.host_tag.as_str())
    }

    pub fn name(&self) -> &'static str {
        self.token.name()
    }
}

pub struct DirectiveBuilder {
    def: DirectiveDef,
}

impl DirectiveBuilder {
    pub fn provider(mut self, provider: Provider) -> Self {
        self.def.providers.push(provider);
        self
    }

    /// Provider visible to the component's own view only.
    pub fn view_provider(mut self, provider: Provider) -> Self {
        self.def.view_providers.push(provider);
        self
    }

    pub fn input(mut self, name: &str, setter: impl Fn(&Instance, &Value) + 'static) -> Self {
        self.def.inputs.push((name.to_string(), Rc::new(setter)));
        self
    }

    /// Directives a component's template may match.
    pub fn declarations(mut self, registry: Vec<Rc<DirectiveDef>>) -> Self {
        if let Some(component) = &mut self.def.component {
            component.registry = Rc::from(registry);
        }
        self
    }

    pub fn build(self) -> Rc<DirectiveDef> {
        Rc::new(self.def)
    }
}

/// FNV-1a over the fields that identify a component, rendered as `c<hash>`.
fn component_id(name: &str, tag: &str) -> String {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in name.bytes().chain([0]).chain(tag.bytes()) {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    format!("c{hash}")
}
