//! Node-injector resolution.
//!
//! A lookup starts at the requesting node and climbs injector windows,
//! crossing into declaration views at view roots. Each window's own bloom
//! filter says whether to search its node's providers and directives; the
//! cumulative filter says whether climbing further can still succeed.
//! When the node tree has nothing, the view's environment injector is asked.

use std::cell::Cell;
use std::rc::Rc;

use super::bloom::{PARENT_OFFSET, RelativeInjectorLocation, cumulative_bloom_has, own_bloom_has};
use super::injector::{InjectContext, InjectorRef, NodeInjector, not_found_or_err};
use super::token::{BloomHash, Token};
use crate::container::{ElementRef, TemplateRef, ViewRef};
use crate::def::{FactoryFn, Instance};
use crate::error::{Result, RuntimeError};
use crate::flags::{InjectFlags, LViewFlags, TNodeType};
use crate::runtime::Runtime;
use crate::view::{Slot, TData, TViewId, ViewId};

/// Deferred directive or provider instantiation stored in a view slot.
pub struct NodeInjectorFactory {
    pub(crate) token: Token,
    pub(crate) factory: FactoryFn,
    /// Set for components and view providers.
    pub(crate) can_see_view_providers: bool,
    pub(crate) resolving: Cell<bool>,
}

impl NodeInjectorFactory {
    pub(crate) fn new(token: Token, factory: FactoryFn, can_see_view_providers: bool) -> Rc<Self> {
        Rc::new(Self {
            token,
            factory,
            can_see_view_providers,
            resolving: Cell::new(false),
        })
    }
}

enum Lookup {
    Found(Option<Instance>),
    NotFound,
}

fn should_search_parent(flags: InjectFlags, is_first_host_tnode: bool) -> bool {
    !flags.contains(InjectFlags::SELF) && !(flags.contains(InjectFlags::HOST) && is_first_host_tnode)
}

impl Runtime {
    /// Resolve `token` for the node at `tnode` in `view`.
    pub(crate) fn get_or_create_injectable(
        &mut self,
        tnode: Option<usize>,
        view: ViewId,
        token: Token,
        flags: InjectFlags,
        not_found: Option<Instance>,
    ) -> Result<Option<Instance>> {
        if let Some(tnode) = tnode {
            if self.lview(view)?.flags.contains(LViewFlags::HAS_EMBEDDED_VIEW_INJECTOR)
                && !flags.contains(InjectFlags::SELF)
                && let Lookup::Found(value) = self.lookup_embedded(tnode, view, token, flags)?
            {
                return Ok(value);
            }
            if let Lookup::Found(value) = self.lookup_node(tnode, view, token, flags)? {
                return Ok(value);
            }
        }
        self.lookup_module(view, token, flags, not_found)
    }

    /// Element injectors only; `Ok(None)` when none of them provides the token.
    pub(crate) fn lookup_node_only(&mut self, tnode: usize, view: ViewId, token: Token, flags: InjectFlags) -> Result<Option<Instance>> {
        if self.lview(view)?.flags.contains(LViewFlags::HAS_EMBEDDED_VIEW_INJECTOR)
            && !flags.contains(InjectFlags::SELF)
            && let Lookup::Found(value) = self.lookup_embedded(tnode, view, token, flags)?
        {
            return Ok(value);
        }
        match self.lookup_node(tnode, view, token, flags)? {
            Lookup::Found(value) => Ok(value),
            Lookup::NotFound => Ok(None),
        }
    }

    fn lookup_module(&mut self, view: ViewId, token: Token, flags: InjectFlags, not_found: Option<Instance>) -> Result<Option<Instance>> {
        if flags.intersects(InjectFlags::SELF | InjectFlags::HOST) {
            return not_found_or_err(token, not_found, flags);
        }
        let injector = self
            .lview(view)?
            .injector
            .clone()
            .unwrap_or_else(|| self.root_injector.clone());
        injector.get(self, token, not_found, flags & InjectFlags::OPTIONAL)
    }

    /// Walk node by node while embedded-view injectors are interleaved with node injectors.
    fn lookup_embedded(&mut self, tnode: usize, view: ViewId, token: Token, flags: InjectFlags) -> Result<Lookup> {
        let mut current = Some((tnode, view));
        while let Some((tnode, view)) = current {
            let lview = self.lview(view)?;
            if !lview.flags.contains(LViewFlags::HAS_EMBEDDED_VIEW_INJECTOR) || lview.flags.contains(LViewFlags::IS_ROOT) {
                break;
            }
            if let Lookup::Found(value) = self.lookup_node(tnode, view, token, flags | InjectFlags::SELF)? {
                return Ok(Lookup::Found(value));
            }
            let lview = self.lview(view)?;
            let parent = self.tview(lview.tview).tnode(tnode).and_then(|t| t.parent);
            current = match parent {
                Some(parent) => Some((parent, view)),
                None => {
                    let (t_host, decl) = (lview.t_host, lview.declaration_view);
                    if let Some(injector) = lview.embedded_injector.clone()
                        && let Some(value) = injector.get(self, token, None, flags | InjectFlags::OPTIONAL)?
                    {
                        return Ok(Lookup::Found(Some(value)));
                    }
                    t_host.zip(decl)
                }
            };
        }
        Ok(Lookup::NotFound)
    }

    fn lookup_node(&mut self, tnode: usize, view: ViewId, token: Token, flags: InjectFlags) -> Result<Lookup> {
        match token.bloom_hash() {
            BloomHash::None => Ok(Lookup::NotFound),
            BloomHash::Structural => {
                if !self.enter_di(view, tnode, flags)? {
                    return Ok(Lookup::NotFound);
                }
                let value = self.structural_value(token);
                self.state.leave_di();
                match value? {
                    None if !flags.contains(InjectFlags::OPTIONAL) => Err(RuntimeError::ProviderNotFound {
                        token: token.name().to_string(),
                    }),
                    value => Ok(Lookup::Found(value)),
                }
            }
            BloomHash::Bit(bit) => self.lookup_bloom(tnode, view, token, bit, flags),
        }
    }

    fn lookup_bloom(&mut self, tnode: usize, mut view: ViewId, token: Token, bit: u8, flags: InjectFlags) -> Result<Lookup> {
        let host_tnode = if flags.contains(InjectFlags::HOST) {
            self.declaration_host_tnode(view)?
        } else {
            None
        };
        let mut previous_tview = None;
        let mut injector_index = self.injector_index(view, tnode)?;

        if injector_index.is_none() || flags.contains(InjectFlags::SKIP_SELF) {
            let parent = match injector_index {
                None => self.parent_injector_location(view, tnode)?,
                Some(index) => self.parent_location_at(view, index)?,
            };
            if !parent.has_parent() || !should_search_parent(flags, false) {
                injector_index = None;
            } else {
                previous_tview = Some(self.lview(view)?.tview);
                injector_index = Some(parent.index());
                view = self.parent_injector_view(parent, view)?;
            }
        }

        while let Some(index) = injector_index {
            let tview_id = self.lview(view)?.tview;
            if own_bloom_has(self.tview(tview_id), index, bit)
                && let Some(value) = self.search_tokens_on_injector(index, view, token, previous_tview, flags, host_tnode)?
            {
                return Ok(Lookup::Found(Some(value)));
            }
            let parent = self.parent_location_at(view, index)?;
            let owner = self.window_owner(tview_id, index);
            let is_first_host = owner.is_some() && host_tnode == owner.map(|o| (tview_id, o));
            if parent.has_parent()
                && should_search_parent(flags, is_first_host)
                && cumulative_bloom_has(self.lview(view)?, index, bit)
            {
                previous_tview = Some(tview_id);
                injector_index = Some(parent.index());
                view = self.parent_injector_view(parent, view)?;
            } else {
                injector_index = None;
            }
        }
        Ok(Lookup::NotFound)
    }

    fn parent_location_at(&self, view: ViewId, injector_index: usize) -> Result<RelativeInjectorLocation> {
        Ok(match self.lview(view)?.slot(injector_index + PARENT_OFFSET) {
            Slot::InjectorParent(location) => *location,
            _ => RelativeInjectorLocation::NO_PARENT,
        })
    }

    pub(crate) fn window_owner(&self, tview: TViewId, injector_index: usize) -> Option<usize> {
        match self.tview(tview).data.get(injector_index + PARENT_OFFSET) {
            Some(TData::InjectorTNode(owner)) => Some(*owner),
            _ => None,
        }
    }

    /// Host node of the component whose template declared `view`.
    fn declaration_host_tnode(&self, view: ViewId) -> Result<Option<(TViewId, usize)>> {
        let component_view = self.lview(self.lview(view)?.declaration_component_view)?;
        let (Some(t_host), Some(decl)) = (component_view.t_host, component_view.declaration_view) else {
            return Ok(None);
        };
        Ok(Some((self.lview(decl)?.tview, t_host)))
    }

    fn search_tokens_on_injector(
        &mut self,
        injector_index: usize,
        view: ViewId,
        token: Token,
        previous_tview: Option<TViewId>,
        flags: InjectFlags,
        host_tnode: Option<(TViewId, usize)>,
    ) -> Result<Option<Instance>> {
        let tview_id = self.lview(view)?.tview;
        let Some(owner) = self.window_owner(tview_id, injector_index) else {
            return Ok(None);
        };
        let tview = self.tview(tview_id);
        let Some(tnode) = tview.tnode(owner) else {
            return Ok(None);
        };
        let can_access_view_providers = match previous_tview {
            // Only a component, asking for itself or a view provider, sees its own view providers.
            None => tnode.is_component_host() && self.state.include_view_providers,
            // Crossing from a component's view into its host element.
            Some(previous) => previous != tview_id && tnode.is(TNodeType::ANY_RNODE),
        };
        let is_host_special_case = flags.contains(InjectFlags::HOST) && host_tnode == Some((tview_id, owner));

        let start = tnode.providers_start;
        let first = if can_access_view_providers {
            start
        } else {
            start + tnode.view_providers_count
        };
        let end = if is_host_special_case {
            start + tnode.view_providers_count
        } else {
            tnode.directive_end
        };
        let mut found = (first..end).find(|&i| match &tview.data[i] {
            TData::Token(t) => i < tnode.directive_start && *t == token,
            TData::Directive(def) => i >= tnode.directive_start && def.token == token,
            _ => false,
        });
        if found.is_none()
            && is_host_special_case
            && let Some(TData::Directive(def)) = tview.data.get(tnode.directive_start)
            && def.is_component()
            && def.token == token
        {
            found = Some(tnode.directive_start);
        }
        match found {
            Some(index) => self.node_injectable(view, index, owner).map(Some),
            None => Ok(None),
        }
    }

    /// Instance at `index`, running its factory on first access.
    pub(crate) fn node_injectable(&mut self, view: ViewId, index: usize, tnode: usize) -> Result<Instance> {
        let factory = match self.lview(view)?.slot(index) {
            Slot::Instance(instance) => return Ok(instance.clone()),
            Slot::Factory(factory) => factory.clone(),
            _ => return Err(RuntimeError::MissingNode { index }),
        };
        if factory.resolving.get() {
            return Err(RuntimeError::CyclicDependency {
                token: factory.token.name().to_string(),
            });
        }
        let previous = std::mem::replace(&mut self.state.include_view_providers, factory.can_see_view_providers);
        factory.resolving.set(true);
        self.enter_di(view, tnode, InjectFlags::empty())?;
        tracing::trace!(token = factory.token.name(), index, "instantiating node injectable");
        let result = self.with_inject_context(Some(InjectContext::Node), |rt| (factory.factory)(rt));
        self.state.leave_di();
        self.state.include_view_providers = previous;
        factory.resolving.set(false);

        let value = result?;
        *self.lview_mut(view)?.slot_mut(index) = Slot::Instance(value.clone());
        Ok(value)
    }

    /// Push a DI frame at the node (or, for `SKIP_SELF`, its nearest element ancestor).
    ///
    /// Returns `false` when there is no such ancestor.
    pub(crate) fn enter_di(&mut self, view: ViewId, tnode: usize, flags: InjectFlags) -> Result<bool> {
        let (mut view, mut tnode) = (view, tnode);
        if flags.contains(InjectFlags::SKIP_SELF) {
            let mut cursor = Some(tnode);
            let mut cursor_view = view;
            while let Some(current) = cursor {
                cursor = self.tview(self.lview(cursor_view)?.tview).tnode(current).and_then(|t| t.parent);
                if cursor.is_some() || flags.contains(InjectFlags::HOST) {
                    break;
                }
                let lview = self.lview(cursor_view)?;
                let (Some(t_host), Some(decl)) = (lview.t_host, lview.declaration_view) else {
                    break;
                };
                cursor = Some(t_host);
                cursor_view = decl;
                if self
                    .tview(self.lview(decl)?.tview)
                    .tnode(t_host)
                    .is_some_and(|t| t.is(TNodeType::ELEMENT | TNodeType::ELEMENT_CONTAINER))
                {
                    break;
                }
            }
            match cursor {
                Some(parent) => {
                    view = cursor_view;
                    tnode = parent;
                }
                None => return Ok(false),
            }
        }
        let tview = self.lview(view)?.tview;
        self.state.enter_di(view, tview, tnode);
        Ok(true)
    }

    /// Produce a framework token's value for the node of the current DI frame.
    fn structural_value(&mut self, token: Token) -> Result<Option<Instance>> {
        let (Some(view), Some(tnode)) = (self.state.frame().lview, self.state.frame().current_tnode) else {
            return Ok(None);
        };
        let tview = self.tview(self.lview(view)?.tview);
        let Some(node) = tview.tnode(tnode) else {
            return Ok(None);
        };
        let is_template = node.is(TNodeType::CONTAINER) && node.tview.is_some();
        let is_component_host = node.is_component_host();
        Ok(match token {
            Token::ElementRef => self
                .native_at(view, tnode)?
                .map(|node| Rc::new(ElementRef { node }) as Instance),
            Token::TemplateRef => is_template.then(|| {
                Rc::new(TemplateRef {
                    declaration_view: view,
                    tnode,
                }) as Instance
            }),
            Token::ViewContainerRef => Some(Rc::new(self.create_container_ref(view, tnode)?)),
            Token::Injector => Some(Rc::new(InjectorRef::Node(NodeInjector { view, tnode }))),
            Token::ChangeDetectorRef => {
                let target = if is_component_host {
                    self.component_view_at(view, tnode)?
                } else {
                    Some(self.lview(view)?.declaration_component_view)
                };
                target.map(|v| Rc::new(ViewRef::new(v)) as Instance)
            }
            Token::EnvironmentInjector | Token::User { .. } => None,
        })
    }
}
