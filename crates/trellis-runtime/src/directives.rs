//! Directive matching and instantiation on element nodes.
//!
//! On a template's first create pass every element is matched against the
//! template's directive registry. Matches get an injector window and a run
//! of expando slots laid out as
//!
//! ```text
//! [view providers | providers | directives]
//! ```
//!
//! with the component (if any) as the first directive. The slots start out
//! holding factories; instances are created on every create pass, and the
//! component additionally gets its own view.

use std::rc::Rc;

use serde_json::Value;

use crate::def::{DirectiveDef, Instance, Provider};
use crate::di::{NodeInjectorFactory, Token};
use crate::di::bloom::bloom_add;
use crate::di::token::BloomHash;
use crate::error::{Result, RuntimeError};
use crate::flags::TNodeFlags;
use crate::runtime::{NewView, Runtime};
use crate::view::{Slot, TData, TViewId, TViewKind, ViewId};

impl Runtime {
    /// Registry directives whose selector matches the node, component first.
    pub(crate) fn match_directives(&self, tview: TViewId, tnode: usize) -> Vec<Rc<DirectiveDef>> {
        let tview = self.tview(tview);
        let Some(node) = tview.tnode(tnode) else {
            return Vec::new();
        };
        let mut matches: Vec<Rc<DirectiveDef>> = tview
            .registry
            .iter()
            .filter(|def| {
                def.selector
                    .as_ref()
                    .is_some_and(|s| s.matches(node.tag.as_deref(), &node.attrs))
            })
            .cloned()
            .collect();
        if let Some(pos) = matches.iter().position(|def| def.is_component()) {
            let component = matches.remove(pos);
            matches.insert(0, component);
        }
        matches
    }

    /// Lay out providers and directives for `tnode` (first create pass only).
    pub(crate) fn resolve_directives(&mut self, view: ViewId, tnode: usize, defs: &[Rc<DirectiveDef>]) -> Result<()> {
        if defs.is_empty() {
            return Ok(());
        }
        let injector = self.get_or_create_node_injector(view, tnode)?;
        let tview = self.lview(view)?.tview;
        let providers_start = self.tview(tview).data.len();

        let mut view_providers = 0;
        if let Some(component) = defs.first().filter(|d| d.is_component()) {
            for provider in &component.view_providers {
                if self.push_provider(view, injector, providers_start, provider, true)? {
                    view_providers += 1;
                }
            }
        }
        for def in defs {
            for provider in &def.providers {
                self.push_provider(view, injector, providers_start + view_providers, provider, false)?;
            }
        }

        let directive_start = self.tview(tview).data.len();
        for def in defs {
            self.publish_token(tview, injector, def.token);
            let factory = NodeInjectorFactory::new(def.token, def.factory.clone(), def.is_component());
            self.push_injectable(view, TData::Directive(def.clone()), factory)?;
        }
        let directive_end = self.tview(tview).data.len();

        let tview = self.tview_mut(tview);
        if defs[0].is_component() {
            tview.components.push(tnode);
        }
        if let Some(node) = tview.tnode_mut(tnode) {
            node.providers_start = providers_start;
            node.view_providers_count = view_providers;
            node.directive_start = directive_start;
            node.directive_end = directive_end;
            node.flags |= TNodeFlags::HAS_DIRECTIVES;
            if defs[0].is_component() {
                node.flags |= TNodeFlags::IS_COMPONENT_HOST;
            }
        }
        Ok(())
    }

    /// Append a provider unless its token is already provided from `search_from` on.
    fn push_provider(&mut self, view: ViewId, injector: usize, search_from: usize, provider: &Provider, is_view_provider: bool) -> Result<bool> {
        let tview = self.lview(view)?.tview;
        let duplicate = self.tview(tview).data[search_from..]
            .iter()
            .any(|entry| matches!(entry, TData::Token(t) if *t == provider.token));
        if duplicate {
            return Ok(false);
        }
        self.publish_token(tview, injector, provider.token);
        let factory = NodeInjectorFactory::new(provider.token, provider.factory.clone(), is_view_provider);
        self.push_injectable(view, TData::Token(provider.token), factory)?;
        Ok(true)
    }

    fn publish_token(&mut self, tview: TViewId, injector: usize, token: Token) {
        if let BloomHash::Bit(bit) = token.bloom_hash() {
            bloom_add(self.tview_mut(tview), injector, bit);
        }
    }

    fn push_injectable(&mut self, view: ViewId, entry: TData, factory: Rc<NodeInjectorFactory>) -> Result<()> {
        let index = self.alloc_expando(view, 1, Slot::Factory(factory))?;
        let tview = self.lview(view)?.tview;
        self.tview_mut(tview).data[index] = entry;
        Ok(())
    }

    /// Instantiate the node's directives; a component also gets its view.
    pub(crate) fn create_directives_instances(&mut self, view: ViewId, tnode: usize) -> Result<()> {
        let tview = self.tview_of(view)?;
        let Some(node) = tview.tnode(tnode) else {
            return Err(RuntimeError::MissingNode { index: tnode });
        };
        let (start, end) = (node.directive_start, node.directive_end);
        let attrs = node.attrs.clone();
        let defs: Vec<Rc<DirectiveDef>> = (start..end)
            .filter_map(|i| match &tview.data[i] {
                TData::Directive(def) => Some(def.clone()),
                _ => None,
            })
            .collect();

        if let Some(component) = defs.first().filter(|d| d.is_component()) {
            self.add_component_logic(view, tnode, component)?;
        }
        for (offset, def) in defs.iter().enumerate() {
            let instance = self.node_injectable(view, start + offset, tnode)?;
            for (name, value) in &attrs {
                set_input(def, &instance, name, &Value::String(value.clone()));
            }
            if offset == 0
                && def.is_component()
                && let Some(component_view) = self.component_view_at(view, tnode)?
            {
                self.lview_mut(component_view)?.context = Some(instance);
            }
        }
        Ok(())
    }

    /// Create the component's view on its host element.
    fn add_component_logic(&mut self, view: ViewId, tnode: usize, def: &Rc<DirectiveDef>) -> Result<()> {
        let host = self
            .native_at(view, tnode)?
            .ok_or(RuntimeError::MissingNode { index: tnode })?;
        let tview = self.component_tview(def)?;
        let hydration = self.hydrate_host(host);
        let component_view = self.create_lview(NewView {
            declaration_view: Some(view),
            host: Some(host),
            t_host: Some(tnode),
            hydration,
            ..NewView::new(tview)
        })?;
        *self.lview_mut(view)?.slot_mut(tnode) = Slot::Component(component_view);
        Ok(())
    }

    /// The component's template, created on first use.
    pub(crate) fn component_tview(&mut self, def: &DirectiveDef) -> Result<TViewId> {
        if let Some(tview) = self.component_tviews.get(&def.token) {
            return Ok(*tview);
        }
        let Some(component) = &def.component else {
            return Err(RuntimeError::NotATemplate { index: 0 });
        };
        let tview = self.create_tview(
            TViewKind::Component,
            Some(component.template.template.clone()),
            component.template.decls,
            component.template.vars,
            component.registry.clone(),
            None,
        );
        self.tview_mut(tview).ssr_id = Some(component.id.clone());
        self.component_tviews.insert(def.token, tview);
        Ok(tview)
    }

    /// Hydration data for a component host, or `None` to render it fresh.
    ///
    /// A host without a usable descriptor loses its server content.
    pub(crate) fn hydrate_host(&mut self, host: trellis_core::NodeId) -> Option<crate::hydration::DehydratedView> {
        if !self.config.hydration {
            return None;
        }
        if self.has_skip_hydration_attr(host) {
            self.clear_element_contents(host);
            return None;
        }
        let info = self.retrieve_hydration_info(host);
        if info.is_none() {
            self.clear_element_contents(host);
        }
        info
    }

    /// Write `value` to every matched directive declaring input `name`.
    ///
    /// Returns `false` when no directive on the node declares the input.
    pub(crate) fn set_directive_input(&mut self, view: ViewId, tnode: usize, name: &str, value: &Value) -> Result<bool> {
        let tview = self.tview_of(view)?;
        let Some(node) = tview.tnode(tnode) else {
            return Ok(false);
        };
        let targets: Vec<(usize, Rc<DirectiveDef>)> = (node.directive_start..node.directive_end)
            .filter_map(|i| match &tview.data[i] {
                TData::Directive(def) if def.inputs.iter().any(|(n, _)| n == name) => Some((i, def.clone())),
                _ => None,
            })
            .collect();
        for (index, def) in &targets {
            let instance = self.node_injectable(view, *index, tnode)?;
            set_input(def, &instance, name, value);
        }
        Ok(!targets.is_empty())
    }
}

fn set_input(def: &DirectiveDef, instance: &Instance, name: &str, value: &Value) {
    for (input, setter) in &def.inputs {
        if input == name {
            setter(instance, value);
        }
    }
}
