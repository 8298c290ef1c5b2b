//! The runtime: view arena, renderer and instruction state.

use std::any::Any;
use std::rc::Rc;

use indexmap::IndexMap;
use trellis_core::{NodeId, Renderer};

use crate::config::RuntimeConfig;
use crate::def::{DirectiveDef, Instance, TemplateFn};
use crate::di::{InjectContext, InjectorRef, ModuleInjector, Token};
use crate::error::{Result, RuntimeError};
use crate::flags::{InjectFlags, LViewFlags};
use crate::hydration::DehydratedView;
use crate::state::InstructionState;
use crate::view::{ContainerHost, ContainerLoc, LContainer, LView, ParentRef, Slot, TView, TViewId, TViewKind, ViewId};

/// Parameters of a new view instance.
pub(crate) struct NewView {
    pub(crate) tview: TViewId,
    pub(crate) declaration_view: Option<ViewId>,
    pub(crate) context: Option<Instance>,
    pub(crate) flags: LViewFlags,
    pub(crate) host: Option<NodeId>,
    pub(crate) t_host: Option<usize>,
    pub(crate) injector: Option<InjectorRef>,
    pub(crate) embedded_injector: Option<InjectorRef>,
    pub(crate) hydration: Option<DehydratedView>,
}

impl NewView {
    pub(crate) fn new(tview: TViewId) -> Self {
        Self {
            tview,
            declaration_view: None,
            context: None,
            flags: LViewFlags::empty(),
            host: None,
            t_host: None,
            injector: None,
            embedded_injector: None,
            hydration: None,
        }
    }
}

/// Owns every view, the renderer they draw through and the environment injector.
pub struct Runtime {
    pub(crate) renderer: Box<dyn Renderer>,
    pub(crate) views: Vec<Option<LView>>,
    pub(crate) tviews: Vec<TView>,
    pub(crate) state: InstructionState,
    pub(crate) config: RuntimeConfig,
    pub(crate) root_injector: InjectorRef,
    /// Template of each component, created on first use.
    pub(crate) component_tviews: IndexMap<Token, TViewId>,
}

/// Builder for [`Runtime`].
pub struct RuntimeBuilder {
    renderer: Box<dyn Renderer>,
    config: RuntimeConfig,
    root_injector: Option<InjectorRef>,
}

impl RuntimeBuilder {
    pub fn new(renderer: impl Renderer + 'static) -> Self {
        Self {
            renderer: Box::new(renderer),
            config: RuntimeConfig::default(),
            root_injector: None,
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn locale(mut self, locale: &str) -> Self {
        self.config = self.config.locale(locale);
        self
    }

    pub fn hydration(mut self, enabled: bool) -> Self {
        self.config = self.config.hydration(enabled);
        self
    }

    pub fn check_no_changes(mut self, enabled: bool) -> Self {
        self.config = self.config.check_no_changes(enabled);
        self
    }

    /// Environment injector for views that have no other.
    pub fn root_injector(mut self, injector: InjectorRef) -> Self {
        self.root_injector = Some(injector);
        self
    }

    pub fn build(self) -> Runtime {
        let root_injector = self
            .root_injector
            .unwrap_or_else(|| InjectorRef::module(ModuleInjector::new("root", Vec::new(), None)));
        tracing::debug!(
            locale = %self.config.locale,
            hydration = self.config.hydration,
            "runtime created"
        );
        Runtime {
            renderer: self.renderer,
            views: Vec::new(),
            tviews: Vec::new(),
            state: InstructionState::new(),
            config: self.config,
            root_injector,
            component_tviews: IndexMap::new(),
        }
    }
}

impl Runtime {
    pub fn builder(renderer: impl Renderer + 'static) -> RuntimeBuilder {
        RuntimeBuilder::new(renderer)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    pub fn renderer_mut(&mut self) -> &mut dyn Renderer {
        self.renderer.as_mut()
    }

    pub fn root_injector(&self) -> &InjectorRef {
        &self.root_injector
    }

    pub fn lview(&self, view: ViewId) -> Result<&LView> {
        self.views
            .get(view.index())
            .and_then(Option::as_ref)
            .ok_or(RuntimeError::MissingView(view))
    }

    pub(crate) fn lview_mut(&mut self, view: ViewId) -> Result<&mut LView> {
        self.views
            .get_mut(view.index())
            .and_then(Option::as_mut)
            .ok_or(RuntimeError::MissingView(view))
    }

    pub fn tview(&self, tview: TViewId) -> &TView {
        &self.tviews[tview.index()]
    }

    pub(crate) fn tview_mut(&mut self, tview: TViewId) -> &mut TView {
        &mut self.tviews[tview.index()]
    }

    /// Template of a live view.
    pub fn tview_of(&self, view: ViewId) -> Result<&TView> {
        Ok(self.tview(self.lview(view)?.tview))
    }

    /// Whether `view` was destroyed (or never existed).
    pub fn is_destroyed(&self, view: ViewId) -> bool {
        self.lview(view).map_or(true, LView::is_destroyed)
    }

    /// Ids of all live views, in creation order.
    pub fn live_views(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.views.iter().flatten().map(LView::id)
    }

    pub(crate) fn create_tview(
        &mut self,
        kind: TViewKind,
        template: Option<TemplateFn>,
        decls: usize,
        vars: usize,
        registry: Rc<[Rc<DirectiveDef>]>,
        decl_tnode: Option<usize>,
    ) -> TViewId {
        let id = TViewId(self.tviews.len() as u32);
        self.tviews
            .push(TView::new(id, kind, template, decls, vars, registry, decl_tnode));
        id
    }

    pub(crate) fn create_lview(&mut self, init: NewView) -> Result<ViewId> {
        let id = ViewId(self.views.len() as u32);
        let tview = self.tview(init.tview);
        let kind = tview.kind;
        let data = tview.blueprint.clone();

        let mut flags = init.flags | LViewFlags::CREATION_MODE | LViewFlags::ATTACHED | LViewFlags::DIRTY;
        let mut injector = init.injector;
        let mut declaration_component_view = id;
        if let Some(decl) = init.declaration_view {
            let parent = self.lview(decl)?;
            if parent.flags.contains(LViewFlags::HAS_EMBEDDED_VIEW_INJECTOR) {
                flags |= LViewFlags::HAS_EMBEDDED_VIEW_INJECTOR;
            }
            if injector.is_none() {
                injector = parent.injector.clone();
            }
            if kind == TViewKind::Embedded {
                declaration_component_view = parent.declaration_component_view;
            }
        }
        if init.embedded_injector.is_some() {
            flags |= LViewFlags::HAS_EMBEDDED_VIEW_INJECTOR;
        }

        self.views.push(Some(LView {
            id,
            tview: init.tview,
            flags,
            data,
            host: init.host,
            t_host: init.t_host,
            parent: init.declaration_view.map(ParentRef::View),
            declaration_view: init.declaration_view,
            declaration_component_view,
            declaration_container: None,
            context: init.context,
            injector,
            embedded_injector: init.embedded_injector,
            hydration: init.hydration,
            cleanup: Vec::new(),
        }));
        tracing::trace!(view = ?id, tview = ?init.tview, ?kind, "view created");
        Ok(id)
    }

    /// Grow the template and `view` by `count` expando slots; returns the first.
    pub(crate) fn alloc_expando(&mut self, view: ViewId, count: usize, initial: Slot) -> Result<usize> {
        let tview = self.lview(view)?.tview;
        let start = self.tview_mut(tview).alloc_expando(count, initial.clone());
        let len = self.tview(tview).data.len();
        let lview = self.lview_mut(view)?;
        if lview.data.len() < len {
            lview.data.resize(len, initial);
        }
        Ok(start)
    }

    /// Native node behind a slot, looking through containers and component views.
    pub fn native_at(&self, view: ViewId, index: usize) -> Result<Option<NodeId>> {
        Ok(match self.lview(view)?.slot(index) {
            Slot::Native(node) => Some(*node),
            Slot::Component(component) => self.lview(*component)?.host,
            Slot::Container(container) => match container.host {
                ContainerHost::Node(node) => Some(node),
                ContainerHost::Component(component) => self.lview(component)?.host,
            },
            _ => None,
        })
    }

    /// Last DOM node a slot occupies: the anchor comment for containers.
    pub(crate) fn trailing_native_at(&self, view: ViewId, index: usize) -> Result<Option<NodeId>> {
        if let Slot::Container(container) = self.lview(view)?.slot(index)
            && let Some(anchor) = container.anchor
        {
            return Ok(Some(anchor));
        }
        self.native_at(view, index)
    }

    pub fn container(&self, loc: ContainerLoc) -> Result<&LContainer> {
        self.lview(loc.view)?
            .slot(loc.index)
            .as_container()
            .ok_or(RuntimeError::NotAContainer { index: loc.index })
    }

    pub(crate) fn container_mut(&mut self, loc: ContainerLoc) -> Result<&mut LContainer> {
        self.lview_mut(loc.view)?
            .data
            .get_mut(loc.index)
            .and_then(Slot::as_container_mut)
            .ok_or(RuntimeError::NotAContainer { index: loc.index })
    }

    /// Component view hosted at a slot.
    pub fn component_view_at(&self, view: ViewId, index: usize) -> Result<Option<ViewId>> {
        Ok(match self.lview(view)?.slot(index) {
            Slot::Component(component) => Some(*component),
            Slot::Container(container) => match container.host {
                ContainerHost::Component(component) => Some(component),
                ContainerHost::Node(_) => None,
            },
            _ => None,
        })
    }

    /// The active view's context.
    pub fn context<T: Any>(&self) -> Result<Rc<T>> {
        let view = self.active_view("context")?;
        self.view_context(view)
    }

    /// Context of the declaration view `level` steps above the active view.
    pub fn parent_context<T: Any>(&self, level: usize) -> Result<Rc<T>> {
        let mut view = self.active_view("parent_context")?;
        for _ in 0..level {
            view = self
                .lview(view)?
                .declaration_view
                .ok_or(RuntimeError::MissingView(view))?;
        }
        self.view_context(view)
    }

    pub fn view_context<T: Any>(&self, view: ViewId) -> Result<Rc<T>> {
        self.lview(view)?
            .context
            .clone()
            .and_then(|ctx| ctx.downcast::<T>().ok())
            .ok_or(RuntimeError::ContextType(std::any::type_name::<T>()))
    }

    pub(crate) fn active_view(&self, instruction: &'static str) -> Result<ViewId> {
        self.state
            .frame()
            .lview
            .ok_or(RuntimeError::NoActiveView(instruction))
    }

    /// Resolve a dependency from wherever the running factory or template sits.
    pub fn inject(&mut self, token: Token, flags: InjectFlags) -> Result<Option<Instance>> {
        if let Some(InjectContext::Environment(injector)) = self.state.inject_context.last().cloned() {
            return injector.get(self, token, None, flags);
        }
        let frame = self.state.frame();
        match frame.lview {
            Some(view) => {
                let tnode = frame.current_tnode;
                self.get_or_create_injectable(tnode, view, token, flags, None)
            }
            None => {
                let root = self.root_injector.clone();
                root.get(self, token, None, flags)
            }
        }
    }

    /// Resolve a required dependency of a known type.
    pub fn inject_as<T: Any>(&mut self, token: Token) -> Result<Rc<T>> {
        self.inject(token, InjectFlags::empty())?
            .ok_or_else(|| RuntimeError::ProviderNotFound {
                token: token.name().to_string(),
            })?
            .downcast::<T>()
            .map_err(|_| RuntimeError::ContextType(std::any::type_name::<T>()))
    }

    pub(crate) fn with_inject_context<R>(&mut self, context: Option<InjectContext>, f: impl FnOnce(&mut Self) -> R) -> R {
        let pushed = context.is_some();
        if let Some(context) = context {
            self.state.inject_context.push(context);
        }
        let result = f(self);
        if pushed {
            self.state.inject_context.pop();
        }
        result
    }
}
