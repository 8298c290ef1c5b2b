//! Template instructions.
//!
//! Template functions call these against the view of the current frame:
//! creation instructions in create mode, binding instructions in update
//! mode. Node indexes are given without the header offset, exactly as the
//! hydration descriptor stores them.

use std::rc::Rc;

use serde_json::Value;
use trellis_core::{Event, NodeId, NodeKind};

use crate::def::TemplateDef;
use crate::error::{Result, RuntimeError};
use crate::flags::{TNodeFlags, TNodeType};
use crate::runtime::Runtime;
use crate::view::{Cleanup, ContainerHost, HEADER_OFFSET, LContainer, Slot, TData, TNode, TView, TViewId, TViewKind, ViewId};

/// How a binding value is written into the DOM.
pub fn render_stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn owned_attrs(attrs: &[(&str, &str)]) -> Vec<(String, String)> {
    attrs
        .iter()
        .map(|(n, v)| (n.to_string(), v.to_string()))
        .collect()
}

impl Runtime {
    pub(crate) fn current_view(&self, instruction: &'static str) -> Result<(ViewId, TViewId)> {
        let frame = self.state.frame();
        match (frame.lview, frame.tview) {
            (Some(view), Some(tview)) => Ok((view, tview)),
            _ => Err(RuntimeError::NoActiveView(instruction)),
        }
    }

    /// Parent of the node about to be created in the current frame.
    pub(crate) fn next_parent(&self, tview: TViewId) -> Option<usize> {
        let frame = self.state.frame();
        let current = frame.current_tnode?;
        if frame.is_parent {
            Some(current)
        } else {
            self.tview(tview).tnode(current).and_then(|t| t.parent)
        }
    }

    /// Create the node at `index`, or turn an i18n placeholder into a real node.
    pub(crate) fn get_or_create_tnode(
        &mut self,
        tview: TViewId,
        index: usize,
        kind: TNodeType,
        tag: Option<&str>,
        attrs: Vec<(String, String)>,
    ) -> Result<usize> {
        let t = self.tview(tview);
        if index < HEADER_OFFSET || index >= t.bindings_start_index {
            return Err(RuntimeError::UndeclaredSlot {
                index: index.saturating_sub(HEADER_OFFSET),
                decls: t.bindings_start_index - HEADER_OFFSET,
            });
        }
        match self.tview(tview).tnode(index) {
            None => {
                self.create_tnode_at_index(tview, index, kind, tag, attrs);
            }
            Some(existing) if existing.is(TNodeType::PLACEHOLDER) => {
                // Placeholders keep the parent and links the message gave them.
                let parent = existing.parent;
                let tview = self.tview_mut(tview);
                let injector_index = parent
                    .and_then(|p| tview.tnode(p))
                    .and_then(|p| p.injector_index);
                if let Some(node) = tview.tnode_mut(index) {
                    node.kind = kind;
                    node.tag = tag.map(str::to_string);
                    node.attrs = attrs;
                    node.injector_index = injector_index;
                }
            }
            Some(_) => {}
        }
        self.state.set_current_tnode(Some(index), true);
        Ok(index)
    }

    /// Add a node and link it after the current node or as its first child.
    pub(crate) fn create_tnode_at_index(
        &mut self,
        tview: TViewId,
        index: usize,
        kind: TNodeType,
        tag: Option<&str>,
        attrs: Vec<(String, String)>,
    ) -> usize {
        let (current, is_parent) = (self.state.frame().current_tnode, self.state.frame().is_parent);
        let in_i18n = self.state.frame().in_i18n;
        let parent = self.next_parent(tview);
        let tview = self.tview_mut(tview);

        let mut tnode = TNode::new(kind, index, tag, parent);
        tnode.attrs = attrs;
        tnode.injector_index = parent
            .and_then(|p| tview.tnode(p))
            .and_then(|p| p.injector_index);
        if in_i18n {
            tnode.flags |= TNodeFlags::I18N;
        }
        if is_projected(tview, parent) {
            tnode.flags |= TNodeFlags::IS_DETACHED;
        }

        if let Some(current) = current {
            if is_parent {
                if tnode.parent.is_some()
                    && let Some(cur) = tview.tnode_mut(current)
                    && cur.child.is_none()
                {
                    cur.child = Some(index);
                }
            } else if let Some(cur) = tview.tnode_mut(current)
                && cur.next.is_none()
            {
                cur.next = Some(index);
                tnode.prev = Some(current);
            }
        }
        if tview.first_child.is_none() {
            tview.first_child = Some(index);
        }
        tview.ensure_slot(index);
        tview.data[index] = TData::Node(tnode);
        index
    }

    /// Server-rendered node for `index`, when the view is hydrating.
    pub(crate) fn claim_node(&self, view: ViewId, index: usize, kind: NodeKind, tag: Option<&str>) -> Result<Option<NodeId>> {
        let lview = self.lview(view)?;
        if lview.hydration.is_none() {
            return Ok(None);
        }
        let detached = self
            .tview(lview.tview)
            .tnode(index)
            .is_some_and(|t| t.flags.contains(TNodeFlags::IS_DETACHED));
        if detached {
            return Ok(None);
        }
        let Some(node) = self.locate_next_node(view, index)? else {
            tracing::warn!(index = index - HEADER_OFFSET, "server-rendered node not found, creating it");
            return Ok(None);
        };
        let tag_matches = tag.is_none_or(|tag| self.renderer.tag_name(node).as_deref() == Some(tag));
        if self.renderer.node_kind(node) != kind || !tag_matches {
            tracing::warn!(
                index = index - HEADER_OFFSET,
                expected = ?kind,
                found = ?self.renderer.node_kind(node),
                "server-rendered node does not match, creating it"
            );
            return Ok(None);
        }
        Ok(Some(node))
    }

    /// Insert a freshly created node under its closest rendered parent.
    pub(crate) fn append_child(&mut self, view: ViewId, index: usize, native: NodeId) -> Result<()> {
        let tview = self.tview_of(view)?;
        let Some(tnode) = tview.tnode(index) else {
            return Ok(());
        };
        let parent = self.closest_parent_element(view, tnode.parent)?;
        let before = self.insert_before_node(view, tnode)?;
        if let Some(parent) = parent {
            self.renderer.insert_before(parent, native, before, false);
        }

        let tview = self.tview_of(view)?;
        let Some(tnode) = tview.tnode(index) else {
            return Ok(());
        };
        if tnode.i18n_children.is_empty() || tnode.is_component_host() {
            return Ok(());
        }
        let (i18n_parent, anchor) = if tnode.is(TNodeType::ANY_RNODE) {
            (Some(native), None)
        } else {
            (parent, Some(native))
        };
        let children: Vec<NodeId> = tnode
            .i18n_children
            .iter()
            .filter_map(|&i| match self.lview(view).map(|l| l.slot(i)) {
                Ok(Slot::Native(node)) => Some(*node),
                _ => None,
            })
            .collect();
        if let Some(i18n_parent) = i18n_parent {
            for child in children {
                self.renderer.insert_before(i18n_parent, child, anchor, false);
            }
        }
        Ok(())
    }

    /// DOM element that children of `parent` render into.
    ///
    /// Element containers and ICUs have no element of their own and are
    /// skipped. View roots render into the view's host (none for embedded
    /// views, which are placed when inserted). Content of a component host
    /// is not rendered.
    pub(crate) fn closest_parent_element(&self, view: ViewId, parent: Option<usize>) -> Result<Option<NodeId>> {
        let lview = self.lview(view)?;
        let tview = self.tview(lview.tview);
        let mut cursor = parent;
        while let Some(p) = cursor.and_then(|i| tview.tnode(i)) {
            if !p.is(TNodeType::ELEMENT_CONTAINER | TNodeType::ICU) {
                break;
            }
            cursor = p.parent;
        }
        match cursor.and_then(|i| tview.tnode(i)) {
            None => Ok(lview.host),
            Some(p) if p.is_component_host() => Ok(None),
            Some(p) => self.native_at(view, p.index),
        }
    }

    /// Node a child must be inserted in front of.
    fn insert_before_node(&self, view: ViewId, tnode: &TNode) -> Result<Option<NodeId>> {
        if let Some(before) = tnode.insert_before_index {
            return self.native_at(view, before);
        }
        let tview = self.tview_of(view)?;
        match tnode.parent.and_then(|p| tview.tnode(p)) {
            Some(p) if p.is(TNodeType::ELEMENT_CONTAINER | TNodeType::ICU) => self.native_at(view, p.index),
            _ => Ok(None),
        }
    }

    pub fn element_start(&mut self, index: usize, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let (view, tview) = self.current_view("element_start")?;
        let adjusted = HEADER_OFFSET + index;
        if self.tview(tview).first_create_pass {
            self.get_or_create_tnode(tview, adjusted, TNodeType::ELEMENT, Some(tag), owned_attrs(attrs))?;
            let defs = self.match_directives(tview, adjusted);
            self.resolve_directives(view, adjusted, &defs)?;
        } else {
            self.state.set_current_tnode(Some(adjusted), true);
        }

        let claimed = self.claim_node(view, adjusted, NodeKind::Element, Some(tag))?;
        let native = match claimed {
            Some(node) => node,
            None => {
                let node = self.renderer.create_element(tag);
                let attrs = self
                    .tview(tview)
                    .tnode(adjusted)
                    .map(|t| t.attrs.clone())
                    .unwrap_or_default();
                for (name, value) in &attrs {
                    self.renderer.set_attribute(node, name, value);
                }
                node
            }
        };
        *self.lview_mut(view)?.slot_mut(adjusted) = Slot::Native(native);
        if claimed.is_none() {
            self.append_child(view, adjusted, native)?;
        }
        if self.tview(tview).tnode(adjusted).is_some_and(TNode::has_directives) {
            self.create_directives_instances(view, adjusted)?;
        }
        Ok(())
    }

    pub fn element_end(&mut self) -> Result<()> {
        let (_, tview) = self.current_view("element_end")?;
        let frame = self.state.frame();
        if frame.is_parent {
            self.state.frame_mut().is_parent = false;
        } else {
            let parent = frame
                .current_tnode
                .and_then(|t| self.tview(tview).tnode(t))
                .and_then(|t| t.parent);
            self.state.set_current_tnode(parent, false);
        }
        Ok(())
    }

    /// An element without children.
    pub fn element(&mut self, index: usize, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.element_start(index, tag, attrs)?;
        self.element_end()
    }

    /// A logical group rendered as its children followed by a comment.
    pub fn element_container_start(&mut self, index: usize, attrs: &[(&str, &str)]) -> Result<()> {
        let (view, tview) = self.current_view("element_container_start")?;
        let adjusted = HEADER_OFFSET + index;
        if self.tview(tview).first_create_pass {
            self.get_or_create_tnode(tview, adjusted, TNodeType::ELEMENT_CONTAINER, None, owned_attrs(attrs))?;
            let defs = self.match_directives(tview, adjusted);
            self.resolve_directives(view, adjusted, &defs)?;
        } else {
            self.state.set_current_tnode(Some(adjusted), true);
        }

        let claimed = match self.claim_node_any(view, adjusted)? {
            Some(first) => self.locate_element_container(view, adjusted, first)?,
            None => None,
        };
        let comment = match claimed {
            Some(node) => node,
            None => self.renderer.create_comment("ng-container"),
        };
        *self.lview_mut(view)?.slot_mut(adjusted) = Slot::Native(comment);
        if claimed.is_none() {
            self.append_child(view, adjusted, comment)?;
        }
        if self.tview(tview).tnode(adjusted).is_some_and(TNode::has_directives) {
            self.create_directives_instances(view, adjusted)?;
        }
        Ok(())
    }

    pub fn element_container_end(&mut self) -> Result<()> {
        self.element_end()
    }

    /// Claim whatever node sits at `index`, without checking its kind.
    fn claim_node_any(&self, view: ViewId, index: usize) -> Result<Option<NodeId>> {
        if self.lview(view)?.hydration.is_none() {
            return Ok(None);
        }
        let found = self.locate_next_node(view, index)?;
        if found.is_none() {
            tracing::warn!(index = index - HEADER_OFFSET, "server-rendered container not found, creating it");
        }
        Ok(found)
    }

    pub fn text(&mut self, index: usize, value: &str) -> Result<()> {
        let (view, tview) = self.current_view("text")?;
        let adjusted = HEADER_OFFSET + index;
        if self.tview(tview).first_create_pass {
            self.get_or_create_tnode(tview, adjusted, TNodeType::TEXT, None, Vec::new())?;
            if let Some(node) = self.tview_mut(tview).tnode_mut(adjusted) {
                node.value = value.to_string();
            }
        }
        self.state.set_current_tnode(Some(adjusted), false);

        let claimed = self.claim_node(view, adjusted, NodeKind::Text, None)?;
        let native = match claimed {
            Some(node) => node,
            None => self.renderer.create_text(value),
        };
        *self.lview_mut(view)?.slot_mut(adjusted) = Slot::Native(native);
        if claimed.is_none() {
            self.append_child(view, adjusted, native)?;
        }
        Ok(())
    }

    /// Declare an embedded template anchored at a comment.
    ///
    /// Views of the template are created through the `ViewContainerRef`
    /// and `TemplateRef` of this node.
    pub fn template(&mut self, index: usize, def: TemplateDef, attrs: &[(&str, &str)]) -> Result<()> {
        let (view, tview) = self.current_view("template")?;
        let adjusted = HEADER_OFFSET + index;
        if self.tview(tview).first_create_pass {
            self.get_or_create_tnode(tview, adjusted, TNodeType::CONTAINER, Some("ng-template"), owned_attrs(attrs))?;
            let registry = self.tview(tview).registry.clone();
            let embedded = self.create_tview(
                TViewKind::Embedded,
                Some(def.template.clone()),
                def.decls,
                def.vars,
                registry,
                Some(adjusted),
            );
            if let Some(node) = self.tview_mut(tview).tnode_mut(adjusted) {
                node.tview = Some(embedded);
            }
            let defs = self.match_directives(tview, adjusted);
            self.resolve_directives(view, adjusted, &defs)?;
        }
        self.state.set_current_tnode(Some(adjusted), false);

        let mut dehydrated = Vec::new();
        let mut anchor = None;
        if let Some(first) = self.claim_node_any(view, adjusted)? {
            let no_offset = index;
            let lview = self.lview(view)?;
            let (ssr_id, views) = match &lview.hydration {
                Some(info) => (
                    info.data.templates.get(&no_offset).cloned(),
                    info.data
                        .containers
                        .get(&no_offset)
                        .map(|c| c.views.clone())
                        .unwrap_or_default(),
                ),
                None => (None, Vec::new()),
            };
            if let Some(embedded) = self.tview(tview).tnode(adjusted).and_then(|t| t.tview)
                && self.tview(embedded).ssr_id.is_none()
            {
                self.tview_mut(embedded).ssr_id = ssr_id;
            }
            let (found, views) = self.locate_dehydrated_views(first, &views);
            match found {
                Some(comment) if self.renderer.node_kind(comment) == NodeKind::Comment => {
                    anchor = Some(comment);
                    dehydrated = views;
                }
                _ => tracing::warn!(index, "container anchor not found, creating it"),
            }
        }
        let claimed = anchor.is_some();
        let comment = match anchor {
            Some(comment) => comment,
            None => self.renderer.create_comment("container"),
        };
        if !claimed {
            self.append_child(view, adjusted, comment)?;
        }
        let mut container = LContainer::new(ContainerHost::Node(comment), Some(comment), view, adjusted);
        container.dehydrated_views = dehydrated;
        *self.lview_mut(view)?.slot_mut(adjusted) = Slot::Container(Box::new(container));

        if self.tview(tview).tnode(adjusted).is_some_and(TNode::has_directives) {
            self.create_directives_instances(view, adjusted)?;
        }
        Ok(())
    }

    /// Select the node that following binding instructions write to.
    pub fn select(&mut self, index: usize) -> Result<()> {
        self.current_view("select")?;
        self.state.frame_mut().selected_index = Some(HEADER_OFFSET + index);
        Ok(())
    }

    /// Move the selection `delta` nodes forward; the first call selects node `delta - 1`.
    pub fn advance(&mut self, delta: usize) -> Result<()> {
        self.current_view("advance")?;
        let frame = self.state.frame_mut();
        frame.selected_index = Some(match frame.selected_index {
            Some(selected) => selected + delta,
            None => HEADER_OFFSET + delta.saturating_sub(1),
        });
        Ok(())
    }

    fn selected(&self, instruction: &'static str) -> Result<(ViewId, usize)> {
        let (view, _) = self.current_view(instruction)?;
        let index = self
            .state
            .frame()
            .selected_index
            .ok_or(RuntimeError::NoActiveView(instruction))?;
        Ok((view, index))
    }

    /// Compare `value` with the next binding slot and store it.
    ///
    /// Returns whether the value changed. In verification mode a change is
    /// an error instead.
    pub fn bind(&mut self, value: Value) -> Result<bool> {
        let (view, _) = self.current_view("bind")?;
        let index = self.state.next_binding_index();
        let check = self.state.check_no_changes;
        let slot = self.lview_mut(view)?.slot_mut(index);
        if let Slot::Value(previous) = slot {
            if *previous == value {
                return Ok(false);
            }
            if check {
                return Err(RuntimeError::ExpressionChanged {
                    index,
                    previous: previous.to_string(),
                    current: value.to_string(),
                });
            }
        }
        *slot = Slot::Value(value);
        Ok(true)
    }

    /// Skip `count` binding slots.
    pub fn skip_bindings(&mut self, count: usize) {
        self.state.frame_mut().binding_index += count;
    }

    /// Write a bound value into the selected text node.
    pub fn text_interpolate(&mut self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if !self.bind(value.clone())? || self.state.check_no_changes {
            return Ok(());
        }
        let (view, index) = self.selected("text_interpolate")?;
        if let Some(node) = self.native_at(view, index)? {
            self.renderer.set_value(node, &render_stringify(&value));
        }
        Ok(())
    }

    /// Bind a property of the selected node: directive inputs first, the
    /// element attribute otherwise.
    pub fn property(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if !self.bind(value.clone())? || self.state.check_no_changes {
            return Ok(());
        }
        let (view, index) = self.selected("property")?;
        if self.set_directive_input(view, index, name, &value)? {
            return Ok(());
        }
        if let Some(node) = self.native_at(view, index)? {
            self.renderer.set_attribute(node, name, &render_stringify(&value));
        }
        Ok(())
    }

    /// Bind an attribute of the selected element; `null` removes it.
    pub fn attribute(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if !self.bind(value.clone())? || self.state.check_no_changes {
            return Ok(());
        }
        let (view, index) = self.selected("attribute")?;
        let Some(node) = self.native_at(view, index)? else {
            return Ok(());
        };
        match value {
            Value::Null => self.renderer.remove_attribute(node, name),
            value => self.renderer.set_attribute(node, name, &render_stringify(&value)),
        }
        Ok(())
    }

    /// Listen for `event` on the element just created; released when the view is destroyed.
    pub fn listener(&mut self, event: &str, handler: impl Fn(&Event) + 'static) -> Result<()> {
        let (view, _) = self.current_view("listener")?;
        let index = self
            .state
            .frame()
            .current_tnode
            .ok_or(RuntimeError::NoActiveView("listener"))?;
        let target = self
            .native_at(view, index)?
            .ok_or(RuntimeError::MissingNode { index })?;
        let id = self.renderer.listen(target, event, Rc::new(handler));
        self.lview_mut(view)?.cleanup.push(Cleanup::Listener(id));
        Ok(())
    }

    /// Run `callback` when the active view is destroyed.
    pub fn on_destroy(&mut self, callback: impl FnOnce(&mut Runtime) + 'static) -> Result<()> {
        let (view, _) = self.current_view("on_destroy")?;
        self.store_cleanup(view, callback)
    }

    pub(crate) fn store_cleanup(&mut self, view: ViewId, callback: impl FnOnce(&mut Runtime) + 'static) -> Result<()> {
        self.lview_mut(view)?
            .cleanup
            .push(Cleanup::Callback(Box::new(callback)));
        Ok(())
    }
}

/// Whether children of `parent` are content of a component host (not rendered).
fn is_projected(tview: &TView, parent: Option<usize>) -> bool {
    let mut cursor = parent;
    while let Some(p) = cursor.and_then(|i| tview.tnode(i)) {
        if p.is_component_host() {
            return true;
        }
        if !p.is(TNodeType::ELEMENT_CONTAINER | TNodeType::ICU) {
            return false;
        }
        cursor = p.parent;
    }
    false
}
