use std::any::Any;
use std::rc::Rc;

use trellis_core::NodeId;

use crate::def::Instance;
use crate::di::InjectorRef;
use crate::error::{Result, RuntimeError};
use crate::flags::LViewFlags;
use crate::hydration::DehydratedView;
use crate::runtime::{NewView, Runtime};
use crate::view::{ContainerLoc, HEADER_OFFSET, ParentRef, Slot, ViewId};

/// Handle on a view.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ViewRef(ViewId);

impl ViewRef {
    pub fn new(view: ViewId) -> Self {
        Self(view)
    }

    pub fn view(self) -> ViewId {
        self.0
    }

    pub fn destroyed(self, rt: &Runtime) -> bool {
        rt.is_destroyed(self.0)
    }

    /// Destroy the view, detaching it from its container first.
    pub fn destroy(self, rt: &mut Runtime) -> Result<()> {
        if rt.is_destroyed(self.0) {
            return Ok(());
        }
        if let Some(ParentRef::Container(loc)) = rt.lview(self.0)?.parent
            && let Some(index) = rt.container(loc)?.views.iter().position(|v| *v == self.0)
        {
            rt.detach_view(loc, index)?;
            if let Some(refs) = &mut rt.container_mut(loc)?.view_refs
                && index < refs.len()
            {
                refs.remove(index);
            }
        }
        rt.destroy_lview(self.0)
    }

    pub fn detect_changes(self, rt: &mut Runtime) -> Result<()> {
        rt.detect_changes(self.0)
    }

    pub fn check_no_changes(self, rt: &mut Runtime) -> Result<()> {
        rt.check_no_changes(self.0)
    }

    /// Stop refreshing the view (and everything below it) from its parent.
    pub fn detach_from_change_detection(self, rt: &mut Runtime) -> Result<()> {
        rt.lview_mut(self.0)?.flags.remove(LViewFlags::ATTACHED);
        Ok(())
    }

    pub fn reattach(self, rt: &mut Runtime) -> Result<()> {
        rt.lview_mut(self.0)?.flags |= LViewFlags::ATTACHED;
        Ok(())
    }

    pub fn mark_for_check(self, rt: &mut Runtime) -> Result<()> {
        let mut cursor = Some(self.0);
        while let Some(view) = cursor {
            let lview = rt.lview_mut(view)?;
            lview.flags |= LViewFlags::DIRTY;
            cursor = match lview.parent {
                Some(ParentRef::View(parent)) => Some(parent),
                Some(ParentRef::Container(loc)) => Some(loc.view),
                None => None,
            };
        }
        Ok(())
    }

    pub fn root_nodes(self, rt: &Runtime) -> Result<Vec<NodeId>> {
        rt.root_nodes(self.0)
    }

    pub fn on_destroy(self, rt: &mut Runtime, callback: impl FnOnce(&mut Runtime) + 'static) -> Result<()> {
        rt.store_cleanup(self.0, callback)
    }

    pub fn context<T: Any>(self, rt: &Runtime) -> Result<Rc<T>> {
        rt.view_context(self.0)
    }
}

/// An embedded template, bound to the view that declared it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TemplateRef {
    pub(crate) declaration_view: ViewId,
    pub(crate) tnode: usize,
}

impl TemplateRef {
    pub fn declaration_view(self) -> ViewId {
        self.declaration_view
    }

    /// Render a new view of the template, not attached anywhere.
    pub fn create_embedded_view(self, rt: &mut Runtime, context: Option<Instance>, injector: Option<InjectorRef>) -> Result<ViewRef> {
        self.create_embedded_view_impl(rt, context, injector, None)
    }

    pub(crate) fn create_embedded_view_impl(
        self,
        rt: &mut Runtime,
        context: Option<Instance>,
        injector: Option<InjectorRef>,
        hydration: Option<DehydratedView>,
    ) -> Result<ViewRef> {
        let tview = rt
            .tview_of(self.declaration_view)?
            .tnode(self.tnode)
            .and_then(|t| t.tview)
            .ok_or(RuntimeError::NotATemplate {
                index: self.tnode - HEADER_OFFSET,
            })?;
        let view = rt.create_lview(NewView {
            declaration_view: Some(self.declaration_view),
            context,
            t_host: Some(self.tnode),
            embedded_injector: injector,
            hydration,
            ..NewView::new(tview)
        })?;
        if matches!(rt.lview(self.declaration_view)?.slot(self.tnode), Slot::Container(_)) {
            rt.lview_mut(view)?.declaration_container = Some(ContainerLoc {
                view: self.declaration_view,
                index: self.tnode,
            });
        }
        rt.render_view(view)?;
        Ok(ViewRef(view))
    }
}

impl Runtime {
    /// Template declared at node `index` (no header offset) of `view`.
    pub fn template_ref(&self, view: ViewId, index: usize) -> Result<TemplateRef> {
        let tnode = HEADER_OFFSET + index;
        match self.tview_of(view)?.tnode(tnode) {
            Some(node) if node.tview.is_some() => Ok(TemplateRef {
                declaration_view: view,
                tnode,
            }),
            _ => Err(RuntimeError::NotATemplate { index }),
        }
    }
}
