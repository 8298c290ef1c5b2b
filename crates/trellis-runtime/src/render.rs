//! Change detection driver.
//!
//! A view is rendered once (create pass) and refreshed any number of times
//! (update pass). Refreshing walks embedded views in the view's containers,
//! then its child components. Views detached from change detection are
//! skipped along with their subtrees.

use crate::def::TemplateFn;
use crate::error::Result;
use crate::flags::{LViewFlags, RenderFlags};
use crate::runtime::Runtime;
use crate::view::{Slot, ViewId};

impl Runtime {
    /// Run the create pass of `view`, then of its child components.
    pub fn render_view(&mut self, view: ViewId) -> Result<()> {
        let tview_id = self.lview(view)?.tview;
        let tview = self.tview(tview_id);
        let (template, bindings_start) = (tview.template.clone(), tview.bindings_start_index);
        self.state.enter_view(view, tview_id, bindings_start);
        tracing::trace!(?view, "render");

        let result = match &template {
            Some(template) => template(self, RenderFlags::CREATE),
            None => Ok(()),
        };
        let tview = self.tview_mut(tview_id);
        tview.first_create_pass = false;
        let components = tview.components.clone();
        let result = result.and_then(|()| {
            for index in components {
                if let Some(child) = self.component_view_at(view, index)? {
                    self.render_view(child)?;
                }
            }
            Ok(())
        });

        if let Ok(lview) = self.lview_mut(view) {
            lview.flags.remove(LViewFlags::CREATION_MODE);
        }
        self.state.leave_view();
        result
    }

    /// Run the update pass of `view` and of every attached view below it.
    pub fn refresh_view(&mut self, view: ViewId) -> Result<()> {
        let lview = self.lview(view)?;
        if lview.flags.contains(LViewFlags::DESTROYED) {
            return Ok(());
        }
        let tview_id = lview.tview;
        let tview = self.tview(tview_id);
        let (template, bindings_start) = (tview.template.clone(), tview.bindings_start_index);
        let components = tview.components.clone();
        self.state.enter_view(view, tview_id, bindings_start);
        tracing::trace!(?view, "refresh");

        let result = self.refresh_view_body(view, template.as_ref(), &components);
        if result.is_ok()
            && !self.state.check_no_changes
            && let Ok(lview) = self.lview_mut(view)
        {
            lview.flags.remove(LViewFlags::DIRTY);
        }
        self.state.leave_view();
        result
    }

    fn refresh_view_body(&mut self, view: ViewId, template: Option<&TemplateFn>, components: &[usize]) -> Result<()> {
        if let Some(template) = template {
            template(self, RenderFlags::UPDATE)?;
        }
        for child in self.embedded_views(view)? {
            if self.is_refreshable(child) {
                self.refresh_view(child)?;
            }
        }
        for &index in components {
            if let Some(child) = self.component_view_at(view, index)?
                && self.is_refreshable(child)
            {
                self.refresh_view(child)?;
            }
        }
        Ok(())
    }

    fn is_refreshable(&self, view: ViewId) -> bool {
        self.lview(view)
            .is_ok_and(|l| l.flags.contains(LViewFlags::ATTACHED) && !l.flags.contains(LViewFlags::DESTROYED))
    }

    /// Views attached to the containers of `view`, in slot and container order.
    fn embedded_views(&self, view: ViewId) -> Result<Vec<ViewId>> {
        Ok(self
            .lview(view)?
            .data
            .iter()
            .filter_map(|slot| match slot {
                Slot::Container(container) => Some(container.views.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect())
    }

    /// Refresh `view`; when verification is on, refresh it again and fail
    /// if any binding changed in between.
    pub fn detect_changes(&mut self, view: ViewId) -> Result<()> {
        self.refresh_view(view)?;
        if self.config.check_no_changes {
            self.check_no_changes(view)?;
        }
        Ok(())
    }

    /// Verification pass: refresh without writing, failing on the first changed binding.
    pub fn check_no_changes(&mut self, view: ViewId) -> Result<()> {
        let previous = std::mem::replace(&mut self.state.check_no_changes, true);
        let result = self.refresh_view(view);
        self.state.check_no_changes = previous;
        result
    }
}
