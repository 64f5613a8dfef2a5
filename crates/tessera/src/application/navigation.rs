//! Focus movement inside and across toplevels

use super::Application;
use crate::error::Result;
use crate::view::ViewId;

impl Application {
    /// Focus `view`, making it the focused child all the way up its hierarchy.
    ///
    /// Returns `false` if the view cannot take focus.
    pub fn set_focus(&mut self, view: ViewId) -> Result<bool> {
        self.views.get(view)?;
        if !self.views.can_receive_focus(view) {
            return Ok(false);
        }
        let previous = self.focused_view();
        self.views.set_focus_path(view)?;
        if previous != Some(view) {
            if let Some(previous) = previous {
                if let Ok(node) = self.views.get_mut(previous) {
                    node.needs_display = true;
                }
            }
            self.views.get_mut(view)?.needs_display = true;
            tracing::trace!(%view, "focus");
        }
        Ok(true)
    }

    /// Deepest focused view of the current toplevel
    pub fn focused_view(&self) -> Option<ViewId> {
        self.current.and_then(|c| self.views.most_focused(c))
    }

    /// Focus the first focusable view of `root` if nothing in it has focus
    pub(super) fn ensure_focus(&mut self, root: ViewId) -> Result<()> {
        if self.views.most_focused(root).is_some() {
            return Ok(());
        }
        if let Some(first) = self.views.tab_order(root).first().copied() {
            self.set_focus(first)?;
        }
        Ok(())
    }

    fn move_within(&mut self, root: ViewId, forward: bool) -> Result<bool> {
        let order = self.views.tab_order(root);
        if order.is_empty() {
            return Ok(false);
        }
        let focused = self.views.most_focused(root);
        let index = focused.and_then(|f| order.iter().position(|v| *v == f));
        let next = match (index, forward) {
            (Some(i), true) => (i + 1) % order.len(),
            (Some(i), false) => (i + order.len() - 1) % order.len(),
            (None, true) => 0,
            (None, false) => order.len() - 1,
        };
        self.set_focus(order[next])
    }

    /// Move focus to the next view in tab order of the current toplevel
    pub fn move_next_view(&mut self) -> Result<bool> {
        match self.current {
            Some(current) => self.move_within(current, true),
            None => Ok(false),
        }
    }

    pub fn move_previous_view(&mut self) -> Result<bool> {
        match self.current {
            Some(current) => self.move_within(current, false),
            None => Ok(false),
        }
    }

    /// In an overlapped container, activate the next child toplevel.
    /// Elsewhere, move focus to the next tab group.
    pub fn move_next_view_or_top(&mut self) -> Result<bool> {
        self.move_group(true)
    }

    pub fn move_previous_view_or_top(&mut self) -> Result<bool> {
        self.move_group(false)
    }

    fn move_group(&mut self, forward: bool) -> Result<bool> {
        let Some(current) = self.current else {
            return Ok(false);
        };

        let groups: Vec<ViewId> = if self.views.is_overlapped_container(current) {
            self.views
                .children(current)
                .into_iter()
                .filter(|c| self.views.is_toplevel(*c) && self.views.is_shown(*c))
                .collect()
        } else {
            // direct children that hold something focusable
            self.views
                .children(current)
                .into_iter()
                .filter(|c| {
                    self.views.is_shown(*c)
                        && (self.views.can_receive_focus(*c) || !self.views.tab_order(*c).is_empty())
                })
                .collect()
        };
        if groups.len() < 2 {
            return self.move_within(current, forward);
        }

        let focused = self.views.get(current)?.focused();
        let index = focused.and_then(|f| groups.iter().position(|g| *g == f));
        let next = match (index, forward) {
            (Some(i), true) => (i + 1) % groups.len(),
            (Some(i), false) => (i + groups.len() - 1) % groups.len(),
            (None, true) => 0,
            (None, false) => groups.len() - 1,
        };
        let group = groups[next];

        let target = self
            .views
            .most_focused(group)
            .or_else(|| self.views.tab_order(group).first().copied())
            .unwrap_or(group);
        self.set_focus(target)?;
        tracing::trace!(%group, "moved to group");
        Ok(true)
    }
}
