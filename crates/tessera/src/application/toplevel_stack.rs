//! Toplevel stack: begin, run, stop, end
//!
//! `begin` pushes a toplevel and hands back a [`RunState`]; `run_loop`
//! iterates the main loop while the toplevel is running; `end` pops it.
//! `end` must be called in reverse order of `begin`.

use super::Application;
use crate::error::{AppError, Result};
use crate::geometry::{Rect, Size};
use crate::main_loop::{LoopHost, MainLoop};
use crate::view::{Canvas, SizeChangedArgs, ToplevelClosingArgs, ViewId};

/// Token tying a `begin` to its `end`
#[derive(Debug, PartialEq, Eq)]
pub struct RunState {
    toplevel: Option<ViewId>,
    previous_top: Option<ViewId>,
}

impl RunState {
    /// The toplevel, until `end` clears it
    pub fn toplevel(&self) -> Option<ViewId> {
        self.toplevel
    }
}

impl Application {
    /// Push `toplevel` onto the stack and prepare it to run.
    pub fn begin(&mut self, toplevel: ViewId) -> Result<RunState> {
        if !self.initialized {
            return Err(AppError::NotInitialized);
        }
        self.views.toplevel(toplevel)?;

        if !self.views.get(toplevel)?.is_initialized() {
            self.views.get_mut(toplevel)?.initialized = true;
            self.with_view(toplevel, (), |v, cx| v.on_initialized(cx))?;
        }

        self.assign_toplevel_id(toplevel)?;
        let previous_top = self.top;
        self.toplevels.push(toplevel);

        if self.top.is_none() || self.views.is_overlapped_container(toplevel) {
            self.top = Some(toplevel);
        }

        let blocked_by_modal = self.top.is_some_and(|t| self.views.is_overlapped_container(t))
            && self.current.is_some_and(|c| self.views.is_modal(c))
            && !self.views.is_modal(toplevel);
        if blocked_by_modal {
            // keep the modal on top of the stack
            if let Some(current) = self.current {
                self.toplevels.retain(|t| *t != current);
                self.toplevels.push(current);
            }
        } else if self.views.get(toplevel)?.is_visible() {
            self.activate(toplevel)?;
        }

        let screen = self.screen;
        let node = self.views.get_mut(toplevel)?;
        if node.frame.is_empty() {
            node.frame = screen;
            if let Some(state) = node.toplevel.as_mut() {
                state.fills_screen = true;
            }
        }

        self.ensure_focus(toplevel)?;
        self.with_view(toplevel, (), |v, cx| v.on_loaded(cx))?;
        self.views.set_needs_display(toplevel);
        self.refresh()?;

        let mut id = toplevel;
        self.events.new_run_state.raise(&mut id);
        tracing::debug!(%toplevel, depth = self.toplevels.len(), "begin");
        Ok(RunState {
            toplevel: Some(toplevel),
            previous_top,
        })
    }

    fn toplevel_id(&self, view: ViewId) -> Option<&str> {
        self.views.toplevel(view).ok().map(|t| t.id.as_str())
    }

    /// Give a blank id the first free number past the stack depth; reject
    /// an id already on the stack.
    fn assign_toplevel_id(&mut self, toplevel: ViewId) -> Result<()> {
        let id = self.views.toplevel(toplevel)?.id.clone();
        if id.is_empty() {
            let mut n = self.toplevels.len() + 1;
            let id = loop {
                let candidate = n.to_string();
                if !self
                    .toplevels
                    .iter()
                    .any(|t| self.toplevel_id(*t) == Some(candidate.as_str()))
                {
                    break candidate;
                }
                n += 1;
            };
            self.views.toplevel_mut(toplevel)?.id = id;
            return Ok(());
        }

        if self.toplevels.contains(&toplevel)
            || self
                .toplevels
                .iter()
                .any(|t| self.toplevel_id(*t) == Some(id.as_str()))
        {
            return Err(AppError::DuplicateToplevelId(id));
        }
        Ok(())
    }

    /// Make `toplevel` current, notifying the one it replaces
    fn activate(&mut self, toplevel: ViewId) -> Result<()> {
        let previous = self.current;
        if previous == Some(toplevel) {
            return Ok(());
        }
        if let Some(previous) = previous.filter(|p| self.views.contains(*p)) {
            self.with_view(previous, (), |v, cx| v.on_deactivate(cx, Some(toplevel)))?;
        }
        self.current = Some(toplevel);
        self.with_view(toplevel, (), |v, cx| v.on_activate(cx, previous))?;
        Ok(())
    }

    /// Iterate until the toplevel stops, then run one more iteration to
    /// drain input that arrived meanwhile.
    pub fn run_loop(&mut self, state: &mut RunState) -> Result<()> {
        let toplevel = state.toplevel.ok_or(AppError::RunStateEnded)?;
        self.views.toplevel_mut(toplevel)?.running = true;
        // a nested run hands the flag back to the run it interrupted
        let outer_running = self.main_loop()?.is_running();
        self.main_loop()?.set_running(true);

        let mut first_iteration = true;
        while self.views.is_running(toplevel) {
            if self.end_after_first_iteration && !first_iteration {
                return Ok(());
            }
            self.run_iteration(state, &mut first_iteration)?;
        }

        self.main_loop()?.set_running(outer_running);
        MainLoop::run_iteration(self)?;
        self.draw_pending()?;
        Ok(())
    }

    /// One main loop iteration for `state`, followed by drawing whatever
    /// needs it and placing the cursor.
    pub fn run_iteration(&mut self, state: &mut RunState, first_iteration: &mut bool) -> Result<()> {
        let toplevel = state.toplevel.ok_or(AppError::RunStateEnded)?;
        if self.main_loop()?.events_pending()? {
            if *first_iteration {
                self.with_view(toplevel, (), |v, cx| v.on_ready(cx))?;
            }
            MainLoop::run_iteration(self)?;
            self.events.iteration.raise(&mut ());
        }
        *first_iteration = false;
        self.draw_pending()
    }

    fn draw_pending(&mut self) -> Result<()> {
        if !self.initialized {
            return Ok(());
        }
        let mut roots = self.toplevels.clone();
        roots.extend(self.popover);
        if self.views.any_needs_display(&roots) {
            self.refresh()?;
        } else {
            self.position_cursor()?;
        }
        Ok(())
    }

    /// Ask a toplevel to stop running. `None` means the current toplevel.
    ///
    /// A modal current toplevel is stopped in place of a non-modal target.
    /// Returns `Ok(false)` when there was nothing to stop or a closing hook
    /// or subscriber cancelled.
    pub fn request_stop(&mut self, toplevel: Option<ViewId>) -> Result<bool> {
        let current = self.current;
        let Some(target) = toplevel.or(current) else {
            return Ok(false);
        };

        if let Some(current) = current.filter(|c| *c != target) {
            let both_modal = self.views.is_modal(current) && self.views.is_modal(target);
            if both_modal && self.views.is_running(current) && self.views.is_running(target) {
                if !self.confirm_close(current)? || !self.confirm_close(target)? {
                    return Ok(false);
                }
                self.stop_toplevel(current)?;
                self.stop_toplevel(target)?;
                return Ok(true);
            }
        }

        let stopping = match current {
            Some(c) if self.views.is_modal(c) && !self.views.is_modal(target) => c,
            _ => target,
        };
        if !self.views.is_running(stopping) {
            return Ok(false);
        }
        if !self.confirm_close(stopping)? {
            tracing::debug!(toplevel = %stopping, "stop cancelled");
            return Ok(false);
        }
        self.stop_toplevel(stopping)?;
        Ok(true)
    }

    fn confirm_close(&mut self, toplevel: ViewId) -> Result<bool> {
        let mut args = ToplevelClosingArgs::new(toplevel);
        self.with_view(toplevel, (), |v, cx| v.on_closing(cx, &mut args))?;
        if !args.cancel {
            self.events.toplevel_closing.raise(&mut args);
        }
        Ok(!args.cancel)
    }

    fn stop_toplevel(&mut self, toplevel: ViewId) -> Result<()> {
        self.views.toplevel_mut(toplevel)?.running = false;
        let mut id = toplevel;
        self.events.stop_run_state.raise(&mut id);
        self.wakeup();
        tracing::debug!(%toplevel, "stop requested");
        Ok(())
    }

    /// Pop the toplevel of `state`, which must be the top of the stack.
    pub fn end(&mut self, state: &mut RunState) -> Result<()> {
        let toplevel = state.toplevel.ok_or(AppError::RunStateEnded)?;
        let top_of_stack = self.toplevels.last().copied();
        if top_of_stack != Some(toplevel) {
            return Err(AppError::UnbalancedEnd {
                expected: top_of_stack,
                actual: toplevel,
            });
        }

        if let Some(popover) = self.popover {
            if let Ok(node) = self.views.get_mut(popover) {
                node.visible = false;
            }
        }

        self.toplevels.pop();
        self.views.toplevel_mut(toplevel)?.running = false;
        self.with_view(toplevel, (), |v, cx| v.on_unloaded(cx))?;
        self.with_view(toplevel, (), |v, cx| v.on_closed(cx))?;

        let popped = self.views.subtree(toplevel);
        if self.mouse_grab_view.is_some_and(|g| popped.contains(&g)) {
            self.mouse_grab_view = None;
        }
        self.mouse_enter_views.retain(|v| !popped.contains(v));

        let previous_current = self.current.take();
        if let Some(next) = self.toplevels.last().copied() {
            self.current = Some(next);
            if previous_current != Some(next) {
                self.with_view(next, (), |v, cx| v.on_activate(cx, Some(toplevel)))?;
            }
        }
        self.top = match state.previous_top {
            Some(previous) if self.toplevels.contains(&previous) => Some(previous),
            _ => self.toplevels.first().copied(),
        };

        state.toplevel = None;
        tracing::debug!(%toplevel, depth = self.toplevels.len(), "end");
        self.set_stack_needs_display();
        self.refresh()
    }

    /// `begin`, `run_loop`, `end`
    pub fn run(&mut self, toplevel: ViewId) -> Result<()> {
        self.run_with_handler(toplevel, |_| false)
    }

    /// Like [`run`](Self::run), passing errors from the loop to `handler`.
    /// `true` resumes the loop; `false` ends the toplevel and returns the error.
    pub fn run_with_handler(
        &mut self,
        toplevel: ViewId,
        mut handler: impl FnMut(&AppError) -> bool,
    ) -> Result<()> {
        let mut state = self.begin(toplevel)?;
        loop {
            match self.run_loop(&mut state) {
                Ok(()) => break,
                Err(e) if handler(&e) => {
                    tracing::warn!(error = %e, category = e.category(), "run loop error, resuming");
                }
                Err(e) => {
                    if state.toplevel.is_some() && !self.end_after_first_iteration {
                        if let Err(end_error) = self.end(&mut state) {
                            tracing::warn!(error = %end_error, "end after run loop error failed");
                        }
                    }
                    return Err(e);
                }
            }
        }
        if self.end_after_first_iteration {
            return Ok(());
        }
        self.end(&mut state)
    }

    /// Redraw every toplevel bottom-up, then the popover, and place the cursor
    pub fn refresh(&mut self) -> Result<()> {
        let Some(driver) = self.driver.as_mut() else {
            return Ok(());
        };
        driver.clear();
        let screen = self.screen;
        for toplevel in self.toplevels.clone() {
            self.draw_view(toplevel, screen)?;
        }
        if let Some(popover) = self.popover {
            self.draw_view(popover, screen)?;
        }
        self.driver_mut()?.update_screen()?;
        self.position_cursor()
    }

    fn draw_view(&mut self, view: ViewId, clip: Rect) -> Result<()> {
        let node = self.views.get(view)?;
        if !node.is_visible() {
            return Ok(());
        }
        let children = node.children().to_vec();
        let frame = self.views.screen_frame(view)?;
        let clip = clip.intersect(&frame);

        let node = self.views.get_mut(view)?;
        node.needs_display = false;
        if let Some(driver) = self.driver.as_mut() {
            if let Some(mut behavior) = node.behavior.take() {
                let mut canvas = Canvas::new(driver.as_mut(), frame, clip);
                behavior.draw(&mut canvas);
                node.behavior = Some(behavior);
            }
        }

        for child in children {
            self.draw_view(child, clip)?;
        }
        Ok(())
    }

    /// Put the driver cursor where the focused view wants it, or hide it
    pub fn position_cursor(&mut self) -> Result<()> {
        let target = match self.focused_view().or(self.current) {
            Some(view) => {
                let local = self
                    .views
                    .get(view)?
                    .behavior
                    .as_ref()
                    .and_then(|b| b.position_cursor());
                match local {
                    Some(local) => {
                        let frame = self.views.screen_frame(view)?;
                        let point = local.offset(frame.x, frame.y);
                        frame.contains(point).then_some(point)
                    }
                    None => None,
                }
            }
            None => None,
        };
        if let Some(driver) = self.driver.as_mut() {
            driver.set_cursor_position(target);
        }
        Ok(())
    }

    /// Screen size changed. Returns `false` if a `size_changing` subscriber
    /// cancelled the relayout.
    pub fn on_size_changed(&mut self, size: Size) -> Result<bool> {
        let mut args = SizeChangedArgs {
            size,
            cancel: false,
        };
        self.events.size_changing.raise(&mut args);
        if args.cancel {
            return Ok(false);
        }

        self.screen = Rect::from_size(size);
        for toplevel in self.toplevels.clone() {
            let node = self.views.get_mut(toplevel)?;
            if node.toplevel.as_ref().is_some_and(|t| t.fills_screen) {
                node.frame = Rect::from_size(size);
            }
        }
        tracing::debug!(width = size.width, height = size.height, "screen resized");
        self.set_stack_needs_display();
        self.refresh()?;
        Ok(true)
    }
}
