//! Mouse routing, grab and popover handling

use super::Application;
use crate::error::{AppError, Result};
use crate::geometry::Point;
use crate::input::{GrabMouseEventArgs, MouseEvent};
use crate::view::{ViewId, VisibleChangingArgs};

/// Passes of the routing for one driver event. The second pass is the
/// redispatch after a popover was dismissed and never dismisses again.
const MAX_ROUTING_DEPTH: u8 = 1;

impl Application {
    /// Route a mouse event from the driver. Returns whether a view handled it.
    pub fn on_mouse_event(&mut self, event: MouseEvent) -> Result<bool> {
        self.route_mouse(event, 0)
    }

    fn route_mouse(&mut self, mut event: MouseEvent, depth: u8) -> Result<bool> {
        self.last_mouse_position = Some(event.screen_position);
        if !self.mouse_enabled {
            return Ok(false);
        }

        self.events.mouse_event.raise(&mut event);
        if event.handled {
            return Ok(true);
        }

        let under = self.view_under(event.screen_position);

        if let Some(popover) = self.popover {
            let inside = under.is_some_and(|v| self.views.is_in_subtree(v, popover));
            if event.is_press()
                && !inside
                && depth < MAX_ROUTING_DEPTH
                && self.views.get(popover).is_ok_and(|n| n.is_visible())
                && self.set_visible(popover, false)?
            {
                tracing::debug!(%popover, "press outside popover, dismissed");
                let mut again = event;
                again.handled = false;
                return self.route_mouse(again, depth + 1);
            }
        }

        let grab = self.mouse_grab_view;
        if let Some(grab) = grab {
            if self.route_to_grab(grab, &event)? {
                return Ok(true);
            }
        }

        let Some(deepest) = under else {
            self.update_hover(&[])?;
            return Ok(false);
        };

        let mut chain = Vec::new();
        let mut cursor = Some(deepest);
        while let Some(view) = cursor {
            chain.push(view);
            cursor = self.views.parent(view);
        }
        chain.reverse();
        self.update_hover(&chain)?;

        let mut cursor = Some(deepest);
        while let Some(view) = cursor {
            if Some(view) != grab && self.deliver_mouse(view, &event)? {
                return Ok(true);
            }
            if self.mouse_grab_view.is_some() {
                break;
            }
            cursor = self.views.parent(view);
        }
        Ok(false)
    }

    /// Deliver to the grab view in its own coordinates. A declined event
    /// falls through to normal routing; the grab stays.
    fn route_to_grab(&mut self, grab: ViewId, event: &MouseEvent) -> Result<bool> {
        let Ok(frame) = self.views.screen_frame(grab) else {
            self.mouse_grab_view = None;
            return Ok(false);
        };
        if !frame.contains(event.screen_position) && self.mouse_enter_views.contains(&grab) {
            self.mouse_enter_views.retain(|v| *v != grab);
            self.with_view(grab, (), |v, cx| v.on_mouse_leave(cx))?;
        }
        self.deliver_mouse(grab, event)
    }

    fn deliver_mouse(&mut self, view: ViewId, event: &MouseEvent) -> Result<bool> {
        let node = self.views.get(view)?;
        if !node.enabled {
            return Ok(false);
        }
        let local = self.views.screen_to_view(view, event.screen_position)?;
        let mut me = event.relative_to(view, local);
        let handled = self.with_view(view, false, |v, cx| v.on_mouse_event(cx, &mut me))?;
        Ok(handled || me.handled)
    }

    /// Raise leave for views no longer under the mouse, then enter for views
    /// newly under it. `chain` runs outermost first.
    fn update_hover(&mut self, chain: &[ViewId]) -> Result<()> {
        let leaving: Vec<ViewId> = self
            .mouse_enter_views
            .iter()
            .rev()
            .filter(|v| !chain.contains(v))
            .copied()
            .collect();
        for view in leaving {
            self.mouse_enter_views.retain(|v| *v != view);
            if self.views.contains(view) {
                self.with_view(view, (), |v, cx| v.on_mouse_leave(cx))?;
            }
        }

        for view in chain {
            if self.mouse_enter_views.contains(view) {
                continue;
            }
            self.mouse_enter_views.push(*view);
            self.with_view(*view, (), |v, cx| v.on_mouse_enter(cx))?;
        }
        Ok(())
    }

    /// Deepest view under a screen point: the popover first, then toplevels
    /// from the top. A modal toplevel hides everything beneath it.
    pub fn view_under(&self, point: Point) -> Option<ViewId> {
        if let Some(popover) = self.popover {
            if let Some(view) = self.views.view_at(popover, point) {
                return Some(view);
            }
        }
        for toplevel in self.toplevels.iter().rev() {
            if let Some(view) = self.views.view_at(*toplevel, point) {
                return Some(view);
            }
            if self.views.is_modal(*toplevel) {
                break;
            }
        }
        None
    }

    /// Route every mouse event to `view` until [`ungrab_mouse`](Self::ungrab_mouse).
    ///
    /// Returns `Ok(false)` if a `grabbing_mouse` subscriber cancelled.
    /// Grabbing while another view holds the grab is an error and leaves the
    /// grab where it is.
    pub fn grab_mouse(&mut self, view: ViewId) -> Result<bool> {
        self.views.get(view)?;
        match self.mouse_grab_view {
            Some(holder) if holder == view => return Ok(true),
            Some(holder) if self.views.contains(holder) => {
                return Err(AppError::MouseAlreadyGrabbed {
                    holder,
                    requested: view,
                });
            }
            _ => {}
        }

        let mut args = GrabMouseEventArgs::new(view);
        self.events.grabbing_mouse.raise(&mut args);
        if args.cancel {
            tracing::debug!(%view, "grab cancelled");
            return Ok(false);
        }

        self.mouse_grab_view = Some(view);
        let mut grabbed = view;
        self.events.grabbed_mouse.raise(&mut grabbed);
        tracing::debug!(%view, "mouse grabbed");
        Ok(true)
    }

    /// Release the grab. `false` if nothing was grabbed or a subscriber cancelled.
    pub fn ungrab_mouse(&mut self) -> bool {
        let Some(view) = self.mouse_grab_view else {
            return false;
        };

        let mut args = GrabMouseEventArgs::new(view);
        self.events.ungrabbing_mouse.raise(&mut args);
        if args.cancel {
            return false;
        }

        self.mouse_grab_view = None;
        let mut released = view;
        self.events.ungrabbed_mouse.raise(&mut released);
        tracing::debug!(%view, "mouse ungrabbed");
        true
    }

    /// Show `view` as the popover, drawn above every toplevel. `None` hides it.
    pub fn set_popover(&mut self, view: Option<ViewId>) -> Result<()> {
        if let Some(old) = self.popover {
            if Some(old) != view && self.views.contains(old) {
                self.views.get_mut(old)?.visible = false;
            }
        }
        if let Some(view) = view {
            let node = self.views.get_mut(view)?;
            node.visible = true;
            self.views.set_needs_display(view);
        }
        self.popover = view;
        self.set_stack_needs_display();
        Ok(())
    }

    /// Change visibility through the view's cancellable hook.
    ///
    /// Returns whether the view ends up with the requested visibility.
    pub fn set_visible(&mut self, view: ViewId, visible: bool) -> Result<bool> {
        if self.views.get(view)?.is_visible() == visible {
            return Ok(true);
        }

        let mut args = VisibleChangingArgs {
            visible,
            cancel: false,
        };
        self.with_view(view, (), |v, cx| v.on_visible_changing(cx, &mut args))?;
        if args.cancel {
            return Ok(false);
        }

        self.views.get_mut(view)?.visible = visible;
        if visible {
            self.views.set_needs_display(view);
        } else {
            let hidden = self.views.subtree(view);
            self.mouse_enter_views.retain(|v| !hidden.contains(v));
        }
        self.set_stack_needs_display();
        Ok(true)
    }

    pub(super) fn set_stack_needs_display(&mut self) {
        for toplevel in self.toplevels.clone() {
            self.views.set_needs_display(toplevel);
        }
    }
}
