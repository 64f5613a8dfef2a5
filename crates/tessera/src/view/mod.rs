//! Views and the arena that owns them
//!
//! Views live in a [`ViewTree`] and are addressed by generational
//! [`ViewId`] handles. A handle to a removed view is detected, not
//! dereferenced: lookups return [`AppError::StaleView`](crate::AppError::StaleView).
//!
//! Behavior is supplied by a [`View`] trait object. While one of its hooks
//! runs, the object is taken out of the arena, so the hook can freely use
//! the whole [`Application`] through its [`EventContext`].

mod canvas;
mod toplevel;
mod tree;

pub use canvas::Canvas;
pub use toplevel::{SizeChangedArgs, ToplevelClosingArgs, ToplevelOptions, ToplevelState, VisibleChangingArgs};
pub use tree::{ViewNode, ViewTree};

use crate::application::Application;
use crate::geometry::Point;
use crate::input::{Command, Key, MouseEvent};
use slotmap::Key as _;
use std::fmt;

slotmap::new_key_type! {
    /// Handle to a view in a [`ViewTree`]
    pub struct ViewId;
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{:?}", self.data())
    }
}

/// Access to the application from inside a view hook
pub struct EventContext<'a> {
    pub app: &'a mut Application,
    /// View whose hook is running
    pub view: ViewId,
}

/// View behavior. Every hook has a no-op default.
///
/// Key and mouse hooks return `true` when they handled the input, which
/// stops further routing.
#[allow(unused_variables)]
pub trait View: 'static {
    fn on_key_down(&mut self, cx: &mut EventContext<'_>, key: Key) -> bool {
        false
    }

    fn on_key_up(&mut self, cx: &mut EventContext<'_>, key: Key) -> bool {
        false
    }

    /// `event.position` is relative to this view
    fn on_mouse_event(&mut self, cx: &mut EventContext<'_>, event: &mut MouseEvent) -> bool {
        false
    }

    fn on_mouse_enter(&mut self, cx: &mut EventContext<'_>) {}

    fn on_mouse_leave(&mut self, cx: &mut EventContext<'_>) {}

    /// Run a command from one of this view's bindings. `None` means the view
    /// does not implement it.
    fn invoke_command(&mut self, cx: &mut EventContext<'_>, command: Command) -> Option<bool> {
        None
    }

    /// Paint in view-local coordinates
    fn draw(&mut self, canvas: &mut Canvas<'_>) {}

    /// Where the cursor goes while this view has focus, view-local
    fn position_cursor(&self) -> Option<Point> {
        None
    }

    fn on_initialized(&mut self, cx: &mut EventContext<'_>) {}

    fn on_loaded(&mut self, cx: &mut EventContext<'_>) {}

    /// First iteration of the toplevel's run loop
    fn on_ready(&mut self, cx: &mut EventContext<'_>) {}

    fn on_unloaded(&mut self, cx: &mut EventContext<'_>) {}

    /// Set `args.cancel` to keep the toplevel running
    fn on_closing(&mut self, cx: &mut EventContext<'_>, args: &mut ToplevelClosingArgs) {}

    fn on_closed(&mut self, cx: &mut EventContext<'_>) {}

    fn on_activate(&mut self, cx: &mut EventContext<'_>, deactivated: Option<ViewId>) {}

    fn on_deactivate(&mut self, cx: &mut EventContext<'_>, activated: Option<ViewId>) {}

    /// Set `args.cancel` to veto a visibility change
    fn on_visible_changing(&mut self, cx: &mut EventContext<'_>, args: &mut VisibleChangingArgs) {}
}

/// View with no behavior of its own, for plain containers
#[derive(Debug, Default)]
pub struct Container;

impl View for Container {}
