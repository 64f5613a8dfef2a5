//! Mouse events as routed through the view hierarchy

use crate::geometry::Point;
use crate::view::ViewId;
use crossterm::event::{KeyModifiers, MouseButton, MouseEventKind};

/// A mouse event.
///
/// `screen_position` never changes while routing; `position` is rewritten
/// into the viewport of whichever view is receiving the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub modifiers: KeyModifiers,
    pub screen_position: Point,
    pub position: Point,
    /// View the event is currently addressed to
    pub view: Option<ViewId>,
    pub handled: bool,
}

impl MouseEvent {
    pub fn new(kind: MouseEventKind, screen_position: Point) -> Self {
        Self {
            kind,
            modifiers: KeyModifiers::NONE,
            screen_position,
            position: screen_position,
            view: None,
            handled: false,
        }
    }

    pub fn pressed(button: MouseButton, screen_position: Point) -> Self {
        Self::new(MouseEventKind::Down(button), screen_position)
    }

    pub fn released(button: MouseButton, screen_position: Point) -> Self {
        Self::new(MouseEventKind::Up(button), screen_position)
    }

    pub fn moved(screen_position: Point) -> Self {
        Self::new(MouseEventKind::Moved, screen_position)
    }

    /// Button press of any button
    pub fn is_press(&self) -> bool {
        matches!(self.kind, MouseEventKind::Down(_))
    }

    /// Copy addressed to `view` with a view-relative position
    pub fn relative_to(&self, view: ViewId, position: Point) -> Self {
        Self {
            position,
            view: Some(view),
            handled: false,
            ..*self
        }
    }
}

impl From<crossterm::event::MouseEvent> for MouseEvent {
    fn from(event: crossterm::event::MouseEvent) -> Self {
        let mut me = Self::new(
            event.kind,
            Point::new(i32::from(event.column), i32::from(event.row)),
        );
        me.modifiers = event.modifiers;
        me
    }
}

/// Args for the cancellable grab/ungrab events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrabMouseEventArgs {
    pub view: ViewId,
    pub cancel: bool,
}

impl GrabMouseEventArgs {
    pub fn new(view: ViewId) -> Self {
        Self {
            view,
            cancel: false,
        }
    }
}
