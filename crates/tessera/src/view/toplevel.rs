use super::ViewId;
use crate::geometry::Size;

/// Per-toplevel state kept on its view node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToplevelState {
    /// Unique among toplevels on the stack. Blank ids get one assigned by `begin`.
    pub id: String,
    pub running: bool,
    pub modal: bool,
    pub is_overlapped_container: bool,
    /// Frame follows the screen size
    pub fills_screen: bool,
}

/// How a toplevel is created
#[derive(Debug, Clone, Default)]
pub struct ToplevelOptions {
    pub id: String,
    pub modal: bool,
    pub is_overlapped_container: bool,
}

impl ToplevelOptions {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn modal(mut self, modal: bool) -> Self {
        self.modal = modal;
        self
    }

    pub fn overlapped_container(mut self, container: bool) -> Self {
        self.is_overlapped_container = container;
        self
    }

    pub(crate) fn into_state(self) -> ToplevelState {
        ToplevelState {
            id: self.id,
            running: false,
            modal: self.modal,
            is_overlapped_container: self.is_overlapped_container,
            fills_screen: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToplevelClosingArgs {
    pub toplevel: ViewId,
    pub cancel: bool,
}

impl ToplevelClosingArgs {
    pub fn new(toplevel: ViewId) -> Self {
        Self {
            toplevel,
            cancel: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleChangingArgs {
    /// Requested visibility
    pub visible: bool,
    pub cancel: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeChangedArgs {
    pub size: Size,
    pub cancel: bool,
}
