use super::{ToplevelOptions, ToplevelState, View, ViewId};
use crate::error::{AppError, Result};
use crate::geometry::{Point, Rect};
use crate::input::KeyBindings;
use slotmap::SlotMap;
use std::fmt;

/// One view in the arena
pub struct ViewNode {
    pub(crate) behavior: Option<Box<dyn View>>,
    pub(crate) parent: Option<ViewId>,
    pub(crate) children: Vec<ViewId>,
    pub(crate) focused: Option<ViewId>,
    pub(crate) initialized: bool,
    pub(crate) toplevel: Option<ToplevelState>,
    pub(crate) visible: bool,
    /// Relative to the parent's frame; screen coordinates for root views
    pub frame: Rect,
    pub enabled: bool,
    pub can_focus: bool,
    pub needs_display: bool,
    /// Focused and hot-key scoped bindings owned by this view
    pub key_bindings: KeyBindings,
}

impl ViewNode {
    fn new(behavior: Box<dyn View>) -> Self {
        Self {
            behavior: Some(behavior),
            parent: None,
            children: Vec::new(),
            focused: None,
            initialized: false,
            toplevel: None,
            visible: true,
            frame: Rect::default(),
            enabled: true,
            can_focus: false,
            needs_display: true,
            key_bindings: KeyBindings::new(),
        }
    }

    pub fn parent(&self) -> Option<ViewId> {
        self.parent
    }

    pub fn children(&self) -> &[ViewId] {
        &self.children
    }

    /// Child that has focus within this view
    pub fn focused(&self) -> Option<ViewId> {
        self.focused
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn toplevel(&self) -> Option<&ToplevelState> {
        self.toplevel.as_ref()
    }
}

impl fmt::Debug for ViewNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewNode")
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("frame", &self.frame)
            .field("visible", &self.visible)
            .field("toplevel", &self.toplevel)
            .finish_non_exhaustive()
    }
}

/// Arena of views
#[derive(Debug, Default)]
pub struct ViewTree {
    nodes: SlotMap<ViewId, ViewNode>,
}

impl ViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, behavior: Box<dyn View>) -> ViewId {
        self.nodes.insert(ViewNode::new(behavior))
    }

    pub fn insert_toplevel(&mut self, behavior: Box<dyn View>, options: ToplevelOptions) -> ViewId {
        let mut node = ViewNode::new(behavior);
        node.toplevel = Some(options.into_state());
        node.can_focus = true;
        self.nodes.insert(node)
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: ViewId) -> Result<&ViewNode> {
        self.nodes.get(id).ok_or(AppError::StaleView(id))
    }

    pub fn get_mut(&mut self, id: ViewId) -> Result<&mut ViewNode> {
        self.nodes.get_mut(id).ok_or(AppError::StaleView(id))
    }

    pub fn toplevel(&self, id: ViewId) -> Result<&ToplevelState> {
        self.get(id)?.toplevel.as_ref().ok_or(AppError::NotAToplevel(id))
    }

    pub fn toplevel_mut(&mut self, id: ViewId) -> Result<&mut ToplevelState> {
        self.get_mut(id)?
            .toplevel
            .as_mut()
            .ok_or(AppError::NotAToplevel(id))
    }

    pub fn is_toplevel(&self, id: ViewId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.toplevel.is_some())
    }

    pub fn is_modal(&self, id: ViewId) -> bool {
        self.toplevel(id).is_ok_and(|t| t.modal)
    }

    pub fn is_running(&self, id: ViewId) -> bool {
        self.toplevel(id).is_ok_and(|t| t.running)
    }

    pub fn is_overlapped_container(&self, id: ViewId) -> bool {
        self.toplevel(id).is_ok_and(|t| t.is_overlapped_container)
    }

    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: ViewId) -> Vec<ViewId> {
        self.nodes
            .get(id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Attach `child` as the last child of `parent`, detaching it from any
    /// previous parent.
    pub fn add_child(&mut self, parent: ViewId, child: ViewId) -> Result<()> {
        self.get(parent)?;
        self.get(child)?;
        if parent == child || self.is_in_subtree(parent, child) {
            return Err(AppError::InvalidParent { parent, child });
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
            node.needs_display = true;
        }
        Ok(())
    }

    fn detach(&mut self, child: ViewId) {
        let Some(parent) = self.parent(child) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|c| *c != child);
            if node.focused == Some(child) {
                node.focused = None;
            }
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = None;
        }
    }

    /// Remove `id` and its whole subtree. Outstanding handles become stale.
    pub fn remove(&mut self, id: ViewId) -> Result<Vec<ViewId>> {
        self.get(id)?;
        self.detach(id);
        let removed = self.subtree(id);
        for view in &removed {
            self.nodes.remove(*view);
        }
        Ok(removed)
    }

    /// `id` followed by its descendants, depth-first
    pub fn subtree(&self, id: ViewId) -> Vec<ViewId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(view) = stack.pop() {
            let Some(node) = self.nodes.get(view) else {
                continue;
            };
            out.push(view);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Whether `id` is `root` or one of its descendants
    pub fn is_in_subtree(&self, id: ViewId, root: ViewId) -> bool {
        let mut cursor = Some(id);
        while let Some(view) = cursor {
            if view == root {
                return true;
            }
            cursor = self.parent(view);
        }
        false
    }

    /// The root of the hierarchy `id` belongs to
    pub fn root(&self, id: ViewId) -> ViewId {
        let mut view = id;
        while let Some(parent) = self.parent(view) {
            view = parent;
        }
        view
    }

    /// Frame in screen coordinates
    pub fn screen_frame(&self, id: ViewId) -> Result<Rect> {
        let node = self.get(id)?;
        let mut location = node.frame.location();
        let mut cursor = node.parent;
        while let Some(parent) = cursor {
            let p = self.get(parent)?;
            location = location.offset(p.frame.x, p.frame.y);
            cursor = p.parent;
        }
        Ok(node.frame.with_location(location))
    }

    /// Screen point relative to `id`'s frame
    pub fn screen_to_view(&self, id: ViewId, point: Point) -> Result<Point> {
        let frame = self.screen_frame(id)?;
        Ok(Point::new(point.x - frame.x, point.y - frame.y))
    }

    /// Whether `id` and all its ancestors are visible
    pub fn is_shown(&self, id: ViewId) -> bool {
        let mut cursor = Some(id);
        while let Some(view) = cursor {
            match self.nodes.get(view) {
                Some(node) if node.visible => cursor = node.parent,
                _ => return false,
            }
        }
        true
    }

    /// Deepest visible view under a screen point, starting at `root`
    pub fn view_at(&self, root: ViewId, point: Point) -> Option<ViewId> {
        let node = self.nodes.get(root)?;
        if !node.visible {
            return None;
        }
        let frame = self.screen_frame(root).ok()?;
        if !frame.contains(point) {
            return None;
        }
        // later children are drawn on top
        node.children
            .iter()
            .rev()
            .find_map(|child| self.view_at(*child, point))
            .or(Some(root))
    }

    /// `root`, its focused child, that child's focused child, and so on
    pub fn focus_chain(&self, root: ViewId) -> Vec<ViewId> {
        let mut chain = Vec::new();
        let mut cursor = Some(root);
        while let Some(view) = cursor {
            let Some(node) = self.nodes.get(view) else {
                break;
            };
            chain.push(view);
            cursor = node.focused;
        }
        chain
    }

    /// Deepest view of the focus chain below `root`, if any has focus
    pub fn most_focused(&self, root: ViewId) -> Option<ViewId> {
        let chain = self.focus_chain(root);
        if chain.len() > 1 {
            chain.last().copied()
        } else {
            None
        }
    }

    pub fn can_receive_focus(&self, id: ViewId) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|n| n.can_focus && n.visible && n.enabled)
    }

    /// Focusable descendants of `root` in depth-first order. Hidden or
    /// disabled views hide their whole subtree.
    pub fn tab_order(&self, root: ViewId) -> Vec<ViewId> {
        let mut out = Vec::new();
        self.collect_tab_order(root, &mut out);
        out
    }

    fn collect_tab_order(&self, view: ViewId, out: &mut Vec<ViewId>) {
        let Some(node) = self.nodes.get(view) else {
            return;
        };
        for child in &node.children {
            let Some(c) = self.nodes.get(*child) else {
                continue;
            };
            if !c.visible || !c.enabled {
                continue;
            }
            if c.can_focus {
                out.push(*child);
            }
            self.collect_tab_order(*child, out);
        }
    }

    /// Make `id` the focused view along its ancestor chain
    pub fn set_focus_path(&mut self, id: ViewId) -> Result<()> {
        self.get(id)?;
        let mut child = id;
        while let Some(parent) = self.parent(child) {
            self.get_mut(parent)?.focused = Some(child);
            child = parent;
        }
        Ok(())
    }

    pub fn set_needs_display(&mut self, id: ViewId) {
        for view in self.subtree(id) {
            if let Some(node) = self.nodes.get_mut(view) {
                node.needs_display = true;
            }
        }
    }

    pub fn any_needs_display(&self, roots: &[ViewId]) -> bool {
        roots
            .iter()
            .flat_map(|root| self.subtree(*root))
            .any(|view| self.nodes.get(view).is_some_and(|n| n.visible && n.needs_display))
    }

    pub fn ids(&self) -> impl Iterator<Item = ViewId> + '_ {
        self.nodes.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::Container;

    fn tree() -> (ViewTree, ViewId, ViewId, ViewId) {
        let mut tree = ViewTree::new();
        let root = tree.insert(Box::new(Container));
        let panel = tree.insert(Box::new(Container));
        let leaf = tree.insert(Box::new(Container));
        tree.get_mut(root).unwrap().frame = Rect::new(0, 0, 80, 25);
        tree.get_mut(panel).unwrap().frame = Rect::new(10, 5, 20, 10);
        tree.get_mut(leaf).unwrap().frame = Rect::new(2, 1, 5, 1);
        tree.add_child(root, panel).unwrap();
        tree.add_child(panel, leaf).unwrap();
        (tree, root, panel, leaf)
    }

    #[test]
    fn screen_frame_accumulates_parent_offsets() {
        let (tree, _, _, leaf) = tree();
        assert_eq!(tree.screen_frame(leaf).unwrap(), Rect::new(12, 6, 5, 1));
        assert_eq!(
            tree.screen_to_view(leaf, Point::new(13, 6)).unwrap(),
            Point::new(1, 0)
        );
    }

    #[test]
    fn view_at_finds_deepest() {
        let (tree, root, panel, leaf) = tree();
        assert_eq!(tree.view_at(root, Point::new(13, 6)), Some(leaf));
        assert_eq!(tree.view_at(root, Point::new(11, 12)), Some(panel));
        assert_eq!(tree.view_at(root, Point::new(0, 0)), Some(root));
        assert_eq!(tree.view_at(root, Point::new(90, 0)), None);
    }

    #[test]
    fn removed_subtree_handles_are_stale() {
        let (mut tree, _, panel, leaf) = tree();
        let removed = tree.remove(panel).unwrap();
        assert_eq!(removed, vec![panel, leaf]);
        assert!(matches!(tree.get(leaf), Err(AppError::StaleView(id)) if id == leaf));
    }

    #[test]
    fn tab_order_skips_hidden_subtrees() {
        let (mut tree, root, panel, leaf) = tree();
        tree.get_mut(panel).unwrap().can_focus = true;
        tree.get_mut(leaf).unwrap().can_focus = true;
        assert_eq!(tree.tab_order(root), vec![panel, leaf]);

        tree.get_mut(panel).unwrap().visible = false;
        assert!(tree.tab_order(root).is_empty());
    }

    #[test]
    fn focus_path_sets_every_ancestor() {
        let (mut tree, root, panel, leaf) = tree();
        tree.set_focus_path(leaf).unwrap();
        assert_eq!(tree.focus_chain(root), vec![root, panel, leaf]);
        assert_eq!(tree.most_focused(root), Some(leaf));
    }

    #[test]
    fn cannot_parent_a_view_under_itself() {
        let (mut tree, root, _, leaf) = tree();
        assert!(matches!(
            tree.add_child(leaf, root),
            Err(AppError::InvalidParent { .. })
        ));
    }
}
