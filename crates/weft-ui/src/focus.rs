//! Keyboard focus.
//!
//! The manager owns which node is focused; nodes only mirror it in
//! `focus.focused`. Tab order is: positive `tab_index` ascending, then
//! `tab_index == 0` in tree order. Negative indexes stay focusable by id
//! or programmatically but are skipped by Tab. While focus sits inside a
//! node with `trap` set, Tab cycles within that node's subtree.

use tracing::debug;

use crate::error::{Result, UiError};
use crate::node::NodeId;
use crate::style::Display;
use crate::tree::Dom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusConfig {
    /// Deepest tree the traversal accepts.
    pub max_depth: usize,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self { max_depth: 256 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusDirection {
    Next,
    Prev,
    Programmatic,
}

/// What a listener learns about one side of a focus change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusSnapshot {
    pub node: NodeId,
    pub id: Option<String>,
    pub tab_index: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusChange {
    pub old: Option<FocusSnapshot>,
    pub new: Option<FocusSnapshot>,
    pub direction: FocusDirection,
}

pub type FocusListener = Box<dyn FnMut(&FocusChange)>;

pub struct FocusManager {
    config: FocusConfig,
    focused: Option<NodeId>,
    listeners: Vec<FocusListener>,
    render_pending: bool,
}

impl FocusManager {
    #[must_use]
    pub fn new(config: FocusConfig) -> Self {
        Self {
            config,
            focused: None,
            listeners: Vec::new(),
            render_pending: false,
        }
    }

    #[must_use]
    pub const fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Call `listener` after every change.
    pub fn on_change(&mut self, listener: impl FnMut(&FocusChange) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Whether focus changed since the last call.
    pub fn take_render_request(&mut self) -> bool {
        std::mem::replace(&mut self.render_pending, false)
    }

    /// Focusable nodes under `root` in Tab order.
    ///
    /// # Errors
    ///
    /// [`UiError::DepthExceeded`] when the tree is deeper than
    /// [`FocusConfig::max_depth`].
    pub fn tab_order(&self, dom: &Dom, root: NodeId) -> Result<Vec<NodeId>> {
        let mut found = Vec::new();
        let mut stack = vec![(root, 0_usize)];

        while let Some((id, depth)) = stack.pop() {
            if depth > self.config.max_depth {
                return Err(UiError::DepthExceeded {
                    max: self.config.max_depth,
                });
            }
            let Some(node) = dom.get(id) else {
                continue;
            };
            if node.layout_style.display == Display::None {
                continue;
            }
            if node.focus.focusable && node.focus.tab_index >= 0 {
                found.push((node.focus.tab_index, id));
            }
            stack.extend(node.children.iter().rev().map(|&c| (c, depth + 1)));
        }

        // Stable: equal indexes keep tree order.
        found.sort_by_key(|&(tab, _)| (tab == 0, tab));
        Ok(found.into_iter().map(|(_, id)| id).collect())
    }

    /// Root of the region Tab moves within: the nearest trapping ancestor
    /// of the focused node, or `root`.
    fn scope(&self, dom: &Dom, root: NodeId) -> NodeId {
        let Some(mut cursor) = self.focused.filter(|&f| dom.is_ancestor(root, f)) else {
            return root;
        };
        loop {
            if dom.get(cursor).is_some_and(|n| n.focus.trap) || cursor == root {
                return cursor;
            }
            match dom.parent(cursor) {
                Some(parent) => cursor = parent,
                None => return root,
            }
        }
    }

    /// Move to the next node in Tab order, wrapping at the end.
    ///
    /// # Errors
    ///
    /// As [`tab_order`](Self::tab_order).
    pub fn focus_next(&mut self, dom: &mut Dom, root: NodeId) -> Result<Option<NodeId>> {
        self.step(dom, root, FocusDirection::Next)
    }

    /// Move to the previous node in Tab order, wrapping at the start.
    ///
    /// # Errors
    ///
    /// As [`tab_order`](Self::tab_order).
    pub fn focus_prev(&mut self, dom: &mut Dom, root: NodeId) -> Result<Option<NodeId>> {
        self.step(dom, root, FocusDirection::Prev)
    }

    fn step(&mut self, dom: &mut Dom, root: NodeId, direction: FocusDirection) -> Result<Option<NodeId>> {
        self.sync(dom)?;
        let order = self.tab_order(dom, self.scope(dom, root))?;
        if order.is_empty() {
            return Ok(None);
        }
        let len = order.len();
        let current = self.focused.and_then(|f| order.iter().position(|&n| n == f));
        let target = match (direction, current) {
            (FocusDirection::Prev, Some(i)) => (i + len - 1) % len,
            (FocusDirection::Prev, None) => len - 1,
            (_, Some(i)) => (i + 1) % len,
            (_, None) => 0,
        };
        let node = order[target];
        self.set_focus(dom, Some(node), direction)?;
        Ok(Some(node))
    }

    /// Focus the node under `root` whose id is `id`.
    ///
    /// Returns `Ok(false)` when no such node exists or it is not focusable.
    ///
    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale root.
    pub fn focus_by_id(&mut self, dom: &mut Dom, root: NodeId, id: &str) -> Result<bool> {
        dom.node(root)?;
        match dom.find_by_id(root, id) {
            Some(node) => self.focus(dom, node),
            None => Ok(false),
        }
    }

    /// Focus `node` directly. `Ok(false)` if it is not focusable.
    ///
    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn focus(&mut self, dom: &mut Dom, node: NodeId) -> Result<bool> {
        if !dom.node(node)?.focus.focusable {
            return Ok(false);
        }
        self.set_focus(dom, Some(node), FocusDirection::Programmatic)?;
        Ok(true)
    }

    /// Drop focus.
    ///
    /// # Errors
    ///
    /// Propagates tree errors.
    pub fn blur(&mut self, dom: &mut Dom) -> Result<()> {
        self.set_focus(dom, None, FocusDirection::Programmatic)
    }

    /// Focus the first node under `root`, in tree order, that asks for it.
    ///
    /// # Errors
    ///
    /// Propagates tree errors.
    pub fn auto_focus(&mut self, dom: &mut Dom, root: NodeId) -> Result<Option<NodeId>> {
        let wanted = dom.descendants(root).into_iter().find(|&id| {
            dom.get(id)
                .is_some_and(|n| n.focus.auto_focus && n.focus.focusable && n.layout_style.display != Display::None)
        });
        if let Some(node) = wanted {
            self.set_focus(dom, Some(node), FocusDirection::Programmatic)?;
        }
        Ok(wanted)
    }

    /// Forget a focused node that was destroyed or stopped being
    /// focusable.
    ///
    /// # Errors
    ///
    /// [`UiError::InvalidNode`] if the node vanished while being unfocused.
    pub fn sync(&mut self, dom: &mut Dom) -> Result<()> {
        let Some(current) = self.focused else {
            return Ok(());
        };
        match dom.get(current) {
            Some(n) if n.focus.focusable => return Ok(()),
            Some(_) => dom.set_focused(current, false)?,
            None => {}
        }
        debug!(node = %current, "focused node went away");
        self.focused = None;
        self.render_pending = true;
        self.notify(&FocusChange {
            old: None,
            new: None,
            direction: FocusDirection::Programmatic,
        });
        Ok(())
    }

    fn set_focus(&mut self, dom: &mut Dom, target: Option<NodeId>, direction: FocusDirection) -> Result<()> {
        if self.focused == target {
            return Ok(());
        }
        let old = self.focused.and_then(|id| snapshot(dom, id));
        if let Some(prev) = self.focused.filter(|&id| dom.contains(id)) {
            dom.set_focused(prev, false)?;
        }
        if let Some(next) = target {
            dom.set_focused(next, true)?;
        }
        self.focused = target;

        let change = FocusChange {
            old,
            new: target.and_then(|id| snapshot(dom, id)),
            direction,
        };
        debug!(?change, "focus changed");
        self.notify(&change);
        self.render_pending = true;
        Ok(())
    }

    fn notify(&mut self, change: &FocusChange) {
        for listener in &mut self.listeners {
            listener(change);
        }
    }
}

impl Default for FocusManager {
    fn default() -> Self {
        Self::new(FocusConfig::default())
    }
}

impl std::fmt::Debug for FocusManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusManager")
            .field("config", &self.config)
            .field("focused", &self.focused)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

fn snapshot(dom: &Dom, id: NodeId) -> Option<FocusSnapshot> {
    dom.get(id).map(|n| FocusSnapshot {
        node: id,
        id: n.id.clone(),
        tab_index: n.focus.tab_index,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Root box with `n` focusable children.
    fn fields(dom: &mut Dom, n: usize) -> (NodeId, Vec<NodeId>) {
        let root = dom.create_box().unwrap();
        let kids = (0..n)
            .map(|_| {
                let k = dom.create_box().unwrap();
                dom.set_focusable(k, true).unwrap();
                dom.append_child(root, k).unwrap();
                k
            })
            .collect();
        (root, kids)
    }

    #[test]
    fn next_wraps_around() {
        let mut dom = Dom::new();
        let (root, k) = fields(&mut dom, 3);
        let mut fm = FocusManager::default();
        assert_eq!(fm.focus_next(&mut dom, root).unwrap(), Some(k[0]));
        assert_eq!(fm.focus_next(&mut dom, root).unwrap(), Some(k[1]));
        assert_eq!(fm.focus_next(&mut dom, root).unwrap(), Some(k[2]));
        assert_eq!(fm.focus_next(&mut dom, root).unwrap(), Some(k[0]));
    }

    #[test]
    fn prev_from_nothing_goes_to_last() {
        let mut dom = Dom::new();
        let (root, k) = fields(&mut dom, 3);
        let mut fm = FocusManager::default();
        assert_eq!(fm.focus_prev(&mut dom, root).unwrap(), Some(k[2]));
        assert_eq!(fm.focus_prev(&mut dom, root).unwrap(), Some(k[1]));
    }

    #[test]
    fn only_one_node_is_focused() {
        let mut dom = Dom::new();
        let (root, k) = fields(&mut dom, 2);
        let mut fm = FocusManager::default();
        fm.focus_next(&mut dom, root).unwrap();
        fm.focus_next(&mut dom, root).unwrap();
        assert!(!dom.get(k[0]).unwrap().focus.focused);
        assert!(dom.get(k[1]).unwrap().focus.focused);
    }

    #[test]
    fn tab_index_ordering() {
        let mut dom = Dom::new();
        let (root, k) = fields(&mut dom, 4);
        dom.set_tab_index(k[0], 0).unwrap();
        dom.set_tab_index(k[1], 2).unwrap();
        dom.set_tab_index(k[2], 1).unwrap();
        dom.set_tab_index(k[3], -1).unwrap();
        let fm = FocusManager::default();
        assert_eq!(fm.tab_order(&dom, root).unwrap(), [k[2], k[1], k[0]]);
    }

    #[test]
    fn hidden_nodes_are_skipped() {
        let mut dom = Dom::new();
        let (root, k) = fields(&mut dom, 2);
        dom.set_display(k[0], Display::None).unwrap();
        let fm = FocusManager::default();
        assert_eq!(fm.tab_order(&dom, root).unwrap(), [k[1]]);
    }

    #[test]
    fn trap_confines_tab() {
        let mut dom = Dom::new();
        let (root, k) = fields(&mut dom, 2);
        let dialog = dom.create_box().unwrap();
        dom.set_focus_trap(dialog, true).unwrap();
        let a = dom.create_box().unwrap();
        let b = dom.create_box().unwrap();
        for n in [a, b] {
            dom.set_focusable(n, true).unwrap();
            dom.append_child(dialog, n).unwrap();
        }
        dom.append_child(root, dialog).unwrap();

        let mut fm = FocusManager::default();
        assert!(fm.focus(&mut dom, a).unwrap());
        assert_eq!(fm.focus_next(&mut dom, root).unwrap(), Some(b));
        assert_eq!(fm.focus_next(&mut dom, root).unwrap(), Some(a));
        assert!(!k.contains(&fm.focused().unwrap()));
    }

    #[test]
    fn focus_by_id_requires_focusable() {
        let mut dom = Dom::new();
        let (root, k) = fields(&mut dom, 1);
        dom.set_id(k[0], Some("name".into())).unwrap();
        let label = dom.create_text("label").unwrap();
        dom.set_id(label, Some("label".into())).unwrap();
        dom.append_child(root, label).unwrap();

        let mut fm = FocusManager::default();
        assert!(!fm.focus_by_id(&mut dom, root, "label").unwrap());
        assert!(!fm.focus_by_id(&mut dom, root, "missing").unwrap());
        assert!(fm.focus_by_id(&mut dom, root, "name").unwrap());
        assert_eq!(fm.focused(), Some(k[0]));
    }

    #[test]
    fn listeners_see_old_and_new() {
        let mut dom = Dom::new();
        let (root, k) = fields(&mut dom, 2);
        dom.set_id(k[1], Some("second".into())).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut fm = FocusManager::default();
        fm.on_change(move |c| sink.borrow_mut().push(c.clone()));
        fm.focus_next(&mut dom, root).unwrap();
        fm.focus_next(&mut dom, root).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].old, None);
        assert_eq!(seen[1].old.as_ref().unwrap().node, k[0]);
        assert_eq!(seen[1].new.as_ref().unwrap().id.as_deref(), Some("second"));
        assert_eq!(seen[1].direction, FocusDirection::Next);
    }

    #[test]
    fn render_request_is_raised_once() {
        let mut dom = Dom::new();
        let (root, _) = fields(&mut dom, 1);
        let mut fm = FocusManager::default();
        assert!(!fm.take_render_request());
        fm.focus_next(&mut dom, root).unwrap();
        assert!(fm.take_render_request());
        assert!(!fm.take_render_request());
    }

    #[test]
    fn blur_clears_focus() {
        let mut dom = Dom::new();
        let (root, k) = fields(&mut dom, 1);
        let mut fm = FocusManager::default();
        fm.focus_next(&mut dom, root).unwrap();
        fm.blur(&mut dom).unwrap();
        assert_eq!(fm.focused(), None);
        assert!(!dom.get(k[0]).unwrap().focus.focused);
    }

    #[test]
    fn auto_focus_picks_first_request() {
        let mut dom = Dom::new();
        let (root, k) = fields(&mut dom, 3);
        dom.set_auto_focus(k[1], true).unwrap();
        dom.set_auto_focus(k[2], true).unwrap();
        let mut fm = FocusManager::default();
        assert_eq!(fm.auto_focus(&mut dom, root).unwrap(), Some(k[1]));
    }

    #[test]
    fn depth_limit() {
        let mut dom = Dom::new();
        let root = dom.create_box().unwrap();
        let mut parent = root;
        for _ in 0..5 {
            let child = dom.create_box().unwrap();
            dom.append_child(parent, child).unwrap();
            parent = child;
        }
        let fm = FocusManager::new(FocusConfig { max_depth: 3 });
        assert_eq!(fm.tab_order(&dom, root), Err(UiError::DepthExceeded { max: 3 }));
    }

    #[test]
    fn destroyed_focus_is_dropped() {
        let mut dom = Dom::new();
        let (root, k) = fields(&mut dom, 2);
        let mut fm = FocusManager::default();
        fm.focus_next(&mut dom, root).unwrap();
        dom.remove_child(root, k[0]).unwrap();
        dom.destroy(k[0]).unwrap();
        fm.sync(&mut dom).unwrap();
        assert_eq!(fm.focused(), None);
        assert_eq!(fm.focus_next(&mut dom, root).unwrap(), Some(k[1]));
    }

    #[test]
    fn unfocusable_focus_is_cleared_on_node() {
        let mut dom = Dom::new();
        let (root, k) = fields(&mut dom, 2);
        let mut fm = FocusManager::default();
        fm.focus_next(&mut dom, root).unwrap();
        assert!(dom.get(k[0]).unwrap().focus.focused);
        fm.take_render_request();

        dom.set_focusable(k[0], false).unwrap();
        fm.sync(&mut dom).unwrap();
        assert_eq!(fm.focused(), None);
        assert!(!dom.get(k[0]).unwrap().focus.focused);
        assert!(fm.take_render_request());
    }
}
