//! The node arena.
//!
//! [`Dom`] owns every node in slots addressed by [`NodeId`]. Freed slots go
//! on a free list and are reused with a bumped generation, so ids held past
//! a node's destruction are rejected instead of silently aliasing a new
//! node. Each node owns one layout-engine node; the `Dom` keeps the
//! engine's child lists and styles in step with its own.

use std::rc::Rc;

use tracing::{debug, trace};
use weft_term::buffer::Hyperlink;

use crate::error::{Result, UiError};
use crate::layout::{AvailableWidth, LayoutEngine, MeasureRequest, TaffyEngine};
use crate::node::{FocusAttrs, LayoutBox, Node, NodeId, NodeKind};
use crate::style::{
    Align, Border, Dimension, Display, Edges, FlexDirection, Justify, LayoutProperty, LayoutStyle, Style, WrapMode,
};
use crate::text;

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena of UI nodes plus the layout engine's shadow tree.
pub struct Dom {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    engine: Box<dyn LayoutEngine>,
}

impl Dom {
    /// An empty tree laid out by [`TaffyEngine`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_engine(Box::new(TaffyEngine::new()))
    }

    #[must_use]
    pub fn with_engine(engine: Box<dyn LayoutEngine>) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            engine,
        }
    }

    /// Live nodes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    // ---------------------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------------------

    /// A flex container laid out as a row.
    ///
    /// # Errors
    ///
    /// [`UiError::Alloc`] or [`UiError::Layout`] if storage cannot be obtained.
    pub fn create_box(&mut self) -> Result<NodeId> {
        self.alloc(NodeKind::Box, LayoutStyle::default())
    }

    /// A text leaf.
    ///
    /// # Errors
    ///
    /// Same as [`create_box`](Self::create_box).
    pub fn create_text(&mut self, content: impl Into<String>) -> Result<NodeId> {
        let id = self.alloc(NodeKind::Text, LayoutStyle::default())?;
        self.node_mut(id)?.text = Some(content.into());
        Ok(id)
    }

    /// A column container for write-once content.
    ///
    /// # Errors
    ///
    /// Same as [`create_box`](Self::create_box).
    pub fn create_static(&mut self) -> Result<NodeId> {
        let style = LayoutStyle {
            direction: FlexDirection::Column,
            ..LayoutStyle::default()
        };
        self.alloc(NodeKind::Static, style)
    }

    /// `count` blank rows.
    ///
    /// # Errors
    ///
    /// Same as [`create_box`](Self::create_box).
    pub fn create_newline(&mut self, count: u16) -> Result<NodeId> {
        let id = self.alloc(NodeKind::Newline, LayoutStyle::default())?;
        self.node_mut(id)?.newline_count = count;
        Ok(id)
    }

    /// Empty space that grows to fill its parent.
    ///
    /// # Errors
    ///
    /// Same as [`create_box`](Self::create_box).
    pub fn create_spacer(&mut self) -> Result<NodeId> {
        let style = LayoutStyle {
            flex_grow: 1.0,
            ..LayoutStyle::default()
        };
        self.alloc(NodeKind::Spacer, style)
    }

    fn alloc(&mut self, kind: NodeKind, layout_style: LayoutStyle) -> Result<NodeId> {
        if self.free.is_empty() {
            self.slots.try_reserve(1)?;
        }
        let layout = self.engine.create(&layout_style)?;
        let node = Node::new(kind, layout, layout_style);

        let id = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let Ok(index) = u32::try_from(self.slots.len()) else {
                self.engine.destroy(layout);
                return Err(UiError::Alloc);
            };
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId { index, generation: 0 }
        };
        self.live += 1;

        if matches!(kind, NodeKind::Text | NodeKind::Newline) {
            self.engine.set_measured(layout, Some(id))?;
        }
        trace!(%id, ?kind, "node created");
        Ok(id)
    }

    // ---------------------------------------------------------------------------
    // Destruction
    // ---------------------------------------------------------------------------

    /// Destroy `id` and its whole subtree, releasing each layout node once.
    ///
    /// # Errors
    ///
    /// [`UiError::StillAttached`] if `id` has a parent (detach it first),
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn destroy(&mut self, id: NodeId) -> Result<()> {
        if self.node(id)?.parent.is_some() {
            return Err(UiError::StillAttached(id));
        }
        for victim in self.descendants(id) {
            self.release(victim);
        }
        Ok(())
    }

    fn release(&mut self, id: NodeId) {
        let Some(slot) = self.slots.get_mut(id.index()) else {
            return;
        };
        if slot.generation != id.generation {
            return;
        }
        if let Some(node) = slot.node.take() {
            self.engine.destroy(node.layout);
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
            self.live -= 1;
            trace!(%id, "node destroyed");
        }
    }

    // ---------------------------------------------------------------------------
    // Access
    // ---------------------------------------------------------------------------

    /// The node, or `None` for a stale id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or(UiError::InvalidNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(UiError::InvalidNode(id))
    }

    /// Children in render order. Empty for a stale id.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Position of `id` among its parent's children.
    #[must_use]
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// `root` and everything under it, in pre-order.
    #[must_use]
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// First node under `root` (inclusive, pre-order) whose id is `wanted`.
    #[must_use]
    pub fn find_by_id(&self, root: NodeId, wanted: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&id| self.get(id).and_then(|n| n.id.as_deref()) == Some(wanted))
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    // ---------------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------------

    /// Attach `child` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// [`UiError::AlreadyAttached`], [`UiError::Cycle`],
    /// [`UiError::InvalidNode`], or [`UiError::Alloc`] with the tree
    /// untouched.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let len = self.node(parent)?.children.len();
        self.insert_at(parent, child, len)
    }

    /// Attach `child` before `anchor`, or last when `anchor` is `None`.
    ///
    /// # Errors
    ///
    /// As [`append_child`](Self::append_child), plus
    /// [`UiError::NotAChild`] when `anchor` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, anchor: Option<NodeId>) -> Result<()> {
        let Some(anchor) = anchor else {
            return self.append_child(parent, child);
        };
        let index = self
            .node(parent)?
            .children
            .iter()
            .position(|&c| c == anchor)
            .ok_or(UiError::NotAChild { parent, child: anchor })?;
        self.insert_at(parent, child, index)
    }

    /// Attach `child` at `index`, clamped to the end.
    pub(crate) fn insert_at(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<()> {
        if self.node(child)?.parent.is_some() {
            return Err(UiError::AlreadyAttached(child));
        }
        self.node(parent)?;
        if self.is_ancestor(child, parent) {
            return Err(UiError::Cycle { parent, child });
        }

        let node = self.node_mut(parent)?;
        node.children.try_reserve(1)?;
        let index = index.min(node.children.len());
        node.children.insert(index, child);
        node.dirty = true;
        self.node_mut(child)?.parent = Some(parent);
        self.sync_children(parent)
    }

    /// Detach `child` from `parent`. The child stays alive.
    ///
    /// # Errors
    ///
    /// [`UiError::NotAChild`] or [`UiError::InvalidNode`].
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(child)?;
        let node = self.node_mut(parent)?;
        let index = node
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(UiError::NotAChild { parent, child })?;
        node.children.remove(index);
        node.dirty = true;
        self.node_mut(child)?.parent = None;
        self.sync_children(parent)
    }

    /// Detach `id` from whatever parent it has. No-op for a root.
    ///
    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        match self.node(id)?.parent {
            Some(parent) => self.remove_child(parent, id),
            None => Ok(()),
        }
    }

    /// Move an attached child to `to` (clamped) among its siblings.
    /// Returns whether anything moved.
    pub(crate) fn move_child(&mut self, parent: NodeId, child: NodeId, to: usize) -> Result<bool> {
        let node = self.node_mut(parent)?;
        let from = node
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(UiError::NotAChild { parent, child })?;
        let to = to.min(node.children.len() - 1);
        if from == to {
            return Ok(false);
        }
        node.children.remove(from);
        node.children.insert(to, child);
        node.dirty = true;
        self.sync_children(parent)?;
        Ok(true)
    }

    fn sync_children(&mut self, parent: NodeId) -> Result<()> {
        let node = self.node(parent)?;
        let layouts: Vec<_> = node
            .children
            .iter()
            .filter_map(|&c| self.get(c).map(|n| n.layout))
            .collect();
        let layout = node.layout;
        self.engine.set_children(layout, &layouts)
    }

    // ---------------------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------------------

    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_style(&mut self, id: NodeId, style: Style) -> Result<()> {
        self.node_mut(id)?.style = style;
        Ok(())
    }

    /// Replace the text, invalidating layout when it changed.
    ///
    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_text(&mut self, id: NodeId, content: impl Into<String>) -> Result<()> {
        let content = content.into();
        let node = self.node_mut(id)?;
        if node.text.as_deref() == Some(content.as_str()) {
            return Ok(());
        }
        node.text = Some(content);
        node.dirty = true;
        let layout = node.layout;
        self.engine.mark_dirty(layout)
    }

    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_id(&mut self, id: NodeId, value: Option<String>) -> Result<()> {
        self.node_mut(id)?.id = value;
        Ok(())
    }

    /// Attach an OSC 8 link to everything this node paints.
    ///
    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_hyperlink(&mut self, id: NodeId, url: &str, link_id: Option<&str>) -> Result<()> {
        self.node_mut(id)?.link = Some(Hyperlink {
            url: url.to_owned(),
            id: link_id.map(str::to_owned),
        });
        Ok(())
    }

    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_key(&mut self, id: NodeId, key: Option<Rc<str>>) -> Result<()> {
        self.node_mut(id)?.key = key;
        Ok(())
    }

    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_wrap(&mut self, id: NodeId, wrap: WrapMode) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.wrap == wrap {
            return Ok(());
        }
        node.wrap = wrap;
        node.dirty = true;
        let layout = node.layout;
        self.engine.mark_dirty(layout)
    }

    /// Set the border. Unless thickness was set by hand, a visible border
    /// reserves one cell per side.
    ///
    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_border(&mut self, id: NodeId, border: Border) -> Result<()> {
        let node = self.node_mut(id)?;
        node.border = border;
        if node.border_explicit {
            return Ok(());
        }
        let thickness = if border.style.is_visible() { 1.0 } else { 0.0 };
        self.update_layout(id, |s| s.border = Edges::all(thickness))
    }

    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_focusable(&mut self, id: NodeId, focusable: bool) -> Result<()> {
        self.node_mut(id)?.focus.focusable = focusable;
        Ok(())
    }

    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_tab_index(&mut self, id: NodeId, tab_index: i32) -> Result<()> {
        self.node_mut(id)?.focus.tab_index = tab_index;
        Ok(())
    }

    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_focus_group(&mut self, id: NodeId, group: Option<String>) -> Result<()> {
        self.node_mut(id)?.focus.group = group;
        Ok(())
    }

    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_auto_focus(&mut self, id: NodeId, auto_focus: bool) -> Result<()> {
        self.node_mut(id)?.focus.auto_focus = auto_focus;
        Ok(())
    }

    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_focus_trap(&mut self, id: NodeId, trap: bool) -> Result<()> {
        self.node_mut(id)?.focus.trap = trap;
        Ok(())
    }

    pub(crate) fn set_focused(&mut self, id: NodeId, focused: bool) -> Result<()> {
        self.node_mut(id)?.focus.focused = focused;
        Ok(())
    }

    /// Record how many children of a static node were already emitted.
    ///
    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_static_rendered(&mut self, id: NodeId, count: usize) -> Result<()> {
        self.node_mut(id)?.static_rendered = count;
        Ok(())
    }

    /// Set one layout property. Setting any border property pins the
    /// border thickness so later [`set_border`](Self::set_border) calls
    /// leave it alone.
    ///
    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_layout_property(&mut self, id: NodeId, prop: LayoutProperty, value: Dimension) -> Result<()> {
        if prop.is_border() {
            self.node_mut(id)?.border_explicit = true;
        }
        self.update_layout(id, |s| s.set(prop, value))
    }

    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_flex_direction(&mut self, id: NodeId, direction: FlexDirection) -> Result<()> {
        self.update_layout(id, |s| s.direction = direction)
    }

    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_justify(&mut self, id: NodeId, justify: Justify) -> Result<()> {
        self.update_layout(id, |s| s.justify = justify)
    }

    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_align_items(&mut self, id: NodeId, align: Align) -> Result<()> {
        self.update_layout(id, |s| s.align_items = align)
    }

    /// Hidden nodes take no space and are skipped by paint and focus.
    ///
    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale id.
    pub fn set_display(&mut self, id: NodeId, display: Display) -> Result<()> {
        self.update_layout(id, |s| s.display = display)
    }

    fn update_layout(&mut self, id: NodeId, f: impl FnOnce(&mut LayoutStyle)) -> Result<()> {
        let node = self.node_mut(id)?;
        let before = node.layout_style;
        f(&mut node.layout_style);
        if node.layout_style == before {
            return Ok(());
        }
        node.dirty = true;
        let (layout, style) = (node.layout, node.layout_style);
        self.engine.set_style(layout, &style)
    }

    /// Copy everything the application controls from `from` onto `to`.
    /// `focused` stays with `to`; text only counts as a change when it
    /// differs.
    pub(crate) fn copy_props(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        let src = self.node(from)?.clone();
        let dst = self.node_mut(to)?;

        dst.key = src.key;
        dst.id = src.id;
        dst.style = src.style;
        dst.border = src.border;
        dst.link = src.link;
        dst.focus = FocusAttrs {
            focused: dst.focus.focused,
            ..src.focus
        };

        let mut measure_dirty = false;
        if dst.text != src.text {
            dst.text = src.text;
            measure_dirty = true;
        }
        if dst.wrap != src.wrap {
            dst.wrap = src.wrap;
            measure_dirty = true;
        }
        if dst.newline_count != src.newline_count {
            dst.newline_count = src.newline_count;
            measure_dirty = true;
        }

        let style_changed = dst.layout_style != src.layout_style;
        dst.layout_style = src.layout_style;
        dst.border_explicit = src.border_explicit;
        dst.dirty |= measure_dirty || style_changed;

        let (layout, style) = (dst.layout, dst.layout_style);
        if style_changed {
            self.engine.set_style(layout, &style)?;
        } else if measure_dirty {
            self.engine.mark_dirty(layout)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------------
    // Layout
    // ---------------------------------------------------------------------------

    /// Lay out `root` within `width` × `height` cells and store each
    /// node's box.
    ///
    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale root, [`UiError::Layout`] if
    /// the engine fails.
    pub fn compute_layout(&mut self, root: NodeId, width: u16, height: u16) -> Result<()> {
        let root_layout = self.node(root)?.layout;
        {
            let Self { slots, engine, .. } = self;
            let slots: &[Slot] = slots;
            let mut measure = |id: NodeId, request: MeasureRequest| measure_node(slots, id, request);
            engine.compute(root_layout, f32::from(width), f32::from(height), &mut measure)?;
        }

        let ids = self.descendants(root);
        for &id in &ids {
            let layout = self.node(id)?.layout;
            let computed = self.engine.layout_box(layout).unwrap_or_default();
            let node = self.node_mut(id)?;
            node.computed = computed;
            node.dirty = false;
        }
        debug!(nodes = ids.len(), width, height, "layout computed");
        Ok(())
    }

    /// Box from the last layout, relative to the parent.
    #[must_use]
    pub fn layout_box(&self, id: NodeId) -> Option<LayoutBox> {
        self.get(id).map(|n| n.computed)
    }

    /// Box from the last layout, relative to the tree's root.
    #[must_use]
    pub fn absolute_box(&self, id: NodeId) -> Option<LayoutBox> {
        let mut b = self.layout_box(id)?;
        let mut cursor = self.parent(id);
        while let Some(ancestor) = cursor {
            let a = self.get(ancestor)?;
            b.x += a.computed.x;
            b.y += a.computed.y;
            cursor = a.parent;
        }
        Some(b)
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dom").field("live", &self.live).field("slots", &self.slots.len()).finish()
    }
}

fn measure_node(slots: &[Slot], id: NodeId, request: MeasureRequest) -> (f32, f32) {
    let Some(node) = slots
        .get(id.index())
        .filter(|s| s.generation == id.generation)
        .and_then(|s| s.node.as_ref())
    else {
        return (0.0, 0.0);
    };

    match node.kind {
        NodeKind::Newline => (0.0, f32::from(node.newline_count)),
        NodeKind::Text => {
            let content = node.text.as_deref().unwrap_or("");
            let width = request.known_width.map_or(
                match request.available_width {
                    AvailableWidth::Definite(w) => Some(cells(w)),
                    AvailableWidth::MinContent => Some(1),
                    AvailableWidth::MaxContent => None,
                },
                |w| Some(cells(w)),
            );
            let (w, h) = text::measure(content, width, node.wrap);
            (to_f32(w), to_f32(h))
        }
        _ => (0.0, 0.0),
    }
}

// Layout widths are small non-negative cell counts.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn cells(w: f32) -> usize {
    w.max(0.0).floor() as usize
}

#[allow(clippy::cast_precision_loss)]
fn to_f32(n: usize) -> f32 {
    n as f32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::BorderStyle;
    use pretty_assertions::assert_eq;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    // -- creation and destruction -----------------------------------------

    #[test]
    fn create_assigns_kinds() {
        let mut dom = Dom::new();
        let b = dom.create_box().unwrap();
        let t = dom.create_text("hi").unwrap();
        let s = dom.create_spacer().unwrap();
        assert_eq!(dom.get(b).unwrap().kind, NodeKind::Box);
        assert_eq!(dom.get(t).unwrap().text.as_deref(), Some("hi"));
        assert!(approx(dom.get(s).unwrap().layout_style.flex_grow, 1.0));
        assert_eq!(dom.len(), 3);
    }

    #[test]
    fn static_is_a_column() {
        let mut dom = Dom::new();
        let s = dom.create_static().unwrap();
        assert_eq!(dom.get(s).unwrap().layout_style.direction, FlexDirection::Column);
    }

    #[test]
    fn destroy_is_recursive() {
        let mut dom = Dom::new();
        let root = dom.create_box().unwrap();
        let child = dom.create_box().unwrap();
        let leaf = dom.create_text("x").unwrap();
        dom.append_child(root, child).unwrap();
        dom.append_child(child, leaf).unwrap();

        dom.destroy(root).unwrap();
        assert!(dom.is_empty());
        assert!(!dom.contains(leaf));
    }

    #[test]
    fn destroy_attached_is_rejected() {
        let mut dom = Dom::new();
        let root = dom.create_box().unwrap();
        let child = dom.create_box().unwrap();
        dom.append_child(root, child).unwrap();
        assert_eq!(dom.destroy(child), Err(UiError::StillAttached(child)));
        assert!(dom.contains(child));
    }

    #[test]
    fn stale_id_after_slot_reuse() {
        let mut dom = Dom::new();
        let a = dom.create_box().unwrap();
        dom.destroy(a).unwrap();
        let b = dom.create_box().unwrap();
        assert_eq!(a.index(), b.index());
        assert!(dom.get(a).is_none());
        assert_eq!(dom.set_text(a, "x"), Err(UiError::InvalidNode(a)));
        assert_eq!(dom.destroy(a), Err(UiError::InvalidNode(a)));
    }

    // -- structure ---------------------------------------------------------

    #[test]
    fn append_and_insert_before() {
        let mut dom = Dom::new();
        let root = dom.create_box().unwrap();
        let a = dom.create_box().unwrap();
        let b = dom.create_box().unwrap();
        let c = dom.create_box().unwrap();
        dom.append_child(root, a).unwrap();
        dom.append_child(root, c).unwrap();
        dom.insert_before(root, b, Some(c)).unwrap();
        assert_eq!(dom.children(root), [a, b, c]);
        assert_eq!(dom.parent(b), Some(root));
        assert_eq!(dom.position(c), Some(2));
    }

    #[test]
    fn double_attach_is_rejected() {
        let mut dom = Dom::new();
        let p1 = dom.create_box().unwrap();
        let p2 = dom.create_box().unwrap();
        let c = dom.create_box().unwrap();
        dom.append_child(p1, c).unwrap();
        assert_eq!(dom.append_child(p2, c), Err(UiError::AlreadyAttached(c)));
        assert!(dom.children(p2).is_empty());
    }

    #[test]
    fn cycles_are_rejected() {
        let mut dom = Dom::new();
        let a = dom.create_box().unwrap();
        let b = dom.create_box().unwrap();
        dom.append_child(a, b).unwrap();
        assert_eq!(dom.append_child(b, a), Err(UiError::Cycle { parent: b, child: a }));
        assert_eq!(dom.append_child(a, a), Err(UiError::Cycle { parent: a, child: a }));
    }

    #[test]
    fn insert_before_foreign_anchor() {
        let mut dom = Dom::new();
        let root = dom.create_box().unwrap();
        let stranger = dom.create_box().unwrap();
        let c = dom.create_box().unwrap();
        assert_eq!(
            dom.insert_before(root, c, Some(stranger)),
            Err(UiError::NotAChild { parent: root, child: stranger })
        );
        assert_eq!(dom.parent(c), None);
    }

    #[test]
    fn remove_child_detaches() {
        let mut dom = Dom::new();
        let root = dom.create_box().unwrap();
        let c = dom.create_box().unwrap();
        dom.append_child(root, c).unwrap();
        dom.remove_child(root, c).unwrap();
        assert_eq!(dom.parent(c), None);
        assert_eq!(dom.remove_child(root, c), Err(UiError::NotAChild { parent: root, child: c }));
        dom.destroy(c).unwrap();
    }

    #[test]
    fn move_child_clamps() {
        let mut dom = Dom::new();
        let root = dom.create_box().unwrap();
        let kids: Vec<_> = (0..3).map(|_| dom.create_box().unwrap()).collect();
        for &k in &kids {
            dom.append_child(root, k).unwrap();
        }
        assert!(dom.move_child(root, kids[0], 99).unwrap());
        assert_eq!(dom.children(root), [kids[1], kids[2], kids[0]]);
        assert!(!dom.move_child(root, kids[0], 2).unwrap());
    }

    #[test]
    fn descendants_pre_order_and_find_by_id() {
        let mut dom = Dom::new();
        let root = dom.create_box().unwrap();
        let a = dom.create_box().unwrap();
        let a1 = dom.create_text("a1").unwrap();
        let b = dom.create_box().unwrap();
        dom.append_child(root, a).unwrap();
        dom.append_child(a, a1).unwrap();
        dom.append_child(root, b).unwrap();
        dom.set_id(b, Some("bee".into())).unwrap();

        assert_eq!(dom.descendants(root), [root, a, a1, b]);
        assert_eq!(dom.find_by_id(root, "bee"), Some(b));
        assert_eq!(dom.find_by_id(root, "nope"), None);
    }

    // -- properties --------------------------------------------------------

    #[test]
    fn border_reserves_a_cell_unless_pinned() {
        let mut dom = Dom::new();
        let b = dom.create_box().unwrap();
        dom.set_border(b, Border::new(BorderStyle::Single)).unwrap();
        assert!(approx(dom.get(b).unwrap().layout_style.border.left, 1.0));

        dom.set_layout_property(b, LayoutProperty::Border, Dimension::Cells(0.0)).unwrap();
        dom.set_border(b, Border::new(BorderStyle::Double)).unwrap();
        assert!(approx(dom.get(b).unwrap().layout_style.border.left, 0.0));
    }

    #[test]
    fn set_text_marks_dirty_only_on_change() {
        let mut dom = Dom::new();
        let root = dom.create_box().unwrap();
        let t = dom.create_text("a").unwrap();
        dom.append_child(root, t).unwrap();
        dom.compute_layout(root, 10, 1).unwrap();
        assert!(!dom.get(t).unwrap().dirty);

        dom.set_text(t, "a").unwrap();
        assert!(!dom.get(t).unwrap().dirty);
        dom.set_text(t, "b").unwrap();
        assert!(dom.get(t).unwrap().dirty);
    }

    #[test]
    fn hyperlink_is_stored() {
        let mut dom = Dom::new();
        let t = dom.create_text("docs").unwrap();
        dom.set_hyperlink(t, "https://example.com", Some("d")).unwrap();
        let link = dom.get(t).unwrap().link.clone().unwrap();
        assert_eq!(link.url, "https://example.com");
        assert_eq!(link.id.as_deref(), Some("d"));
    }

    // -- layout ------------------------------------------------------------

    #[test]
    fn text_is_measured() {
        let mut dom = Dom::new();
        let root = dom.create_box().unwrap();
        dom.set_layout_property(root, LayoutProperty::Width, Dimension::Cells(20.0)).unwrap();
        dom.set_layout_property(root, LayoutProperty::Height, Dimension::Cells(5.0)).unwrap();
        dom.set_align_items(root, Align::Start).unwrap();
        let t = dom.create_text("hello").unwrap();
        dom.append_child(root, t).unwrap();
        dom.compute_layout(root, 20, 5).unwrap();

        let b = dom.layout_box(t).unwrap();
        assert!(approx(b.width, 5.0));
        assert!(approx(b.height, 1.0));
    }

    #[test]
    fn newline_measures_its_rows() {
        let mut dom = Dom::new();
        let root = dom.create_static().unwrap();
        dom.set_layout_property(root, LayoutProperty::Width, Dimension::Cells(10.0)).unwrap();
        let nl = dom.create_newline(3).unwrap();
        let t = dom.create_text("x").unwrap();
        dom.append_child(root, nl).unwrap();
        dom.append_child(root, t).unwrap();
        dom.compute_layout(root, 10, 10).unwrap();

        assert!(approx(dom.layout_box(t).unwrap().y, 3.0));
    }

    #[test]
    fn absolute_box_accumulates_offsets() {
        let mut dom = Dom::new();
        let root = dom.create_box().unwrap();
        dom.set_layout_property(root, LayoutProperty::Width, Dimension::Cells(20.0)).unwrap();
        dom.set_layout_property(root, LayoutProperty::Height, Dimension::Cells(10.0)).unwrap();
        dom.set_layout_property(root, LayoutProperty::Padding, Dimension::Cells(1.0)).unwrap();
        let inner = dom.create_box().unwrap();
        dom.set_layout_property(inner, LayoutProperty::Padding, Dimension::Cells(2.0)).unwrap();
        let leaf = dom.create_text("x").unwrap();
        dom.append_child(root, inner).unwrap();
        dom.append_child(inner, leaf).unwrap();
        dom.compute_layout(root, 20, 10).unwrap();

        let abs = dom.absolute_box(leaf).unwrap();
        assert!(approx(abs.x, 3.0));
        assert!(approx(abs.y, 3.0));
    }
}
