//! Node data: what one slot of the [`Dom`](crate::tree::Dom) arena holds.
//!
//! Nodes are plain data. All structural changes (attach, detach, destroy)
//! go through the `Dom` so parent and child links stay consistent and the
//! layout engine's shadow tree follows along.

use std::fmt;
use std::rc::Rc;

use weft_term::buffer::Hyperlink;

use crate::style::{Border, LayoutStyle, Style, WrapMode};

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Handle to a node. Carries the slot generation, so an id kept after its
/// node was destroyed (and the slot reused) is detected as stale.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Opaque handle into the layout engine. Created with its node and
/// released exactly once when the node is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutId(pub u64);

// ---------------------------------------------------------------------------
// Kinds and attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Flex container; may draw a background and border.
    Box,
    /// Leaf holding text, measured by the text service.
    Text,
    /// Column container for content that is written once.
    Static,
    /// One or more blank rows.
    Newline,
    /// Flexible empty space.
    Spacer,
}

/// Focus-related attributes. `focused` is owned by the focus manager.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FocusAttrs {
    pub focusable: bool,
    pub focused: bool,
    /// Positive values come first in ascending order, zero follows tree
    /// order, negative leaves the node out of Tab navigation.
    pub tab_index: i32,
    pub group: Option<String>,
    pub auto_focus: bool,
    /// Confine Tab navigation to this subtree while focus is inside it.
    pub trap: bool,
}

/// Geometry produced by layout, relative to the parent's origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Identity among siblings for keyed reconciliation.
    pub key: Option<Rc<str>>,
    /// Stable identifier for lookups and focus-by-id.
    pub id: Option<String>,
    pub style: Style,
    pub text: Option<String>,
    pub wrap: WrapMode,
    pub border: Border,
    pub focus: FocusAttrs,
    pub link: Option<Hyperlink>,
    pub layout_style: LayoutStyle,
    /// Border thickness was set by hand and no longer follows the border
    /// style.
    pub border_explicit: bool,
    pub layout: LayoutId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub computed: LayoutBox,
    pub dirty: bool,
    /// Children of a static node already emitted.
    pub static_rendered: usize,
    pub newline_count: u16,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, layout: LayoutId, layout_style: LayoutStyle) -> Self {
        Self {
            kind,
            key: None,
            id: None,
            style: Style::default(),
            text: None,
            wrap: WrapMode::default(),
            border: Border::default(),
            focus: FocusAttrs::default(),
            link: None,
            layout_style,
            border_explicit: false,
            layout,
            parent: None,
            children: Vec::new(),
            computed: LayoutBox::default(),
            dirty: true,
            static_rendered: 0,
            newline_count: 0,
        }
    }

    /// Whether the layout engine measures this node instead of sizing it
    /// from its children.
    #[inline]
    #[must_use]
    pub const fn is_measured(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::Newline)
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}
