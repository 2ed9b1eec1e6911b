//! Layout engine seam.
//!
//! The [`Dom`](crate::tree::Dom) keeps a shadow node in a [`LayoutEngine`]
//! for every UI node: created with it, restyled and re-parented alongside
//! it, destroyed exactly once with it. Text and newline nodes are measured
//! leaves; the engine calls back into the Dom to size them.
//!
//! [`TaffyEngine`] is the flexbox implementation backed by `taffy`.

use std::collections::HashSet;

use taffy::{AvailableSpace, TaffyTree};

use crate::error::{Result, UiError};
use crate::node::{LayoutBox, LayoutId, NodeId};
use crate::style::{Align, Dimension, Display, Edges, FlexDirection, Justify, LayoutStyle};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Width the engine offers a measured leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AvailableWidth {
    Definite(f32),
    /// Narrowest the content can be.
    MinContent,
    /// Widest the content wants to be.
    MaxContent,
}

/// What the engine knows when it asks for a leaf's size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasureRequest {
    pub known_width: Option<f32>,
    pub known_height: Option<f32>,
    pub available_width: AvailableWidth,
}

/// Callback that sizes a measured leaf: `(width, height)` in cells.
pub type MeasureFn<'a> = dyn FnMut(NodeId, MeasureRequest) -> (f32, f32) + 'a;

/// A flexbox layout backend.
pub trait LayoutEngine {
    /// Create a detached node.
    ///
    /// # Errors
    ///
    /// [`UiError::Layout`] if the backend rejects the node.
    fn create(&mut self, style: &LayoutStyle) -> Result<LayoutId>;

    /// Release a node. Unknown ids are ignored.
    fn destroy(&mut self, id: LayoutId);

    /// # Errors
    ///
    /// [`UiError::Layout`] for an unknown id.
    fn set_style(&mut self, id: LayoutId, style: &LayoutStyle) -> Result<()>;

    /// Replace the children of `id`, in order.
    ///
    /// # Errors
    ///
    /// [`UiError::Layout`] for an unknown id.
    fn set_children(&mut self, id: LayoutId, children: &[LayoutId]) -> Result<()>;

    /// Make `id` a measured leaf reporting as `node`, or clear it.
    ///
    /// # Errors
    ///
    /// [`UiError::Layout`] for an unknown id.
    fn set_measured(&mut self, id: LayoutId, node: Option<NodeId>) -> Result<()>;

    /// Invalidate cached layout for `id` and its ancestors.
    ///
    /// # Errors
    ///
    /// [`UiError::Layout`] for an unknown id.
    fn mark_dirty(&mut self, id: LayoutId) -> Result<()>;

    /// Lay out the tree under `root` within `width` × `height` cells.
    ///
    /// # Errors
    ///
    /// [`UiError::Layout`] if the computation fails.
    fn compute(&mut self, root: LayoutId, width: f32, height: f32, measure: &mut MeasureFn<'_>) -> Result<()>;

    /// Result of the last computation, relative to the parent.
    fn layout_box(&self, id: LayoutId) -> Option<LayoutBox>;
}

// ---------------------------------------------------------------------------
// Taffy
// ---------------------------------------------------------------------------

/// [`LayoutEngine`] backed by a `taffy` tree whose leaf context is the
/// owning [`NodeId`].
///
/// `taffy` panics on ids it has already removed, so every call is checked
/// against the set of live ids first.
pub struct TaffyEngine {
    tree: TaffyTree<NodeId>,
    live: HashSet<LayoutId>,
}

impl TaffyEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: TaffyTree::new(),
            live: HashSet::new(),
        }
    }

    /// Live engine nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn contains(&self, id: LayoutId) -> bool {
        self.live.contains(&id)
    }

    fn live_id(&self, id: LayoutId) -> Result<taffy::NodeId> {
        if self.live.contains(&id) {
            Ok(taffy_id(id))
        } else {
            Err(UiError::Layout(format!("unknown layout node {}", id.0)))
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TaffyEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn taffy_id(id: LayoutId) -> taffy::NodeId {
    taffy::NodeId::from(id.0)
}

fn layout_err(e: &taffy::TaffyError) -> UiError {
    UiError::Layout(e.to_string())
}

fn dimension(d: Dimension) -> taffy::Dimension {
    match d {
        Dimension::Auto => taffy::Dimension::Auto,
        Dimension::Cells(v) => taffy::Dimension::Length(v),
        Dimension::Percent(p) => taffy::Dimension::Percent(p / 100.0),
    }
}

fn length_percentage(d: Dimension) -> taffy::LengthPercentage {
    match d {
        Dimension::Auto => taffy::LengthPercentage::Length(0.0),
        Dimension::Cells(v) => taffy::LengthPercentage::Length(v),
        Dimension::Percent(p) => taffy::LengthPercentage::Percent(p / 100.0),
    }
}

fn length_percentage_auto(d: Dimension) -> taffy::LengthPercentageAuto {
    match d {
        Dimension::Auto => taffy::LengthPercentageAuto::Auto,
        Dimension::Cells(v) => taffy::LengthPercentageAuto::Length(v),
        Dimension::Percent(p) => taffy::LengthPercentageAuto::Percent(p / 100.0),
    }
}

fn rect<T, U>(edges: Edges<T>, f: impl Fn(T) -> U) -> taffy::Rect<U> {
    taffy::Rect {
        top: f(edges.top),
        right: f(edges.right),
        bottom: f(edges.bottom),
        left: f(edges.left),
    }
}

fn to_taffy(style: &LayoutStyle) -> taffy::Style {
    taffy::Style {
        display: match style.display {
            Display::Flex => taffy::Display::Flex,
            Display::None => taffy::Display::None,
        },
        flex_direction: match style.direction {
            FlexDirection::Row => taffy::FlexDirection::Row,
            FlexDirection::Column => taffy::FlexDirection::Column,
            FlexDirection::RowReverse => taffy::FlexDirection::RowReverse,
            FlexDirection::ColumnReverse => taffy::FlexDirection::ColumnReverse,
        },
        justify_content: Some(match style.justify {
            Justify::Start => taffy::JustifyContent::FlexStart,
            Justify::Center => taffy::JustifyContent::Center,
            Justify::End => taffy::JustifyContent::FlexEnd,
            Justify::SpaceBetween => taffy::JustifyContent::SpaceBetween,
            Justify::SpaceAround => taffy::JustifyContent::SpaceAround,
            Justify::SpaceEvenly => taffy::JustifyContent::SpaceEvenly,
        }),
        align_items: Some(match style.align_items {
            Align::Stretch => taffy::AlignItems::Stretch,
            Align::Start => taffy::AlignItems::FlexStart,
            Align::Center => taffy::AlignItems::Center,
            Align::End => taffy::AlignItems::FlexEnd,
        }),
        flex_grow: style.flex_grow,
        flex_shrink: style.flex_shrink,
        flex_basis: dimension(style.flex_basis),
        size: taffy::Size {
            width: dimension(style.width),
            height: dimension(style.height),
        },
        min_size: taffy::Size {
            width: dimension(style.min_width),
            height: dimension(style.min_height),
        },
        max_size: taffy::Size {
            width: dimension(style.max_width),
            height: dimension(style.max_height),
        },
        padding: rect(style.padding, length_percentage),
        margin: rect(style.margin, length_percentage_auto),
        border: rect(style.border, taffy::LengthPercentage::Length),
        gap: taffy::Size {
            width: length_percentage(style.gap),
            height: length_percentage(style.gap),
        },
        ..taffy::Style::default()
    }
}

impl LayoutEngine for TaffyEngine {
    fn create(&mut self, style: &LayoutStyle) -> Result<LayoutId> {
        let id = LayoutId(u64::from(self.tree.new_leaf(to_taffy(style)).map_err(|e| layout_err(&e))?));
        self.live.insert(id);
        Ok(id)
    }

    fn destroy(&mut self, id: LayoutId) {
        if !self.live.remove(&id) {
            tracing::trace!(?id, "layout node already gone");
            return;
        }
        if let Err(e) = self.tree.remove(taffy_id(id)) {
            tracing::warn!(?id, error = %e, "taffy refused to remove layout node");
        }
    }

    fn set_style(&mut self, id: LayoutId, style: &LayoutStyle) -> Result<()> {
        let node = self.live_id(id)?;
        self.tree.set_style(node, to_taffy(style)).map_err(|e| layout_err(&e))
    }

    fn set_children(&mut self, id: LayoutId, children: &[LayoutId]) -> Result<()> {
        let node = self.live_id(id)?;
        let ids = children
            .iter()
            .map(|&c| self.live_id(c))
            .collect::<Result<Vec<_>>>()?;
        self.tree.set_children(node, &ids).map_err(|e| layout_err(&e))
    }

    fn set_measured(&mut self, id: LayoutId, node: Option<NodeId>) -> Result<()> {
        let id = self.live_id(id)?;
        self.tree.set_node_context(id, node).map_err(|e| layout_err(&e))
    }

    fn mark_dirty(&mut self, id: LayoutId) -> Result<()> {
        let node = self.live_id(id)?;
        self.tree.mark_dirty(node).map_err(|e| layout_err(&e))
    }

    fn compute(&mut self, root: LayoutId, width: f32, height: f32, measure: &mut MeasureFn<'_>) -> Result<()> {
        let available = taffy::Size {
            width: AvailableSpace::Definite(width),
            height: AvailableSpace::Definite(height),
        };
        let root = self.live_id(root)?;
        self.tree
            .compute_layout_with_measure(
                root,
                available,
                |known, avail, _id, context: Option<&mut NodeId>, _style| {
                    let Some(node) = context.map(|n| *n) else {
                        return taffy::Size::ZERO;
                    };
                    let request = MeasureRequest {
                        known_width: known.width,
                        known_height: known.height,
                        available_width: match avail.width {
                            AvailableSpace::Definite(w) => AvailableWidth::Definite(w),
                            AvailableSpace::MinContent => AvailableWidth::MinContent,
                            AvailableSpace::MaxContent => AvailableWidth::MaxContent,
                        },
                    };
                    let (w, h) = measure(node, request);
                    taffy::Size {
                        width: known.width.unwrap_or(w),
                        height: known.height.unwrap_or(h),
                    }
                },
            )
            .map_err(|e| layout_err(&e))
    }

    fn layout_box(&self, id: LayoutId) -> Option<LayoutBox> {
        if !self.live.contains(&id) {
            return None;
        }
        let layout = self.tree.layout(taffy_id(id)).ok()?;
        Some(LayoutBox {
            x: layout.location.x,
            y: layout.location.y,
            width: layout.size.width,
            height: layout.size.height,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
