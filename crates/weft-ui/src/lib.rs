//! # weft-ui: retained UI core for weft
//!
//! Everything between "the application describes a screen" and "cells land
//! in a frame buffer":
//!
//! - **[`node`]**, **[`tree`]**: the arena [`Dom`](tree::Dom) of typed nodes
//!   (box, text, static, newline, spacer), with generation-checked ids.
//! - **[`style`]**: colors, borders, wrap modes and flex layout properties.
//! - **[`layout`]**: the [`LayoutEngine`](layout::LayoutEngine) seam and its
//!   taffy-backed implementation.
//! - **[`keymap`]**: open-addressing key lookup used by the reconciler.
//! - **[`reconcile`]**: keyed diff of two subtrees and the five-pass apply
//!   that mutates the retained tree in place.
//! - **[`text`]**: grapheme-aware wrap, truncate and measure.
//! - **[`render`]**: paints a laid-out tree into a
//!   [`FrameBuffer`](weft_term::buffer::FrameBuffer).
//! - **[`focus`]**, **[`history`]**, **[`virtual_list`]**: interaction state.
//! - **[`runtime`]**: glue driving diff → apply → layout → paint.

pub mod error;
pub mod focus;
pub mod history;
pub mod keymap;
pub mod layout;
pub mod node;
pub mod reconcile;
pub mod render;
pub mod runtime;
pub mod style;
pub mod text;
pub mod tree;
pub mod virtual_list;

pub use error::{Result, UiError};
pub use node::{NodeId, NodeKind};
pub use tree::Dom;
