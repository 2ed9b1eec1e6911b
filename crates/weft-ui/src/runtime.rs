//! Frame pipeline glue.
//!
//! [`Runtime`] owns the [`Dom`], the retained root, a [`Reconciler`] and a
//! [`FocusManager`]. Each frame the application builds a fresh subtree in
//! [`Runtime::dom_mut`] and hands it to [`Runtime::commit`]; layout and
//! paint then work on the retained tree.

use tracing::debug;
use weft_term::buffer::FrameBuffer;
use weft_term::input::InputEvent;

use crate::error::Result;
use crate::focus::{FocusConfig, FocusManager};
use crate::node::NodeId;
use crate::reconcile::{ApplyStats, Reconciler};
use crate::render::render_tree;
use crate::style::{Dimension, LayoutProperty};
use crate::tree::Dom;

#[derive(Debug, Default)]
pub struct Runtime {
    dom: Dom,
    root: Option<NodeId>,
    reconciler: Reconciler,
    focus: FocusManager,
}

impl Runtime {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_focus_config(config: FocusConfig) -> Self {
        Self {
            focus: FocusManager::new(config),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn dom(&self) -> &Dom {
        &self.dom
    }

    /// The tree the application builds its next frame in.
    pub const fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    #[must_use]
    pub const fn root(&self) -> Option<NodeId> {
        self.root
    }

    #[must_use]
    pub const fn focus(&self) -> &FocusManager {
        &self.focus
    }

    pub const fn focus_mut(&mut self) -> &mut FocusManager {
        &mut self.focus
    }

    /// Make the tree at `new_root` current, reusing retained nodes where
    /// possible. `new_root` must not be used afterwards unless it became
    /// the retained root.
    ///
    /// # Errors
    ///
    /// Propagates diff and apply failures.
    pub fn commit(&mut self, new_root: NodeId) -> Result<ApplyStats> {
        let stats = match self.root {
            Some(old) if old == new_root => ApplyStats::default(),
            Some(old) if self.same_kind(old, new_root) => {
                let ops = self.reconciler.diff(&self.dom, Some(old), Some(new_root))?;
                let stats = self.reconciler.apply(&mut self.dom, &ops);
                self.reconciler.free(ops);
                stats?
            }
            old => {
                // First frame, or the root changed kind: adopt the new tree.
                if let Some(old) = old.filter(|&o| self.dom.contains(o)) {
                    self.dom.destroy(old)?;
                    debug!(%old, new = %new_root, "root replaced");
                }
                self.root = Some(new_root);
                ApplyStats {
                    created: 1,
                    ..ApplyStats::default()
                }
            }
        };

        self.focus.sync(&mut self.dom)?;
        if let (None, Some(root)) = (self.focus.focused(), self.root) {
            self.focus.auto_focus(&mut self.dom, root)?;
        }
        Ok(stats)
    }

    fn same_kind(&self, a: NodeId, b: NodeId) -> bool {
        matches!((self.dom.get(a), self.dom.get(b)), (Some(x), Some(y)) if x.kind == y.kind)
    }

    /// Lay the retained tree out to fill `width` × `height` cells. A root
    /// without an explicit size is stretched to the full area.
    ///
    /// # Errors
    ///
    /// Propagates layout failures.
    pub fn layout(&mut self, width: u16, height: u16) -> Result<()> {
        let Some(root) = self.root else {
            return Ok(());
        };
        let style = self.dom.node(root)?.layout_style;
        if style.width == Dimension::Auto {
            self.dom
                .set_layout_property(root, LayoutProperty::Width, Dimension::Percent(100.0))?;
        }
        if style.height == Dimension::Auto {
            self.dom
                .set_layout_property(root, LayoutProperty::Height, Dimension::Percent(100.0))?;
        }
        self.dom.compute_layout(root, width, height)
    }

    /// Paint the retained tree.
    pub fn paint(&self, buf: &mut FrameBuffer) {
        if let Some(root) = self.root {
            render_tree(&self.dom, root, buf);
        }
    }

    /// Tab and Shift+Tab move focus. Returns whether the event was used.
    ///
    /// # Errors
    ///
    /// Propagates focus traversal failures.
    pub fn handle_input(&mut self, event: &InputEvent) -> Result<bool> {
        let (InputEvent::Key(key), Some(root)) = (event, self.root) else {
            return Ok(false);
        };
        if !key.tab() {
            return Ok(false);
        }
        if key.shift() {
            self.focus.focus_prev(&mut self.dom, root)?;
        } else {
            self.focus.focus_next(&mut self.dom, root)?;
        }
        Ok(true)
    }

    /// Whether focus moved since the last call.
    pub fn take_render_request(&mut self) -> bool {
        self.focus.take_render_request()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
