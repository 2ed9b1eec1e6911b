//! Reconciliation of a freshly built subtree against the retained tree.
//!
//! The application builds its new tree inside the same [`Dom`] as the
//! retained one. [`Reconciler::diff`] walks both and emits [`DiffOp`]s;
//! [`Reconciler::apply`] mutates the retained tree to match, adopting new
//! nodes where nothing could be reused, and finally destroys the parts of
//! the new tree that were only used as property sources.
//!
//! Children are matched by key when any child on either side has one,
//! otherwise by position. Keyed matching tracks the highest old index
//! placed so far; a match that lands before it has moved and is marked
//! [`OpKind::REORDER`].
//!
//! Apply runs in five passes: delete, update, replace, reorder, create.
//! Child order is then settled against the new indices.

use tracing::{debug, trace, warn};

use crate::error::{Result, UiError};
use crate::keymap::KeyMap;
use crate::node::NodeId;
use crate::tree::Dom;

/// Op lists kept for reuse by [`Reconciler::free`].
const POOL_LIMIT: usize = 4;

// ---------------------------------------------------------------------------
// Ops
// ---------------------------------------------------------------------------

bitflags::bitflags! {
    /// What an op does. `UPDATE | REORDER` is the only combination emitted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpKind: u8 {
        const CREATE  = 1 << 0;
        const UPDATE  = 1 << 1;
        const DELETE  = 1 << 2;
        const REPLACE = 1 << 3;
        const REORDER = 1 << 4;
    }
}

/// One step that turns the retained tree into the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOp {
    pub kind: OpKind,
    /// Retained node the op acts on.
    pub old: Option<NodeId>,
    /// New-tree node supplying data or being adopted.
    pub new: Option<NodeId>,
    /// Retained parent the op applies under. `None` at the root.
    pub parent: Option<NodeId>,
    pub old_index: usize,
    pub new_index: usize,
}

impl DiffOp {
    const fn new(kind: OpKind) -> Self {
        Self {
            kind,
            old: None,
            new: None,
            parent: None,
            old_index: 0,
            new_index: 0,
        }
    }
}

/// Counts from one [`Reconciler::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub replaced: usize,
    pub reordered: usize,
    /// Ops ignored because their target was detached or already gone.
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Reconciler {
    pool: Vec<Vec<DiffOp>>,
}

impl Reconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ops that turn the tree at `old` into the tree at `new`.
    ///
    /// # Errors
    ///
    /// [`UiError::Alloc`](crate::UiError::Alloc) if the op list cannot
    /// grow; no partial list is returned.
    pub fn diff(&mut self, dom: &Dom, old: Option<NodeId>, new: Option<NodeId>) -> Result<Vec<DiffOp>> {
        self.collect(|ops| diff_roots(dom, old, new, ops))
    }

    /// Like [`diff`](Self::diff), for a subtree hanging under `parent`
    /// rather than a root. `old`, when given, must be a child of `parent`;
    /// a `new` with no `old` is appended after the existing children.
    ///
    /// # Errors
    ///
    /// [`UiError::InvalidNode`] for a stale `parent` or an `old` that is
    /// not its child, and [`UiError::Alloc`] as for `diff`.
    pub fn diff_child(
        &mut self,
        dom: &Dom,
        parent: NodeId,
        old: Option<NodeId>,
        new: Option<NodeId>,
    ) -> Result<Vec<DiffOp>> {
        if !dom.contains(parent) {
            return Err(UiError::InvalidNode(parent));
        }
        if let Some(old) = old.filter(|&o| dom.parent(o) != Some(parent)) {
            return Err(UiError::InvalidNode(old));
        }
        self.collect(|ops| diff_under(dom, parent, old, new, ops))
    }

    fn collect(&mut self, build: impl FnOnce(&mut Vec<DiffOp>) -> Result<()>) -> Result<Vec<DiffOp>> {
        let mut ops = self.pool.pop().unwrap_or_default();
        match build(&mut ops) {
            Ok(()) => Ok(ops),
            Err(e) => {
                self.free(ops);
                Err(e)
            }
        }
    }

    /// Return an op list's storage for reuse.
    pub fn free(&mut self, mut ops: Vec<DiffOp>) {
        if self.pool.len() < POOL_LIMIT {
            ops.clear();
            self.pool.push(ops);
        }
    }

    /// Mutate the retained tree according to `ops`, then destroy the new
    /// tree's nodes that were not adopted.
    ///
    /// # Errors
    ///
    /// Propagates tree errors; the tree stays structurally valid but may
    /// be partially updated.
    pub fn apply(&mut self, dom: &mut Dom, ops: &[DiffOp]) -> Result<ApplyStats> {
        let mut stats = ApplyStats::default();

        for op in ops.iter().filter(|op| op.kind.contains(OpKind::DELETE)) {
            let Some(old) = attached(dom, op.old) else {
                skip(op, &mut stats);
                continue;
            };
            trace!(?op, "delete");
            dom.detach(old)?;
            dom.destroy(old)?;
            stats.deleted += 1;
        }

        for op in ops.iter().filter(|op| op.kind.contains(OpKind::UPDATE)) {
            let (Some(old), Some(new)) = (op.old, op.new) else {
                skip(op, &mut stats);
                continue;
            };
            if !dom.contains(old) || !dom.contains(new) {
                skip(op, &mut stats);
                continue;
            }
            dom.copy_props(new, old)?;
            stats.updated += 1;
        }

        for op in ops.iter().filter(|op| op.kind.contains(OpKind::REPLACE)) {
            let (Some(old), Some(new)) = (attached(dom, op.old), op.new.filter(|&n| dom.contains(n))) else {
                skip(op, &mut stats);
                continue;
            };
            let Some((parent, index)) = dom.parent(old).zip(dom.position(old)) else {
                skip(op, &mut stats);
                continue;
            };
            trace!(?op, "replace");
            dom.detach(new)?;
            dom.remove_child(parent, old)?;
            dom.insert_at(parent, new, index)?;
            dom.destroy(old)?;
            stats.replaced += 1;
        }

        for op in ops.iter().filter(|op| op.kind.contains(OpKind::REORDER)) {
            let Some(old) = attached(dom, op.old) else {
                skip(op, &mut stats);
                continue;
            };
            let Some(parent) = dom.parent(old) else {
                skip(op, &mut stats);
                continue;
            };
            if dom.move_child(parent, old, op.new_index)? {
                trace!(?op, "reorder");
                stats.reordered += 1;
            }
        }

        for op in ops.iter().filter(|op| op.kind.contains(OpKind::CREATE)) {
            let Some(new) = op.new.filter(|&n| dom.contains(n)) else {
                skip(op, &mut stats);
                continue;
            };
            match op.parent {
                // A new root stays where it is and becomes the retained root.
                None => {}
                Some(parent) if dom.contains(parent) => {
                    dom.detach(new)?;
                    dom.insert_at(parent, new, op.new_index)?;
                }
                Some(_) => {
                    skip(op, &mut stats);
                    continue;
                }
            }
            trace!(?op, "create");
            stats.created += 1;
        }

        settle_order(dom, ops)?;

        for op in ops.iter().filter(|op| op.kind.contains(OpKind::UPDATE)) {
            let Some(shell) = op.new.filter(|&n| Some(n) != op.old && dom.contains(n)) else {
                continue;
            };
            dom.detach(shell)?;
            dom.destroy(shell)?;
        }

        debug!(
            created = stats.created,
            updated = stats.updated,
            deleted = stats.deleted,
            replaced = stats.replaced,
            reordered = stats.reordered,
            skipped = stats.skipped,
            "reconciled"
        );
        Ok(stats)
    }
}

/// Reorder moves are made before creates land, so a rotation such as
/// `[A, B, C] -> [C, A, B]` is not finished by them alone. Placing every
/// surviving child at its target index in ascending order is.
fn settle_order(dom: &mut Dom, ops: &[DiffOp]) -> Result<()> {
    let mut placed = Vec::new();
    placed.try_reserve(ops.len())?;
    placed.extend(ops.iter().filter_map(|op| {
        let parent = op.parent?;
        let node = if op.kind.contains(OpKind::UPDATE) {
            op.old?
        } else if op.kind.intersects(OpKind::REPLACE | OpKind::CREATE) {
            op.new?
        } else {
            return None;
        };
        Some((parent, op.new_index, node))
    }));
    placed.sort_unstable_by_key(|&(parent, index, _)| (parent, index));

    for (parent, index, node) in placed {
        if dom.parent(node) == Some(parent) {
            dom.move_child(parent, node, index)?;
        }
    }
    Ok(())
}

fn attached(dom: &Dom, id: Option<NodeId>) -> Option<NodeId> {
    id.filter(|&id| dom.parent(id).is_some())
}

fn skip(op: &DiffOp, stats: &mut ApplyStats) {
    warn!(?op, "op target detached or destroyed, skipped");
    stats.skipped += 1;
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

fn push(ops: &mut Vec<DiffOp>, op: DiffOp) -> Result<()> {
    ops.try_reserve(1)?;
    ops.push(op);
    Ok(())
}

fn diff_roots(dom: &Dom, old: Option<NodeId>, new: Option<NodeId>, ops: &mut Vec<DiffOp>) -> Result<()> {
    match (old, new) {
        (None, None) => Ok(()),
        (None, Some(new)) => push(
            ops,
            DiffOp {
                new: Some(new),
                ..DiffOp::new(OpKind::CREATE)
            },
        ),
        (Some(old), None) => push(
            ops,
            DiffOp {
                old: Some(old),
                parent: dom.parent(old),
                old_index: dom.position(old).unwrap_or(0),
                ..DiffOp::new(OpKind::DELETE)
            },
        ),
        (Some(old), Some(new)) => {
            let index = dom.position(old).unwrap_or(0);
            diff_node(dom, old, new, dom.parent(old), (index, index), OpKind::empty(), ops)
        }
    }
}

fn diff_under(
    dom: &Dom,
    parent: NodeId,
    old: Option<NodeId>,
    new: Option<NodeId>,
    ops: &mut Vec<DiffOp>,
) -> Result<()> {
    let index = old
        .and_then(|o| dom.position(o))
        .unwrap_or_else(|| dom.children(parent).len());
    match (old, new) {
        (None, None) => Ok(()),
        (None, Some(new)) => push(
            ops,
            DiffOp {
                new: Some(new),
                parent: Some(parent),
                new_index: index,
                ..DiffOp::new(OpKind::CREATE)
            },
        ),
        (Some(old), None) => push(
            ops,
            DiffOp {
                old: Some(old),
                parent: Some(parent),
                old_index: index,
                ..DiffOp::new(OpKind::DELETE)
            },
        ),
        (Some(old), Some(new)) => diff_node(dom, old, new, Some(parent), (index, index), OpKind::empty(), ops),
    }
}

fn diff_node(
    dom: &Dom,
    old: NodeId,
    new: NodeId,
    parent: Option<NodeId>,
    (old_index, new_index): (usize, usize),
    extra: OpKind,
    ops: &mut Vec<DiffOp>,
) -> Result<()> {
    if old == new {
        return Ok(());
    }
    let same_kind = matches!((dom.get(old), dom.get(new)), (Some(o), Some(n)) if o.kind == n.kind);
    let kind = if same_kind { OpKind::UPDATE | extra } else { OpKind::REPLACE };
    push(
        ops,
        DiffOp {
            kind,
            old: Some(old),
            new: Some(new),
            parent,
            old_index,
            new_index,
        },
    )?;
    if same_kind {
        diff_children(dom, old, new, ops)?;
    }
    Ok(())
}

fn key_of(dom: &Dom, id: NodeId) -> Option<&str> {
    dom.get(id).and_then(|n| n.key())
}

fn diff_children(dom: &Dom, old_parent: NodeId, new_parent: NodeId, ops: &mut Vec<DiffOp>) -> Result<()> {
    let old_kids = dom.children(old_parent);
    let new_kids = dom.children(new_parent);
    let keyed = old_kids.iter().chain(new_kids).any(|&c| key_of(dom, c).is_some());
    if keyed {
        diff_keyed(dom, old_parent, old_kids, new_kids, ops)
    } else {
        diff_indexed(dom, old_parent, old_kids, new_kids, ops)
    }
}

fn diff_indexed(
    dom: &Dom,
    parent: NodeId,
    old_kids: &[NodeId],
    new_kids: &[NodeId],
    ops: &mut Vec<DiffOp>,
) -> Result<()> {
    for i in 0..old_kids.len().max(new_kids.len()) {
        match (old_kids.get(i).copied(), new_kids.get(i).copied()) {
            (Some(old), Some(new)) => diff_node(dom, old, new, Some(parent), (i, i), OpKind::empty(), ops)?,
            (None, Some(new)) => push(
                ops,
                DiffOp {
                    new: Some(new),
                    parent: Some(parent),
                    new_index: i,
                    ..DiffOp::new(OpKind::CREATE)
                },
            )?,
            (Some(old), None) => push(
                ops,
                DiffOp {
                    old: Some(old),
                    parent: Some(parent),
                    old_index: i,
                    ..DiffOp::new(OpKind::DELETE)
                },
            )?,
            (None, None) => {}
        }
    }
    Ok(())
}

fn diff_keyed(
    dom: &Dom,
    parent: NodeId,
    old_kids: &[NodeId],
    new_kids: &[NodeId],
    ops: &mut Vec<DiffOp>,
) -> Result<()> {
    let keyed_count = old_kids.iter().filter(|&&c| key_of(dom, c).is_some()).count();
    let mut map = KeyMap::try_with_capacity(keyed_count)?;
    for (i, &child) in old_kids.iter().enumerate() {
        if let Some(key) = key_of(dom, child) {
            map.insert(key, child, i);
        }
    }

    let mut used = Vec::new();
    used.try_reserve_exact(old_kids.len())?;
    used.resize(old_kids.len(), false);
    let mut last_placed = 0;

    for (new_index, &new) in new_kids.iter().enumerate() {
        let candidate = match key_of(dom, new) {
            Some(key) => map.get_mut(key).filter(|e| !e.matched).map(|e| {
                e.matched = true;
                (e.node, e.old_index)
            }),
            None => old_kids
                .get(new_index)
                .copied()
                .filter(|&old| key_of(dom, old).is_none() && !used[new_index])
                .map(|old| (old, new_index)),
        };

        let Some((old, old_index)) = candidate else {
            push(
                ops,
                DiffOp {
                    new: Some(new),
                    parent: Some(parent),
                    new_index,
                    ..DiffOp::new(OpKind::CREATE)
                },
            )?;
            continue;
        };

        used[old_index] = true;
        let extra = if old_index < last_placed {
            OpKind::REORDER
        } else {
            last_placed = old_index;
            OpKind::empty()
        };
        diff_node(dom, old, new, Some(parent), (old_index, new_index), extra, ops)?;
    }

    for (old_index, &old) in old_kids.iter().enumerate() {
        if !used[old_index] {
            push(
                ops,
                DiffOp {
                    old: Some(old),
                    parent: Some(parent),
                    old_index,
                    ..DiffOp::new(OpKind::DELETE)
                },
            )?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
