//! Input-line history: submitted entries plus Up/Down navigation.
//!
//! The history is bounded; adding past capacity evicts the oldest entry.
//! Navigation starts past the newest entry (the "live" line). `prev` walks
//! toward older entries and stops at the oldest; `next` walks back toward
//! newer ones and, past the newest, leaves navigation so the caller can
//! restore the draft saved with [`InputHistory::save_temp`].

use std::collections::VecDeque;

use crate::error::{Result, UiError};

// ---------------------------------------------------------------------------
// InputHistory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct InputHistory {
    entries: VecDeque<String>,
    capacity: usize,
    /// Index of the entry being shown; `None` on the live line.
    cursor: Option<usize>,
    temp: Option<String>,
}

impl InputHistory {
    /// # Errors
    ///
    /// [`UiError::Capacity`] for a capacity of zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(UiError::Capacity);
        }
        Ok(Self {
            entries: VecDeque::new(),
            capacity,
            cursor: None,
            temp: None,
        })
    }

    /// Record a submitted line and return to the live line.
    pub fn add(&mut self, line: impl Into<String>) {
        self.cursor = None;
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line.into());
    }

    /// Like [`add`](Self::add), but skips empty lines and repeats of the
    /// newest entry. Returns whether the line was recorded.
    pub fn add_unique(&mut self, line: impl Into<String>) -> bool {
        let line = line.into();
        if line.is_empty() || self.entries.back() == Some(&line) {
            self.cursor = None;
            return false;
        }
        self.add(line);
        true
    }

    /// One entry older. `None` when empty or already at the oldest.
    pub fn prev(&mut self) -> Option<&str> {
        let target = match self.cursor {
            None => self.entries.len().checked_sub(1)?,
            Some(0) => return None,
            Some(i) => i - 1,
        };
        self.cursor = Some(target);
        self.entries.get(target).map(String::as_str)
    }

    /// One entry newer. Past the newest, navigation ends and `None` is
    /// returned.
    pub fn next(&mut self) -> Option<&str> {
        let i = self.cursor?;
        if i + 1 >= self.entries.len() {
            self.cursor = None;
            return None;
        }
        self.cursor = Some(i + 1);
        self.entries.get(i + 1).map(String::as_str)
    }

    /// Stash the unsubmitted draft before navigating.
    pub fn save_temp(&mut self, draft: impl Into<String>) {
        self.temp = Some(draft.into());
    }

    #[must_use]
    pub fn get_temp(&self) -> Option<&str> {
        self.temp.as_deref()
    }

    /// Oldest first.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.entries.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub const fn is_navigating(&self) -> bool {
        self.cursor.is_some()
    }

    pub const fn reset_navigation(&mut self) {
        self.cursor = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
