//! Key lookup for keyed child diffing.
//!
//! An open-addressing table (FNV-1a hash, linear probing) over keys
//! borrowed from the [`Dom`](crate::tree::Dom) for the span of one diff.
//! Capacity is the next power of two at or above twice the entry count, so
//! the load factor stays at or below one half and probes stay short.

use crate::error::Result;
use crate::node::NodeId;

const MIN_CAPACITY: usize = 8;

/// One old keyed child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    pub key: &'a str,
    pub node: NodeId,
    pub old_index: usize,
    /// Claimed by a new child during this diff.
    pub matched: bool,
    pub hash: u64,
}

/// Fixed-capacity map from borrowed key to [`Entry`].
#[derive(Debug)]
pub struct KeyMap<'a> {
    slots: Vec<Option<Entry<'a>>>,
    len: usize,
}

/// 64-bit FNV-1a.
#[must_use]
pub fn fnv1a(key: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    key.bytes()
        .fold(OFFSET, |h, b| (h ^ u64::from(b)).wrapping_mul(PRIME))
}

impl<'a> KeyMap<'a> {
    /// A map sized for `entries` keys.
    ///
    /// # Errors
    ///
    /// [`UiError::Alloc`](crate::UiError::Alloc) if the table cannot be
    /// allocated.
    pub fn try_with_capacity(entries: usize) -> Result<Self> {
        let capacity = entries
            .saturating_mul(2)
            .max(MIN_CAPACITY)
            .checked_next_power_of_two()
            .ok_or(crate::UiError::Alloc)?;
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;
        slots.resize(capacity, None);
        Ok(Self { slots, len: 0 })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Insert `key`. A key already present keeps its first entry and the
    /// call returns `false`; so does a full table.
    pub fn insert(&mut self, key: &'a str, node: NodeId, old_index: usize) -> bool {
        if self.len * 2 >= self.slots.len() {
            return false;
        }
        let hash = fnv1a(key);
        let Some(slot) = self.probe(key, hash) else {
            return false;
        };
        if self.slots[slot].is_some() {
            return false;
        }
        self.slots[slot] = Some(Entry {
            key,
            node,
            old_index,
            matched: false,
            hash,
        });
        self.len += 1;
        true
    }

    #[cfg(test)]
    fn get(&self, key: &str) -> Option<&Entry<'a>> {
        let slot = self.probe(key, fnv1a(key))?;
        self.slots[slot].as_ref()
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Entry<'a>> {
        let slot = self.probe(key, fnv1a(key))?;
        self.slots[slot].as_mut()
    }

    /// Entries never claimed by a new child.
    #[cfg(test)]
    fn unmatched(&self) -> impl Iterator<Item = &Entry<'a>> {
        self.slots.iter().flatten().filter(|e| !e.matched)
    }

    /// Slot holding `key`, or the empty slot where it would go.
    fn probe(&self, key: &str, hash: u64) -> Option<usize> {
        let mask = self.slots.len() - 1;
        // Masked, so it fits in usize on every target.
        #[allow(clippy::cast_possible_truncation)]
        let mut i = (hash as usize) & mask;
        for _ in 0..self.slots.len() {
            match &self.slots[i] {
                None => return Some(i),
                Some(e) if e.hash == hash && e.key == key => return Some(i),
                Some(_) => i = (i + 1) & mask,
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: u32) -> NodeId {
        NodeId { index, generation: 0 }
    }

    #[test]
    fn capacity_is_power_of_two_at_least_double() {
        assert_eq!(KeyMap::try_with_capacity(0).unwrap().capacity(), 8);
        assert_eq!(KeyMap::try_with_capacity(5).unwrap().capacity(), 16);
        assert_eq!(KeyMap::try_with_capacity(8).unwrap().capacity(), 16);
        assert_eq!(KeyMap::try_with_capacity(9).unwrap().capacity(), 32);
    }

    #[test]
    fn insert_and_get() {
        let keys = ["a", "b", "c"];
        let mut map = KeyMap::try_with_capacity(keys.len()).unwrap();
        for (i, k) in keys.iter().enumerate() {
            assert!(map.insert(k, id(u32::try_from(i).unwrap()), i));
        }
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("b").unwrap().old_index, 1);
        assert!(map.get("z").is_none());
    }

    #[test]
    fn duplicate_keeps_first() {
        let mut map = KeyMap::try_with_capacity(2).unwrap();
        assert!(map.insert("k", id(1), 0));
        assert!(!map.insert("k", id(2), 1));
        assert_eq!(map.get("k").unwrap().node, id(1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn matched_flag_and_unmatched_iter() {
        let mut map = KeyMap::try_with_capacity(2).unwrap();
        map.insert("x", id(1), 0);
        map.insert("y", id(2), 1);
        map.get_mut("x").unwrap().matched = true;
        let left: Vec<_> = map.unmatched().map(|e| e.key).collect();
        assert_eq!(left, ["y"]);
    }

    #[test]
    fn many_keys_with_collisions() {
        let keys: Vec<String> = (0..200).map(|i| format!("item-{i}")).collect();
        let mut map = KeyMap::try_with_capacity(keys.len()).unwrap();
        for (i, k) in keys.iter().enumerate() {
            assert!(map.insert(k, id(u32::try_from(i).unwrap()), i));
        }
        for (i, k) in keys.iter().enumerate() {
            assert_eq!(map.get(k).unwrap().old_index, i);
        }
    }

    #[test]
    fn fnv_reference_values() {
        assert_eq!(fnv1a(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a("a"), 0xaf63_dc4c_8601_ec8c);
    }
}
