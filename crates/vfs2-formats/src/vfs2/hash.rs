//! Path hashing and the hash to entry index

use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;

use crate::vfs2::tree::EntryRef;

/// djb2 seed
const HASH_SEED: u32 = 5381;
/// Bits kept from the running hash
const HASH_MASK: u32 = 0x3FFF_FFFF;
/// Marker bit set on every path hash
const HASH_MARKER: u32 = 0x4000_0000;

/// Hash a `/`-separated path the way the target loader does.
///
/// The path is prefixed with `/` when it does not start with one and is
/// hashed case-insensitively, so `ui`, `/ui` and `UI` are the same key.
/// The result always has bit 30 set and bit 31 clear.
pub fn path_hash(path: &str) -> u32 {
    let mut hash = HASH_SEED;
    if !path.starts_with('/') {
        hash = step(hash, '/');
    }
    for c in path.chars().flat_map(char::to_lowercase) {
        hash = step(hash, c);
    }
    (hash & HASH_MASK) | HASH_MARKER
}

#[inline]
fn step(hash: u32, c: char) -> u32 {
    hash.wrapping_shl(5)
        .wrapping_add(hash)
        .wrapping_add(u32::from(c))
}

/// Index from path hash to the entry carrying it.
///
/// The root directory is never indexed.
#[derive(Debug, Clone, Default)]
pub struct HashIndex {
    entries: HashMap<u32, EntryRef>,
}

impl HashIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Insert an entry.
    ///
    /// On a repeated key the index is left unchanged and the entry already
    /// holding the hash is returned.
    pub fn insert(&mut self, hash: u32, entry: EntryRef) -> Result<(), EntryRef> {
        match self.entries.entry(hash) {
            MapEntry::Occupied(existing) => Err(*existing.get()),
            MapEntry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    /// Look up the entry carrying `hash`
    pub fn get(&self, hash: u32) -> Option<EntryRef> {
        self.entries.get(&hash).copied()
    }

    /// Check whether `hash` is indexed
    pub fn contains(&self, hash: u32) -> bool {
        self.entries.contains_key(&hash)
    }

    /// Number of indexed entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexed `(hash, entry)` pairs in ascending hash order
    pub fn sorted(&self) -> Vec<(u32, EntryRef)> {
        let mut pairs: Vec<_> = self.entries.iter().map(|(&h, &e)| (h, e)).collect();
        pairs.sort_unstable_by_key(|&(h, _)| h);
        pairs
    }
}
