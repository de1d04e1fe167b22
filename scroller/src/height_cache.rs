use alloc::vec::Vec;

use crate::CacheKey;
use crate::key::KeyMap;

/// Anything that can answer "how tall is this item right now".
///
/// [`crate::Layout`] only needs this; [`HeightCache`] is the implementation the engine uses.
pub trait HeightSource<K> {
    fn height(&self, key: &K) -> u32;
}

/// Last known height per item key, with a default for items never measured.
///
/// Records are never evicted: items that leave the window keep their height so coming back
/// into view does not reflow the neighbours.
#[derive(Clone, Debug)]
pub struct HeightCache<K> {
    heights: KeyMap<K, u32>,
    default_height: u32,
}

impl<K: CacheKey> HeightCache<K> {
    pub fn new(default_height: u32) -> Self {
        Self {
            heights: KeyMap::new(),
            default_height,
        }
    }

    pub fn default_height(&self) -> u32 {
        self.default_height
    }

    /// Recorded height, or the default height when `key` was never measured.
    pub fn get(&self, key: &K) -> u32 {
        self.heights
            .get(key)
            .copied()
            .unwrap_or(self.default_height)
    }

    pub fn update(&mut self, key: K, height: u32) {
        self.heights.insert(key, height);
    }

    pub fn has_record(&self, key: &K) -> bool {
        self.heights.contains_key(key)
    }

    /// Number of measured items.
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    /// Iterates over the recorded heights without allocations.
    pub fn for_each(&self, mut f: impl FnMut(&K, u32)) {
        for (k, &h) in &self.heights {
            f(k, h);
        }
    }

    /// Exports the recorded heights (useful for persistence).
    pub fn export(&self) -> Vec<(K, u32)>
    where
        K: Clone,
    {
        self.heights.iter().map(|(k, &h)| (k.clone(), h)).collect()
    }

    /// Adds records from `entries`, overwriting existing ones with the same key.
    pub fn import(&mut self, entries: impl IntoIterator<Item = (K, u32)>) {
        let mut n = 0usize;
        for (k, h) in entries {
            self.heights.insert(k, h);
            n = n.saturating_add(1);
        }
        sdebug!(entries = n, records = self.heights.len(), "HeightCache::import");
    }
}

impl<K: CacheKey> HeightSource<K> for HeightCache<K> {
    fn height(&self, key: &K) -> u32 {
        self.get(key)
    }
}
