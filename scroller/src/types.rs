use crate::CacheKey;

/// Anything that can live in a virtualized list.
///
/// The engine never looks past the key: identity is by key, order is list order.
pub trait Keyed {
    type Key: CacheKey + Clone;

    fn key(&self) -> &Self::Key;
}

/// A keyed list entry with an opaque payload.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item<K, P> {
    pub key: K,
    pub payload: P,
}

impl<K, P> Item<K, P> {
    pub fn new(key: K, payload: P) -> Self {
        Self { key, payload }
    }
}

impl<K: CacheKey + Clone, P> Keyed for Item<K, P> {
    type Key = K;

    fn key(&self) -> &K {
        &self.key
    }
}

/// An item placed in the runway.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderedItem<T> {
    pub item: T,
    /// Top edge in runway coordinates (not viewport coordinates).
    pub offset: i64,
}

impl<T: Keyed> RenderedItem<T> {
    pub fn key(&self) -> &T::Key {
        self.item.key()
    }

    /// Same key at the same offset.
    pub fn same_placement(&self, other: &Self) -> bool {
        self.offset == other.offset && self.item.key() == other.item.key()
    }
}

/// The currently materialized window, ordered top to bottom.
pub type Rendition<T> = alloc::vec::Vec<RenderedItem<T>>;
