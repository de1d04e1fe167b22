#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(feature = "std")]
use std::collections::HashMap;

#[cfg(feature = "std")]
pub(crate) type KeyMap<K, V> = HashMap<K, V>;
#[cfg(not(feature = "std"))]
pub(crate) type KeyMap<K, V> = BTreeMap<K, V>;

/// Bound for item keys used as cache/queue keys.
///
/// With `std` this is `Hash + Eq` (backed by `HashMap`); without it, `Ord` (backed by
/// `BTreeMap`).
#[cfg(feature = "std")]
pub trait CacheKey: core::hash::Hash + Eq {}
#[cfg(feature = "std")]
impl<K: core::hash::Hash + Eq> CacheKey for K {}

/// Bound for item keys used as cache/queue keys.
///
/// With `std` this is `Hash + Eq` (backed by `HashMap`); without it, `Ord` (backed by
/// `BTreeMap`).
#[cfg(not(feature = "std"))]
pub trait CacheKey: Ord {}
#[cfg(not(feature = "std"))]
impl<K: Ord> CacheKey for K {}
