//! Hashed collections used across the workspace.
//!
//! Texture metadata lookups sit on the per-frame path, so maps are keyed
//! with AHash rather than SipHash.

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet, RandomState};

/// Map with room for `capacity` entries before reallocating.
pub fn map_with_capacity<K, V>(capacity: usize) -> HashMap<K, V> {
    HashMap::with_capacity(capacity)
}
