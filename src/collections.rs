//! Map and set aliases for the in-memory joins.
//!
//! With the `gxhash` feature the classifier's path and hash indexes use
//! gxhash (needs AES-NI/SSE2 at build time); otherwise they fall back to the
//! std hasher. Construct maps with `Default::default()` so both builds work.

#[cfg(feature = "gxhash")]
pub use gxhash::{HashMap, HashSet};

#[cfg(not(feature = "gxhash"))]
pub use std::collections::{HashMap, HashSet};

use std::hash::Hash;

/// Multi-map from a join key to every value sharing it.
///
/// Each value list is sorted, so walking a group is independent of the
/// order records arrived in.
pub type Groups<K, V> = HashMap<K, Vec<V>>;

/// Build sorted groups from `(key, value)` pairs
pub fn group_sorted<K, V, I>(pairs: I) -> Groups<K, V>
where
    K: Eq + Hash,
    V: Ord,
    I: IntoIterator<Item = (K, V)>,
{
    let mut groups: Groups<K, V> = HashMap::default();
    for (key, value) in pairs {
        groups.entry(key).or_default().push(value);
    }
    for values in groups.values_mut() {
        values.sort();
    }
    groups
}
