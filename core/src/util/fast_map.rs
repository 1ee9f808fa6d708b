//! FxHash-backed collections for symbol tables and map values.

pub type FastHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

pub type FastHashSet<K> = rustc_hash::FxHashSet<K>;

#[inline]
pub fn fast_hash_map_new<K, V>() -> FastHashMap<K, V> {
    rustc_hash::FxHashMap::default()
}

#[inline]
pub fn fast_hash_set_new<K>() -> FastHashSet<K> {
    rustc_hash::FxHashSet::default()
}
