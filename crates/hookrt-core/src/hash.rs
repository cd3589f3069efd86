use std::hash::{Hash, Hasher};

#[cfg(feature = "std-hash")]
pub mod default {
    pub use std::collections::hash_map::DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::new()
    }
}

#[cfg(not(feature = "std-hash"))]
pub mod default {
    // fast branch
    pub use ahash::AHasher as DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::default()
    }
}

/// Hashes a user supplied child key down to the 64-bit form stored in the tree.
pub fn hash_key<K: Hash + ?Sized>(key: &K) -> u64 {
    let mut hasher = default::new();
    key.hash(&mut hasher);
    hasher.finish()
}
