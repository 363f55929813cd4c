//! Small fingerprint-keyed caches for values derived from a snapshot.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of the inputs a derived value was computed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

#[derive(Default)]
pub struct FingerprintBuilder {
    hasher: DefaultHasher,
}

impl FingerprintBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Hash + ?Sized>(mut self, value: &T) -> Self {
        value.hash(&mut self.hasher);
        self
    }

    /// Floats are hashed by bit pattern.
    pub fn with_f64(mut self, value: f64) -> Self {
        value.to_bits().hash(&mut self.hasher);
        self
    }

    pub fn finish(self) -> Fingerprint {
        Fingerprint(self.hasher.finish())
    }
}

/// Keeps the last `capacity` derived values; lookups move nothing.
pub struct DerivedCache<V> {
    entries: VecDeque<(Fingerprint, Arc<V>)>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl<V> DerivedCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&self, key: Fingerprint) -> Option<Arc<V>> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| Arc::clone(v))
    }

    /// Returns the cached value for `key` or computes, stores and returns it.
    pub fn get_or_insert_with<E>(
        &mut self,
        key: Fingerprint,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(v) = self.get(key) {
            self.hits += 1;
            return Ok(v);
        }
        self.misses += 1;
        let value = Arc::new(compute()?);
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((key, Arc::clone(&value)));
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
