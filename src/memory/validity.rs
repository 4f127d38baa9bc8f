//! Validity-tracked key/value cache
//!
//! Every entry carries a `valid` flag (may be returned without a target
//! re-fetch) and a `dirty` flag (written locally, not yet pushed to the
//! target). Keys are normalized before every lookup so `" r0"` and `"R0"`
//! can share an entry when the cache is built with [`normalize_register`].

use rustc_hash::FxHashMap;

/// One cached value with its flags
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub valid: bool,
    pub dirty: bool,
}

/// Symbol names compare after trimming
pub fn normalize_symbol(key: &str) -> String {
    key.trim().to_string()
}

/// Register names compare case-insensitively
pub fn normalize_register(key: &str) -> String {
    key.trim().to_ascii_uppercase()
}

#[derive(Debug, Clone)]
pub struct ValidityCache<V> {
    entries: FxHashMap<String, CacheEntry<V>>,
    normalize: fn(&str) -> String,
}

impl<V> Default for ValidityCache<V> {
    fn default() -> Self {
        Self::new(normalize_symbol)
    }
}

impl<V> ValidityCache<V> {
    pub fn new(normalize: fn(&str) -> String) -> Self {
        Self {
            entries: FxHashMap::default(),
            normalize,
        }
    }

    pub fn key(&self, key: &str) -> String {
        (self.normalize)(key)
    }

    /// The cached value, only while the entry is valid
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries
            .get(&self.key(key))
            .filter(|entry| entry.valid)
            .map(|entry| &entry.value)
    }

    pub fn entry(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(&self.key(key))
    }

    /// Store a value fetched from the target: valid and clean
    pub fn set(&mut self, key: &str, value: V) {
        self.put(key, value, false);
    }

    /// Store a locally written value: valid but pending push-back
    pub fn set_dirty(&mut self, key: &str, value: V) {
        self.put(key, value, true);
    }

    fn put(&mut self, key: &str, value: V, dirty: bool) {
        let key = self.key(key);
        self.entries.insert(
            key,
            CacheEntry {
                value,
                valid: true,
                dirty,
            },
        );
    }

    /// Return the entry's value, creating it with `factory` the first time
    /// the key is seen. The factory never runs twice for the same key.
    pub fn ensure(&mut self, key: &str, factory: impl FnOnce() -> V) -> &mut V {
        let key = self.key(key);
        &mut self
            .entries
            .entry(key)
            .or_insert_with(|| CacheEntry {
                value: factory(),
                valid: true,
                dirty: false,
            })
            .value
    }

    /// Mark one entry stale; the value stays for `ensure` callers
    pub fn invalidate(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(&(self.normalize)(key)) {
            entry.valid = false;
        }
    }

    pub fn invalidate_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.valid = false;
        }
    }

    pub fn delete(&mut self, key: &str) -> Option<V> {
        let key = self.key(key);
        self.entries.remove(&key).map(|entry| entry.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Keys and values written locally but not yet pushed back
    pub fn dirty_entries(&self) -> Vec<(String, &V)> {
        let mut dirty: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.dirty)
            .map(|(key, entry)| (key.clone(), &entry.value))
            .collect();
        dirty.sort_by(|a, b| a.0.cmp(&b.0));
        dirty
    }

    pub fn mark_clean(&mut self, key: &str) {
        if let Some(entry) = self.entries.get_mut(&(self.normalize)(key)) {
            entry.dirty = false;
        }
    }

    /// Mutable access to every value, valid or not
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.entries.values_mut().map(|entry| &mut entry.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
