//! Versioned key-value store abstraction.
//!
//! The keeper only needs point reads and writes plus ascending prefix scans.
//! [`MemoryStore`] is the in-process implementation; [`CacheStore`] buffers
//! writes over any other store so a host can apply or discard a whole
//! operation at once.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::iter::Peekable;

/// A key and its stored value.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Boxed ascending iterator over key-value pairs.
pub type KvIter<'a> = Box<dyn Iterator<Item = KvPair> + 'a>;

/// Ordered binary key-value store.
pub trait Store {
    /// Returns the value stored under `key`.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: Vec<u8>, value: Vec<u8>);

    /// Returns true if a value is stored under `key`.
    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Iterates every pair whose key starts with `prefix`, in ascending key
    /// order.
    fn iter_prefix(&self, prefix: &[u8]) -> KvIter<'_>;
}

impl<S: Store + ?Sized> Store for &mut S {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        (**self).get(key)
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        (**self).set(key, value);
    }

    fn has(&self, key: &[u8]) -> bool {
        (**self).has(key)
    }

    fn iter_prefix(&self, prefix: &[u8]) -> KvIter<'_> {
        (**self).iter_prefix(prefix)
    }
}

fn range_prefix<'a>(map: &'a BTreeMap<Vec<u8>, Vec<u8>>, prefix: &[u8]) -> KvIter<'a> {
    let prefix = prefix.to_vec();
    Box::new(
        map.range(prefix.clone()..)
            .take_while(move |(k, _)| k.starts_with(&prefix))
            .map(|(k, v)| (k.clone(), v.clone())),
    )
}

/// In-memory [`Store`] backed by a `BTreeMap`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hashes the complete store contents in key order.
    ///
    /// Two replicas that applied the same operations yield the same hash.
    #[must_use]
    pub fn root_hash(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        for (key, value) in &self.entries {
            hasher.update(&(key.len() as u64).to_be_bytes());
            hasher.update(key);
            hasher.update(&(value.len() as u64).to_be_bytes());
            hasher.update(value);
        }
        *hasher.finalize().as_bytes()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.insert(key, value);
    }

    fn has(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    fn iter_prefix(&self, prefix: &[u8]) -> KvIter<'_> {
        range_prefix(&self.entries, prefix)
    }
}

/// Write-buffering overlay over another store.
///
/// Reads observe buffered writes. [`CacheStore::commit`] flushes them to the
/// parent; dropping the cache discards them.
#[derive(Debug)]
pub struct CacheStore<S> {
    parent: S,
    writes: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl<S: Store> CacheStore<S> {
    /// Creates an empty overlay over `parent`.
    pub fn new(parent: S) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Returns the number of buffered writes.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Applies every buffered write to the parent, in key order.
    pub fn commit(mut self) -> S {
        for (key, value) in std::mem::take(&mut self.writes) {
            self.parent.set(key, value);
        }
        self.parent
    }
}

impl<S: Store> Store for CacheStore<S> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(value) => Some(value.clone()),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, value);
    }

    fn has(&self, key: &[u8]) -> bool {
        self.writes.contains_key(key) || self.parent.has(key)
    }

    fn iter_prefix(&self, prefix: &[u8]) -> KvIter<'_> {
        Box::new(MergeIter {
            base: self.parent.iter_prefix(prefix).peekable(),
            overlay: range_prefix(&self.writes, prefix).peekable(),
        })
    }
}

/// Merges two ascending iterators; on equal keys the overlay wins.
struct MergeIter<'a> {
    base: Peekable<KvIter<'a>>,
    overlay: Peekable<KvIter<'a>>,
}

impl Iterator for MergeIter<'_> {
    type Item = KvPair;

    fn next(&mut self) -> Option<KvPair> {
        let ordering = match (self.base.peek(), self.overlay.peek()) {
            (None, None) => return None,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some((base, _)), Some((overlay, _))) => base.cmp(overlay),
        };
        match ordering {
            Ordering::Less => self.base.next(),
            Ordering::Greater => self.overlay.next(),
            Ordering::Equal => {
                self.base.next();
                self.overlay.next()
            }
        }
    }
}
