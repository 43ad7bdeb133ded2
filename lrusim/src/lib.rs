#![doc = include_str!("../../README.md")]
#![deny(missing_docs)]

mod arena;
mod error;

use std::{
    borrow::Borrow,
    hash::{
        BuildHasher,
        Hash,
    },
    num::NonZeroUsize,
};

pub use arena::{
    IntoIter,
    Iter,
};
use arena::{
    Arena,
    Entry,
    Ptr,
};
pub use error::CapacityError;
use hashbrown::HashTable;

#[cfg(not(feature = "ahash"))]
type RandomState = std::hash::RandomState;
#[cfg(feature = "ahash")]
type RandomState = ahash::RandomState;

// Larger caches grow their storage on demand instead of reserving it all.
const PREALLOCATED_ENTRIES: usize = 4096;

/// Outcome of [`LruCache::put`].
///
/// `put` never fails; this reports which of its three paths was taken so
/// callers can render or react to evictions without the cache doing any I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Put<K, V> {
    /// A new key was stored without displacing anything.
    Inserted,
    /// The key was already cached. Holds the value it replaced.
    Updated(V),
    /// A new key was stored and the least recently used entry was evicted to
    /// make room. Holds the evicted key and value.
    Evicted(K, V),
}

impl<K, V> Put<K, V> {
    /// Returns the evicted entry, if this insertion caused an eviction.
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use lrusim::LruCache;
    ///
    /// let mut cache = LruCache::new(NonZeroUsize::new(1).unwrap());
    /// assert_eq!(cache.put("x", 1).into_evicted(), None);
    /// assert_eq!(cache.put("y", 2).into_evicted(), Some(("x", 1)));
    /// ```
    pub fn into_evicted(self) -> Option<(K, V)> {
        match self {
            Put::Evicted(key, value) => Some((key, value)),
            Put::Inserted | Put::Updated(_) => None,
        }
    }

    /// Returns true if the key was already present and only its value changed.
    pub fn is_update(&self) -> bool {
        matches!(self, Put::Updated(_))
    }
}

/// A fixed-capacity least-recently-used cache.
///
/// Lookups go through a hash index of slot handles; recency is kept in a
/// doubly linked list of slots bounded by two sentinels. Both structures are
/// updated together by every operation, so a key is in the index exactly when
/// its entry is linked into the recency list.
///
/// # Time Complexity
/// - Get/Put/Remove: O(1) average, O(n) worst case
/// - Peek/Contains: O(1) average, O(n) worst case
/// - Pop/Lru/Mru: O(1)
/// - Clear: O(n)
///
/// # Examples
///
/// ```rust
/// use std::num::NonZeroUsize;
///
/// use lrusim::{
///     LruCache,
///     Put,
/// };
///
/// let mut cache = LruCache::new(NonZeroUsize::new(3).unwrap());
/// cache.put("a", 1);
/// cache.put("b", 2);
/// cache.put("c", 3);
///
/// assert_eq!(cache.get(&"a"), Some(&1)); // "a" is now most recently used
/// assert_eq!(cache.put("d", 4), Put::Evicted("b", 2));
///
/// // Iteration runs from most to least recently used.
/// assert_eq!(
///     cache.into_iter().collect::<Vec<_>>(),
///     [("d", 4), ("a", 1), ("c", 3)]
/// );
/// ```
pub struct LruCache<K, V> {
    index: HashTable<Ptr>,
    arena: Arena<K, V>,
    capacity: NonZeroUsize,
    hasher: RandomState,
}

impl<K, V> std::fmt::Debug for LruCache<K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("entries", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl<K, V> Clone for LruCache<K, V>
where
    K: Clone,
    V: Clone,
{
    fn clone(&self) -> Self {
        // Slab keys survive cloning, so the cloned index still points at the
        // right slots.
        Self {
            index: self.index.clone(),
            arena: self.arena.clone(),
            capacity: self.capacity,
            hasher: self.hasher.clone(),
        }
    }
}

impl<K: Hash + Eq, V> LruCache<K, V> {
    /// Creates a new, empty cache holding at most `capacity` entries.
    ///
    /// Storage for small caches is allocated up front. Large capacities only
    /// bound the number of entries and allocate as entries arrive, so any
    /// non-zero capacity is accepted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use lrusim::LruCache;
    ///
    /// let cache: LruCache<i32, String> = LruCache::new(NonZeroUsize::new(100).unwrap());
    /// assert_eq!(cache.capacity(), 100);
    /// assert!(cache.is_empty());
    /// ```
    pub fn new(capacity: NonZeroUsize) -> Self {
        let reserved = capacity.get().min(PREALLOCATED_ENTRIES);
        Self {
            index: HashTable::with_capacity(reserved),
            arena: Arena::with_capacity(reserved),
            capacity,
            hasher: RandomState::default(),
        }
    }

    /// Creates a new, empty cache from an unchecked integer capacity.
    ///
    /// # Errors
    ///
    /// * [`CapacityError::Zero`] if `capacity` is zero.
    /// * [`CapacityError::OutOfRange`] if `capacity` is negative or does not
    ///   fit in a `usize`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lrusim::{
    ///     CapacityError,
    ///     LruCache,
    /// };
    ///
    /// let cache = LruCache::<&str, i32>::try_new(3).unwrap();
    /// assert_eq!(cache.capacity(), 3);
    ///
    /// assert_eq!(
    ///     LruCache::<&str, i32>::try_new(0).unwrap_err(),
    ///     CapacityError::Zero
    /// );
    /// assert_eq!(
    ///     LruCache::<&str, i32>::try_new(-1).unwrap_err(),
    ///     CapacityError::OutOfRange
    /// );
    /// ```
    pub fn try_new<C: TryInto<usize>>(capacity: C) -> Result<Self, CapacityError> {
        let capacity = capacity
            .try_into()
            .map_err(|_| CapacityError::OutOfRange)?;
        NonZeroUsize::new(capacity)
            .map(Self::new)
            .ok_or(CapacityError::Zero)
    }

    /// Gets a value from the cache, marking it as most recently used.
    ///
    /// A miss returns `None` and leaves the recency order untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use lrusim::LruCache;
    ///
    /// let mut cache = LruCache::new(NonZeroUsize::new(3).unwrap());
    /// cache.put(1, "one".to_string());
    /// cache.put(2, "two".to_string());
    ///
    /// assert_eq!(cache.get(&1), Some(&"one".to_string()));
    /// assert_eq!(cache.get(&3), None);
    /// assert_eq!(cache.keys().collect::<Vec<_>>(), [&1, &2]);
    /// ```
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_mut(key).map(|v| &*v)
    }

    /// Gets a mutable reference to a value, marking it as most recently used.
    ///
    /// This is the mutable version of [`get()`](Self::get).
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use lrusim::LruCache;
    ///
    /// let mut cache = LruCache::new(NonZeroUsize::new(2).unwrap());
    /// cache.put("hits", 0);
    /// if let Some(hits) = cache.get_mut(&"hits") {
    ///     *hits += 1;
    /// }
    /// assert_eq!(cache.peek(&"hits"), Some(&1));
    /// ```
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let ptr = self.find_ptr(key)?;
        self.arena.move_to_front(ptr);
        Some(&mut self.arena[ptr].value)
    }

    /// Returns a reference to the value without updating its recency.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use lrusim::LruCache;
    ///
    /// let mut cache = LruCache::new(NonZeroUsize::new(3).unwrap());
    /// cache.put(1, "one");
    /// cache.put(2, "two");
    ///
    /// assert_eq!(cache.peek(&1), Some(&"one"));
    /// assert_eq!(cache.keys().collect::<Vec<_>>(), [&2, &1]);
    /// ```
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let ptr = self.find_ptr(key)?;
        Some(&self.arena[ptr].value)
    }

    /// Returns true if the cache contains the given key.
    ///
    /// Does not count as a use of the key.
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use lrusim::LruCache;
    ///
    /// let mut cache = LruCache::new(NonZeroUsize::new(2).unwrap());
    /// cache.put("a", 1);
    /// assert!(cache.contains(&"a"));
    /// assert!(!cache.contains(&"b"));
    /// ```
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_ptr(key).is_some()
    }

    /// Inserts or updates a key-value pair, marking it as most recently used.
    ///
    /// If the key is already cached its value is replaced in place and the
    /// cache never evicts. If the key is new and the cache is full, the least
    /// recently used entry is evicted; exactly one entry is evicted per such
    /// insertion.
    ///
    /// # Returns
    ///
    /// * [`Put::Inserted`] if a new key was stored without eviction
    /// * [`Put::Updated`] with the previous value if the key was present
    /// * [`Put::Evicted`] with the displaced entry if the cache was full
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use lrusim::{
    ///     LruCache,
    ///     Put,
    /// };
    ///
    /// let mut cache = LruCache::new(NonZeroUsize::new(2).unwrap());
    /// assert_eq!(cache.put(1, "Alice"), Put::Inserted);
    /// assert_eq!(cache.put(2, "Bob"), Put::Inserted);
    /// assert_eq!(cache.put(1, "Alicia"), Put::Updated("Alice"));
    /// assert_eq!(cache.put(3, "Charlie"), Put::Evicted(2, "Bob"));
    /// assert_eq!(cache.len(), 2);
    /// ```
    pub fn put(&mut self, key: K, value: V) -> Put<K, V> {
        let hash = self.hasher.hash_one(&key);
        let arena = &self.arena;
        if let Some(&ptr) = self.index.find(hash, |&ptr| arena[ptr].key == key) {
            let old = std::mem::replace(&mut self.arena[ptr].value, value);
            self.arena.move_to_front(ptr);
            return Put::Updated(old);
        }

        // Evicting before linking lets the new entry reuse the freed slot. The
        // victim is the same either way since new entries land at the front.
        let evicted = if self.len() == self.capacity.get() {
            self.pop_lru()
        } else {
            None
        };

        let ptr = self.arena.push_front(Entry { key, value, hash });
        let arena = &self.arena;
        self.index
            .insert_unique(hash, ptr, |&ptr| arena[ptr].hash);

        debug_assert!(self.len() <= self.capacity.get());
        match evicted {
            Some((key, value)) => Put::Evicted(key, value),
            None => Put::Inserted,
        }
    }

    /// Removes a specific entry from the cache.
    ///
    /// # Returns
    ///
    /// * `Some(Value)` if the key existed and was removed
    /// * `None` if the key was not found
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use lrusim::LruCache;
    ///
    /// let mut cache = LruCache::new(NonZeroUsize::new(3).unwrap());
    /// cache.put(1, "one".to_string());
    /// cache.put(2, "two".to_string());
    ///
    /// assert_eq!(cache.remove(&1), Some("one".to_string()));
    /// assert_eq!(cache.remove(&1), None);
    /// assert_eq!(cache.len(), 1);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hasher.hash_one(key);
        let arena = &self.arena;
        match self
            .index
            .find_entry(hash, |&ptr| key == arena[ptr].key.borrow())
        {
            Ok(occupied) => {
                let (ptr, _) = occupied.remove();
                Some(self.arena.remove(ptr).value)
            }
            Err(_) => None,
        }
    }

    fn find_ptr<Q>(&self, key: &Q) -> Option<Ptr>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hasher.hash_one(key);
        self.index
            .find(hash, |&ptr| key == self.arena[ptr].key.borrow())
            .copied()
    }
}

impl<K, V> LruCache<K, V> {
    /// Returns the maximum number of entries the cache can hold.
    ///
    /// Fixed at construction.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Returns the number of entries currently in the cache.
    ///
    /// Never exceeds [`capacity()`](Self::capacity).
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.index.len(), self.arena.len());
        self.arena.len()
    }

    /// Returns true if the cache contains no entries.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Removes and returns the least recently used entry.
    ///
    /// This is the entry the next capacity-breaching [`put()`](Self::put)
    /// would evict.
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use lrusim::LruCache;
    ///
    /// let mut cache = LruCache::new(NonZeroUsize::new(3).unwrap());
    /// cache.put(1, "one");
    /// cache.put(2, "two");
    ///
    /// assert_eq!(cache.pop_lru(), Some((1, "one")));
    /// assert_eq!(cache.pop_lru(), Some((2, "two")));
    /// assert_eq!(cache.pop_lru(), None);
    /// ```
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let ptr = self.arena.back()?;
        Some(self.remove_ptr(ptr))
    }

    /// Returns the least recently used entry without touching it.
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use lrusim::LruCache;
    ///
    /// let mut cache = LruCache::new(NonZeroUsize::new(3).unwrap());
    /// assert_eq!(cache.lru(), None);
    ///
    /// cache.put(1, "one");
    /// cache.put(2, "two");
    /// assert_eq!(cache.lru(), Some((&1, &"one")));
    /// assert_eq!(cache.mru(), Some((&2, &"two")));
    /// ```
    pub fn lru(&self) -> Option<(&K, &V)> {
        self.arena.back().map(|ptr| self.entry_at(ptr))
    }

    /// Returns the most recently used entry without touching it.
    pub fn mru(&self) -> Option<(&K, &V)> {
        self.arena.front().map(|ptr| self.entry_at(ptr))
    }

    /// Removes all entries from the cache. The capacity remains unchanged.
    pub fn clear(&mut self) {
        self.index.clear();
        self.arena.clear();
    }

    /// Returns an iterator over the entries from most recently used to least
    /// recently used.
    ///
    /// Iterating is read-only and never changes the recency order. The
    /// iterator is double-ended, so `.rev()` walks in eviction order.
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use lrusim::LruCache;
    ///
    /// let mut cache = LruCache::new(NonZeroUsize::new(3).unwrap());
    /// cache.put("a", 1);
    /// cache.put("b", 2);
    /// cache.put("c", 3);
    /// cache.get(&"a");
    ///
    /// assert_eq!(
    ///     cache.iter().collect::<Vec<_>>(),
    ///     [(&"a", &1), (&"c", &3), (&"b", &2)]
    /// );
    /// assert_eq!(cache.iter().rev().next(), cache.lru());
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.arena.iter()
    }

    /// Returns an iterator over the keys from most to least recently used.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator {
        self.iter().map(|(k, _)| k)
    }

    /// Returns an iterator over the values from most to least recently used.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator {
        self.iter().map(|(_, v)| v)
    }

    fn entry_at(&self, ptr: Ptr) -> (&K, &V) {
        let entry = &self.arena[ptr];
        (&entry.key, &entry.value)
    }

    // Drops the index record and the recency slot for `ptr` together.
    fn remove_ptr(&mut self, ptr: Ptr) -> (K, V) {
        debug_assert!(self.arena.is_occupied(ptr), "Removing a vacant slot: {ptr:?}");
        let hash = self.arena[ptr].hash;
        match self.index.find_entry(hash, |&p| p == ptr) {
            Ok(occupied) => {
                occupied.remove();
            }
            Err(_) => {
                #[cfg(debug_assertions)]
                unreachable!("Pointer not found in index: {ptr:?}");
            }
        }
        let entry = self.arena.remove(ptr);
        (entry.key, entry.value)
    }

    /// Validates that the index and the recency list describe the same set of
    /// entries. This is **expensive** and only meant for debugging.
    #[doc(hidden)]
    #[cfg(any(test, all(debug_assertions, feature = "internal-debugging")))]
    pub fn debug_validate(&self) {
        self.arena.debug_validate();
        assert_eq!(
            self.index.len(),
            self.arena.len(),
            "Index and recency list disagree on length"
        );
        assert!(self.len() <= self.capacity(), "Cache over capacity");
        for &ptr in self.index.iter() {
            assert!(!ptr.is_sentinel(), "Index points at a sentinel");
            assert!(self.arena.is_occupied(ptr), "Index points at a vacant slot");
        }
    }
}

impl<K, V> IntoIterator for LruCache<K, V> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    /// Consumes the cache, yielding entries from most to least recently used.
    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.arena)
    }
}

impl<'a, K, V> IntoIterator for &'a LruCache<K, V> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Hash + Eq, V> Extend<(K, V)> for LruCache<K, V> {
    /// Puts every pair in order, evicting as needed.
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.put(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    //! Checks that trait impls and the two internal structures stay in
    //! agreement. Behavioural tests live in `tests/test_lru.rs`.

    use std::num::NonZeroUsize;

    use crate::{
        LruCache,
        Put,
    };

    fn cache(capacity: usize) -> LruCache<i32, String> {
        LruCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_cache_clone_is_independent() {
        let mut cache = cache(3);
        cache.put(1, "one".to_string());
        cache.put(2, "two".to_string());

        let mut cloned = cache.clone();
        cloned.debug_validate();
        assert_eq!(cloned.len(), 2);
        assert_eq!(cloned.peek(&1), Some(&"one".to_string()));

        cloned.put(3, "three".to_string());
        cloned.get(&1);
        assert_eq!(cloned.keys().collect::<Vec<_>>(), [&1, &3, &2]);
        assert_eq!(cache.keys().collect::<Vec<_>>(), [&2, &1]);
        cloned.debug_validate();
        cache.debug_validate();
    }

    #[test]
    fn test_cache_debug() {
        let mut cache = cache(2);
        cache.put(1, "one".to_string());
        cache.put(2, "two".to_string());

        let debug = format!("{cache:?}");
        assert!(debug.starts_with("LruCache"));
        assert!(debug.contains("len: 2"));
        assert!(debug.contains(r#"entries: [(2, "two"), (1, "one")]"#));
    }

    #[test]
    fn test_index_tracks_every_mutation() {
        let mut cache = cache(3);
        for i in 0..10 {
            cache.put(i, i.to_string());
            cache.debug_validate();
        }
        cache.get(&8);
        cache.debug_validate();
        cache.put(8, "eight".to_string());
        cache.debug_validate();
        cache.remove(&9);
        cache.debug_validate();
        cache.pop_lru();
        cache.debug_validate();
        assert_eq!(cache.keys().collect::<Vec<_>>(), [&8]);
        cache.clear();
        cache.debug_validate();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_borrowed_key_lookup() {
        let mut cache: LruCache<String, i32> = LruCache::new(NonZeroUsize::new(2).unwrap());
        cache.put("user:101".to_string(), 42);
        assert!(cache.contains("user:101"));
        assert_eq!(cache.get("user:101"), Some(&42));
        assert_eq!(cache.peek("user:202"), None);
        assert_eq!(cache.remove("user:101"), Some(42));
        cache.debug_validate();
    }

    #[test]
    fn test_put_outcome_helpers() {
        let inserted: Put<i32, &str> = Put::Inserted;
        assert_eq!(inserted.into_evicted(), None);
        assert!(!inserted.is_update());
        assert!(Put::<i32, &str>::Updated("old").is_update());
        assert_eq!(Put::Evicted(1, "one").into_evicted(), Some((1, "one")));
    }
}
