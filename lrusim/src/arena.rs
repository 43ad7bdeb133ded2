use std::{
    iter::FusedIterator,
    ops::{
        Index,
        IndexMut,
    },
};

use slab::Slab;

/// Handle to a slot in the [`Arena`].
///
/// Two handles are reserved for the sentinels bounding the recency list and
/// are never handed out for live entries.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub(crate) struct Ptr(usize);

impl std::fmt::Debug for Ptr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Ptr::HEAD => write!(f, "Ptr(head)"),
            Ptr::TAIL => write!(f, "Ptr(tail)"),
            Ptr(index) => write!(f, "Ptr({index})"),
        }
    }
}

impl Ptr {
    pub(crate) const HEAD: Ptr = Ptr(0);
    pub(crate) const TAIL: Ptr = Ptr(1);

    pub(crate) fn is_sentinel(self) -> bool {
        self == Ptr::HEAD || self == Ptr::TAIL
    }

    fn get(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u64,
}

#[derive(Debug, Clone)]
struct Slot<K, V> {
    prev: Ptr,
    next: Ptr,
    // `None` only for the two sentinels.
    entry: Option<Entry<K, V>>,
}

impl<K, V> Slot<K, V> {
    fn sentinel() -> Self {
        Slot {
            prev: Ptr::HEAD,
            next: Ptr::TAIL,
            entry: None,
        }
    }

    fn entry(&self) -> &Entry<K, V> {
        match &self.entry {
            Some(entry) => entry,
            None => unreachable!("Attempted to access the entry of a sentinel slot"),
        }
    }

    fn entry_mut(&mut self) -> &mut Entry<K, V> {
        match &mut self.entry {
            Some(entry) => entry,
            None => unreachable!("Attempted to access the entry of a sentinel slot"),
        }
    }

    fn into_entry(self) -> Entry<K, V> {
        match self.entry {
            Some(entry) => entry,
            None => unreachable!("Attempted to extract the entry of a sentinel slot"),
        }
    }
}

/// Doubly linked recency list stored in a slab.
///
/// Entries run from most recently used (just after [`Ptr::HEAD`]) to least
/// recently used (just before [`Ptr::TAIL`]). Links are handles into the
/// slab, so removing an entry frees its slot for the next insertion.
#[derive(Debug, Clone)]
pub(crate) struct Arena<K, V> {
    slots: Slab<Slot<K, V>>,
}

impl<K, V> Arena<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut arena = Arena {
            slots: Slab::with_capacity(capacity.saturating_add(2)),
        };
        arena.install_sentinels();
        arena
    }

    fn install_sentinels(&mut self) {
        debug_assert!(self.slots.is_empty());
        let head = self.slots.insert(Slot::sentinel());
        let tail = self.slots.insert(Slot::sentinel());
        debug_assert_eq!(Ptr(head), Ptr::HEAD);
        debug_assert_eq!(Ptr(tail), Ptr::TAIL);
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len() - 2
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.install_sentinels();
    }

    /// The most recently used entry.
    pub(crate) fn front(&self) -> Option<Ptr> {
        let ptr = self.slots[Ptr::HEAD.get()].next;
        (ptr != Ptr::TAIL).then_some(ptr)
    }

    /// The least recently used entry, i.e. the eviction candidate.
    pub(crate) fn back(&self) -> Option<Ptr> {
        let ptr = self.slots[Ptr::TAIL.get()].prev;
        (ptr != Ptr::HEAD).then_some(ptr)
    }

    pub(crate) fn is_occupied(&self, ptr: Ptr) -> bool {
        self.slots
            .get(ptr.get())
            .is_some_and(|slot| slot.entry.is_some())
    }

    pub(crate) fn push_front(&mut self, entry: Entry<K, V>) -> Ptr {
        let ptr = Ptr(self.slots.insert(Slot {
            prev: Ptr::HEAD,
            next: Ptr::TAIL,
            entry: Some(entry),
        }));
        self.link_front(ptr);
        ptr
    }

    pub(crate) fn move_to_front(&mut self, ptr: Ptr) {
        debug_assert!(!ptr.is_sentinel(), "Cannot move a sentinel: {ptr:?}");
        if self.slots[Ptr::HEAD.get()].next == ptr {
            return;
        }
        self.unlink(ptr);
        self.link_front(ptr);
    }

    #[track_caller]
    pub(crate) fn remove(&mut self, ptr: Ptr) -> Entry<K, V> {
        debug_assert!(!ptr.is_sentinel(), "Cannot remove a sentinel: {ptr:?}");
        self.unlink(ptr);
        self.slots.remove(ptr.get()).into_entry()
    }

    pub(crate) fn pop_front(&mut self) -> Option<Entry<K, V>> {
        let ptr = self.front()?;
        Some(self.remove(ptr))
    }

    pub(crate) fn pop_back(&mut self) -> Option<Entry<K, V>> {
        let ptr = self.back()?;
        Some(self.remove(ptr))
    }

    pub(crate) fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            front: self.slots[Ptr::HEAD.get()].next,
            back: self.slots[Ptr::TAIL.get()].prev,
            remaining: self.len(),
            arena: self,
        }
    }

    fn link_front(&mut self, ptr: Ptr) {
        let first = self.slots[Ptr::HEAD.get()].next;

        let slot = &mut self.slots[ptr.get()];
        slot.prev = Ptr::HEAD;
        slot.next = first;

        self.slots[first.get()].prev = ptr;
        self.slots[Ptr::HEAD.get()].next = ptr;
    }

    fn unlink(&mut self, ptr: Ptr) {
        let slot = &self.slots[ptr.get()];
        let (prev, next) = (slot.prev, slot.next);
        self.slots[prev.get()].next = next;
        self.slots[next.get()].prev = prev;
    }

    #[cfg(any(test, all(debug_assertions, feature = "internal-debugging")))]
    pub(crate) fn debug_validate(&self) {
        assert!(self.slots[Ptr::HEAD.get()].entry.is_none(), "Head sentinel holds data");
        assert!(self.slots[Ptr::TAIL.get()].entry.is_none(), "Tail sentinel holds data");

        let mut visited = 0;
        let mut prev = Ptr::HEAD;
        let mut ptr = self.slots[Ptr::HEAD.get()].next;
        while ptr != Ptr::TAIL {
            assert!(
                self.is_occupied(ptr),
                "Linked slot is vacant or a sentinel: {ptr:?}"
            );
            assert_eq!(
                self.slots[ptr.get()].prev,
                prev,
                "Broken back link at {ptr:?}"
            );
            visited += 1;
            assert!(visited <= self.len(), "Cycle in the recency list");
            prev = ptr;
            ptr = self.slots[ptr.get()].next;
        }
        assert_eq!(
            self.slots[Ptr::TAIL.get()].prev,
            prev,
            "Tail sentinel does not link back to the last entry"
        );
        assert_eq!(visited, self.len(), "Unlinked entries in the arena");
    }
}

impl<K, V> Index<Ptr> for Arena<K, V> {
    type Output = Entry<K, V>;

    fn index(&self, index: Ptr) -> &Self::Output {
        self.slots[index.get()].entry()
    }
}

impl<K, V> IndexMut<Ptr> for Arena<K, V> {
    fn index_mut(&mut self, index: Ptr) -> &mut Self::Output {
        self.slots[index.get()].entry_mut()
    }
}

/// Iterator over the entries of an [`LruCache`](crate::LruCache), from most
/// recently used to least recently used.
///
/// Created by [`LruCache::iter`](crate::LruCache::iter). Iterating never
/// changes the recency order.
#[derive(Debug)]
pub struct Iter<'a, K, V> {
    arena: &'a Arena<K, V>,
    front: Ptr,
    back: Ptr,
    remaining: usize,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = &self.arena.slots[self.front.get()];
        let entry = slot.entry();
        self.front = slot.next;
        self.remaining -= 1;
        Some((&entry.key, &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = &self.arena.slots[self.back.get()];
        let entry = slot.entry();
        self.back = slot.prev;
        self.remaining -= 1;
        Some((&entry.key, &entry.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Owning iterator over the entries of an [`LruCache`](crate::LruCache), from
/// most recently used to least recently used.
///
/// Created by the [`IntoIterator`] implementation of
/// [`LruCache`](crate::LruCache).
#[derive(Debug, Clone)]
pub struct IntoIter<K, V> {
    arena: Arena<K, V>,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(arena: Arena<K, V>) -> Self {
        IntoIter { arena }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.arena
            .pop_front()
            .map(|entry| (entry.key, entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.arena.len(), Some(self.arena.len()))
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.arena
            .pop_back()
            .map(|entry| (entry.key, entry.value))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V> FusedIterator for IntoIter<K, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: i32, value: &str) -> Entry<i32, String> {
        Entry {
            key,
            value: value.to_string(),
            hash: key as u64,
        }
    }

    fn keys(arena: &Arena<i32, String>) -> Vec<i32> {
        arena.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_ptr_sentinels() {
        assert!(Ptr::HEAD.is_sentinel());
        assert!(Ptr::TAIL.is_sentinel());
        assert!(!Ptr(2).is_sentinel());
        assert_ne!(Ptr::HEAD, Ptr::TAIL);
    }

    #[test]
    fn test_ptr_debug() {
        assert_eq!(format!("{:?}", Ptr::HEAD), "Ptr(head)");
        assert_eq!(format!("{:?}", Ptr::TAIL), "Ptr(tail)");
        assert_eq!(format!("{:?}", Ptr(42)), "Ptr(42)");
    }

    #[test]
    fn test_arena_new_only_sentinels() {
        let arena: Arena<i32, String> = Arena::with_capacity(4);
        assert_eq!(arena.len(), 0);
        assert!(arena.is_empty());
        assert_eq!(arena.front(), None);
        assert_eq!(arena.back(), None);
        assert_eq!(arena.slots[Ptr::HEAD.get()].next, Ptr::TAIL);
        assert_eq!(arena.slots[Ptr::TAIL.get()].prev, Ptr::HEAD);
        assert!(!arena.is_occupied(Ptr::HEAD));
        assert!(!arena.is_occupied(Ptr::TAIL));
        arena.debug_validate();
    }

    #[test]
    fn test_arena_with_capacity_reserves_sentinels() {
        let arena: Arena<i32, String> = Arena::with_capacity(10);
        assert!(arena.slots.capacity() >= 12);
    }

    #[test]
    fn test_arena_grows_past_reservation() {
        let mut arena = Arena::with_capacity(0);
        for i in 0..10 {
            arena.push_front(entry(i, "v"));
        }
        assert_eq!(arena.len(), 10);
        arena.debug_validate();
        assert_eq!(
            arena.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            [9, 8, 7, 6, 5, 4, 3, 2, 1, 0]
        );
    }

    #[test]
    fn test_arena_push_front_orders_most_recent_first() {
        let mut arena = Arena::with_capacity(3);
        let one = arena.push_front(entry(1, "one"));
        arena.push_front(entry(2, "two"));
        let three = arena.push_front(entry(3, "three"));

        assert_eq!(arena.len(), 3);
        assert_eq!(keys(&arena), [3, 2, 1]);
        assert_eq!(arena.front(), Some(three));
        assert_eq!(arena.back(), Some(one));
        assert!(!one.is_sentinel());
        arena.debug_validate();
    }

    #[test]
    fn test_arena_move_to_front() {
        let mut arena = Arena::with_capacity(3);
        let one = arena.push_front(entry(1, "one"));
        let two = arena.push_front(entry(2, "two"));
        let three = arena.push_front(entry(3, "three"));

        arena.move_to_front(one);
        assert_eq!(keys(&arena), [1, 3, 2]);
        arena.debug_validate();

        arena.move_to_front(two);
        assert_eq!(keys(&arena), [2, 1, 3]);
        arena.debug_validate();

        arena.move_to_front(two);
        assert_eq!(keys(&arena), [2, 1, 3]);
        assert_eq!(arena.back(), Some(three));
        arena.debug_validate();
    }

    #[test]
    fn test_arena_remove_middle_and_ends() {
        let mut arena = Arena::with_capacity(4);
        let one = arena.push_front(entry(1, "one"));
        let two = arena.push_front(entry(2, "two"));
        let three = arena.push_front(entry(3, "three"));
        let four = arena.push_front(entry(4, "four"));

        assert_eq!(arena.remove(two).key, 2);
        assert_eq!(keys(&arena), [4, 3, 1]);
        arena.debug_validate();

        assert_eq!(arena.remove(four).value, "four");
        assert_eq!(keys(&arena), [3, 1]);
        arena.debug_validate();

        assert_eq!(arena.remove(one).key, 1);
        assert_eq!(keys(&arena), [3]);
        assert_eq!(arena.front(), Some(three));
        assert_eq!(arena.back(), Some(three));

        arena.remove(three);
        assert!(arena.is_empty());
        assert_eq!(arena.front(), None);
        arena.debug_validate();
    }

    #[test]
    fn test_arena_reuses_freed_slots() {
        let mut arena = Arena::with_capacity(2);
        let one = arena.push_front(entry(1, "one"));
        arena.push_front(entry(2, "two"));

        arena.remove(one);
        assert!(!arena.is_occupied(one));

        let three = arena.push_front(entry(3, "three"));
        assert_eq!(three, one);
        assert!(arena.is_occupied(three));
        assert_eq!(arena[three].key, 3);
        assert_eq!(keys(&arena), [3, 2]);
    }

    #[test]
    fn test_arena_index_operations() {
        let mut arena = Arena::with_capacity(1);
        let ptr = arena.push_front(entry(42, "hello"));

        assert_eq!(arena[ptr].key, 42);
        assert_eq!(arena[ptr].hash, 42);
        arena[ptr].value = "world".to_string();
        assert_eq!(arena[ptr].value, "world");
    }

    #[test]
    #[should_panic(expected = "sentinel")]
    fn test_arena_index_sentinel() {
        let arena: Arena<i32, String> = Arena::with_capacity(1);
        let _ = &arena[Ptr::HEAD];
    }

    #[test]
    #[should_panic]
    fn test_arena_index_freed_slot() {
        let mut arena = Arena::with_capacity(1);
        let ptr = arena.push_front(entry(1, "one"));
        arena.remove(ptr);
        let _ = &arena[ptr];
    }

    #[test]
    fn test_arena_pop_front_and_back() {
        let mut arena = Arena::with_capacity(3);
        arena.push_front(entry(1, "one"));
        arena.push_front(entry(2, "two"));
        arena.push_front(entry(3, "three"));

        assert_eq!(arena.pop_back().map(|e| e.key), Some(1));
        assert_eq!(arena.pop_front().map(|e| e.key), Some(3));
        assert_eq!(arena.pop_front().map(|e| e.key), Some(2));
        assert!(arena.pop_front().is_none());
        assert!(arena.pop_back().is_none());
        arena.debug_validate();
    }

    #[test]
    fn test_arena_clear_restores_sentinels() {
        let mut arena = Arena::with_capacity(2);
        arena.push_front(entry(1, "one"));
        arena.push_front(entry(2, "two"));

        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(arena.iter().count(), 0);
        arena.debug_validate();

        arena.push_front(entry(3, "three"));
        assert_eq!(keys(&arena), [3]);
    }

    #[test]
    fn test_arena_iter_double_ended() {
        let mut arena = Arena::with_capacity(4);
        for key in 1..=4 {
            arena.push_front(entry(key, "v"));
        }

        let mut iter = arena.iter();
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next().map(|(k, _)| *k), Some(4));
        assert_eq!(iter.next_back().map(|(k, _)| *k), Some(1));
        assert_eq!(iter.next().map(|(k, _)| *k), Some(3));
        assert_eq!(iter.next_back().map(|(k, _)| *k), Some(2));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn test_arena_into_iter() {
        let mut arena = Arena::with_capacity(3);
        arena.push_front(entry(1, "one"));
        arena.push_front(entry(2, "two"));
        arena.push_front(entry(3, "three"));

        let forward: Vec<_> = IntoIter::new(arena.clone()).map(|(k, _)| k).collect();
        assert_eq!(forward, [3, 2, 1]);

        let backward: Vec<_> = IntoIter::new(arena).rev().map(|(k, _)| k).collect();
        assert_eq!(backward, [1, 2, 3]);
    }

    #[test]
    fn test_arena_clone_preserves_handles() {
        let mut arena = Arena::with_capacity(3);
        let one = arena.push_front(entry(1, "one"));
        let two = arena.push_front(entry(2, "two"));
        arena.remove(one);

        let cloned = arena.clone();
        assert!(!cloned.is_occupied(one));
        assert!(cloned.is_occupied(two));
        assert_eq!(cloned[two].value, "two");
        cloned.debug_validate();
    }
}
