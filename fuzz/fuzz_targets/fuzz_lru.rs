#![no_main]
use std::num::NonZeroUsize;

use fuzz_lib::CacheOperation;
use libfuzzer_sys::fuzz_target;
use lrusim::{
    LruCache,
    Put,
};

fuzz_target!(|data: (u8, Vec<CacheOperation>)| {
    let (size, operations) = data;
    let size = size.max(1) as usize;

    let mut cache = LruCache::<u8, u8>::new(NonZeroUsize::new(size).unwrap());
    // Most recently used first.
    let mut model: Vec<(u8, u8)> = Vec::new();

    for operation in operations {
        match operation {
            CacheOperation::Put(k, v) => {
                let expected = match model.iter().position(|(key, _)| *key == k) {
                    Some(pos) => {
                        let (_, old) = model.remove(pos);
                        model.insert(0, (k, v));
                        Put::Updated(old)
                    }
                    None => {
                        let evicted = if model.len() == size { model.pop() } else { None };
                        model.insert(0, (k, v));
                        match evicted {
                            Some((ek, ev)) => Put::Evicted(ek, ev),
                            None => Put::Inserted,
                        }
                    }
                };
                assert_eq!(
                    cache.put(k, v),
                    expected,
                    "Put outcome mismatch: {k} {v} {cache:#?}"
                );
            }
            CacheOperation::Get(k) => {
                let expected = model.iter().position(|(key, _)| *key == k).map(|pos| {
                    let entry = model.remove(pos);
                    model.insert(0, entry);
                    entry.1
                });
                assert_eq!(
                    cache.get(&k).copied(),
                    expected,
                    "Get mismatch: {k} {cache:#?}"
                );
            }
            CacheOperation::Peek(k) => {
                let expected = model.iter().find(|(key, _)| *key == k).map(|(_, v)| *v);
                assert_eq!(
                    cache.peek(&k).copied(),
                    expected,
                    "Peek mismatch: {k} {cache:#?}"
                );
            }
            CacheOperation::Contains(k) => {
                assert_eq!(
                    cache.contains(&k),
                    model.iter().any(|(key, _)| *key == k),
                    "Contains mismatch: {k} {cache:#?}"
                );
            }
            CacheOperation::Remove(k) => {
                let expected = model
                    .iter()
                    .position(|(key, _)| *key == k)
                    .map(|pos| model.remove(pos).1);
                assert_eq!(cache.remove(&k), expected, "Remove mismatch: {k} {cache:#?}");
            }
            CacheOperation::PopLru => {
                assert_eq!(cache.lru().map(|(k, v)| (*k, *v)), model.last().copied());
                assert_eq!(cache.pop_lru(), model.pop(), "Pop mismatch: {cache:#?}");
            }
            CacheOperation::Clear => {
                cache.clear();
                model.clear();
                assert!(cache.is_empty(), "Clear left entries: {cache:#?}");
            }
            CacheOperation::Iter => {
                let forward: Vec<_> = cache.iter().map(|(k, v)| (*k, *v)).collect();
                assert_eq!(forward, model, "Iteration order mismatch: {cache:#?}");
                let backward: Vec<_> = cache.iter().rev().map(|(k, v)| (*k, *v)).collect();
                assert!(
                    backward.iter().eq(model.iter().rev()),
                    "Reverse iteration mismatch: {cache:#?}"
                );
            }
        }

        cache.debug_validate();
        assert!(cache.len() <= size, "Cache size exceeded: {cache:#?}");
        assert_eq!(cache.len(), model.len(), "Length mismatch: {cache:#?}");
        assert_eq!(cache.capacity(), size, "Cache capacity altered: {cache:#?}");
        assert_eq!(
            cache.mru().map(|(k, v)| (*k, *v)),
            model.first().copied(),
            "Most recent entry mismatch: {cache:#?}"
        );
    }
});
