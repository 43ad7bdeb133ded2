use std::fmt::Display;

use colored::Colorize;
use lrusim::{
    LruCache,
    Put,
};

const RULE: &str = "================================";

pub fn hit(key: impl Display, value: impl Display) -> String {
    format!("Cache {}: {key} -> {value}", "HIT".green().bold())
}

pub fn miss(key: impl Display) -> String {
    format!("Cache {}: {key}", "MISS".red().bold())
}

pub fn put<K: Display, V>(key: impl Display, value: impl Display, outcome: &Put<K, V>) -> String {
    match outcome {
        Put::Inserted => format!("Inserted: {key} = {value}"),
        Put::Updated(_) => format!("Updated: {key} = {value}"),
        Put::Evicted(evicted, _) => format!(
            "Inserted: {key} = {value} | {}: {evicted}",
            "Evicted LRU".yellow()
        ),
    }
}

/// Renders the cache from most to least recently used.
pub fn state<K: Display, V: Display>(cache: &LruCache<K, V>) -> String {
    let entries = if cache.is_empty() {
        "(empty)".to_string()
    } else {
        cache
            .iter()
            .enumerate()
            .map(|(pos, (key, value))| format!("{}. [{key}: {value}]", pos + 1))
            .collect::<Vec<_>>()
            .join(" -> ")
    };

    format!(
        "\n=== Cache State (MRU -> LRU) ===\nSize: {}/{}\n{entries}\n{RULE}\n\n",
        cache.len(),
        cache.capacity()
    )
}
