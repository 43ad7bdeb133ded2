use std::{
    fmt::Display,
    hash::Hash,
    io::{
        BufRead,
        Write,
    },
};

use anyhow::{
    Context,
    Result,
    bail,
};
use lrusim::{
    LruCache,
    Put,
};
use tracing::{
    debug,
    info,
    warn,
};

use crate::render;

/// One cache operation, as read from a script or issued by the demo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op<K, V> {
    Put(K, V),
    Get(K),
    Peek(K),
    Contains(K),
    Remove(K),
    Pop,
    Clear,
    Show,
}

/// Counts of what a run did to the cache.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub hits: usize,
    pub misses: usize,
    pub inserts: usize,
    pub updates: usize,
    pub evictions: usize,
    pub skipped: usize,
}

impl Display for Tally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hits: {}, misses: {}, inserts: {}, updates: {}, evictions: {}",
            self.hits, self.misses, self.inserts, self.updates, self.evictions
        )?;
        if self.skipped > 0 {
            write!(f, ", skipped lines: {}", self.skipped)?;
        }
        Ok(())
    }
}

/// Parses one script line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Op<String, String>>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (command, rest) = line
        .split_once(char::is_whitespace)
        .map(|(command, rest)| (command, rest.trim()))
        .unwrap_or((line, ""));

    let op = match command.to_ascii_lowercase().as_str() {
        "put" => {
            let Some((key, value)) = rest.split_once(char::is_whitespace) else {
                bail!("`put` expects a key and a value");
            };
            Op::Put(key.to_string(), value.trim().to_string())
        }
        "get" => Op::Get(single_key(command, rest)?),
        "peek" => Op::Peek(single_key(command, rest)?),
        "contains" => Op::Contains(single_key(command, rest)?),
        "remove" => Op::Remove(single_key(command, rest)?),
        "pop" => no_args(command, rest, Op::Pop)?,
        "clear" => no_args(command, rest, Op::Clear)?,
        "show" | "display" => no_args(command, rest, Op::Show)?,
        other => bail!("unknown command `{other}`"),
    };
    Ok(Some(op))
}

fn single_key(command: &str, rest: &str) -> Result<String> {
    match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
        [key] => Ok(key.to_string()),
        [] => bail!("`{command}` expects a key"),
        _ => bail!("`{command}` expects exactly one key, got `{rest}`"),
    }
}

fn no_args<T>(command: &str, rest: &str, op: T) -> Result<T> {
    if !rest.is_empty() {
        bail!("`{command}` takes no arguments, got `{rest}`");
    }
    Ok(op)
}

/// Applies `op` to the cache and writes its rendering to `out`.
pub fn apply<K, V, W>(
    cache: &mut LruCache<K, V>,
    op: Op<K, V>,
    tally: &mut Tally,
    out: &mut W,
) -> Result<()>
where
    K: Hash + Eq + Display,
    V: Display,
    W: Write,
{
    match op {
        Op::Put(key, value) => {
            let (shown_key, shown_value) = (key.to_string(), value.to_string());
            let outcome = cache.put(key, value);
            match &outcome {
                Put::Inserted => tally.inserts += 1,
                Put::Updated(_) => tally.updates += 1,
                Put::Evicted(evicted, _) => {
                    tally.inserts += 1;
                    tally.evictions += 1;
                    info!(key = %evicted, "evicted least recently used entry");
                }
            }
            writeln!(out, "{}", render::put(shown_key, shown_value, &outcome))?;
        }
        Op::Get(key) => match cache.get(&key) {
            Some(value) => {
                tally.hits += 1;
                writeln!(out, "{}", render::hit(&key, value))?;
            }
            None => {
                tally.misses += 1;
                writeln!(out, "{}", render::miss(&key))?;
            }
        },
        Op::Peek(key) => match cache.peek(&key) {
            Some(value) => writeln!(out, "Peek: {key} -> {value}")?,
            None => writeln!(out, "Peek: {key} not cached")?,
        },
        Op::Contains(key) => writeln!(out, "Contains {key}: {}", cache.contains(&key))?,
        Op::Remove(key) => match cache.remove(&key) {
            Some(value) => writeln!(out, "Removed: {key} = {value}")?,
            None => writeln!(out, "Not cached: {key}")?,
        },
        Op::Pop => match cache.pop_lru() {
            Some((key, value)) => writeln!(out, "Popped LRU: {key} = {value}")?,
            None => writeln!(out, "Cache is empty")?,
        },
        Op::Clear => {
            cache.clear();
            writeln!(out, "Cleared")?;
        }
        Op::Show => write!(out, "{}", render::state(cache))?,
    }
    Ok(())
}

/// Runs every line of `script` against `cache`.
///
/// With `keep_going`, malformed lines are logged and skipped; otherwise the
/// first one aborts the run.
pub fn run<R, W>(
    script: R,
    cache: &mut LruCache<String, String>,
    keep_going: bool,
    out: &mut W,
) -> Result<Tally>
where
    R: BufRead,
    W: Write,
{
    let mut tally = Tally::default();
    for (index, line) in script.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("failed to read script line {line_no}"))?;
        match parse_line(&line) {
            Ok(Some(op)) => {
                debug!(line = line_no, ?op, "applying");
                apply(cache, op, &mut tally, out)?;
            }
            Ok(None) => {}
            Err(err) if keep_going => {
                warn!(line = line_no, "skipping malformed line: {err:#}");
                tally.skipped += 1;
            }
            Err(err) => return Err(err.context(format!("malformed script line {line_no}"))),
        }
    }
    Ok(tally)
}
