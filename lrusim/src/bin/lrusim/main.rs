use std::{
    fs::File,
    io::{
        self,
        BufRead,
        BufReader,
        Write,
    },
    path::PathBuf,
};

use anyhow::{
    Context,
    Result,
    anyhow,
};
use clap::{
    Args,
    Parser,
    Subcommand,
};
use lrusim::LruCache;
use tracing::{
    info,
    level_filters::LevelFilter,
};
use tracing_subscriber::{
    EnvFilter,
    fmt::format::FmtSpan,
};

use crate::script::{
    Op,
    Tally,
};

mod render;
mod script;

#[derive(Parser)]
#[command(name = "lrusim", version, about = "Simulate a least-recently-used cache")]
struct Cli {
    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    log_level: LevelFilter,

    /// Disable coloured output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay the built-in walkthrough on two small caches.
    Demo,
    /// Run a command script against a fresh cache.
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Maximum number of entries the cache holds.
    #[arg(long, short, env = "LRUSIM_CAPACITY", allow_negative_numbers = true)]
    capacity: i64,

    /// Script to execute, one command per line. Reads stdin when omitted or `-`.
    script: Option<PathBuf>,

    /// Log malformed lines and keep going instead of stopping at the first one.
    #[arg(long)]
    keep_going: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.log_level)?;
    if cli.no_color {
        colored::control::set_override(false);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Demo => demo(&mut out),
        Command::Run(args) => run(args, &mut out),
    }
}

fn setup_tracing(level: LevelFilter) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env()
        .context("invalid RUST_LOG directive")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::NONE)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

fn run(args: RunArgs, out: &mut impl Write) -> Result<()> {
    let mut cache = LruCache::try_new(args.capacity)
        .with_context(|| format!("cannot create a cache with capacity {}", args.capacity))?;
    info!(capacity = cache.capacity(), "created cache");

    let script: Box<dyn BufRead> = match &args.script {
        Some(path) if path.as_os_str() != "-" => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        _ => Box::new(io::stdin().lock()),
    };

    let tally = script::run(script, &mut cache, args.keep_going, out)?;
    writeln!(out, "{tally}")?;
    Ok(())
}

fn demo(out: &mut impl Write) -> Result<()> {
    writeln!(out, "=== LRU Cache Simulation ===")?;
    writeln!(out, "Creating cache with capacity 3\n")?;

    let users = [
        Op::Put("user:101", 42),
        Op::Put("user:202", 88),
        Op::Put("user:303", 15),
        Op::Show,
        Op::Get("user:101"),
        Op::Show,
        Op::Put("user:404", 99),
        Op::Show,
        Op::Put("user:101", 100),
        Op::Show,
        Op::Get("user:202"),
        Op::Put("user:505", 77),
        Op::Put("user:606", 33),
        Op::Show,
    ];
    let tally = replay(3, users, out)?;
    writeln!(out, "{tally}")?;

    writeln!(out, "\n=== String Value Cache ===")?;
    let names = [
        Op::Put(1, "Alice"),
        Op::Put(2, "Bob"),
        Op::Get(1),
        Op::Put(3, "Charlie"),
        Op::Show,
    ];
    let tally = replay(2, names, out)?;
    writeln!(out, "{tally}")?;
    Ok(())
}

fn replay<K, V>(
    capacity: usize,
    ops: impl IntoIterator<Item = Op<K, V>>,
    out: &mut impl Write,
) -> Result<Tally>
where
    K: std::hash::Hash + Eq + std::fmt::Display,
    V: std::fmt::Display,
{
    let mut cache = LruCache::try_new(capacity)?;
    let mut tally = Tally::default();
    for op in ops {
        script::apply(&mut cache, op, &mut tally, out)?;
    }
    Ok(tally)
}
