//! ephemkv CLI
//!
//! Opens an engine in-process and runs commands read from stdin.
//!
//! ```text
//! put <key> <value>    write a value
//! get <key>            read the current value
//! del <key>            write a tombstone
//! scan <key> <count>   list live rows from <key>
//! len                  memtable entry count
//! flush                move recent rows into a new run
//! quit                 exit
//! ```

use std::io::{self, BufRead, Write};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use ephemkv::{clock, Config, Engine, MemtableKind};
use tracing_subscriber::{fmt, EnvFilter};

/// Index strategy names accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    SegmentRing,
    MergeOnRead,
    TimingWheel,
    Vacuum,
}

impl From<Kind> for MemtableKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::SegmentRing => MemtableKind::SegmentRing,
            Kind::MergeOnRead => MemtableKind::MergeOnRead,
            Kind::TimingWheel => MemtableKind::TimingWheel,
            Kind::Vacuum => MemtableKind::Vacuum,
        }
    }
}

/// ephemkv CLI
#[derive(Parser, Debug)]
#[command(name = "ephemkv-cli")]
#[command(about = "Interactive shell for the ephemkv TTL key-value store")]
#[command(version)]
struct Args {
    /// Memtable index strategy
    #[arg(short, long, value_enum, default_value = "segment-ring")]
    kind: Kind,

    /// Seconds a written version stays readable
    #[arg(short, long, default_value = "60")]
    ttl_secs: u64,

    /// Seconds between GC passes (also the segment width)
    #[arg(short, long, default_value = "10")]
    gc_secs: u64,

    /// Log GC statistics after every pass
    #[arg(short, long)]
    log_stats: bool,
}

enum Command {
    Put(String, String),
    Get(String),
    Del(String),
    Scan(String, usize),
    Len,
    Flush,
    Quit,
}

fn parse(line: &str) -> Result<Command, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["put", key, value] => Ok(Command::Put(key.to_string(), value.to_string())),
        ["get", key] => Ok(Command::Get(key.to_string())),
        ["del", key] => Ok(Command::Del(key.to_string())),
        ["scan", key, count] => count
            .parse()
            .map(|count| Command::Scan(key.to_string(), count))
            .map_err(|_| format!("invalid count: {count}")),
        ["len"] => Ok(Command::Len),
        ["flush"] => Ok(Command::Flush),
        ["quit"] | ["exit"] => Ok(Command::Quit),
        _ => Err(format!("unknown command: {line}")),
    }
}

/// Runs one command; returns false on quit
fn execute(engine: &Engine, command: Command, out: &mut impl Write) -> io::Result<bool> {
    match command {
        Command::Put(key, value) => match engine.put(key.as_bytes(), value.as_bytes()) {
            Ok(()) => writeln!(out, "OK")?,
            Err(e) => writeln!(out, "ERR {e}")?,
        },
        Command::Get(key) => match engine.get(key.as_bytes(), clock::now()) {
            Some(value) => writeln!(out, "{}", String::from_utf8_lossy(&value))?,
            None => writeln!(out, "(nil)")?,
        },
        Command::Del(key) => match engine.delete(key.as_bytes()) {
            Ok(()) => writeln!(out, "OK")?,
            Err(e) => writeln!(out, "ERR {e}")?,
        },
        Command::Scan(start, count) => {
            let rows = engine.scan(start.as_bytes(), count, clock::now());
            for pair in &rows {
                let value = pair.value.as_deref().unwrap_or_default();
                writeln!(
                    out,
                    "{} {}",
                    String::from_utf8_lossy(&pair.key),
                    String::from_utf8_lossy(value)
                )?;
            }
            writeln!(out, "({} rows)", rows.len())?;
        }
        Command::Len => writeln!(out, "{}", engine.memtable().len())?,
        Command::Flush => match engine.flush() {
            Ok(Some(run)) => writeln!(out, "flushed into run {run}")?,
            Ok(None) => writeln!(out, "nothing to flush")?,
            Err(e) => writeln!(out, "ERR {e}")?,
        },
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

fn main() {
    // Initialize tracing/logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,ephemkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .kind(args.kind.into())
        .ttl(Duration::from_secs(args.ttl_secs))
        .gc_interval(Duration::from_secs(args.gc_secs))
        .log_stats(args.log_stats)
        .build();

    tracing::info!("ephemkv v{}", ephemkv::VERSION);
    tracing::info!("Index: {}, ttl: {:?}, gc: {:?}", config.kind.name(), config.ttl, config.gc_interval);

    let engine = match Engine::open(config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to read input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let keep_going = match parse(&line) {
            Ok(command) => execute(&engine, command, &mut stdout),
            Err(msg) => writeln!(stdout, "ERR {msg}").map(|_| true),
        };

        match keep_going {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                tracing::error!("Failed to write output: {}", e);
                break;
            }
        }
    }

    engine.close();
}
