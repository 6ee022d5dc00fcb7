//! logsql - filter and reshape JSON-lines log records with a SELECT statement

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use logsql::function::FunctionRegistry;
use logsql::{EngineConfig, Outcome, Record, SqlProcessor};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Filter and reshape JSON-lines log records with a SQL SELECT statement
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SELECT statement to run
    #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
    sql: Option<String>,

    /// File containing the SELECT statement
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// JSON-lines input file (stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Treat missing attributes as empty strings instead of errors
    #[arg(short, long)]
    lenient: bool,

    /// JSON engine config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let script = match (&args.sql, &args.file) {
        (Some(sql), _) => sql.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read SQL file {}", path.display()))?,
        (None, None) => anyhow::bail!("either --sql or --file is required"),
    };

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if args.lenient {
        config.strict_attributes = false;
    }

    let registry = Arc::new(FunctionRegistry::with_builtins());
    let processor =
        SqlProcessor::new(script.trim(), config, registry).context("Failed to compile SQL")?;

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path)
                .with_context(|| format!("Failed to open input {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let stats = run(&processor, reader, &mut out)?;
    out.flush().context("Failed to flush output")?;

    log::info!(
        "{} records read, {} written, {} filtered, {} failed, {} skipped",
        stats.read,
        stats.written,
        stats.filtered,
        stats.failed,
        stats.skipped
    );
    Ok(())
}

#[derive(Debug, Default)]
struct Stats {
    read: usize,
    written: usize,
    filtered: usize,
    failed: usize,
    skipped: usize,
}

fn run(processor: &SqlProcessor, reader: impl BufRead, out: &mut impl Write) -> Result<Stats> {
    let mut stats = Stats::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        stats.read += 1;

        let record = match Record::from_json_str(&line) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("line {}: skipped: {}", index + 1, e);
                stats.skipped += 1;
                continue;
            }
        };

        let outcome = processor.process(&record);
        match &outcome {
            Outcome::Filtered => stats.filtered += 1,
            Outcome::PredicateFailed(_) | Outcome::ProjectionFailed { .. } => stats.failed += 1,
            Outcome::Kept(_) => {}
        }
        if let Some(record) = outcome.into_record() {
            serde_json::to_writer(&mut *out, &record).context("Failed to write record")?;
            out.write_all(b"\n").context("Failed to write record")?;
            stats.written += 1;
        }
    }

    Ok(stats)
}
