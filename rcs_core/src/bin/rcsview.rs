use std::io::Write;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use chrono::DateTime;
use clap::{Parser, Subcommand, ValueEnum};
use rcs_api::{BlameLine, FileLog};
use rcs_core::config::LogSort;
use rcs_core::listing::{list_directory, Listing, ListingStatus};
use rcs_core::{Archive, Config};
use tracing_subscriber::EnvFilter;

/// Inspect RCS `,v` archives.
#[derive(Debug, Parser)]
#[command(name = "rcsview", version)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the revision log.
    Log {
        /// Archive to read.
        file: Utf8PathBuf,
        /// Only revisions visible from this tag, branch, or revision.
        #[arg(short = 'r', long)]
        filter: Option<String>,
        /// Entry order; defaults to the configured one.
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
        /// Skip this many entries after sorting.
        #[arg(long, default_value_t = 0)]
        first: usize,
        /// Show at most this many entries.
        #[arg(long)]
        limit: Option<usize>,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Write the contents of a revision to stdout.
    Co {
        /// Archive to read.
        file: Utf8PathBuf,
        /// Tag, branch, or revision; the head of the main line by default.
        #[arg(short = 'r', long, default_value = "")]
        revision: String,
    },
    /// Show which revision introduced each line.
    Annotate {
        /// Archive to read.
        file: Utf8PathBuf,
        /// Tag, branch, or revision; the head of the main line by default.
        #[arg(short = 'r', long, default_value = "")]
        revision: String,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// List the archives of a directory at a tag.
    Ls {
        /// Directory holding `,v` files.
        dir: Utf8PathBuf,
        /// Tag or branch to resolve each file against.
        #[arg(short = 'r', long, default_value = "")]
        tag: String,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Dump the parser callbacks as JSON lines.
    Events {
        /// Archive to read.
        file: Utf8PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    Default,
    Date,
    Revision,
}

impl From<SortArg> for LogSort {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Default => Self::Default,
            SortArg::Date => Self::Date,
            SortArg::Revision => Self::Revision,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path.as_std_path())
            .with_context(|| format!("failed to load config {path}"))?,
        None => Config::default(),
    };
    run(cli.command, config)
}

fn run(command: Command, config: Config) -> Result<()> {
    let mut out = std::io::stdout().lock();
    match command {
        Command::Log {
            file,
            filter,
            sort,
            first,
            limit,
            json,
        } => {
            let log = open(&file, config)?
                .log(filter.as_deref(), sort.map(LogSort::from))
                .with_context(|| format!("failed to read log of {file}"))?
                .paged(first, limit);
            if json {
                serde_json::to_writer_pretty(&mut out, &log)?;
                writeln!(out)?;
            } else {
                print_log(&mut out, &log)?;
            }
        }
        Command::Co { file, revision } => {
            let checkout = open(&file, config)?
                .checkout(&revision)
                .with_context(|| format!("failed to check out {file}"))?;
            out.write_all(&checkout.text)?;
        }
        Command::Annotate {
            file,
            revision,
            json,
        } => {
            let lines = open(&file, config)?
                .annotate(&revision)
                .with_context(|| format!("failed to annotate {file}"))?;
            if json {
                serde_json::to_writer_pretty(&mut out, &lines)?;
                writeln!(out)?;
            } else {
                print_annotation(&mut out, &lines)?;
            }
        }
        Command::Ls { dir, tag, json } => {
            let listing = list_directory(dir.as_std_path(), &tag, &config)
                .with_context(|| format!("failed to list {dir}"))?;
            if json {
                serde_json::to_writer_pretty(&mut out, &listing)?;
                writeln!(out)?;
            } else {
                print_listing(&mut out, &listing)?;
            }
        }
        Command::Events { file } => {
            let events = open(&file, config)?
                .events()
                .with_context(|| format!("failed to parse {file}"))?;
            for event in events {
                serde_json::to_writer(&mut out, &event)?;
                writeln!(out)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn open(file: &Utf8PathBuf, config: Config) -> Result<Archive> {
    Archive::with_config(file.as_std_path(), config).with_context(|| format!("failed to open {file}"))
}

fn format_time(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0).map_or_else(
        || timestamp.to_string(),
        |time| time.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

fn print_log(out: &mut impl Write, log: &FileLog) -> Result<()> {
    if let Some(head) = &log.head {
        writeln!(out, "head: {head}")?;
    }
    if let Some(branch) = &log.principal_branch {
        writeln!(out, "branch: {branch}")?;
    }
    writeln!(out, "symbolic names:")?;
    for tag in &log.tags {
        let number = tag
            .number
            .as_ref()
            .map_or_else(|| "trunk".to_owned(), ToString::to_string);
        writeln!(out, "\t{}: {number}", tag.name)?;
    }
    if let Some(description) = &log.description {
        writeln!(out, "description:\n{description}")?;
    }
    for entry in &log.entries {
        writeln!(out, "----------------------------")?;
        write!(out, "revision {}", entry.number)?;
        if let Some(lock) = &entry.lock {
            write!(out, "\tlocked by: {lock};")?;
        }
        writeln!(out)?;
        write!(
            out,
            "date: {};  author: {};  state: {};",
            format_time(entry.timestamp),
            entry.author,
            entry.state
        )?;
        if let Some(changes) = entry.changes {
            write!(out, "  lines: +{} -{}", changes.added, changes.removed)?;
        }
        writeln!(out)?;
        if !entry.tags.is_empty() {
            writeln!(out, "tags: {}", entry.tags.join(", "))?;
        }
        if !entry.branch_points.is_empty() {
            writeln!(out, "branches: {}", entry.branch_points.join(", "))?;
        }
        write!(out, "{}", entry.log)?;
        if !entry.log.ends_with('\n') {
            writeln!(out)?;
        }
    }
    writeln!(out, "=============================================================================")?;
    Ok(())
}

fn print_annotation(out: &mut impl Write, lines: &[BlameLine]) -> Result<()> {
    for line in lines {
        write!(
            out,
            "{:<12} ({:<8} {}): {}",
            line.revision.to_string(),
            line.author,
            format_time(line.timestamp),
            line.text
        )?;
        if !line.text.ends_with('\n') {
            writeln!(out)?;
        }
    }
    Ok(())
}

fn print_listing(out: &mut impl Write, listing: &Listing) -> Result<()> {
    for entry in &listing.entries {
        let attic = if entry.in_attic { " (Attic)" } else { "" };
        match &entry.status {
            ListingStatus::Present(revision) => writeln!(
                out,
                "{}{attic}\t{}\t{}\t{}\t{}",
                entry.name,
                revision.number,
                revision.author,
                format_time(revision.timestamp),
                revision.log.lines().next().unwrap_or_default()
            )?,
            ListingStatus::Absent => writeln!(out, "{}{attic}\t(absent)", entry.name)?,
            ListingStatus::Failed(message) => {
                writeln!(out, "{}{attic}\t(error: {message})", entry.name)?;
            }
        }
    }
    writeln!(out, "tags: {}", join(&listing.tags))?;
    writeln!(out, "branches: {}", join(&listing.branches))?;
    Ok(())
}

fn join(names: &std::collections::BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
