//! Single-archive access: metadata, logs, checkouts, and annotations.

use std::fs::File;
use std::path::{Path, PathBuf};

use rcs_api::{BlameLine, Checkout, FileLog, Lookup, ResolvedRevision, RevisionGraph};
use rcs_sink_api::{EventRecorder, Sink, SinkEvent, TracingSink};
use rcs_sinks::{Collected, MatchOutcome, MatchingSink, Purpose, TargetSink, TreeSink};
use tracing::{debug, instrument};

use crate::config::{Config, LogSort};
use crate::log::build_log;
use crate::parser::{ParseOutcome, Parser};
use crate::reconstruct::Reconstructor;
use crate::{Error, ResolutionError, Result};

/// Handle to one `,v` file.
///
/// Every query reparses the file with a sink tailored to it, so a query
/// only reads as far into the archive as its answer requires.
#[derive(Debug, Clone)]
pub struct Archive {
    path: PathBuf,
    config: Config,
}

impl Archive {
    /// Open an archive with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the path does not name a readable file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(path, Config::default())
    }

    /// Open an archive with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the path does not name a readable file and
    /// [`Error::Config`] when `config` fails validation.
    pub fn with_config(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref();
        config.validate()?;
        let metadata = std::fs::metadata(path).map_err(|source| Error::Io {
            path: display_path(path),
            source,
        })?;
        if !metadata.is_file() {
            return Err(Error::Io {
                path: display_path(path),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file"),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            config,
        })
    }

    /// Path of the archive.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Full metadata, logs, and change counts of every revision.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed archives and [`Error::Tree`]
    /// for malformed delta scripts.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn graph(&self) -> Result<RevisionGraph> {
        let mut sink = TreeSink::new();
        self.parse_with(&mut sink)?;
        let (graph, _) = sink.finish()?;
        Ok(graph)
    }

    /// Cross-linked log, filtered by a tag or number and sorted by `sort`
    /// (the configured order when `None`).
    ///
    /// # Errors
    ///
    /// Returns the errors of [`graph`](Self::graph), and
    /// [`ResolutionError::UnknownTag`] for an unknown filter.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn log(&self, filter: Option<&str>, sort: Option<LogSort>) -> Result<FileLog> {
        let graph = self.graph()?;
        let sort = sort.unwrap_or(self.config.log.sort);
        Ok(build_log(&graph, filter, sort)?)
    }

    /// Resolve `request` to a revision without reconstructing any text.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::UnknownTag`] when the request names
    /// nothing, and parse errors for malformed archives.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn lookup(&self, request: &str) -> Result<Lookup<ResolvedRevision>> {
        let mut sink = MatchingSink::new(request);
        self.parse_with(&mut sink)?;
        match sink.outcome() {
            MatchOutcome::UnknownTag => Err(unknown(request)),
            MatchOutcome::Absent => Ok(Lookup::Absent),
            MatchOutcome::Found(revision) => Ok(Lookup::Found(revision)),
        }
    }

    /// Exact contents of the revision `request` resolves to.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError`] when nothing exists at `request`, and
    /// parse or reconstruction errors for damaged archives.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn checkout(&self, request: &str) -> Result<Checkout> {
        let collected = self.collect(request, Purpose::Checkout)?;
        let revision = found(collected.outcome, request)?;
        let text = Reconstructor::new(&collected.graph, &collected.texts)
            .extract_text(&revision.number)?;
        Ok(Checkout { revision, text })
    }

    /// Per-line provenance of the revision `request` resolves to.
    ///
    /// # Errors
    ///
    /// See [`checkout`](Self::checkout).
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn annotate(&self, request: &str) -> Result<Vec<BlameLine>> {
        let collected = self.collect(request, Purpose::Blame)?;
        let revision = found(collected.outcome, request)?;
        Ok(Reconstructor::new(&collected.graph, &collected.texts).annotate(&revision.number)?)
    }

    /// Every callback the parser issues for this archive, in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed archives.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn events(&self) -> Result<Vec<SinkEvent>> {
        let mut sink = TracingSink::new(EventRecorder::new());
        self.parse_with(&mut sink)?;
        Ok(sink.into_inner().into_events())
    }

    fn collect(&self, request: &str, purpose: Purpose) -> Result<Collected> {
        let mut sink = TargetSink::new(request, purpose);
        self.parse_with(&mut sink)?;
        debug!(needed = sink.needed().len(), "collected deltatexts");
        Ok(sink.finish()?)
    }

    fn parse_with<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<ParseOutcome> {
        let file = File::open(&self.path).map_err(|source| Error::Io {
            path: display_path(&self.path),
            source,
        })?;
        let mut parser = Parser::with_chunk_size(file, self.config.parser.chunk_size);
        let outcome = parser.run(sink)?;
        debug!(?outcome, bytes_read = parser.bytes_read(), "parsed archive");
        Ok(outcome)
    }
}

fn found(outcome: MatchOutcome, request: &str) -> Result<ResolvedRevision> {
    match outcome {
        MatchOutcome::Found(revision) => Ok(revision),
        MatchOutcome::Absent => Err(ResolutionError::AbsentAtTarget {
            request: request.to_owned(),
        }
        .into()),
        MatchOutcome::UnknownTag => Err(unknown(request)),
    }
}

fn unknown(request: &str) -> Error {
    ResolutionError::UnknownTag {
        name: request.to_owned(),
    }
    .into()
}

pub(crate) fn display_path(path: &Path) -> String {
    path.display().to_string()
}
