//! Core library for reading RCS `,v` archives.
//!
//! The crate is layered around three primary responsibilities:
//! - tokenizing and parsing archives into sink callbacks
//! - rebuilding revision texts and per-line provenance from deltas
//! - file logs and directory listings built on top of the parsed metadata

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    missing_docs
)]
#![cfg_attr(
    not(test),
    deny(
        clippy::dbg_macro,
        clippy::expect_used,
        clippy::panic,
        clippy::print_stderr,
        clippy::print_stdout,
        clippy::todo,
        clippy::unwrap_used
    )
)]

/// Single-archive handle tying parsing, resolution, and reconstruction
/// together.
pub mod archive;
/// TOML configuration.
pub mod config;
/// Chunked tokenizer.
pub mod lexer;
/// Directory listings resolved against a tag.
pub mod listing;
/// File-log construction.
pub mod log;
/// Streaming archive parser.
pub mod parser;
/// Full-text reconstruction and blame.
pub mod reconstruct;

pub use archive::Archive;
pub use config::Config;

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A request that did not name anything usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// The name is neither a known tag nor a revision or branch number.
    #[error("unknown tag or revision: {name}")]
    UnknownTag {
        /// Name as requested.
        name: String,
    },
    /// The request resolved, but the file has no revision there.
    #[error("no revision exists at {request}")]
    AbsentAtTarget {
        /// Request as given.
        request: String,
    },
}

/// Errors surfaced by the core library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filesystem interaction failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Filesystem path involved in the failed operation.
        path: String,
        /// Source I/O error returned by the standard library.
        #[source]
        source: std::io::Error,
    },
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    /// The archive is malformed.
    #[error(transparent)]
    Parse(#[from] parser::ParseError),
    /// Deltas could not be applied.
    #[error(transparent)]
    Reconstruction(#[from] reconstruct::ReconstructionError),
    /// The request did not resolve to a revision.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    /// A delta script failed to parse while collecting metadata.
    #[error(transparent)]
    Tree(#[from] rcs_sinks::TreeError),
}
