//! Directory listings: every archive of a directory resolved against one
//! tag, with failures confined to the file that caused them.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use rcs_api::{ResolvedRevision, TagTarget};
use rcs_sinks::{InfoSink, MatchOutcome, TagCatalog};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::archive::display_path;
use crate::config::Config;
use crate::parser::Parser;
use crate::{Error, Result};

const ARCHIVE_SUFFIX: &str = ",v";
const ATTIC: &str = "Attic";

/// What a listing found for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "revision", rename_all = "snake_case")]
pub enum ListingStatus {
    /// The file exists at the requested tag.
    Present(ResolvedRevision),
    /// The file has no revision at the requested tag.
    Absent,
    /// The archive could not be read or parsed.
    Failed(String),
}

/// One archive of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Working-file name, without the `,v` suffix.
    pub name: String,
    /// Path of the archive.
    pub path: PathBuf,
    /// Whether the archive lives under `Attic/`.
    pub in_attic: bool,
    /// Resolution result.
    pub status: ListingStatus,
}

/// Result of listing a set of archives.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Listing {
    /// One entry per archive, ordered by name.
    pub entries: Vec<ListingEntry>,
    /// Plain tag names seen in any archive, plus `HEAD`.
    pub tags: BTreeSet<String>,
    /// Branch tag names seen in any archive, plus `MAIN`.
    pub branches: BTreeSet<String>,
}

/// List the archives of `dir` (and of `dir/Attic` when configured) at
/// `request`.
///
/// An archive in `Attic/` is skipped when the directory itself holds one of
/// the same name.
///
/// # Errors
///
/// Returns [`Error::Io`] when a directory cannot be read; failures of
/// individual archives are reported in their entries instead.
#[instrument(skip(dir, config), fields(dir = %dir.display()))]
pub fn list_directory(dir: &Path, request: &str, config: &Config) -> Result<Listing> {
    let mut paths = archives_in(dir)?;
    if config.listing.include_attic {
        let attic = dir.join(ATTIC);
        if attic.is_dir() {
            let present: BTreeSet<String> =
                paths.iter().filter_map(|path| archive_name(path)).collect();
            paths.extend(
                archives_in(&attic)?
                    .into_iter()
                    .filter(|path| archive_name(path).is_some_and(|name| !present.contains(&name))),
            );
        }
    }
    Ok(list_archives(&paths, request, config))
}

/// List an explicit set of archives at `request`.
#[must_use]
pub fn list_archives(paths: &[PathBuf], request: &str, config: &Config) -> Listing {
    let mut catalog = TagCatalog::new();
    let mut entries: Vec<ListingEntry> = paths
        .iter()
        .map(|path| ListingEntry {
            name: archive_name(path).unwrap_or_else(|| display_path(path)),
            path: path.clone(),
            in_attic: path
                .parent()
                .and_then(Path::file_name)
                .is_some_and(|parent| parent == ATTIC),
            status: resolve(path, request, config, &mut catalog),
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    let mut listing = Listing {
        entries,
        tags: BTreeSet::from(["HEAD".to_owned()]),
        branches: BTreeSet::from(["MAIN".to_owned()]),
    };
    for (name, raw) in catalog {
        match TagTarget::parse(&raw) {
            Ok(target) if target.is_branch() => {
                listing.branches.insert(name);
            }
            Ok(_) => {
                listing.tags.insert(name);
            }
            Err(err) => warn!(%name, %err, "ignoring malformed symbol"),
        }
    }
    listing
}

fn resolve(path: &Path, request: &str, config: &Config, catalog: &mut TagCatalog) -> ListingStatus {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!(path = %path.display(), %err, "cannot open archive");
            return ListingStatus::Failed(err.to_string());
        }
    };
    let mut sink = InfoSink::new(request, catalog);
    if let Err(err) = Parser::with_chunk_size(file, config.parser.chunk_size).run(&mut sink) {
        warn!(path = %path.display(), %err, "cannot parse archive");
        return ListingStatus::Failed(err.to_string());
    }
    match sink.outcome() {
        MatchOutcome::Found(revision) if !(config.listing.hide_dead && revision.dead) => {
            ListingStatus::Present(revision)
        }
        _ => ListingStatus::Absent,
    }
}

fn archives_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let io_error = |source| Error::Io {
        path: display_path(dir),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file() && archive_name(&path).is_some() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn archive_name(path: &Path) -> Option<String> {
    path.file_name()?
        .to_str()?
        .strip_suffix(ARCHIVE_SUFFIX)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_names_strip_suffix() {
        assert_eq!(archive_name(Path::new("a/b/main.c,v")).as_deref(), Some("main.c"));
        assert_eq!(archive_name(Path::new("a/b/main.c")), None);
        assert_eq!(archive_name(Path::new(",v")), None);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let missing = dir.path().join("nope");
        assert!(matches!(
            list_directory(&missing, "HEAD", &Config::default()),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn unreadable_archive_is_confined_to_its_entry() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let listing = list_archives(
            &[dir.path().join("gone.c,v")],
            "HEAD",
            &Config::default(),
        );
        assert_eq!(listing.entries.len(), 1);
        assert_eq!(listing.entries[0].name, "gone.c");
        assert!(matches!(listing.entries[0].status, ListingStatus::Failed(_)));
        assert!(listing.tags.contains("HEAD"));
        assert!(listing.branches.contains("MAIN"));
    }
}
