use serde::{Deserialize, Serialize};

use crate::delta::ChangeStats;
use crate::revision::RevisionNumber;

/// Result of a lookup that may legitimately find nothing.
///
/// `Absent` is a normal value: a file listed against a tag it never had is
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Lookup<T> {
    /// The requested revision exists.
    Found(T),
    /// Nothing exists at the requested tag or branch.
    Absent,
}

impl<T> Lookup<T> {
    /// Convert into an `Option`.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent => None,
        }
    }

    /// Whether the lookup found nothing.
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Map the found value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::Absent => Lookup::Absent,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Self::Found)
    }
}

/// Metadata of the single revision a request resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRevision {
    /// Resolved revision number.
    pub number: RevisionNumber,
    /// Commit time in seconds since the Unix epoch.
    pub timestamp: i64,
    /// Committer name.
    pub author: String,
    /// State string.
    pub state: String,
    /// Whether the file is removed in this revision.
    pub dead: bool,
    /// Holder of a lock on this revision, if any.
    #[serde(default)]
    pub lock: Option<String>,
    /// Log message; empty when parsing stopped before the deltatext.
    #[serde(default)]
    pub log: String,
}

/// Full text of one revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    /// Revision the text belongs to.
    pub revision: ResolvedRevision,
    /// Exact file contents.
    pub text: Vec<u8>,
}

/// One line of an annotated revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameLine {
    /// 1-based line number in the annotated revision.
    pub line_number: usize,
    /// Line contents including the trailing newline, lossily decoded.
    pub text: String,
    /// Revision that introduced the line.
    pub revision: RevisionNumber,
    /// Revision preceding `revision` on its line of development.
    #[serde(default)]
    pub previous: Option<RevisionNumber>,
    /// Author of `revision`.
    pub author: String,
    /// Commit time of `revision`.
    pub timestamp: i64,
}

/// One revision of a file log, cross-linked with its neighbours and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Revision number.
    pub number: RevisionNumber,
    /// Commit time in seconds since the Unix epoch.
    pub timestamp: i64,
    /// Committer name.
    pub author: String,
    /// State string.
    pub state: String,
    /// Whether the file is removed in this revision.
    pub dead: bool,
    /// Log message.
    pub log: String,
    /// Lock holder, if any.
    #[serde(default)]
    pub lock: Option<String>,
    /// Lines changed relative to the predecessor; `None` for the first
    /// revision.
    #[serde(default)]
    pub changes: Option<ChangeStats>,
    /// Previous revision on the same branch.
    #[serde(default)]
    pub prev: Option<RevisionNumber>,
    /// Next revision on the same branch.
    #[serde(default)]
    pub next: Option<RevisionNumber>,
    /// Branch point, set on the first commit of a branch.
    #[serde(default)]
    pub parent: Option<RevisionNumber>,
    /// Nearest revision at or before this one that is not dead.
    #[serde(default)]
    pub undead: Option<RevisionNumber>,
    /// Nearest existing revision below this one in the numbering scheme;
    /// the base a "changes since" diff compares against.
    #[serde(default)]
    pub since: Option<RevisionNumber>,
    /// Plain tags naming this revision.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Branch tags of the branch this revision lives on.
    #[serde(default)]
    pub branches: Vec<String>,
    /// Branch tags rooted at this revision.
    #[serde(default)]
    pub branch_points: Vec<String>,
}

/// A symbolic name together with what a checkout of it yields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    /// Tag name.
    pub name: String,
    /// Decoded number (`A.B.0.C` becomes `A.B.C`); `None` when the tag
    /// names the trunk itself.
    #[serde(default)]
    pub number: Option<RevisionNumber>,
    /// Whether the tag names a branch.
    pub is_branch: bool,
    /// Revision a checkout of the tag yields, if any.
    #[serde(default)]
    pub co_rev: Option<RevisionNumber>,
    /// Branch point of a branch tag.
    #[serde(default)]
    pub branch_rev: Option<RevisionNumber>,
    /// Other tags with the same number.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Parsed log of one archive.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileLog {
    /// Head revision.
    #[serde(default)]
    pub head: Option<RevisionNumber>,
    /// Principal branch, when it is not the trunk.
    #[serde(default)]
    pub principal_branch: Option<String>,
    /// File description.
    #[serde(default)]
    pub description: Option<String>,
    /// Revisions in the requested order.
    pub entries: Vec<LogEntry>,
    /// Every tag including the artificial `MAIN` and `HEAD`.
    pub tags: Vec<TagInfo>,
}

impl FileLog {
    /// Look up an entry by revision number.
    #[must_use]
    pub fn entry(&self, number: &RevisionNumber) -> Option<&LogEntry> {
        self.entries.iter().find(|entry| &entry.number == number)
    }

    /// Look up a tag by name.
    #[must_use]
    pub fn tag(&self, name: &str) -> Option<&TagInfo> {
        self.tags.iter().find(|tag| tag.name == name)
    }

    /// Keep at most `limit` entries starting at index `first`; `None`
    /// keeps everything from `first` on.
    #[must_use]
    pub fn paged(mut self, first: usize, limit: Option<usize>) -> Self {
        self.entries.drain(..first.min(self.entries.len()));
        if let Some(limit) = limit {
            self.entries.truncate(limit);
        }
        self
    }
}
