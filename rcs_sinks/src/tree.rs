use std::collections::BTreeSet;

use rcs_api::{
    DeltaError, DeltaScript, DeltaTexts, Revision, RevisionGraph, RevisionNumber, Tag,
};
use rcs_sink_api::{Flow, Sink, CONTINUE, STOP};
use tracing::{debug, warn};

/// Failure while interpreting deltatexts collected by a sink.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// A stored edit script could not be decoded.
    #[error("malformed deltatext for revision {revision}")]
    MalformedDelta {
        /// Revision owning the deltatext.
        revision: RevisionNumber,
        /// Decoder failure.
        #[source]
        source: DeltaError,
    },
}

/// Which deltatexts a [`TreeSink`] keeps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum Retain {
    #[default]
    Nothing,
    Everything,
    Only(BTreeSet<RevisionNumber>),
}

impl Retain {
    fn wants(&self, revision: &RevisionNumber) -> bool {
        match self {
            Self::Nothing => false,
            Self::Everything => true,
            Self::Only(wanted) => wanted.contains(revision),
        }
    }
}

/// Sink that accumulates the whole revision graph of an archive.
///
/// Deltatexts are decoded to compute per-revision change statistics; the
/// raw texts themselves are only kept when requested.
#[derive(Debug, Default)]
pub struct TreeSink {
    graph: RevisionGraph,
    texts: DeltaTexts,
    retain: Retain,
    compute_stats: bool,
    error: Option<TreeError>,
}

impl TreeSink {
    /// Collect metadata and change statistics only.
    #[must_use]
    pub fn new() -> Self {
        Self {
            compute_stats: true,
            ..Self::default()
        }
    }

    /// Collect metadata, statistics, and every raw deltatext.
    #[must_use]
    pub fn with_texts() -> Self {
        Self {
            retain: Retain::Everything,
            compute_stats: true,
            ..Self::default()
        }
    }

    /// Collect metadata only; deltatexts are neither decoded nor kept
    /// until [`retain_only`](Self::retain_only) names some.
    #[must_use]
    pub fn metadata_only() -> Self {
        Self::default()
    }

    /// Keep exactly the deltatexts of `revisions` from now on.
    pub fn retain_only(&mut self, revisions: BTreeSet<RevisionNumber>) {
        self.retain = Retain::Only(revisions);
    }

    /// The graph collected so far.
    #[must_use]
    pub const fn graph(&self) -> &RevisionGraph {
        &self.graph
    }

    /// Whether a deltatext has been kept for `revision`.
    #[must_use]
    pub fn has_text(&self, revision: &RevisionNumber) -> bool {
        self.texts.contains_key(revision)
    }

    /// Finish collection and hand out the graph and any retained texts.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::MalformedDelta`] when an edit script seen while
    /// computing statistics could not be decoded.
    pub fn finish(self) -> Result<(RevisionGraph, DeltaTexts), TreeError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok((self.graph, self.texts)),
        }
    }
}

impl Sink for TreeSink {
    fn set_head_revision(&mut self, revision: &RevisionNumber) -> Flow {
        self.graph.head = Some(revision.clone());
        CONTINUE
    }

    fn set_principal_branch(&mut self, branch: &str) -> Flow {
        self.graph.principal_branch = Some(branch.to_owned());
        CONTINUE
    }

    fn set_access(&mut self, users: &[String]) -> Flow {
        self.graph.access = users.to_vec();
        CONTINUE
    }

    fn define_tag(&mut self, name: &str, revision: &str) -> Flow {
        match RevisionNumber::parse(revision) {
            Ok(number) => self.graph.tags.push(Tag::new(name, number)),
            Err(error) => warn!(tag = name, revision, %error, "skipping malformed tag"),
        }
        CONTINUE
    }

    fn set_locker(&mut self, revision: &RevisionNumber, locker: &str) -> Flow {
        self.graph.locks.insert(revision.clone(), locker.to_owned());
        CONTINUE
    }

    fn set_locking(&mut self, mode: &str) -> Flow {
        self.graph.strict_locking = mode == "strict";
        CONTINUE
    }

    fn set_comment(&mut self, comment: &str) -> Flow {
        self.graph.comment = Some(comment.to_owned());
        CONTINUE
    }

    fn set_expansion(&mut self, mode: &str) -> Flow {
        self.graph.expansion = Some(mode.to_owned());
        CONTINUE
    }

    fn define_revision(&mut self, revision: &Revision) -> Flow {
        self.graph.insert_revision(revision.clone());
        CONTINUE
    }

    fn set_description(&mut self, description: &str) -> Flow {
        self.graph.description = Some(description.to_owned());
        CONTINUE
    }

    fn set_revision_info(&mut self, revision: &RevisionNumber, log: &str, text: &[u8]) -> Flow {
        self.graph.logs.insert(revision.clone(), log.to_owned());

        if self.compute_stats && self.graph.head.as_ref() != Some(revision) {
            match DeltaScript::parse(text) {
                Ok(script) => {
                    self.graph.delta_stats.insert(revision.clone(), script.stats());
                }
                Err(source) => {
                    debug!(%revision, "stopping on malformed deltatext");
                    self.error = Some(TreeError::MalformedDelta {
                        revision: revision.clone(),
                        source,
                    });
                    return STOP;
                }
            }
        }

        if self.retain.wants(revision) {
            self.texts.insert(revision.clone(), text.to_vec());
        }
        CONTINUE
    }
}
