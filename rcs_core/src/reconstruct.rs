//! Full-text and per-line provenance reconstruction from collected
//! deltatexts.
//!
//! Exactly one revision (the head) stores its full text. Trunk deltas are
//! reverse diffs: revision `R`'s script turns the text of the next newer
//! trunk revision into `R`. Branch deltas are forward diffs from the branch
//! point or the previous branch commit. [`Reconstructor::extract`] walks the
//! delta path from the head to the target applying scripts in order;
//! [`Reconstructor::blame`] walks the ancestry from the oldest revision up
//! to the target, labelling lines with the revision that introduced them.

use rcs_api::{
    split_lines, BlameLine, DeltaCommand, DeltaError, DeltaScript, DeltaTexts, RevisionGraph,
    RevisionNumber,
};
use tracing::trace;

/// Failure to rebuild a revision from its deltatexts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconstructionError {
    /// The revision is not in the tree or not reachable from the head.
    #[error("revision {revision} is not reachable from the head revision")]
    UnknownRevision {
        /// Requested revision.
        revision: RevisionNumber,
    },
    /// The archive names no head or its full text was not collected.
    #[error("archive has no full-text snapshot")]
    NoSnapshot,
    /// A deltatext on the walk was not collected.
    #[error("deltatext for revision {revision} is missing")]
    MissingDeltaText {
        /// Revision whose deltatext is missing.
        revision: RevisionNumber,
    },
    /// A deltatext on the walk is not a valid edit script.
    #[error("malformed deltatext for revision {revision}: {source}")]
    MalformedDelta {
        /// Revision owning the deltatext.
        revision: RevisionNumber,
        /// Decoder failure.
        #[source]
        source: DeltaError,
    },
    /// An edit command addresses lines the text does not have.
    #[error("delta for revision {revision} addresses line {line} of a {lines}-line text")]
    DeltaOutOfRange {
        /// Revision owning the script.
        revision: RevisionNumber,
        /// Offending 1-based line.
        line: usize,
        /// Lines available at that point.
        lines: usize,
    },
    /// Provenance labels and reconstructed lines disagree in number.
    #[error("blame of {revision} produced {labels} labels for {lines} lines")]
    InconsistentDeltaCount {
        /// Annotated revision.
        revision: RevisionNumber,
        /// Label count.
        labels: usize,
        /// Line count.
        lines: usize,
    },
}

type Result<T> = std::result::Result<T, ReconstructionError>;

/// Rebuilds revisions from a graph and the deltatexts collected for it.
#[derive(Debug, Clone, Copy)]
pub struct Reconstructor<'a> {
    graph: &'a RevisionGraph,
    texts: &'a DeltaTexts,
}

impl<'a> Reconstructor<'a> {
    /// Reconstruct from `graph` using `texts`.
    #[must_use]
    pub const fn new(graph: &'a RevisionGraph, texts: &'a DeltaTexts) -> Self {
        Self { graph, texts }
    }

    /// Lines of `target`, each keeping its newline.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructionError`] when the target is unknown, a needed
    /// deltatext is missing or malformed, or a command is out of range.
    pub fn extract(&self, target: &RevisionNumber) -> Result<Vec<&'a [u8]>> {
        let path = self.delta_path(target)?;
        let mut lines = split_lines(self.snapshot()?);
        for revision in path.iter().skip(1) {
            let script = self.script(revision)?;
            trace!(%revision, commands = script.commands().len(), "applying delta");
            apply_forward(&mut lines, &script, revision, |line| line)?;
        }
        Ok(lines)
    }

    /// Exact bytes of `target`.
    ///
    /// # Errors
    ///
    /// See [`extract`](Self::extract).
    pub fn extract_text(&self, target: &RevisionNumber) -> Result<Vec<u8>> {
        Ok(self.extract(target)?.concat())
    }

    /// The revision that introduced each line of `target`.
    ///
    /// # Errors
    ///
    /// Besides the failures of [`extract`](Self::extract), returns
    /// [`ReconstructionError::InconsistentDeltaCount`] when the labels do not
    /// line up with the reconstructed text.
    pub fn blame(&self, target: &RevisionNumber) -> Result<Vec<RevisionNumber>> {
        let head = self.head()?;
        let chain = self.graph.ancestry(target);
        let primordial = chain.last().unwrap_or(target).clone();

        let snapshot_lines = split_lines(self.snapshot()?).len();
        let mut count = isize::try_from(snapshot_lines).unwrap_or(isize::MAX);
        // No trunk text can hold more lines than the snapshot plus every
        // line a trunk script adds.
        let mut limit = snapshot_lines;
        for revision in self.graph.ancestry(head).iter().skip(1) {
            let script = self.script(revision)?;
            count = count.saturating_add(script.line_delta());
            limit = limit.saturating_add(script.added_lines());
        }
        let count = usize::try_from(count).map_err(|_| {
            ReconstructionError::InconsistentDeltaCount {
                revision: target.clone(),
                labels: 0,
                lines: 0,
            }
        })?;

        let mut labels = vec![primordial.clone(); count];
        let mut last = primordial;
        for revision in chain.iter().rev().skip(1) {
            if revision.is_trunk() {
                let script = self.script(&last)?;
                apply_inverse(&mut labels, &script, revision, limit)?;
            } else {
                let script = self.script(revision)?;
                apply_forward(&mut labels, &script, revision, |_| revision.clone())?;
            }
            last = revision.clone();
        }

        let lines = self.extract(target)?.len();
        if labels.len() != lines {
            return Err(ReconstructionError::InconsistentDeltaCount {
                revision: target.clone(),
                labels: labels.len(),
                lines,
            });
        }
        Ok(labels)
    }

    /// Text of `target` with author, date, and origin for every line.
    ///
    /// # Errors
    ///
    /// See [`blame`](Self::blame).
    pub fn annotate(&self, target: &RevisionNumber) -> Result<Vec<BlameLine>> {
        let labels = self.blame(target)?;
        let lines = self.extract(target)?;
        labels
            .into_iter()
            .zip(lines)
            .enumerate()
            .map(|(index, (revision, text))| {
                let meta = self
                    .graph
                    .revision(&revision)
                    .ok_or_else(|| ReconstructionError::UnknownRevision {
                        revision: revision.clone(),
                    })?;
                Ok(BlameLine {
                    line_number: index + 1,
                    text: String::from_utf8_lossy(text).into_owned(),
                    previous: self.graph.ancestor(&revision).cloned(),
                    author: meta.author.clone(),
                    timestamp: meta.timestamp,
                    revision,
                })
            })
            .collect()
    }

    fn head(&self) -> Result<&'a RevisionNumber> {
        self.graph.head.as_ref().ok_or(ReconstructionError::NoSnapshot)
    }

    fn snapshot(&self) -> Result<&'a [u8]> {
        let head = self.head()?;
        self.texts
            .get(head)
            .map(Vec::as_slice)
            .ok_or(ReconstructionError::NoSnapshot)
    }

    fn delta_path(&self, target: &RevisionNumber) -> Result<Vec<RevisionNumber>> {
        if self.graph.revision(target).is_none() {
            return Err(ReconstructionError::UnknownRevision {
                revision: target.clone(),
            });
        }
        self.head()?;
        self.graph
            .delta_path(target)
            .ok_or_else(|| ReconstructionError::UnknownRevision {
                revision: target.clone(),
            })
    }

    fn script(&self, revision: &RevisionNumber) -> Result<DeltaScript<'a>> {
        let text = self.texts.get(revision).ok_or_else(|| {
            ReconstructionError::MissingDeltaText {
                revision: revision.clone(),
            }
        })?;
        DeltaScript::parse(text).map_err(|source| ReconstructionError::MalformedDelta {
            revision: revision.clone(),
            source,
        })
    }
}

/// Apply `script` to `items` in the forward direction.
///
/// Command positions refer to the text before the script started, so a
/// running `adjust` maps them onto the partially edited vector.
fn apply_forward<'s, T>(
    items: &mut Vec<T>,
    script: &DeltaScript<'s>,
    revision: &RevisionNumber,
    mut make: impl FnMut(&'s [u8]) -> T,
) -> Result<()> {
    let mut adjust: isize = 0;
    for command in script.commands() {
        let out_of_range = |line: usize, lines: usize| ReconstructionError::DeltaOutOfRange {
            revision: revision.clone(),
            line,
            lines,
        };
        match command {
            DeltaCommand::Delete { at, count } => {
                let begin = at
                    .checked_sub(1)
                    .and_then(|index| shift(index, adjust))
                    .ok_or_else(|| out_of_range(*at, items.len()))?;
                let end = begin
                    .checked_add(*count)
                    .filter(|end| *end <= items.len())
                    .ok_or_else(|| out_of_range(*at, items.len()))?;
                items.drain(begin..end);
                adjust -= signed(*count);
            }
            DeltaCommand::Add { at, lines } => {
                let index = shift(*at, adjust)
                    .filter(|index| *index <= items.len())
                    .ok_or_else(|| out_of_range(*at, items.len()))?;
                items.splice(index..index, lines.iter().copied().map(&mut make));
                adjust += signed(lines.len());
            }
        }
    }
    Ok(())
}

/// Undo a reverse delta on a label vector.
///
/// `script` turns the newer text into the older one; the labels describe the
/// older text. Lines the script deletes exist only in the newer text and are
/// credited to `revision`; lines it adds exist only in the older text and
/// are dropped. Commands are visited in order, so everything before the
/// current position is already in newer-text coordinates. The labels never
/// grow past `limit`.
fn apply_inverse(
    labels: &mut Vec<RevisionNumber>,
    script: &DeltaScript<'_>,
    revision: &RevisionNumber,
    limit: usize,
) -> Result<()> {
    for command in script.commands() {
        let out_of_range = |line: usize, lines: usize| ReconstructionError::DeltaOutOfRange {
            revision: revision.clone(),
            line,
            lines,
        };
        match command {
            DeltaCommand::Delete { at, count } => {
                let index = at
                    .checked_sub(1)
                    .filter(|index| *index <= labels.len())
                    .ok_or_else(|| out_of_range(*at, labels.len()))?;
                if labels.len().checked_add(*count).map_or(true, |grown| grown > limit) {
                    return Err(out_of_range(*at, labels.len()));
                }
                labels.splice(index..index, std::iter::repeat(revision.clone()).take(*count));
            }
            DeltaCommand::Add { at, lines } => {
                let end = at
                    .checked_add(lines.len())
                    .filter(|end| *end <= labels.len())
                    .ok_or_else(|| out_of_range(at.saturating_add(lines.len()), labels.len()))?;
                labels.drain(*at..end);
            }
        }
    }
    Ok(())
}

fn signed(value: usize) -> isize {
    isize::try_from(value).unwrap_or(isize::MAX)
}

fn shift(index: usize, adjust: isize) -> Option<usize> {
    index.checked_add_signed(adjust)
}
