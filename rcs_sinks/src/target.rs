use std::collections::BTreeSet;

use rcs_api::{DeltaTexts, Revision, RevisionGraph, RevisionNumber};
use rcs_sink_api::{Flow, Sink, CONTINUE, STOP};
use tracing::debug;

use crate::matching::{MatchOutcome, MatchingSink, Request};
use crate::tree::{TreeError, TreeSink};

/// What the collected deltatexts will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Full text of the target only.
    Checkout,
    /// Full text plus the per-line provenance of the target.
    Blame,
}

/// Sink that resolves a request and keeps just the deltatexts needed to
/// rebuild the resolved revision.
///
/// Once the tree is known the set of required deltatexts is fixed: the
/// delta path from the snapshot to the target, and for blame also the
/// ancestry chains of the head and of the target. The parse stops as soon
/// as all of them have been read.
#[derive(Debug)]
pub struct TargetSink {
    purpose: Purpose,
    tree: TreeSink,
    matching: MatchingSink,
    needed: BTreeSet<RevisionNumber>,
    target_log_seen: bool,
}

/// Everything a reconstruction needs, as collected by a [`TargetSink`].
#[derive(Debug)]
pub struct Collected {
    /// How the request resolved.
    pub outcome: MatchOutcome,
    /// Metadata of the whole archive.
    pub graph: RevisionGraph,
    /// The required deltatexts.
    pub texts: DeltaTexts,
}

impl TargetSink {
    /// Resolve `request` and collect texts for `purpose`.
    #[must_use]
    pub fn new(request: impl Into<Request>, purpose: Purpose) -> Self {
        Self {
            purpose,
            tree: TreeSink::metadata_only(),
            matching: MatchingSink::new(request),
            needed: BTreeSet::new(),
            target_log_seen: false,
        }
    }

    /// Deltatexts the sink is waiting for.
    #[must_use]
    pub const fn needed(&self) -> &BTreeSet<RevisionNumber> {
        &self.needed
    }

    /// Finish collection.
    ///
    /// # Errors
    ///
    /// Propagates [`TreeError`] from the embedded tree sink.
    pub fn finish(self) -> Result<Collected, TreeError> {
        let outcome = self.matching.outcome();
        let (graph, texts) = self.tree.finish()?;
        Ok(Collected {
            outcome,
            graph,
            texts,
        })
    }

    fn required(&self, target: &RevisionNumber) -> BTreeSet<RevisionNumber> {
        let graph = self.tree.graph();
        let mut needed: BTreeSet<RevisionNumber> = graph
            .delta_path(target)
            .unwrap_or_default()
            .into_iter()
            .collect();
        if let Some(head) = &graph.head {
            needed.insert(head.clone());
            if self.purpose == Purpose::Blame {
                needed.extend(graph.ancestry(head));
                needed.extend(graph.ancestry(target));
            }
        }
        needed.insert(target.clone());
        needed
    }

    fn complete(&self) -> bool {
        self.target_log_seen && self.needed.iter().all(|rev| self.tree.has_text(rev))
    }
}

impl Sink for TargetSink {
    fn set_head_revision(&mut self, revision: &RevisionNumber) -> Flow {
        self.tree.set_head_revision(revision)
    }

    fn set_principal_branch(&mut self, branch: &str) -> Flow {
        let _ = self.tree.set_principal_branch(branch);
        self.matching.set_principal_branch(branch)
    }

    fn set_access(&mut self, users: &[String]) -> Flow {
        self.tree.set_access(users)
    }

    fn define_tag(&mut self, name: &str, revision: &str) -> Flow {
        let _ = self.tree.define_tag(name, revision);
        self.matching.define_tag(name, revision)
    }

    fn set_locker(&mut self, revision: &RevisionNumber, locker: &str) -> Flow {
        let _ = self.tree.set_locker(revision, locker);
        self.matching.set_locker(revision, locker)
    }

    fn set_locking(&mut self, mode: &str) -> Flow {
        self.tree.set_locking(mode)
    }

    fn set_comment(&mut self, comment: &str) -> Flow {
        self.tree.set_comment(comment)
    }

    fn set_expansion(&mut self, mode: &str) -> Flow {
        self.tree.set_expansion(mode)
    }

    fn admin_completed(&mut self) -> Flow {
        self.matching.admin_completed()
    }

    fn define_revision(&mut self, revision: &Revision) -> Flow {
        let _ = self.tree.define_revision(revision);
        self.matching.define_revision(revision)
    }

    fn tree_completed(&mut self) -> Flow {
        if self.matching.tree_completed().is_break() {
            return STOP;
        }
        let Some(target) = self.matching.candidate().map(|c| c.number.clone()) else {
            return STOP;
        };
        self.needed = self.required(&target);
        debug!(%target, needed = self.needed.len(), purpose = ?self.purpose, "collecting deltatexts");
        self.tree.retain_only(self.needed.clone());
        CONTINUE
    }

    fn set_description(&mut self, description: &str) -> Flow {
        self.tree.set_description(description)
    }

    fn set_revision_info(&mut self, revision: &RevisionNumber, log: &str, text: &[u8]) -> Flow {
        let _ = self.tree.set_revision_info(revision, log, text);
        if self.matching.set_revision_info(revision, log, text).is_break() {
            self.target_log_seen = true;
        }
        if self.complete() {
            debug!(%revision, "all required deltatexts collected");
            return STOP;
        }
        CONTINUE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rev(s: &str) -> RevisionNumber {
        RevisionNumber::parse(s).expect("valid revision")
    }

    fn revision(number: &str, branches: &[&str], next: Option<&str>) -> Revision {
        Revision {
            number: rev(number),
            timestamp: 0,
            author: "jrandom".into(),
            state: "Exp".into(),
            branches: branches.iter().map(|b| rev(b)).collect(),
            next: next.map(rev),
        }
    }

    fn feed_tree(sink: &mut TargetSink) -> Flow {
        let _ = sink.set_head_revision(&rev("1.3"));
        let _ = sink.define_tag("RELENG", "1.2.0.2");
        let _ = sink.admin_completed();
        let _ = sink.define_revision(&revision("1.3", &[], Some("1.2")));
        let _ = sink.define_revision(&revision("1.2", &["1.2.2.1"], Some("1.1")));
        let _ = sink.define_revision(&revision("1.1", &[], None));
        let _ = sink.define_revision(&revision("1.2.2.1", &[], None));
        sink.tree_completed()
    }

    #[test]
    fn checkout_of_head_stops_after_first_deltatext() {
        let mut sink = TargetSink::new("HEAD", Purpose::Checkout);
        assert_eq!(feed_tree(&mut sink), CONTINUE);
        assert_eq!(sink.needed(), &BTreeSet::from([rev("1.3")]));
        assert_eq!(sink.set_revision_info(&rev("1.3"), "tip", b"a\n"), STOP);

        let collected = sink.finish().expect("finish");
        assert!(matches!(collected.outcome, MatchOutcome::Found(ref r) if r.log == "tip"));
        assert_eq!(collected.texts.len(), 1);
        assert_eq!(collected.graph.revisions.len(), 4);
    }

    #[test]
    fn branch_checkout_needs_the_delta_path() {
        let mut sink = TargetSink::new("RELENG", Purpose::Checkout);
        let _ = feed_tree(&mut sink);
        assert_eq!(
            sink.needed(),
            &BTreeSet::from([rev("1.3"), rev("1.2"), rev("1.2.2.1")])
        );
        assert_eq!(sink.set_revision_info(&rev("1.3"), "", b"a\n"), CONTINUE);
        assert_eq!(sink.set_revision_info(&rev("1.2"), "", b"d1 1\n"), CONTINUE);
        assert_eq!(sink.set_revision_info(&rev("1.2.2.1"), "br", b"a0 1\nb\n"), STOP);
    }

    #[test]
    fn blame_also_needs_the_primordial_chain() {
        let mut sink = TargetSink::new("HEAD", Purpose::Blame);
        let _ = feed_tree(&mut sink);
        assert_eq!(
            sink.needed(),
            &BTreeSet::from([rev("1.1"), rev("1.2"), rev("1.3")])
        );
    }

    #[test]
    fn unknown_request_stops_early() {
        let mut sink = TargetSink::new("NOPE", Purpose::Checkout);
        let _ = sink.set_head_revision(&rev("1.3"));
        assert_eq!(sink.admin_completed(), STOP);
        assert_eq!(sink.finish().expect("finish").outcome, MatchOutcome::UnknownTag);
    }
}
