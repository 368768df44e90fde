use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::delta::ChangeStats;
use crate::revision::{RevisionNumber, TagTarget};

/// Raw deltatexts keyed by revision: the snapshot's full text or an edit
/// script.
pub type DeltaTexts = BTreeMap<RevisionNumber, Vec<u8>>;

/// Metadata of one node in the revision tree, as read from the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Revision number (never a branch number).
    pub number: RevisionNumber,
    /// Commit time in seconds since the Unix epoch, UTC.
    pub timestamp: i64,
    /// Committer name.
    pub author: String,
    /// State string, usually `Exp` or `dead`.
    pub state: String,
    /// First commit of every branch rooted at this revision.
    #[serde(default)]
    pub branches: Vec<RevisionNumber>,
    /// Where the next deltatext of the chain lives: the previous revision
    /// on trunk, the following revision on a branch.
    #[serde(default)]
    pub next: Option<RevisionNumber>,
}

impl Revision {
    /// Whether the file was removed in this revision.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == "dead"
    }
}

/// A symbolic name bound to a revision or branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Symbol name.
    pub name: String,
    /// Number exactly as written in the archive, e.g. `1.2.0.4`.
    pub number: RevisionNumber,
}

impl Tag {
    /// Create a tag.
    #[must_use]
    pub fn new(name: impl Into<String>, number: RevisionNumber) -> Self {
        Self {
            name: name.into(),
            number,
        }
    }

    /// Branch tags are recognised purely from the number's shape.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        self.number.is_branch()
    }

    /// The decoded target of the tag.
    #[must_use]
    pub fn target(&self) -> TagTarget {
        TagTarget::from_number(&self.number)
    }
}

/// Admin section, revision tree, and per-revision logs of one archive.
///
/// Besides the raw records the graph maintains two derived links per
/// revision: `prev_delta` (whose text this revision's deltatext is applied
/// to) and `ancestor` (the revision this one was committed on top of).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RevisionGraph {
    /// Revision holding the full-text snapshot.
    #[serde(default)]
    pub head: Option<RevisionNumber>,
    /// Default branch when it is not the trunk, e.g. a vendor branch.
    #[serde(default)]
    pub principal_branch: Option<String>,
    /// Users allowed to lock revisions.
    #[serde(default)]
    pub access: Vec<String>,
    /// Symbols in archive order.
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Lock holders by revision.
    #[serde(default)]
    pub locks: BTreeMap<RevisionNumber, String>,
    /// Whether strict locking is enabled.
    #[serde(default)]
    pub strict_locking: bool,
    /// Comment leader.
    #[serde(default)]
    pub comment: Option<String>,
    /// Keyword expansion mode.
    #[serde(default)]
    pub expansion: Option<String>,
    /// File description.
    #[serde(default)]
    pub description: Option<String>,
    /// Revisions keyed by number.
    #[serde(default)]
    pub revisions: BTreeMap<RevisionNumber, Revision>,
    /// Log messages keyed by revision.
    #[serde(default)]
    pub logs: BTreeMap<RevisionNumber, String>,
    /// Counts of each revision's stored deltatext; absent for the snapshot.
    #[serde(skip)]
    pub delta_stats: BTreeMap<RevisionNumber, ChangeStats>,
    #[serde(skip)]
    prev_delta: BTreeMap<RevisionNumber, RevisionNumber>,
    #[serde(skip)]
    ancestor: BTreeMap<RevisionNumber, RevisionNumber>,
}

impl RevisionGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a revision and derive its delta and ancestry links.
    pub fn insert_revision(&mut self, revision: Revision) {
        let number = revision.number.clone();
        for branch in &revision.branches {
            self.prev_delta.insert(branch.clone(), number.clone());
            self.ancestor.insert(branch.clone(), number.clone());
        }
        if let Some(next) = &revision.next {
            self.prev_delta.insert(next.clone(), number.clone());
            if number.is_trunk() {
                self.ancestor.insert(number.clone(), next.clone());
            } else {
                self.ancestor.insert(next.clone(), number.clone());
            }
        }
        self.revisions.insert(number, revision);
    }

    /// Look up one revision.
    #[must_use]
    pub fn revision(&self, number: &RevisionNumber) -> Option<&Revision> {
        self.revisions.get(number)
    }

    /// The revision whose text `number`'s deltatext transforms.
    #[must_use]
    pub fn prev_delta(&self, number: &RevisionNumber) -> Option<&RevisionNumber> {
        self.prev_delta.get(number)
    }

    /// The revision `number` was committed on top of.
    #[must_use]
    pub fn ancestor(&self, number: &RevisionNumber) -> Option<&RevisionNumber> {
        self.ancestor.get(number)
    }

    /// Deltatexts to apply, in order, to turn the snapshot into `target`.
    ///
    /// The first element is the snapshot revision itself; the path ends with
    /// `target`. Returns `None` when the chain does not reach the head.
    #[must_use]
    pub fn delta_path(&self, target: &RevisionNumber) -> Option<Vec<RevisionNumber>> {
        let head = self.head.as_ref()?;
        let mut path = vec![target.clone()];
        let mut current = target;
        while current != head {
            current = self.prev_delta.get(current)?;
            if path.len() > self.revisions.len() {
                return None;
            }
            path.push(current.clone());
        }
        path.reverse();
        Some(path)
    }

    /// `target` followed by its ancestors down to the primordial revision.
    #[must_use]
    pub fn ancestry(&self, target: &RevisionNumber) -> Vec<RevisionNumber> {
        let mut chain = vec![target.clone()];
        let mut current = target;
        while let Some(parent) = self.ancestor.get(current) {
            if chain.len() > self.revisions.len() {
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    /// Lines changed by `number` relative to the revision it was committed
    /// on top of.
    ///
    /// Branch revisions store forward deltas, so their own counts apply.
    /// Trunk deltas are reverse diffs stored on the older revision, so a
    /// trunk revision's change is the inverse of its `next` revision's
    /// counts.
    #[must_use]
    pub fn changes(&self, number: &RevisionNumber) -> Option<ChangeStats> {
        if number.is_trunk() {
            let older = self.revisions.get(number)?.next.as_ref()?;
            self.delta_stats.get(older).map(|stats| stats.inverted())
        } else {
            self.delta_stats.get(number).copied()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rev(s: &str) -> RevisionNumber {
        RevisionNumber::parse(s).expect("valid revision")
    }

    fn node(number: &str, branches: &[&str], next: Option<&str>) -> Revision {
        Revision {
            number: rev(number),
            timestamp: 0,
            author: "jrandom".into(),
            state: "Exp".into(),
            branches: branches.iter().map(|b| rev(b)).collect(),
            next: next.map(rev),
        }
    }

    fn sample() -> RevisionGraph {
        let mut graph = RevisionGraph::new();
        graph.head = Some(rev("1.3"));
        graph.insert_revision(node("1.3", &[], Some("1.2")));
        graph.insert_revision(node("1.2", &["1.2.2.1"], Some("1.1")));
        graph.insert_revision(node("1.1", &[], None));
        graph.insert_revision(node("1.2.2.1", &[], Some("1.2.2.2")));
        graph.insert_revision(node("1.2.2.2", &[], None));
        graph
    }

    #[test]
    fn delta_path_walks_from_head() {
        let graph = sample();
        assert_eq!(
            graph.delta_path(&rev("1.1")),
            Some(vec![rev("1.3"), rev("1.2"), rev("1.1")])
        );
        assert_eq!(
            graph.delta_path(&rev("1.2.2.2")),
            Some(vec![rev("1.3"), rev("1.2"), rev("1.2.2.1"), rev("1.2.2.2")])
        );
        assert_eq!(graph.delta_path(&rev("1.3")), Some(vec![rev("1.3")]));
        assert_eq!(graph.delta_path(&rev("1.9")), None);
    }

    #[test]
    fn ancestry_reaches_primordial_revision() {
        let graph = sample();
        assert_eq!(
            graph.ancestry(&rev("1.2.2.2")),
            vec![rev("1.2.2.2"), rev("1.2.2.1"), rev("1.2"), rev("1.1")]
        );
        assert_eq!(graph.ancestry(&rev("1.3")), vec![rev("1.3"), rev("1.2"), rev("1.1")]);
    }

    #[test]
    fn changes_invert_trunk_deltas() {
        let mut graph = sample();
        graph.delta_stats.insert(rev("1.2"), ChangeStats::new(1, 3));
        graph.delta_stats.insert(rev("1.2.2.1"), ChangeStats::new(2, 0));

        assert_eq!(graph.changes(&rev("1.3")), Some(ChangeStats::new(3, 1)));
        assert_eq!(graph.changes(&rev("1.2.2.1")), Some(ChangeStats::new(2, 0)));
        assert_eq!(graph.changes(&rev("1.1")), None);
    }

    #[test]
    fn tags_classify_by_shape() {
        let branch = Tag::new("RELENG", rev("1.2.0.2"));
        assert!(branch.is_branch());
        assert_eq!(branch.target(), TagTarget::Branch(rev("1.2.2")));
        assert!(!Tag::new("R1", rev("1.2")).is_branch());
    }

    #[test]
    fn graph_serializes_without_derived_links() {
        let graph = sample();
        let json = serde_json::to_value(&graph).expect("serialize graph");
        assert_eq!(json["head"], "1.3");
        assert_eq!(json["revisions"]["1.2"]["branches"][0], "1.2.2.1");
        assert!(json.get("prev_delta").is_none());
    }
}
