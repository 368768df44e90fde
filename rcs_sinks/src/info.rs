use std::collections::BTreeMap;

use rcs_api::{Revision, RevisionNumber};
use rcs_sink_api::{Flow, Sink};

use crate::matching::{MatchOutcome, MatchingSink, Request};

/// Every symbol seen across a set of archives, keyed by name, with the last
/// raw number seen for it.
pub type TagCatalog = BTreeMap<String, String>;

/// Per-file sink for directory listings.
///
/// Resolves the listing request like [`MatchingSink`] and additionally
/// records each symbol into a catalog shared by all files of the listing.
#[derive(Debug)]
pub struct InfoSink<'a> {
    matching: MatchingSink,
    catalog: &'a mut TagCatalog,
}

impl<'a> InfoSink<'a> {
    /// Resolve `request`, adding symbols to `catalog`.
    pub fn new(request: impl Into<Request>, catalog: &'a mut TagCatalog) -> Self {
        Self {
            matching: MatchingSink::new(request),
            catalog,
        }
    }

    /// Interpret the parse result. Unknown names count as absent here: a
    /// file that never carried the tag simply does not exist at it.
    #[must_use]
    pub fn outcome(&self) -> MatchOutcome {
        match self.matching.outcome() {
            MatchOutcome::UnknownTag => MatchOutcome::Absent,
            outcome => outcome,
        }
    }
}

impl Sink for InfoSink<'_> {
    fn set_principal_branch(&mut self, branch: &str) -> Flow {
        self.matching.set_principal_branch(branch)
    }

    fn define_tag(&mut self, name: &str, revision: &str) -> Flow {
        self.catalog.insert(name.to_owned(), revision.to_owned());
        self.matching.define_tag(name, revision)
    }

    fn set_locker(&mut self, revision: &RevisionNumber, locker: &str) -> Flow {
        self.matching.set_locker(revision, locker)
    }

    fn admin_completed(&mut self) -> Flow {
        self.matching.admin_completed()
    }

    fn define_revision(&mut self, revision: &Revision) -> Flow {
        self.matching.define_revision(revision)
    }

    fn tree_completed(&mut self) -> Flow {
        self.matching.tree_completed()
    }

    fn set_revision_info(&mut self, revision: &RevisionNumber, log: &str, text: &[u8]) -> Flow {
        self.matching.set_revision_info(revision, log, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcs_sink_api::STOP;

    #[test]
    fn records_tags_and_treats_unknown_as_absent() {
        let mut catalog = TagCatalog::new();
        catalog.insert("MAIN".into(), String::new());

        let mut sink = InfoSink::new("MISSING", &mut catalog);
        let _ = sink.define_tag("R1", "1.1");
        let _ = sink.define_tag("RELENG", "1.1.0.2");
        assert_eq!(sink.admin_completed(), STOP);
        assert_eq!(sink.outcome(), MatchOutcome::Absent);

        assert_eq!(
            catalog.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["MAIN", "R1", "RELENG"]
        );
    }
}
