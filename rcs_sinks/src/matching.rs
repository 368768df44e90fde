use std::collections::BTreeMap;

use rcs_api::{ResolvedRevision, Revision, RevisionNumber, TagTarget};
use rcs_sink_api::{Flow, Sink, CONTINUE, STOP};
use tracing::debug;

/// What a caller asked for: the default line of development or a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `""`, `HEAD`, or `MAIN`: the principal branch, else the trunk.
    Main,
    /// A tag, a branch tag, or a literal revision or branch number.
    Named(String),
}

impl Request {
    /// Classify a request string.
    #[must_use]
    pub fn parse(request: &str) -> Self {
        match request {
            "" | "HEAD" | "MAIN" => Self::Main,
            name => Self::Named(name.to_owned()),
        }
    }
}

impl From<&str> for Request {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Final state of a [`MatchingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The request named neither a tag nor a valid number.
    UnknownTag,
    /// The target resolved, but no revision exists there.
    Absent,
    /// The request resolved to this revision.
    Found(ResolvedRevision),
}

/// Sink that resolves one request to a single revision, stopping the parse
/// as soon as the answer is known.
///
/// The request is resolved against the symbol table at the end of the admin
/// section; an unknown name stops the parse right there. While the tree is
/// read the best candidate is tracked: an exact number, the first trunk
/// revision for a trunk request, or for a branch request the highest commit
/// on that branch (falling back to the branch point when the branch has no
/// commits). Reading stops again once the candidate's deltatext supplies its
/// log message.
#[derive(Debug)]
pub struct MatchingSink {
    request: Request,
    principal_branch: Option<String>,
    named_tag: Option<String>,
    target: Option<TagTarget>,
    resolved: bool,
    locks: BTreeMap<RevisionNumber, String>,
    candidate: Option<Revision>,
    perfect: bool,
    log: Option<String>,
}

impl MatchingSink {
    /// Resolve `request` while parsing.
    #[must_use]
    pub fn new(request: impl Into<Request>) -> Self {
        Self {
            request: request.into(),
            principal_branch: None,
            named_tag: None,
            target: None,
            resolved: false,
            locks: BTreeMap::new(),
            candidate: None,
            perfect: false,
            log: None,
        }
    }

    /// The resolved target, once the admin section has been read.
    #[must_use]
    pub const fn target(&self) -> Option<&TagTarget> {
        self.target.as_ref()
    }

    /// The revision currently chosen, if any.
    #[must_use]
    pub const fn candidate(&self) -> Option<&Revision> {
        self.candidate.as_ref()
    }

    /// Log message of the candidate, once its deltatext was seen.
    #[must_use]
    pub fn log(&self) -> Option<&str> {
        self.log.as_deref()
    }

    /// Whether the request failed to resolve at the end of the admin section.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        self.resolved && self.target.is_none()
    }

    /// The resolved revision with whatever log message was collected.
    #[must_use]
    pub fn resolved_revision(&self) -> Option<ResolvedRevision> {
        let candidate = self.candidate.as_ref()?;
        Some(ResolvedRevision {
            number: candidate.number.clone(),
            timestamp: candidate.timestamp,
            author: candidate.author.clone(),
            state: candidate.state.clone(),
            dead: candidate.is_dead(),
            lock: self.locks.get(&candidate.number).cloned(),
            log: self.log.clone().unwrap_or_default(),
        })
    }

    /// Interpret the parse result.
    ///
    /// A candidate only counts as found when its deltatext was reached;
    /// an archive whose deltatexts stop short of it reports `Absent`.
    #[must_use]
    pub fn outcome(&self) -> MatchOutcome {
        if !self.resolved || self.target.is_none() {
            return MatchOutcome::UnknownTag;
        }
        match (self.log.is_some(), self.resolved_revision()) {
            (true, Some(revision)) => MatchOutcome::Found(revision),
            _ => MatchOutcome::Absent,
        }
    }

    fn resolve(&self) -> Option<TagTarget> {
        match &self.request {
            Request::Main => Some(
                self.principal_branch
                    .as_deref()
                    .and_then(|branch| TagTarget::parse(branch).ok())
                    .unwrap_or(TagTarget::Trunk),
            ),
            Request::Named(name) => match &self.named_tag {
                Some(raw) => TagTarget::parse(raw).ok(),
                None => TagTarget::parse(name).ok(),
            },
        }
    }

    fn consider(&mut self, revision: &Revision) {
        let Some(target) = &self.target else {
            return;
        };
        let number = &revision.number;
        let perfect = match target {
            TagTarget::Trunk => number.is_trunk(),
            TagTarget::Branch(_) => false,
            TagTarget::Revision(wanted) => number == wanted,
        };

        let better = perfect
            || match target {
                TagTarget::Branch(branch) => {
                    let on_branch = target.contains(number)
                        && self
                            .candidate
                            .as_ref()
                            .map_or(true, |current| *number > current.number);
                    let at_branch_point = self.candidate.is_none()
                        && branch.branch_point().as_ref() == Some(number);
                    on_branch || at_branch_point
                }
                TagTarget::Trunk | TagTarget::Revision(_) => false,
            };

        if better {
            self.candidate = Some(revision.clone());
            self.perfect = perfect;
        }
    }
}

impl Sink for MatchingSink {
    fn set_principal_branch(&mut self, branch: &str) -> Flow {
        self.principal_branch = Some(branch.to_owned());
        CONTINUE
    }

    fn define_tag(&mut self, name: &str, revision: &str) -> Flow {
        if matches!(&self.request, Request::Named(wanted) if wanted == name) {
            self.named_tag = Some(revision.to_owned());
        }
        CONTINUE
    }

    fn set_locker(&mut self, revision: &RevisionNumber, locker: &str) -> Flow {
        self.locks.insert(revision.clone(), locker.to_owned());
        CONTINUE
    }

    fn admin_completed(&mut self) -> Flow {
        self.target = self.resolve();
        self.resolved = true;
        if self.target.is_none() {
            debug!(request = ?self.request, "unknown tag, stopping after admin section");
            return STOP;
        }
        CONTINUE
    }

    fn define_revision(&mut self, revision: &Revision) -> Flow {
        if !self.perfect {
            self.consider(revision);
        }
        CONTINUE
    }

    fn tree_completed(&mut self) -> Flow {
        if self.candidate.is_none() {
            debug!(request = ?self.request, "nothing at target, stopping after tree");
            return STOP;
        }
        CONTINUE
    }

    fn set_revision_info(&mut self, revision: &RevisionNumber, log: &str, _text: &[u8]) -> Flow {
        match &self.candidate {
            Some(candidate) if &candidate.number == revision => {
                self.log = Some(log.to_owned());
                STOP
            }
            Some(_) => CONTINUE,
            None => STOP,
        }
    }
}
