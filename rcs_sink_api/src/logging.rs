use rcs_api::{Revision, RevisionNumber};
use tracing::{debug, trace};

use crate::{Flow, Sink};

/// Decorator that logs every callback before forwarding it.
#[derive(Debug, Clone, Default)]
pub struct TracingSink<S> {
    inner: S,
}

impl<S: Sink> TracingSink<S> {
    /// Wrap `inner`.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Borrow the wrapped sink.
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwrap the decorator.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

fn traced(event: &'static str, flow: Flow) -> Flow {
    if flow.is_break() {
        debug!(event, "sink requested stop");
    }
    flow
}

impl<S: Sink> Sink for TracingSink<S> {
    fn set_head_revision(&mut self, revision: &RevisionNumber) -> Flow {
        trace!(%revision, "head");
        traced("head", self.inner.set_head_revision(revision))
    }

    fn set_principal_branch(&mut self, branch: &str) -> Flow {
        trace!(branch, "principal branch");
        traced("branch", self.inner.set_principal_branch(branch))
    }

    fn set_access(&mut self, users: &[String]) -> Flow {
        trace!(?users, "access");
        traced("access", self.inner.set_access(users))
    }

    fn define_tag(&mut self, name: &str, revision: &str) -> Flow {
        trace!(name, revision, "tag");
        traced("tag", self.inner.define_tag(name, revision))
    }

    fn set_locker(&mut self, revision: &RevisionNumber, locker: &str) -> Flow {
        trace!(%revision, locker, "lock");
        traced("lock", self.inner.set_locker(revision, locker))
    }

    fn set_locking(&mut self, mode: &str) -> Flow {
        trace!(mode, "locking");
        traced("locking", self.inner.set_locking(mode))
    }

    fn set_comment(&mut self, comment: &str) -> Flow {
        trace!(comment, "comment");
        traced("comment", self.inner.set_comment(comment))
    }

    fn set_expansion(&mut self, mode: &str) -> Flow {
        trace!(mode, "expansion");
        traced("expand", self.inner.set_expansion(mode))
    }

    fn admin_completed(&mut self) -> Flow {
        trace!("admin completed");
        traced("admin_completed", self.inner.admin_completed())
    }

    fn define_revision(&mut self, revision: &Revision) -> Flow {
        trace!(
            revision = %revision.number,
            author = %revision.author,
            state = %revision.state,
            branches = revision.branches.len(),
            "revision"
        );
        traced("revision", self.inner.define_revision(revision))
    }

    fn tree_completed(&mut self) -> Flow {
        trace!("tree completed");
        traced("tree_completed", self.inner.tree_completed())
    }

    fn set_description(&mut self, description: &str) -> Flow {
        trace!(len = description.len(), "description");
        traced("desc", self.inner.set_description(description))
    }

    fn set_revision_info(&mut self, revision: &RevisionNumber, log: &str, text: &[u8]) -> Flow {
        trace!(%revision, log_len = log.len(), text_len = text.len(), "deltatext");
        traced("deltatext", self.inner.set_revision_info(revision, log, text))
    }

    fn parse_completed(&mut self) -> Flow {
        trace!("parse completed");
        traced("parse_completed", self.inner.parse_completed())
    }
}
