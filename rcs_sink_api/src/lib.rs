//! Callback interface driven by the RCS archive parser.
//!
//! The parser walks an archive once, front to back, and reports what it
//! finds to a [`Sink`]. Every callback returns a [`Flow`]; returning
//! [`STOP`] ends the parse early without error, which is how lookups of a
//! single revision avoid reading deltatexts they do not need.

mod events;
mod logging;

use std::ops::ControlFlow;

pub use events::{EventRecorder, SinkEvent};
pub use logging::TracingSink;

use rcs_api::{Revision, RevisionNumber};

/// Whether the parser should keep going after a callback.
pub type Flow = ControlFlow<()>;

/// Keep parsing.
pub const CONTINUE: Flow = ControlFlow::Continue(());

/// End the parse now; the parser reports it as a successful early stop.
pub const STOP: Flow = ControlFlow::Break(());

/// Receiver of parse events, called in archive order.
///
/// Admin callbacks come first (each at most once, except `define_tag` and
/// `set_locker`), then `admin_completed`, one `define_revision` per tree
/// entry, `tree_completed`, `set_description`, one `set_revision_info` per
/// deltatext, and finally `parse_completed`. All methods default to
/// ignoring the event.
pub trait Sink {
    /// `head` names the revision holding the full-text snapshot.
    fn set_head_revision(&mut self, _revision: &RevisionNumber) -> Flow {
        CONTINUE
    }

    /// `branch` names a default branch other than the trunk. Passed raw.
    fn set_principal_branch(&mut self, _branch: &str) -> Flow {
        CONTINUE
    }

    /// `access` lists users allowed to lock.
    fn set_access(&mut self, _users: &[String]) -> Flow {
        CONTINUE
    }

    /// One `symbols` entry. The number is passed raw so sinks can decide how
    /// to treat values they cannot parse.
    fn define_tag(&mut self, _name: &str, _revision: &str) -> Flow {
        CONTINUE
    }

    /// One `locks` entry.
    fn set_locker(&mut self, _revision: &RevisionNumber, _locker: &str) -> Flow {
        CONTINUE
    }

    /// `strict` was present.
    fn set_locking(&mut self, _mode: &str) -> Flow {
        CONTINUE
    }

    /// `comment` leader.
    fn set_comment(&mut self, _comment: &str) -> Flow {
        CONTINUE
    }

    /// `expand` keyword-substitution mode.
    fn set_expansion(&mut self, _mode: &str) -> Flow {
        CONTINUE
    }

    /// The admin section ended.
    fn admin_completed(&mut self) -> Flow {
        CONTINUE
    }

    /// One revision tree entry.
    fn define_revision(&mut self, _revision: &Revision) -> Flow {
        CONTINUE
    }

    /// The revision tree ended.
    fn tree_completed(&mut self) -> Flow {
        CONTINUE
    }

    /// The `desc` string.
    fn set_description(&mut self, _description: &str) -> Flow {
        CONTINUE
    }

    /// One deltatext: the log message and either the full text (for the
    /// snapshot revision) or an edit script.
    fn set_revision_info(&mut self, _revision: &RevisionNumber, _log: &str, _text: &[u8]) -> Flow {
        CONTINUE
    }

    /// End of input was reached.
    fn parse_completed(&mut self) -> Flow {
        CONTINUE
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn set_head_revision(&mut self, revision: &RevisionNumber) -> Flow {
        (**self).set_head_revision(revision)
    }

    fn set_principal_branch(&mut self, branch: &str) -> Flow {
        (**self).set_principal_branch(branch)
    }

    fn set_access(&mut self, users: &[String]) -> Flow {
        (**self).set_access(users)
    }

    fn define_tag(&mut self, name: &str, revision: &str) -> Flow {
        (**self).define_tag(name, revision)
    }

    fn set_locker(&mut self, revision: &RevisionNumber, locker: &str) -> Flow {
        (**self).set_locker(revision, locker)
    }

    fn set_locking(&mut self, mode: &str) -> Flow {
        (**self).set_locking(mode)
    }

    fn set_comment(&mut self, comment: &str) -> Flow {
        (**self).set_comment(comment)
    }

    fn set_expansion(&mut self, mode: &str) -> Flow {
        (**self).set_expansion(mode)
    }

    fn admin_completed(&mut self) -> Flow {
        (**self).admin_completed()
    }

    fn define_revision(&mut self, revision: &Revision) -> Flow {
        (**self).define_revision(revision)
    }

    fn tree_completed(&mut self) -> Flow {
        (**self).tree_completed()
    }

    fn set_description(&mut self, description: &str) -> Flow {
        (**self).set_description(description)
    }

    fn set_revision_info(&mut self, revision: &RevisionNumber, log: &str, text: &[u8]) -> Flow {
        (**self).set_revision_info(revision, log, text)
    }

    fn parse_completed(&mut self) -> Flow {
        (**self).parse_completed()
    }
}
