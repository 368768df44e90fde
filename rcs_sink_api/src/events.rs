use serde::{Deserialize, Serialize};

use rcs_api::{Revision, RevisionNumber};

use crate::{Flow, Sink, CONTINUE, STOP};

/// One parser callback, captured as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    /// `set_head_revision`.
    HeadRevision {
        /// Snapshot revision.
        revision: RevisionNumber,
    },
    /// `set_principal_branch`.
    PrincipalBranch {
        /// Raw branch number.
        branch: String,
    },
    /// `set_access`.
    Access {
        /// Listed users.
        users: Vec<String>,
    },
    /// `define_tag`.
    Tag {
        /// Symbol name.
        name: String,
        /// Raw number.
        revision: String,
    },
    /// `set_locker`.
    Locker {
        /// Locked revision.
        revision: RevisionNumber,
        /// Lock holder.
        locker: String,
    },
    /// `set_locking`.
    Locking {
        /// Locking mode keyword.
        mode: String,
    },
    /// `set_comment`.
    Comment {
        /// Comment leader.
        comment: String,
    },
    /// `set_expansion`.
    Expansion {
        /// Expansion mode.
        mode: String,
    },
    /// `admin_completed`.
    AdminCompleted,
    /// `define_revision`.
    Revision(Revision),
    /// `tree_completed`.
    TreeCompleted,
    /// `set_description`.
    Description {
        /// Description text.
        text: String,
    },
    /// `set_revision_info`.
    RevisionInfo {
        /// Revision the deltatext belongs to.
        revision: RevisionNumber,
        /// Log message.
        log: String,
        /// Deltatext, lossily decoded.
        text: String,
    },
    /// `parse_completed`.
    ParseCompleted,
}

/// Sink that records every event, optionally stopping after a fixed count.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Vec<SinkEvent>,
    limit: Option<usize>,
}

impl EventRecorder {
    /// Record events until the parse ends.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop as soon as `limit` events have been recorded.
    #[must_use]
    pub fn stop_after(limit: usize) -> Self {
        Self {
            events: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> &[SinkEvent] {
        &self.events
    }

    /// Take ownership of the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<SinkEvent> {
        self.events
    }

    fn record(&mut self, event: SinkEvent) -> Flow {
        self.events.push(event);
        match self.limit {
            Some(limit) if self.events.len() >= limit => STOP,
            _ => CONTINUE,
        }
    }
}

impl Sink for EventRecorder {
    fn set_head_revision(&mut self, revision: &RevisionNumber) -> Flow {
        self.record(SinkEvent::HeadRevision {
            revision: revision.clone(),
        })
    }

    fn set_principal_branch(&mut self, branch: &str) -> Flow {
        self.record(SinkEvent::PrincipalBranch {
            branch: branch.to_owned(),
        })
    }

    fn set_access(&mut self, users: &[String]) -> Flow {
        self.record(SinkEvent::Access {
            users: users.to_vec(),
        })
    }

    fn define_tag(&mut self, name: &str, revision: &str) -> Flow {
        self.record(SinkEvent::Tag {
            name: name.to_owned(),
            revision: revision.to_owned(),
        })
    }

    fn set_locker(&mut self, revision: &RevisionNumber, locker: &str) -> Flow {
        self.record(SinkEvent::Locker {
            revision: revision.clone(),
            locker: locker.to_owned(),
        })
    }

    fn set_locking(&mut self, mode: &str) -> Flow {
        self.record(SinkEvent::Locking {
            mode: mode.to_owned(),
        })
    }

    fn set_comment(&mut self, comment: &str) -> Flow {
        self.record(SinkEvent::Comment {
            comment: comment.to_owned(),
        })
    }

    fn set_expansion(&mut self, mode: &str) -> Flow {
        self.record(SinkEvent::Expansion {
            mode: mode.to_owned(),
        })
    }

    fn admin_completed(&mut self) -> Flow {
        self.record(SinkEvent::AdminCompleted)
    }

    fn define_revision(&mut self, revision: &Revision) -> Flow {
        self.record(SinkEvent::Revision(revision.clone()))
    }

    fn tree_completed(&mut self) -> Flow {
        self.record(SinkEvent::TreeCompleted)
    }

    fn set_description(&mut self, description: &str) -> Flow {
        self.record(SinkEvent::Description {
            text: description.to_owned(),
        })
    }

    fn set_revision_info(&mut self, revision: &RevisionNumber, log: &str, text: &[u8]) -> Flow {
        self.record(SinkEvent::RevisionInfo {
            revision: revision.clone(),
            log: log.to_owned(),
            text: String::from_utf8_lossy(text).into_owned(),
        })
    }

    fn parse_completed(&mut self) -> Flow {
        self.record(SinkEvent::ParseCompleted)
    }
}
