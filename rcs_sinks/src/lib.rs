//! Concrete sinks for RCS archives: whole-tree collection, request
//! matching, directory-listing info, and targeted deltatext collection.

mod info;
mod matching;
mod target;
mod tree;

pub use info::{InfoSink, TagCatalog};
pub use matching::{MatchOutcome, MatchingSink, Request};
pub use target::{Collected, Purpose, TargetSink};
pub use tree::{TreeError, TreeSink};
