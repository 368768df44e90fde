//! Shared RCS data models consumed by the parser, the sinks, and callers.

pub mod delta;
pub mod graph;
pub mod model;
pub mod revision;

pub use delta::*;
pub use graph::*;
pub use model::*;
pub use revision::*;
