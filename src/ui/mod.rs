//! UI modules - multi-line terminal reporting
//!
//! All rendering for concurrent pipelines goes through one
//! [`MultiReporter`]: each pipeline owns a line, and a single mutex
//! serializes cursor movement because the terminal cursor is one shared
//! resource. [`progress`] holds the pure formatting helpers.

pub mod multiline;
pub mod progress;

pub use multiline::MultiReporter;
