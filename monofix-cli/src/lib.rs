//! Library half of the `monofix` binary: configuration merging and the rule
//! explanation registry, shared with the acceptance suite.

pub mod config;
pub mod explain;
