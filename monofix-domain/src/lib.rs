//! Domain logic: npm range semantics, the consistency rule catalog, and the
//! engine that checks or repairs a workspace with it.
//!
//! This crate decides *what* is wrong with a set of manifests and edits them
//! in memory. Persisting the edits and running installers belongs to
//! `monofix-core`.

mod engine;
mod error;
pub mod ranges;
mod rules;

pub use engine::Engine;
pub use error::{FixError, RuleError};
pub use rules::{
    DEFAULT_BRANCH, FixOutcome, PackageRef, RepositoryHost, Rule, RuleContext, RuleOptions,
    Validation, Violation, builtin_rules, name_problems,
};
