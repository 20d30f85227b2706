//! Shared vocabulary for the monofix workspace.
//!
//! # Design constraints
//! - Nothing in here touches the filesystem.
//! - Names that users type (rule names, tool names) round-trip through `FromStr`/`Display`.

pub mod deps;
pub mod rule;
pub mod summary;
pub mod tool;

pub use deps::DependencyKind;
pub use rule::{RuleId, Scope, UnknownRule};
pub use summary::{Finding, Mode, RuleFailure, RunSummary};
pub use tool::{CommandSpec, Tool};

/// Key of the configuration block inside the root `package.json`.
pub const CONFIG_KEY: &str = "monofix";

/// File name of a package manifest.
pub const MANIFEST_FILE: &str = "package.json";
