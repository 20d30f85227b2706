//! Embeddable core library for monofix.
//!
//! Provides clap-free entry points suitable for linking into another host
//! process. Child processes and registry queries go through the port traits
//! in [`ports`]; [`adapters`] holds the tokio and npm backed defaults.
//!
//! # Entry points
//!
//! - [`open_workspace`](pipeline::open_workspace): discover the workspace and its config
//! - [`run_check`](pipeline::run_check): report violations
//! - [`run_fix`](pipeline::run_fix): repair, persist, install
//! - [`run_upgrade`](upgrade::run_upgrade): bump a dependency everywhere
//! - [`run_exec`](exec::run_exec) / [`run_script`](exec::run_script): delegate to packages

pub mod adapters;
mod error;
pub mod exec;
pub mod pipeline;
pub mod ports;
pub mod settings;
pub mod upgrade;

pub use error::ToolError;

// Re-exported so hosts don't need the domain and discovery crates directly.
pub use monofix_discovery::{DiscoveryError, WorkspaceSet};
pub use monofix_domain::{RuleOptions, builtin_rules};
