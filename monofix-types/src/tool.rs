use serde::{Deserialize, Serialize};
use std::fmt;

/// The workspace convention managing a repository.
///
/// Determined once per run by root discovery and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    /// `workspaces` array or `workspaces.packages` in `package.json`.
    Yarn,
    /// `bolt.workspaces` in `package.json`.
    Bolt,
    /// `packages` in `pnpm-workspace.yaml`.
    Pnpm,
    /// `packages` in `lerna.json`.
    Lerna,
    /// A single package; no member globs.
    Root,
}

/// A program plus its leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: &'static str,
    pub args: Vec<String>,
}

impl CommandSpec {
    fn new(program: &'static str, args: &[&str]) -> Self {
        Self {
            program,
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl Tool {
    pub fn as_str(self) -> &'static str {
        match self {
            Tool::Yarn => "yarn",
            Tool::Bolt => "bolt",
            Tool::Pnpm => "pnpm",
            Tool::Lerna => "lerna",
            Tool::Root => "root",
        }
    }

    /// Whether the repository has member packages besides the root.
    pub fn is_monorepo(self) -> bool {
        !matches!(self, Tool::Root)
    }

    /// The command that reinstalls dependencies after manifests changed.
    pub fn install_command(self) -> CommandSpec {
        match self {
            Tool::Yarn | Tool::Root => CommandSpec::new("yarn", &[]),
            Tool::Bolt => CommandSpec::new("bolt", &[]),
            Tool::Pnpm => CommandSpec::new("pnpm", &["install"]),
            Tool::Lerna => CommandSpec::new("lerna", &["bootstrap", "--since", "HEAD"]),
        }
    }

    /// The command running a package script; the script and its args are appended.
    pub fn script_command(self, script_args: &[String]) -> CommandSpec {
        let mut spec = match self {
            Tool::Pnpm => CommandSpec::new("pnpm", &["run"]),
            _ => CommandSpec::new("yarn", &[]),
        };
        spec.args.extend(script_args.iter().cloned());
        spec
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
