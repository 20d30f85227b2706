//! Port traits abstracting external processes away from the pipelines.

use async_trait::async_trait;
use camino::Utf8PathBuf;
use std::collections::BTreeMap;

/// How to launch a child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub cwd: Option<Utf8PathBuf>,
    /// Environment overrides; `None` removes the variable.
    pub env: BTreeMap<String, Option<String>>,
    /// Capture stdout/stderr instead of inheriting the terminal.
    pub capture: bool,
}

impl RunOptions {
    pub fn in_dir(cwd: impl Into<Utf8PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
            ..Self::default()
        }
    }
}

/// What a finished child process left behind. Output fields are empty
/// unless [`RunOptions::capture`] was set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Spawns external commands.
///
/// A non-zero exit is a normal result; `Err` means the command could not run.
#[async_trait]
pub trait ProcessPort: Send + Sync {
    async fn run(
        &self,
        command: &str,
        args: &[String],
        options: RunOptions,
    ) -> anyhow::Result<ProcessOutput>;
}

/// Package registry queries.
#[async_trait]
pub trait RegistryPort: Send + Sync {
    /// Dist-tag to version mapping of a package (`latest`, `next`, ...).
    async fn query_dist_tags(&self, name: &str) -> anyhow::Result<BTreeMap<String, String>>;
}
