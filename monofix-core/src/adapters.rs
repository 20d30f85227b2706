//! Default port implementations backed by tokio and the npm CLI.

use crate::ports::{ProcessOutput, ProcessPort, RegistryPort, RunOptions};
use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

/// The yarn registry mirror; `npm info` gives different answers through it.
pub const YARN_REGISTRY: &str = "https://registry.yarnpkg.com";

const NPM_REGISTRY_ENV: &str = "npm_config_registry";

/// Runs commands with `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessPort;

#[async_trait]
impl ProcessPort for TokioProcessPort {
    async fn run(
        &self,
        command: &str,
        args: &[String],
        options: RunOptions,
    ) -> anyhow::Result<ProcessOutput> {
        let mut cmd = Command::new(command);
        cmd.args(args);
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &options.env {
            match value {
                Some(value) => cmd.env(key, value),
                None => cmd.env_remove(key),
            };
        }
        debug!(command, ?args, cwd = ?options.cwd, capture = options.capture, "spawn");

        if options.capture {
            let output = cmd
                .stdin(Stdio::null())
                .output()
                .await
                .with_context(|| format!("run {command}"))?;
            Ok(ProcessOutput {
                // Killed by a signal: no code, report failure.
                exit_code: output.status.code().unwrap_or(1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        } else {
            let status = cmd
                .status()
                .await
                .with_context(|| format!("run {command}"))?;
            Ok(ProcessOutput {
                exit_code: status.code().unwrap_or(1),
                ..ProcessOutput::default()
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct NpmInfo {
    #[serde(rename = "dist-tags", default)]
    dist_tags: BTreeMap<String, String>,
}

/// Reads dist-tags with `npm info <name> --json`.
#[derive(Clone)]
pub struct NpmRegistry {
    process: Arc<dyn ProcessPort>,
    registry_env: Option<String>,
}

impl NpmRegistry {
    pub fn new(process: Arc<dyn ProcessPort>) -> Self {
        Self {
            process,
            registry_env: std::env::var(NPM_REGISTRY_ENV).ok(),
        }
    }

    /// Override the `npm_config_registry` value seen at construction.
    pub fn with_registry_env(mut self, value: Option<String>) -> Self {
        self.registry_env = value;
        self
    }

    fn run_options(&self) -> RunOptions {
        let mut options = RunOptions {
            capture: true,
            ..RunOptions::default()
        };
        // Yarn sets this for scripts it runs; npm should ask its own registry.
        if self.registry_env.as_deref() == Some(YARN_REGISTRY) {
            options.env.insert(NPM_REGISTRY_ENV.to_string(), None);
        }
        options
    }
}

#[async_trait]
impl RegistryPort for NpmRegistry {
    async fn query_dist_tags(&self, name: &str) -> anyhow::Result<BTreeMap<String, String>> {
        let args = vec!["info".to_string(), name.to_string(), "--json".to_string()];
        let output = self.process.run("npm", &args, self.run_options()).await?;
        if !output.success() {
            bail!(
                "npm info {name} exited with code {}: {}",
                output.exit_code,
                output.stderr.trim()
            );
        }
        let info: NpmInfo = serde_json::from_str(&output.stdout)
            .with_context(|| format!("parse npm info output for {name}"))?;
        Ok(info.dist_tags)
    }
}

/// Fixed dist-tags, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    tags: BTreeMap<String, BTreeMap<String, String>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(mut self, name: &str, tag: &str, version: &str) -> Self {
        self.tags
            .entry(name.to_string())
            .or_default()
            .insert(tag.to_string(), version.to_string());
        self
    }
}

#[async_trait]
impl RegistryPort for InMemoryRegistry {
    async fn query_dist_tags(&self, name: &str) -> anyhow::Result<BTreeMap<String, String>> {
        match self.tags.get(name) {
            Some(tags) => Ok(tags.clone()),
            None => bail!("{name} is not in the registry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Answers every command with a canned output and records the call.
    struct Canned {
        output: ProcessOutput,
        calls: Mutex<Vec<(String, Vec<String>, RunOptions)>>,
    }

    #[async_trait]
    impl ProcessPort for Canned {
        async fn run(
            &self,
            command: &str,
            args: &[String],
            options: RunOptions,
        ) -> anyhow::Result<ProcessOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((command.to_string(), args.to_vec(), options));
            Ok(self.output.clone())
        }
    }

    fn canned(exit_code: i32, stdout: &str) -> Arc<Canned> {
        Arc::new(Canned {
            output: ProcessOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: "boom".to_string(),
            },
            calls: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn npm_registry_parses_dist_tags() {
        let process = canned(0, r#"{ "name": "react", "dist-tags": { "latest": "18.3.1", "next": "19.0.0-rc" } }"#);
        let registry = NpmRegistry::new(process.clone()).with_registry_env(None);
        let tags = registry.query_dist_tags("react").await.unwrap();
        assert_eq!(tags.get("latest").map(String::as_str), Some("18.3.1"));
        assert_eq!(tags.len(), 2);

        let calls = process.calls.lock().unwrap();
        assert_eq!(calls[0].0, "npm");
        assert_eq!(calls[0].1, vec!["info", "react", "--json"]);
        assert!(calls[0].2.capture);
        assert!(calls[0].2.env.is_empty());
    }

    #[tokio::test]
    async fn npm_registry_clears_yarn_mirror() {
        let process = canned(0, r#"{ "dist-tags": {} }"#);
        let registry =
            NpmRegistry::new(process.clone()).with_registry_env(Some(YARN_REGISTRY.to_string()));
        registry.query_dist_tags("x").await.unwrap();
        let calls = process.calls.lock().unwrap();
        assert_eq!(calls[0].2.env.get(NPM_REGISTRY_ENV), Some(&None));
    }

    #[tokio::test]
    async fn npm_registry_reports_failures() {
        let registry = NpmRegistry::new(canned(1, "")).with_registry_env(None);
        let err = registry.query_dist_tags("nope").await.unwrap_err();
        assert!(err.to_string().contains("exited with code 1"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tokio_port_captures_output() {
        let out = TokioProcessPort
            .run(
                "sh",
                &["-c".to_string(), "echo hi; exit 3".to_string()],
                RunOptions {
                    capture: true,
                    ..RunOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout.trim(), "hi");
    }
}
