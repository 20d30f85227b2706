use super::{FixOutcome, Rule, RuleContext, Violation, expect_rule};
use crate::error::{FixError, RuleError};
use camino::Utf8Path;
use monofix_discovery::WorkspaceSet;
use monofix_types::RuleId;

/// Hosts whose browse URLs can be derived from the root repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryHost {
    GitHub,
    GitLab,
}

impl RepositoryHost {
    pub fn domain(self) -> &'static str {
        match self {
            RepositoryHost::GitHub => "github.com",
            RepositoryHost::GitLab => "gitlab.com",
        }
    }

    fn from_host(host: &str) -> Option<Self> {
        match host.to_ascii_lowercase().as_str() {
            "github.com" | "www.github.com" | "github" => Some(RepositoryHost::GitHub),
            "gitlab.com" | "www.gitlab.com" | "gitlab" => Some(RepositoryHost::GitLab),
            _ => None,
        }
    }

    /// Parse any common spelling of a repository URL (`git+https`, `ssh`,
    /// scp-like `git@host:owner/repo`, `github:owner/repo`) into its host and
    /// the canonical `https://<host>/<owner>/<repo>` form.
    pub fn parse(url: &str) -> Option<(Self, String)> {
        let url = url.trim();
        let url = url.strip_prefix("git+").unwrap_or(url);
        let rest = ["https://", "http://", "ssh://", "git://"]
            .iter()
            .find_map(|scheme| url.strip_prefix(scheme))
            .unwrap_or(url);
        let rest = rest.strip_prefix("git@").unwrap_or(rest);
        let (host, path) = rest.split_once(['/', ':'])?;
        let host = Self::from_host(host)?;

        let path = path.split('#').next().unwrap_or(path);
        let path = path.trim_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        if path.split('/').filter(|s| !s.is_empty()).count() < 2 {
            return None;
        }
        Some((host, format!("https://{}/{}", host.domain(), path)))
    }

    /// Browse URL of `relative_dir` on `branch`.
    pub fn tree_url(self, base: &str, branch: &str, relative_dir: &Utf8Path) -> String {
        let rel: Vec<&str> = relative_dir.components().map(|c| c.as_str()).collect();
        let tree = match self {
            RepositoryHost::GitHub => "tree",
            RepositoryHost::GitLab => "-/tree",
        };
        format!("{base}/{tree}/{branch}/{}", rel.join("/"))
    }
}

/// Repository fields agree with the root's repository.
pub struct IncorrectRepositoryField;

impl Rule for IncorrectRepositoryField {
    fn id(&self) -> RuleId {
        RuleId::IncorrectRepositoryField
    }

    fn validate(&self, index: usize, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let Some(root_url) = ctx.workspace.root().manifest.repository_url() else {
            return Ok(Vec::new());
        };
        let Some((host, base)) = RepositoryHost::parse(root_url) else {
            return Ok(Vec::new());
        };
        let pkg = ctx.package(index);
        let correct = if index == ctx.workspace.root_index() {
            base
        } else {
            host.tree_url(&base, &ctx.options.default_branch, &pkg.relative_dir)
        };
        let current = pkg.manifest.repository_url();
        if current == Some(correct.as_str()) {
            return Ok(Vec::new());
        }
        Ok(vec![Violation::IncorrectRepositoryField {
            package: ctx.package_ref(index),
            current: current.map(str::to_string),
            correct,
        }])
    }

    fn fix(&self, violation: &Violation, workspace: &mut WorkspaceSet) -> Result<FixOutcome, FixError> {
        expect_rule(self.id(), violation)?;
        let Violation::IncorrectRepositoryField {
            package,
            current,
            correct,
        } = violation
        else {
            return Err(FixError::NotFixable { rule: self.id() });
        };
        let manifest = &mut workspace.package_mut(package.index).manifest;
        let found = manifest.repository_url();
        if found != current.as_deref() && found != Some(correct.as_str()) {
            return Err(FixError::stale(&package.name, "repository", current.as_deref(), found));
        }
        manifest.set_repository(correct);
        Ok(FixOutcome::NO_INSTALL)
    }
}
