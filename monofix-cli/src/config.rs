//! Merges the root manifest's `"monofix"` block with CLI flags.
//!
//! CLI flags take precedence: `--ignore` extends the configured list and
//! `--default-branch` replaces the configured branch.

use monofix_core::RuleOptions;
use monofix_core::settings::ProjectConfig;
use monofix_types::RuleId;
use std::collections::BTreeSet;
use tracing::debug;

/// Rule options after merging, plus the configured names that matched no rule.
#[derive(Debug, Clone, Default)]
pub struct MergedConfig {
    pub rules: RuleOptions,

    /// Entries of `ignoredRules` that are not rule names.
    pub unknown_rules: Vec<String>,
}

/// Builder for merging the project config with CLI arguments.
pub struct ConfigMerger {
    config: ProjectConfig,
}

impl ConfigMerger {
    pub fn new(config: ProjectConfig) -> Self {
        Self { config }
    }

    /// Merge with the global CLI flags. Unknown configured rule names are
    /// skipped and returned in [`MergedConfig::unknown_rules`].
    pub fn merge(self, cli_ignore: &[RuleId], cli_default_branch: Option<&str>) -> MergedConfig {
        let mut ignored_rules = BTreeSet::new();
        let mut unknown_rules = Vec::new();
        for name in &self.config.ignored_rules {
            match name.parse::<RuleId>() {
                Ok(id) => {
                    ignored_rules.insert(id);
                }
                Err(_) => unknown_rules.push(name.clone()),
            }
        }
        ignored_rules.extend(cli_ignore.iter().copied());

        let mut rules = RuleOptions {
            ignored_rules,
            ..RuleOptions::default()
        };
        if let Some(branch) = cli_default_branch.or(self.config.default_branch.as_deref()) {
            rules.default_branch = branch.to_string();
        }
        debug!(
            ignored = ?rules.ignored_rules,
            default_branch = %rules.default_branch,
            "merged config"
        );

        MergedConfig {
            rules,
            unknown_rules,
        }
    }
}
