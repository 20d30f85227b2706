//! Clap-free settings for the pipelines, and the `"monofix"` block of the
//! root manifest they are partly read from.

use crate::error::ToolError;
use monofix_domain::RuleOptions;
use monofix_manifest::Manifest;
use monofix_types::CONFIG_KEY;
use serde::Deserialize;

/// The `"monofix"` block of the root `package.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Rule names to skip, e.g. `"EXTERNAL_MISMATCH"`.
    pub ignored_rules: Vec<String>,

    /// Branch used when building repository browse URLs.
    pub default_branch: Option<String>,
}

impl ProjectConfig {
    /// Read the block from the root manifest; absent means defaults.
    pub fn from_manifest(root: &Manifest) -> Result<Self, ToolError> {
        match root.config_block(CONFIG_KEY) {
            Some(block) => Self::deserialize(block).map_err(|source| ToolError::Config {
                key: CONFIG_KEY,
                source,
            }),
            None => Ok(Self::default()),
        }
    }
}

/// Settings for the fix pipeline.
#[derive(Debug, Clone)]
pub struct FixSettings {
    pub rules: RuleOptions,
    /// Compute the diff, write nothing, install nothing.
    pub dry_run: bool,
    /// Run the tool's installer when a fix asks for it.
    pub install: bool,
}

impl Default for FixSettings {
    fn default() -> Self {
        Self {
            rules: RuleOptions::default(),
            dry_run: false,
            install: true,
        }
    }
}

/// Settings for the upgrade pipeline.
#[derive(Debug, Clone)]
pub struct UpgradeSettings {
    /// Package name, or a scope (`@scope` / `@scope/`) matching all its packages.
    pub name: String,
    /// Dist-tag, or an explicit version/range used verbatim.
    pub tag: String,
    pub install: bool,
}

impl UpgradeSettings {
    pub fn new(name: impl Into<String>, tag: Option<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.unwrap_or_else(|| "latest".to_string()),
            install: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use serde_json::json;

    fn root(value: serde_json::Value) -> Manifest {
        Manifest::from_value(Utf8Path::new("/repo"), value).unwrap()
    }

    #[test]
    fn reads_camel_case_block() {
        let config = ProjectConfig::from_manifest(&root(json!({
            "name": "root",
            "monofix": { "ignoredRules": ["EXTERNAL_MISMATCH"], "defaultBranch": "main" }
        })))
        .unwrap();
        assert_eq!(config.ignored_rules, vec!["EXTERNAL_MISMATCH"]);
        assert_eq!(config.default_branch.as_deref(), Some("main"));
    }

    #[test]
    fn missing_block_is_default() {
        let config = ProjectConfig::from_manifest(&root(json!({ "name": "root" }))).unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn malformed_block_is_an_error() {
        let err = ProjectConfig::from_manifest(&root(json!({
            "name": "root",
            "monofix": { "ignoredRules": "EXTERNAL_MISMATCH" }
        })))
        .unwrap_err();
        assert!(matches!(err, ToolError::Config { .. }));
    }

    #[test]
    fn upgrade_tag_defaults_to_latest() {
        assert_eq!(UpgradeSettings::new("react", None).tag, "latest");
        assert_eq!(UpgradeSettings::new("react", Some("next".into())).tag, "next");
    }
}
