use monofix_types::RuleId;
use thiserror::Error;

/// A rule could not evaluate one package.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("{package} declares version {version:?}, which is not valid semver")]
    InvalidVersion { package: String, version: String },
}

/// A fix could not be applied cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixError {
    /// The field changed between validation and fixing.
    #[error("{package}: expected {field} to be {expected}, found {found}")]
    Stale {
        package: String,
        field: String,
        expected: String,
        found: String,
    },

    #[error("{rule} has no automatic fix")]
    NotFixable { rule: RuleId },

    #[error("{rule} cannot fix a {other} violation")]
    WrongRule { rule: RuleId, other: RuleId },
}

impl FixError {
    pub(crate) fn stale(
        package: &str,
        field: impl Into<String>,
        expected: Option<&str>,
        found: Option<&str>,
    ) -> Self {
        let show = |v: Option<&str>| v.map_or_else(|| "absent".to_string(), |s| format!("{s:?}"));
        FixError::Stale {
            package: package.to_string(),
            field: field.into(),
            expected: show(expected),
            found: show(found),
        }
    }
}
