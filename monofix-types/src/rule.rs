use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of a consistency rule.
///
/// The declaration order is the catalog order: rules are dispatched, and their
/// findings printed, in exactly this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleId {
    ExternalMismatch,
    InternalMismatch,
    InvalidDevAndPeerDependencyRelationship,
    InvalidPackageName,
    MultipleDependencyTypes,
    RootHasDevDependencies,
    UnsortedDependencies,
    IncorrectRepositoryField,
}

impl RuleId {
    pub const ALL: [RuleId; 8] = [
        RuleId::ExternalMismatch,
        RuleId::InternalMismatch,
        RuleId::InvalidDevAndPeerDependencyRelationship,
        RuleId::InvalidPackageName,
        RuleId::MultipleDependencyTypes,
        RuleId::RootHasDevDependencies,
        RuleId::UnsortedDependencies,
        RuleId::IncorrectRepositoryField,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleId::ExternalMismatch => "EXTERNAL_MISMATCH",
            RuleId::InternalMismatch => "INTERNAL_MISMATCH",
            RuleId::InvalidDevAndPeerDependencyRelationship => {
                "INVALID_DEV_AND_PEER_DEPENDENCY_RELATIONSHIP"
            }
            RuleId::InvalidPackageName => "INVALID_PACKAGE_NAME",
            RuleId::MultipleDependencyTypes => "MULTIPLE_DEPENDENCY_TYPES",
            RuleId::RootHasDevDependencies => "ROOT_HAS_DEV_DEPENDENCIES",
            RuleId::UnsortedDependencies => "UNSORTED_DEPENDENCIES",
            RuleId::IncorrectRepositoryField => "INCORRECT_REPOSITORY_FIELD",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown rule '{0}'")]
pub struct UnknownRule(pub String);

impl FromStr for RuleId {
    type Err = UnknownRule;

    /// Accepts the canonical `SCREAMING_SNAKE_CASE` name, case-insensitively,
    /// with `-` standing in for `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        RuleId::ALL
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| UnknownRule(s.to_string()))
    }
}

/// Which packages a rule is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Only the workspace root manifest.
    Root,
    /// Every package in the workspace, root included.
    All,
}
