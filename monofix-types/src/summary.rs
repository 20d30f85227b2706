use crate::rule::RuleId;
use serde::{Deserialize, Serialize};

/// Rule engine run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Report only; nothing is mutated.
    Check,
    /// Apply every available fix and report the residue.
    Fix,
}

/// A rendered violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule: RuleId,
    /// Name (or synthetic key) of the package the violation belongs to.
    pub package: String,
    pub message: String,
    /// Whether the rule can repair this violation.
    pub fixable: bool,
}

/// A rule that failed to validate or to apply a fix for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFailure {
    pub rule: RuleId,
    pub package: String,
    pub message: String,
}

/// Aggregate result of one pass over the rule catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: Mode,

    /// True when any violation was reported (check mode) or left unfixed (fix mode).
    pub has_errored: bool,

    /// True when at least one applied fix needs a dependency install.
    pub requires_install: bool,

    /// Violations that were reported, in catalog then scope order.
    #[serde(default)]
    pub findings: Vec<Finding>,

    /// Number of fixes applied (fix mode only).
    #[serde(default)]
    pub fixed: u64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RuleFailure>,
}

impl RunSummary {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            has_errored: false,
            requires_install: false,
            findings: Vec::new(),
            fixed: 0,
            failures: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
