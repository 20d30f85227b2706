use crate::error::RuleError;
use crate::rules::{Rule, RuleContext, RuleOptions, Validation, Violation, builtin_rules};
use monofix_discovery::WorkspaceSet;
use monofix_types::{Finding, Mode, RuleFailure, RunSummary, Scope};
use tracing::{debug, info, warn};

/// Result of evaluating one rule against one package.
#[derive(Debug, Default)]
struct PairOutcome {
    findings: Vec<Finding>,
    fixes_applied: u64,
    requires_install: bool,
    failures: Vec<RuleFailure>,
}

impl PairOutcome {
    fn fold_into(self, summary: &mut RunSummary) {
        summary.has_errored |= match summary.mode {
            Mode::Check => !self.findings.is_empty(),
            Mode::Fix => self.findings.iter().any(|f| !f.fixable),
        };
        summary.requires_install |= self.requires_install;
        summary.fixed += self.fixes_applied;
        summary.findings.extend(self.findings);
        summary.failures.extend(self.failures);
    }
}

/// Runs the rule catalog over a workspace.
pub struct Engine {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            rules: builtin_rules(),
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Report every violation without touching the workspace.
    pub fn check(&self, workspace: &WorkspaceSet, options: &RuleOptions) -> RunSummary {
        let mut summary = RunSummary::new(Mode::Check);
        for rule in self.active_rules(options) {
            let ctx = RuleContext::new(workspace, options);
            for index in scope_indices(rule.scope(), workspace) {
                let Validation { violations, errors } = rule.validate_all(index, &ctx);
                let mut outcome = failed(rule, workspace.key(index), &errors);
                outcome.findings = violations
                    .iter()
                    .map(|v| finding(rule, v, rule.can_fix()))
                    .collect();
                outcome.fold_into(&mut summary);
            }
        }
        info!(
            findings = summary.findings.len(),
            failures = summary.failures.len(),
            "check complete"
        );
        summary
    }

    /// Apply every available fix, rule by rule.
    ///
    /// A rule validates all of its scope before any of its fixes run, so later
    /// rules observe the edits of earlier ones.
    pub fn fix(&self, workspace: &mut WorkspaceSet, options: &RuleOptions) -> RunSummary {
        let mut summary = RunSummary::new(Mode::Fix);
        for rule in self.active_rules(options) {
            let validated: Vec<(usize, Validation)> = {
                let ctx = RuleContext::new(workspace, options);
                scope_indices(rule.scope(), workspace)
                    .into_iter()
                    .map(|index| (index, rule.validate_all(index, &ctx)))
                    .collect()
            };
            for (index, Validation { violations, errors }) in validated {
                let outcome = failed(rule, workspace.key(index), &errors);
                let outcome = settle(rule, violations, workspace, outcome);
                outcome.fold_into(&mut summary);
            }
        }
        info!(
            fixed = summary.fixed,
            remaining = summary.findings.len(),
            failures = summary.failures.len(),
            requires_install = summary.requires_install,
            "fix pass complete"
        );
        summary
    }

    pub fn run(&self, workspace: &mut WorkspaceSet, options: &RuleOptions, mode: Mode) -> RunSummary {
        match mode {
            Mode::Check => self.check(workspace, options),
            Mode::Fix => self.fix(workspace, options),
        }
    }

    fn active_rules<'s>(&'s self, options: &'s RuleOptions) -> impl Iterator<Item = &'s dyn Rule> {
        self.rules.iter().map(Box::as_ref).filter(|rule| {
            let ignored = options.ignored_rules.contains(&rule.id());
            if ignored {
                debug!(rule = %rule.id(), "rule ignored");
            }
            !ignored
        })
    }
}

/// Root-scoped rules see only the root; the rest see every package, root last.
fn scope_indices(scope: Scope, workspace: &WorkspaceSet) -> Vec<usize> {
    match scope {
        Scope::Root => vec![workspace.root_index()],
        Scope::All => (0..workspace.len()).collect(),
    }
}

fn finding(rule: &dyn Rule, violation: &Violation, fixable: bool) -> Finding {
    Finding {
        rule: rule.id(),
        package: violation.package().name.clone(),
        message: rule.print(violation),
        fixable,
    }
}

fn failed(rule: &dyn Rule, package: &str, errors: &[RuleError]) -> PairOutcome {
    let failures = errors
        .iter()
        .map(|err| {
            warn!(rule = %rule.id(), package, error = %err, "rule failed");
            RuleFailure {
                rule: rule.id(),
                package: package.to_string(),
                message: err.to_string(),
            }
        })
        .collect();
    PairOutcome {
        failures,
        ..PairOutcome::default()
    }
}

fn settle(
    rule: &dyn Rule,
    violations: Vec<Violation>,
    workspace: &mut WorkspaceSet,
    mut outcome: PairOutcome,
) -> PairOutcome {
    for violation in violations {
        if !rule.can_fix() {
            outcome.findings.push(finding(rule, &violation, false));
            continue;
        }
        match rule.fix(&violation, workspace) {
            Ok(fixed) => {
                debug!(rule = %rule.id(), package = %violation.package().name, "fixed");
                outcome.fixes_applied += 1;
                outcome.requires_install |= fixed.requires_install;
            }
            Err(err) => {
                warn!(rule = %rule.id(), package = %violation.package().name, error = %err, "fix failed");
                outcome.failures.push(RuleFailure {
                    rule: rule.id(),
                    package: violation.package().name.clone(),
                    message: err.to_string(),
                });
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FixError;
    use crate::rules::test_support::workspace;
    use crate::rules::FixOutcome;
    use monofix_types::{RuleId, Tool};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Flags every package and fails to fix the root.
    struct Flaky;

    impl Rule for Flaky {
        fn id(&self) -> RuleId {
            RuleId::MultipleDependencyTypes
        }

        fn validate(&self, index: usize, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
            if ctx.package(index).manifest.version() == Some("bad") {
                return Err(RuleError::InvalidVersion {
                    package: ctx.workspace.key(index).to_string(),
                    version: "bad".into(),
                });
            }
            Ok(vec![Violation::MultipleDependencyTypes {
                package: ctx.package_ref(index),
                dependency: "x".into(),
                duplicate_in: monofix_types::DependencyKind::DevDependencies,
            }])
        }

        fn fix(&self, violation: &Violation, workspace: &mut WorkspaceSet) -> Result<FixOutcome, FixError> {
            if violation.package().index == workspace.root_index() {
                return Err(FixError::NotFixable { rule: self.id() });
            }
            Ok(FixOutcome::INSTALL)
        }
    }

    fn ws() -> WorkspaceSet {
        workspace(
            Tool::Yarn,
            vec![
                ("", json!({ "name": "root" })),
                ("packages/a", json!({ "name": "a" })),
                ("packages/b", json!({ "name": "b", "version": "bad" })),
            ],
        )
    }

    #[test]
    fn failures_do_not_stop_the_pass() {
        let mut ws = ws();
        let engine = Engine::with_rules(vec![Box::new(Flaky)]);
        let summary = engine.fix(&mut ws, &RuleOptions::default());
        assert_eq!(summary.fixed, 1);
        assert!(summary.requires_install);
        assert!(!summary.has_errored);
        let failed: Vec<&str> = summary.failures.iter().map(|f| f.package.as_str()).collect();
        assert_eq!(failed, vec!["b", "root"]);
    }

    #[test]
    fn check_reports_in_scope_order() {
        let ws = ws();
        let engine = Engine::with_rules(vec![Box::new(Flaky)]);
        let summary = engine.check(&ws, &RuleOptions::default());
        assert!(summary.has_errored);
        let packages: Vec<&str> = summary.findings.iter().map(|f| f.package.as_str()).collect();
        assert_eq!(packages, vec!["a", "root"]);
        assert_eq!(summary.failures.len(), 1);
    }

    #[test]
    fn ignored_rules_are_skipped() {
        let ws = ws();
        let engine = Engine::with_rules(vec![Box::new(Flaky)]);
        let mut options = RuleOptions::default();
        options.ignored_rules.insert(RuleId::MultipleDependencyTypes);
        let summary = engine.check(&ws, &options);
        assert!(summary.findings.is_empty());
        assert!(summary.failures.is_empty());
    }
}
