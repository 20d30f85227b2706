use super::{FixOutcome, Rule, RuleContext, Validation, Violation, expect_rule};
use crate::error::{FixError, RuleError};
use crate::ranges::{is_valid_range, range_satisfied_by, range_type};
use monofix_discovery::WorkspaceSet;
use monofix_types::{DependencyKind, RuleId};

/// Specifiers that point somewhere other than the registry version.
const PROTOCOL_PREFIXES: [&str; 4] = ["workspace:", "npm:", "file:", "link:"];

/// Dependencies on workspace packages accept the workspace version.
pub struct InternalMismatch;

impl InternalMismatch {
    fn fixed_range(range: &str, version: &str) -> String {
        format!("{}{}", range_type(range), version)
    }
}

impl Rule for InternalMismatch {
    fn id(&self) -> RuleId {
        RuleId::InternalMismatch
    }

    fn validate(&self, index: usize, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let Validation { violations, errors } = self.validate_all(index, ctx);
        match errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(violations),
        }
    }

    fn validate_all(&self, index: usize, ctx: &RuleContext<'_>) -> Validation {
        let pkg = ctx.package(index);
        let mut out = Validation::default();
        for kind in DependencyKind::NORMAL {
            for (dep, range) in pkg.manifest.dependency_entries(kind) {
                if PROTOCOL_PREFIXES.iter().any(|p| range.starts_with(p)) {
                    continue;
                }
                let Some(target) = ctx.workspace.get(dep) else {
                    continue;
                };
                let Some(version) = target.manifest.version() else {
                    continue;
                };
                let satisfied = match range_satisfied_by(range, version) {
                    Some(ok) => ok,
                    None if is_valid_range(range) => {
                        out.errors.push(RuleError::InvalidVersion {
                            package: dep.to_string(),
                            version: version.to_string(),
                        });
                        continue;
                    }
                    // Tags, urls and the like.
                    None => continue,
                };
                if !satisfied {
                    out.violations.push(Violation::InternalMismatch {
                        package: ctx.package_ref(index),
                        kind,
                        dependency: dep.to_string(),
                        range: range.to_string(),
                        version: version.to_string(),
                    });
                }
            }
        }
        out
    }

    fn fix(&self, violation: &Violation, workspace: &mut WorkspaceSet) -> Result<FixOutcome, FixError> {
        expect_rule(self.id(), violation)?;
        let Violation::InternalMismatch {
            package,
            kind,
            dependency,
            range,
            version,
        } = violation
        else {
            return Err(FixError::NotFixable { rule: self.id() });
        };
        let fixed = Self::fixed_range(range, version);
        let manifest = &mut workspace.package_mut(package.index).manifest;
        match manifest.dependency_range(*kind, dependency) {
            Some(current) if current == range || current == fixed => {}
            found => {
                return Err(FixError::stale(
                    &package.name,
                    format!("{kind}.{dependency}"),
                    Some(range.as_str()),
                    found,
                ));
            }
        }
        manifest.set_dependency(*kind, dependency, &fixed);
        Ok(FixOutcome::INSTALL)
    }
}
