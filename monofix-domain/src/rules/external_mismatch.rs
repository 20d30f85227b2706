use super::{FixOutcome, Rule, RuleContext, Violation, expect_rule, is_peer_governed};
use crate::error::{FixError, RuleError};
use crate::ranges::is_valid_range;
use monofix_discovery::WorkspaceSet;
use monofix_types::{DependencyKind, RuleId};

/// Every external dependency uses the repo's most common range.
pub struct ExternalMismatch;

impl Rule for ExternalMismatch {
    fn id(&self) -> RuleId {
        RuleId::ExternalMismatch
    }

    fn validate(&self, index: usize, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let pkg = ctx.package(index);
        let most_common = ctx.most_common_ranges();
        let mut out = Vec::new();
        for kind in DependencyKind::NORMAL {
            for (dep, range) in pkg.manifest.dependency_entries(kind) {
                if ctx.is_internal(dep) || !is_valid_range(range) || is_peer_governed(pkg, kind, dep) {
                    continue;
                }
                let Some(common) = most_common.get(dep) else {
                    continue;
                };
                if common != range {
                    out.push(Violation::ExternalMismatch {
                        package: ctx.package_ref(index),
                        kind,
                        dependency: dep.to_string(),
                        range: range.to_string(),
                        most_common: common.clone(),
                    });
                }
            }
        }
        Ok(out)
    }

    fn fix(&self, violation: &Violation, workspace: &mut WorkspaceSet) -> Result<FixOutcome, FixError> {
        expect_rule(self.id(), violation)?;
        let Violation::ExternalMismatch {
            package,
            kind,
            dependency,
            range,
            most_common,
        } = violation
        else {
            return Err(FixError::NotFixable { rule: self.id() });
        };
        let manifest = &mut workspace.package_mut(package.index).manifest;
        match manifest.dependency_range(*kind, dependency) {
            Some(current) if current == range || current == most_common => {}
            found => {
                return Err(FixError::stale(
                    &package.name,
                    format!("{kind}.{dependency}"),
                    Some(range.as_str()),
                    found,
                ));
            }
        }
        manifest.set_dependency(*kind, dependency, most_common);
        Ok(FixOutcome::INSTALL)
    }
}
