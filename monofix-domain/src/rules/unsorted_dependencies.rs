use super::{FixOutcome, Rule, RuleContext, Violation, expect_rule};
use crate::error::{FixError, RuleError};
use monofix_discovery::WorkspaceSet;
use monofix_types::{DependencyKind, RuleId};

/// Dependency maps are sorted by name.
pub struct UnsortedDependencies;

impl Rule for UnsortedDependencies {
    fn id(&self) -> RuleId {
        RuleId::UnsortedDependencies
    }

    fn validate(&self, index: usize, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let manifest = &ctx.package(index).manifest;
        let kinds: Vec<DependencyKind> = DependencyKind::ALL
            .into_iter()
            .filter(|kind| !manifest.is_dependency_map_sorted(*kind))
            .collect();
        if kinds.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Violation::UnsortedDependencies {
            package: ctx.package_ref(index),
            kinds,
        }])
    }

    fn fix(&self, violation: &Violation, workspace: &mut WorkspaceSet) -> Result<FixOutcome, FixError> {
        expect_rule(self.id(), violation)?;
        let Violation::UnsortedDependencies { package, .. } = violation else {
            return Err(FixError::NotFixable { rule: self.id() });
        };
        let manifest = &mut workspace.package_mut(package.index).manifest;
        // Sort every map, including ones that became unsorted after validation.
        for kind in DependencyKind::ALL {
            manifest.sort_dependencies(kind);
        }
        Ok(FixOutcome::NO_INSTALL)
    }
}
