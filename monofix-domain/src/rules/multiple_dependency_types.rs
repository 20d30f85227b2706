use super::{FixOutcome, Rule, RuleContext, Violation, expect_rule};
use crate::error::{FixError, RuleError};
use monofix_discovery::WorkspaceSet;
use monofix_types::{DependencyKind, RuleId};

const SHADOWED_KINDS: [DependencyKind; 2] = [
    DependencyKind::DevDependencies,
    DependencyKind::OptionalDependencies,
];

/// A regular dependency is not repeated in dev or optional dependencies.
pub struct MultipleDependencyTypes;

impl Rule for MultipleDependencyTypes {
    fn id(&self) -> RuleId {
        RuleId::MultipleDependencyTypes
    }

    fn validate(&self, index: usize, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let manifest = &ctx.package(index).manifest;
        let mut out = Vec::new();
        for (dep, _) in manifest.dependency_entries(DependencyKind::Dependencies) {
            for kind in SHADOWED_KINDS {
                if manifest.has_dependency(kind, dep) {
                    out.push(Violation::MultipleDependencyTypes {
                        package: ctx.package_ref(index),
                        dependency: dep.to_string(),
                        duplicate_in: kind,
                    });
                }
            }
        }
        Ok(out)
    }

    fn fix(&self, violation: &Violation, workspace: &mut WorkspaceSet) -> Result<FixOutcome, FixError> {
        expect_rule(self.id(), violation)?;
        let Violation::MultipleDependencyTypes {
            package,
            dependency,
            duplicate_in,
        } = violation
        else {
            return Err(FixError::NotFixable { rule: self.id() });
        };
        // Already gone counts as fixed.
        workspace
            .package_mut(package.index)
            .manifest
            .remove_dependency(*duplicate_in, dependency);
        Ok(FixOutcome::NO_INSTALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleOptions;
    use crate::rules::test_support::workspace;
    use monofix_types::Tool;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn removes_duplicates_from_dev_and_optional() {
        let mut ws = workspace(
            Tool::Yarn,
            vec![
                ("", json!({ "name": "root" })),
                ("packages/a", json!({
                    "name": "a",
                    "dependencies": { "lodash": "^4.0.0", "react": "^18.0.0" },
                    "devDependencies": { "lodash": "^4.0.0", "jest": "^29.0.0" },
                    "optionalDependencies": { "react": "^18.0.0" }
                })),
            ],
        );
        let a = ws.index_of("a").unwrap();
        let found = {
            let options = RuleOptions::default();
            let ctx = RuleContext::new(&ws, &options);
            MultipleDependencyTypes.validate(a, &ctx).unwrap()
        };
        assert_eq!(found.len(), 2);
        assert_eq!(
            found[0].to_string(),
            "a has a dependency and a devDependencies entry on lodash, this is unnecessary, it should be removed from devDependencies"
        );
        for v in &found {
            let outcome = MultipleDependencyTypes.fix(v, &mut ws).unwrap();
            assert!(!outcome.requires_install);
        }
        let manifest = &ws.package(a).manifest;
        assert!(!manifest.has_dependency(DependencyKind::DevDependencies, "lodash"));
        assert!(manifest.has_dependency(DependencyKind::DevDependencies, "jest"));
        assert!(!manifest.has_dependency(DependencyKind::OptionalDependencies, "react"));
        assert!(manifest.has_dependency(DependencyKind::Dependencies, "react"));
    }
}
