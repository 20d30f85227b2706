use super::{FixOutcome, Rule, RuleContext, Violation, expect_rule};
use crate::error::{FixError, RuleError};
use monofix_discovery::WorkspaceSet;
use monofix_types::{DependencyKind, RuleId, Scope};
use serde_json::{Map, Value};

/// A monorepo root keeps everything in `dependencies`.
pub struct RootHasDevDependencies;

impl Rule for RootHasDevDependencies {
    fn id(&self) -> RuleId {
        RuleId::RootHasDevDependencies
    }

    fn scope(&self) -> Scope {
        Scope::Root
    }

    fn validate(&self, index: usize, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        if !ctx.workspace.tool().is_monorepo() {
            return Ok(Vec::new());
        }
        let manifest = &ctx.package(index).manifest;
        match manifest.dependencies(DependencyKind::DevDependencies) {
            Some(dev) if !dev.is_empty() => Ok(vec![Violation::RootHasDevDependencies {
                package: ctx.package_ref(index),
                dev_dependencies: dev.keys().cloned().collect(),
            }]),
            _ => Ok(Vec::new()),
        }
    }

    fn fix(&self, violation: &Violation, workspace: &mut WorkspaceSet) -> Result<FixOutcome, FixError> {
        expect_rule(self.id(), violation)?;
        let Violation::RootHasDevDependencies { package, .. } = violation else {
            return Err(FixError::NotFixable { rule: self.id() });
        };
        let manifest = &mut workspace.package_mut(package.index).manifest;
        let Some(dev) = manifest.take_dependencies(DependencyKind::DevDependencies) else {
            return Ok(FixOutcome::NO_INSTALL);
        };
        let mut merged = manifest
            .dependencies(DependencyKind::Dependencies)
            .cloned()
            .unwrap_or_else(Map::new);
        for (name, range) in dev {
            merged.entry(name).or_insert(range);
        }
        manifest.set(DependencyKind::Dependencies.key(), Value::Object(merged));
        Ok(FixOutcome::INSTALL)
    }
}
