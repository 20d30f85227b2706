use super::{FixOutcome, Rule, RuleContext, Violation, expect_rule, min_satisfies};
use crate::error::{FixError, RuleError};
use crate::ranges::is_valid_range;
use monofix_discovery::WorkspaceSet;
use monofix_types::{DependencyKind, RuleId};

/// Peer dependencies are also dev dependencies, at a range the peer range accepts.
pub struct PeerDevRelationship;

impl PeerDevRelationship {
    fn ideal_dev_range(ctx: &RuleContext<'_>, dependency: &str, peer_range: &str) -> String {
        if ctx.is_internal(dependency) {
            return "*".to_string();
        }
        match ctx.highest_ranges().get(dependency) {
            Some(highest) if min_satisfies(highest, peer_range) => highest.clone(),
            _ => peer_range.to_string(),
        }
    }
}

impl Rule for PeerDevRelationship {
    fn id(&self) -> RuleId {
        RuleId::InvalidDevAndPeerDependencyRelationship
    }

    fn validate(&self, index: usize, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let manifest = &ctx.package(index).manifest;
        let mut out = Vec::new();
        for (dep, peer_range) in manifest.dependency_entries(DependencyKind::PeerDependencies) {
            // Already installed as a regular dependency.
            if manifest.has_dependency(DependencyKind::Dependencies, dep) {
                continue;
            }
            let dev_range = manifest.dependency_range(DependencyKind::DevDependencies, dep);
            let violated = match dev_range {
                None => true,
                Some(_) if ctx.is_internal(dep) => false,
                Some(dev) => {
                    is_valid_range(dev) && is_valid_range(peer_range) && !min_satisfies(dev, peer_range)
                }
            };
            if violated {
                out.push(Violation::InvalidDevAndPeerDependencyRelationship {
                    package: ctx.package_ref(index),
                    dependency: dep.to_string(),
                    peer_range: peer_range.to_string(),
                    dev_range: dev_range.map(str::to_string),
                    ideal_dev_range: Self::ideal_dev_range(ctx, dep, peer_range),
                });
            }
        }
        Ok(out)
    }

    fn fix(&self, violation: &Violation, workspace: &mut WorkspaceSet) -> Result<FixOutcome, FixError> {
        expect_rule(self.id(), violation)?;
        let Violation::InvalidDevAndPeerDependencyRelationship {
            package,
            dependency,
            dev_range,
            ideal_dev_range,
            ..
        } = violation
        else {
            return Err(FixError::NotFixable { rule: self.id() });
        };
        let manifest = &mut workspace.package_mut(package.index).manifest;
        let current = manifest.dependency_range(DependencyKind::DevDependencies, dependency);
        if current != dev_range.as_deref() && current != Some(ideal_dev_range.as_str()) {
            return Err(FixError::stale(
                &package.name,
                format!("devDependencies.{dependency}"),
                dev_range.as_deref(),
                current,
            ));
        }
        manifest.set_dependency(DependencyKind::DevDependencies, dependency, ideal_dev_range);
        Ok(FixOutcome::INSTALL)
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

    fn ideal(ws: &WorkspaceSet, pkg: &str) -> Vec<(String, Option<String>)> {
        let options = RuleOptions::default();
        let ctx = RuleContext::new(ws, &options);
        PeerDevRelationship
            .validate(ws.index_of(pkg).unwrap(), &ctx)
            .unwrap()
            .into_iter()
            .map(|v| match v {
                Violation::InvalidDevAndPeerDependencyRelationship {
                    ideal_dev_range,
                    dev_range,
                    ..
                } => (ideal_dev_range, dev_range),
                other => panic!("unexpected violation {other:?}"),
            })
            .collect()
    }

    #[test]
    fn missing_dev_dependency_uses_highest_compatible_range() {
        let ws = workspace(
            Tool::Yarn,
            vec![
                ("", json!({ "name": "root" })),
                ("packages/a", json!({ "name": "a", "dependencies": { "react": "^18.2.0" } })),
                ("packages/b", json!({ "name": "b", "peerDependencies": { "react": "^18.0.0" } })),
            ],
        );
        assert_eq!(ideal(&ws, "b"), vec![("^18.2.0".to_string(), None)]);
    }

    #[test]
    fn incompatible_highest_falls_back_to_peer_range() {
        let ws = workspace(
            Tool::Yarn,
            vec![
                ("", json!({ "name": "root" })),
                ("packages/a", json!({ "name": "a", "dependencies": { "react": "^18.2.0" } })),
                ("packages/b", json!({
                    "name": "b",
                    "peerDependencies": { "react": "^17.0.0" },
                    "devDependencies": { "react": "^16.0.0" }
                })),
            ],
        );
        assert_eq!(
            ideal(&ws, "b"),
            vec![("^17.0.0".to_string(), Some("^16.0.0".to_string()))]
        );
    }

    #[test]
    fn internal_peer_needs_only_presence() {
        let mut ws = workspace(
            Tool::Yarn,
            vec![
                ("", json!({ "name": "root" })),
                ("packages/a", json!({ "name": "a", "version": "1.0.0" })),
                ("packages/b", json!({ "name": "b", "peerDependencies": { "a": "^1.0.0" } })),
            ],
        );
        let b = ws.index_of("b").unwrap();
        let violations = {
            let options = RuleOptions::default();
            let ctx = RuleContext::new(&ws, &options);
            PeerDevRelationship.validate(b, &ctx).unwrap()
        };
        assert_eq!(violations.len(), 1);
        PeerDevRelationship.fix(&violations[0], &mut ws).unwrap();
        assert_eq!(
            ws.package(b)
                .manifest
                .dependency_range(DependencyKind::DevDependencies, "a"),
            Some("*")
        );
        assert!(ideal(&ws, "b").is_empty());
    }

    #[test]
    fn peer_also_in_dependencies_is_fine() {
        let ws = workspace(
            Tool::Yarn,
            vec![
                ("", json!({ "name": "root" })),
                ("packages/b", json!({
                    "name": "b",
                    "dependencies": { "react": "^18.0.0" },
                    "peerDependencies": { "react": "^18.0.0" }
                })),
            ],
        );
        assert!(ideal(&ws, "b").is_empty());
    }
}
