use crate::error::{FixError, RuleError};
use crate::ranges::{NpmRange, compare_ranges, is_valid_range};
use monofix_discovery::{Package, WorkspaceSet};
use monofix_types::{DependencyKind, RuleId, Scope};
use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

mod external_mismatch;
mod internal_mismatch;
mod invalid_package_name;
mod multiple_dependency_types;
mod peer_dev_relationship;
mod repository_field;
mod root_dev_dependencies;
mod unsorted_dependencies;

pub use invalid_package_name::name_problems;
pub use repository_field::RepositoryHost;

pub const DEFAULT_BRANCH: &str = "master";

/// Per-run rule configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOptions {
    pub default_branch: String,
    pub ignored_rules: BTreeSet<RuleId>,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            default_branch: DEFAULT_BRANCH.to_string(),
            ignored_rules: BTreeSet::new(),
        }
    }
}

/// Which package a violation belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub index: usize,
    pub name: String,
}

/// One violation, carrying what both the message and the fix need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    ExternalMismatch {
        package: PackageRef,
        kind: DependencyKind,
        dependency: String,
        range: String,
        most_common: String,
    },
    InternalMismatch {
        package: PackageRef,
        kind: DependencyKind,
        dependency: String,
        range: String,
        version: String,
    },
    InvalidDevAndPeerDependencyRelationship {
        package: PackageRef,
        dependency: String,
        peer_range: String,
        dev_range: Option<String>,
        ideal_dev_range: String,
    },
    InvalidPackageName {
        package: PackageRef,
        name: String,
        problems: Vec<String>,
    },
    MultipleDependencyTypes {
        package: PackageRef,
        dependency: String,
        duplicate_in: DependencyKind,
    },
    RootHasDevDependencies {
        package: PackageRef,
        dev_dependencies: Vec<String>,
    },
    UnsortedDependencies {
        package: PackageRef,
        kinds: Vec<DependencyKind>,
    },
    IncorrectRepositoryField {
        package: PackageRef,
        current: Option<String>,
        correct: String,
    },
}

impl Violation {
    pub fn rule(&self) -> RuleId {
        match self {
            Violation::ExternalMismatch { .. } => RuleId::ExternalMismatch,
            Violation::InternalMismatch { .. } => RuleId::InternalMismatch,
            Violation::InvalidDevAndPeerDependencyRelationship { .. } => {
                RuleId::InvalidDevAndPeerDependencyRelationship
            }
            Violation::InvalidPackageName { .. } => RuleId::InvalidPackageName,
            Violation::MultipleDependencyTypes { .. } => RuleId::MultipleDependencyTypes,
            Violation::RootHasDevDependencies { .. } => RuleId::RootHasDevDependencies,
            Violation::UnsortedDependencies { .. } => RuleId::UnsortedDependencies,
            Violation::IncorrectRepositoryField { .. } => RuleId::IncorrectRepositoryField,
        }
    }

    pub fn package(&self) -> &PackageRef {
        match self {
            Violation::ExternalMismatch { package, .. }
            | Violation::InternalMismatch { package, .. }
            | Violation::InvalidDevAndPeerDependencyRelationship { package, .. }
            | Violation::InvalidPackageName { package, .. }
            | Violation::MultipleDependencyTypes { package, .. }
            | Violation::RootHasDevDependencies { package, .. }
            | Violation::UnsortedDependencies { package, .. }
            | Violation::IncorrectRepositoryField { package, .. } => package,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::ExternalMismatch {
                package,
                dependency,
                range,
                most_common,
                ..
            } => write!(
                f,
                "{} has a dependency on {dependency}@{range} but the most common range in the repo is {most_common}, the range should be set to {most_common}",
                package.name
            ),
            Violation::InternalMismatch {
                package,
                dependency,
                range,
                version,
                ..
            } => write!(
                f,
                "{} has a dependency on {dependency}@{range} but the version of {dependency} in the repo is {version} which is not within range of the depended on version, please update the dependency version",
                package.name
            ),
            Violation::InvalidDevAndPeerDependencyRelationship {
                package,
                dependency,
                peer_range,
                dev_range,
                ideal_dev_range,
            } => match dev_range {
                None => write!(
                    f,
                    "{} has a peerDependency on {dependency} but it is not also specified in devDependencies, please add it there, the version should be {ideal_dev_range}",
                    package.name
                ),
                Some(dev) => write!(
                    f,
                    "{} has a peerDependency on {dependency}@{peer_range} but the devDependency range {dev} does not satisfy it, the devDependency range should be {ideal_dev_range}",
                    package.name
                ),
            },
            Violation::InvalidPackageName { name, problems, .. } => {
                write!(f, "{name:?} is an invalid package name for the following reasons:")?;
                for p in problems {
                    write!(f, "\n  - {p}")?;
                }
                Ok(())
            }
            Violation::MultipleDependencyTypes {
                package,
                dependency,
                duplicate_in,
            } => write!(
                f,
                "{} has a dependency and a {duplicate_in} entry on {dependency}, this is unnecessary, it should be removed from {duplicate_in}",
                package.name
            ),
            Violation::RootHasDevDependencies { .. } => f.write_str(
                "the root package.json contains devDependencies, this is disallowed as devDependencies vs dependencies in a private package does not affect anything and creates confusion",
            ),
            Violation::UnsortedDependencies { package, kinds } => {
                let kinds: Vec<&str> = kinds.iter().map(|k| k.key()).collect();
                write!(
                    f,
                    "{}'s dependencies are unsorted ({}), this can cause large diffs when packages are added, resulting in dependencies being sorted",
                    package.name,
                    kinds.join(", ")
                )
            }
            Violation::IncorrectRepositoryField {
                package,
                current,
                correct,
            } => match current {
                Some(current) => write!(
                    f,
                    "{} has a repository field of {current:?} when it should be {correct:?}",
                    package.name
                ),
                None => write!(
                    f,
                    "{} does not have a repository field when it should be {correct:?}",
                    package.name
                ),
            },
        }
    }
}

/// What an applied fix needs afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixOutcome {
    pub requires_install: bool,
}

impl FixOutcome {
    pub const INSTALL: FixOutcome = FixOutcome {
        requires_install: true,
    };
    pub const NO_INSTALL: FixOutcome = FixOutcome {
        requires_install: false,
    };
}

/// Read-only view handed to `validate`, with lazily computed repo-wide tallies.
pub struct RuleContext<'a> {
    pub workspace: &'a WorkspaceSet,
    pub options: &'a RuleOptions,
    most_common: OnceCell<BTreeMap<String, String>>,
    highest: OnceCell<BTreeMap<String, String>>,
}

impl<'a> RuleContext<'a> {
    pub fn new(workspace: &'a WorkspaceSet, options: &'a RuleOptions) -> Self {
        Self {
            workspace,
            options,
            most_common: OnceCell::new(),
            highest: OnceCell::new(),
        }
    }

    pub fn package(&self, index: usize) -> &'a Package {
        self.workspace.package(index)
    }

    pub fn package_ref(&self, index: usize) -> PackageRef {
        PackageRef {
            index,
            name: self.workspace.key(index).to_string(),
        }
    }

    pub fn is_internal(&self, dependency: &str) -> bool {
        self.workspace.contains(dependency)
    }

    /// Most common valid range of each external dependency; ties go to the
    /// range with the highest upper bound.
    pub fn most_common_ranges(&self) -> &BTreeMap<String, String> {
        self.most_common.get_or_init(|| {
            let mut counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
            for (_, dep, range) in self.external_entries() {
                *counts
                    .entry(dep.to_string())
                    .or_default()
                    .entry(range.to_string())
                    .or_default() += 1;
            }
            counts
                .into_iter()
                .filter_map(|(dep, ranges)| {
                    ranges
                        .into_iter()
                        .max_by(|(ra, ca), (rb, cb)| ca.cmp(cb).then_with(|| compare_ranges(ra, rb)))
                        .map(|(range, _)| (dep, range))
                })
                .collect()
        })
    }

    /// Highest valid range each external dependency is declared with.
    pub fn highest_ranges(&self) -> &BTreeMap<String, String> {
        self.highest.get_or_init(|| {
            let mut highest: BTreeMap<String, String> = BTreeMap::new();
            for (_, dep, range) in self.external_entries() {
                match highest.get(dep) {
                    Some(current) if compare_ranges(current, range).is_ge() => {}
                    _ => {
                        highest.insert(dep.to_string(), range.to_string());
                    }
                }
            }
            highest
        })
    }

    /// `(package index, dependency, range)` for every external dependency with a
    /// valid range in a normal category, excluding dev entries governed by a
    /// peer dependency of the same package.
    fn external_entries(&self) -> Vec<(usize, &'a str, &'a str)> {
        let mut out = Vec::new();
        for (idx, pkg) in self.workspace.packages().iter().enumerate() {
            for kind in DependencyKind::NORMAL {
                for (dep, range) in pkg.manifest.dependency_entries(kind) {
                    if self.is_internal(dep)
                        || !is_valid_range(range)
                        || is_peer_governed(pkg, kind, dep)
                    {
                        continue;
                    }
                    out.push((idx, dep, range));
                }
            }
        }
        out
    }
}

/// A dev dependency that mirrors a peer dependency follows the peer range,
/// not the repo-wide most common range.
pub(crate) fn is_peer_governed(pkg: &Package, kind: DependencyKind, dependency: &str) -> bool {
    kind == DependencyKind::DevDependencies
        && pkg
            .manifest
            .has_dependency(DependencyKind::PeerDependencies, dependency)
}

pub(crate) fn min_satisfies(range: &str, target: &str) -> bool {
    match (NpmRange::parse(range), NpmRange::parse(target)) {
        (Some(r), Some(t)) => r.min_version().is_some_and(|v| t.satisfies(&v)),
        _ => false,
    }
}

/// Everything one rule found in one package, including entries it could not
/// evaluate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub violations: Vec<Violation>,
    pub errors: Vec<RuleError>,
}

impl From<Result<Vec<Violation>, RuleError>> for Validation {
    fn from(result: Result<Vec<Violation>, RuleError>) -> Self {
        match result {
            Ok(violations) => Validation {
                violations,
                errors: Vec::new(),
            },
            Err(err) => Validation {
                violations: Vec::new(),
                errors: vec![err],
            },
        }
    }
}

/// A consistency rule.
pub trait Rule {
    fn id(&self) -> RuleId;

    fn scope(&self) -> Scope {
        Scope::All
    }

    fn validate(&self, index: usize, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError>;

    /// Rules that can isolate an error to one entry override this to keep
    /// reporting the package's other violations.
    fn validate_all(&self, index: usize, ctx: &RuleContext<'_>) -> Validation {
        self.validate(index, ctx).into()
    }

    fn can_fix(&self) -> bool {
        true
    }

    fn fix(&self, violation: &Violation, workspace: &mut WorkspaceSet) -> Result<FixOutcome, FixError> {
        let _ = (violation, workspace);
        Err(FixError::NotFixable { rule: self.id() })
    }

    fn print(&self, violation: &Violation) -> String {
        violation.to_string()
    }
}

/// The catalog, in dispatch order.
pub fn builtin_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(external_mismatch::ExternalMismatch),
        Box::new(internal_mismatch::InternalMismatch),
        Box::new(peer_dev_relationship::PeerDevRelationship),
        Box::new(invalid_package_name::InvalidPackageName),
        Box::new(multiple_dependency_types::MultipleDependencyTypes),
        Box::new(root_dev_dependencies::RootHasDevDependencies),
        Box::new(unsorted_dependencies::UnsortedDependencies),
        Box::new(repository_field::IncorrectRepositoryField),
    ]
}

/// Fix helper: reject a violation addressed to another rule.
pub(crate) fn expect_rule(rule: RuleId, violation: &Violation) -> Result<(), FixError> {
    if violation.rule() == rule {
        Ok(())
    } else {
        Err(FixError::WrongRule {
            rule,
            other: violation.rule(),
        })
    }
}
