//! Rule explanations for the `monofix explain` and `monofix list-rules` commands.

use monofix_types::RuleId;

/// What a rule checks, how it repairs, and how to fix it by hand.
#[derive(Debug, Clone)]
pub struct RuleExplanation {
    /// Short user-facing key, e.g. "external-mismatch".
    pub key: &'static str,
    pub rule: RuleId,
    pub title: &'static str,
    /// Whether `monofix fix` repairs the violation.
    pub fixable: bool,
    /// Whether the repair is followed by a dependency install.
    pub installs: bool,
    pub description: &'static str,
    pub remediation: &'static str,
}

/// Every rule, in catalog order.
pub static RULE_REGISTRY: &[RuleExplanation] = &[
    // 1) External mismatch
    RuleExplanation {
        key: "external-mismatch",
        rule: RuleId::ExternalMismatch,
        title: "External Dependency Mismatch",
        fixable: true,
        installs: true,
        description: r#"Every package depending on the same external (non-workspace) package
should ask for the same range.

For each external dependency the most common valid range across all workspace
packages, the root included, is the expected range. Ties go to the range with
the highest upper bound. Dev dependencies that only mirror a peer dependency
are left out of the count.

Example: two packages declare `react@^18.2.0` and one declares `react@^17.0.0`;
the third is reported and fixed to `^18.2.0`."#,
        remediation: r#"Pick the range the rest of the workspace uses and set it in every
dependencies, devDependencies and optionalDependencies map that declares the
package, then reinstall:

    monofix upgrade <name> <range>"#,
    },
    // 2) Internal mismatch
    RuleExplanation {
        key: "internal-mismatch",
        rule: RuleId::InternalMismatch,
        title: "Internal Dependency Mismatch",
        fixable: true,
        installs: true,
        description: r#"A dependency on another workspace package must admit that package's
current version.

Protocol specifiers (`workspace:`, `npm:`, `file:`, `link:`) and ranges that
are not semver are skipped. Peer dependencies are handled by
INVALID_DEV_AND_PEER_DEPENDENCY_RELATIONSHIP instead.

The fix keeps the declared range type and moves it to the workspace version:
`^0.9.0` against a workspace version of `1.2.0` becomes `^1.2.0`."#,
        remediation: r#"Update the dependency range to cover the version in the workspace package's
package.json, keeping `^` or `~` as before."#,
    },
    // 3) Dev/peer relationship
    RuleExplanation {
        key: "invalid-dev-and-peer-dependency-relationship",
        rule: RuleId::InvalidDevAndPeerDependencyRelationship,
        title: "Peer Dependency Without Matching Dev Dependency",
        fixable: true,
        installs: true,
        description: r#"Every peer dependency must also be a dev dependency so the package can be
built and tested on its own. For external packages the dev range's minimum
version must satisfy the peer range.

The expected dev range is:
- `*` for workspace packages
- the highest range used for the package elsewhere in the repo, when its
  minimum version satisfies the peer range
- the peer range itself otherwise

Peers that are also regular dependencies are skipped."#,
        remediation: r#"Add the package to devDependencies with the suggested range:

    "devDependencies": { "<name>": "<range>" }"#,
    },
    // 4) Package name
    RuleExplanation {
        key: "invalid-package-name",
        rule: RuleId::InvalidPackageName,
        title: "Invalid Package Name",
        fixable: false,
        installs: false,
        description: r#"Each package name must be a valid npm package name:
- at most 214 characters
- lowercase
- URL-safe characters, with an optional `@scope/` prefix
- no leading `.` or `_`
- no surrounding whitespace
- not `node_modules` or `favicon.ico`

An unnamed root manifest is not checked."#,
        remediation: r#"Rename the package by hand and update every dependency on it. monofix does
not rename packages because consumers outside the repo may depend on the name."#,
    },
    // 5) Multiple dependency types
    RuleExplanation {
        key: "multiple-dependency-types",
        rule: RuleId::MultipleDependencyTypes,
        title: "Dependency Declared More Than Once",
        fixable: true,
        installs: false,
        description: r#"A package listed in dependencies must not also appear in devDependencies or
optionalDependencies. The regular dependency already installs it.

The fix removes the duplicate from the other map."#,
        remediation: r#"Delete the entry from devDependencies or optionalDependencies."#,
    },
    // 6) Root dev dependencies
    RuleExplanation {
        key: "root-has-dev-dependencies",
        rule: RuleId::RootHasDevDependencies,
        title: "Root Has Dev Dependencies",
        fixable: true,
        installs: true,
        description: r#"The root package of a monorepo is never published, so the split between
dependencies and devDependencies means nothing there. Everything belongs in
dependencies.

Only checked when the workspace is a monorepo. The fix moves devDependencies
into dependencies; an existing dependencies entry wins."#,
        remediation: r#"Move every root devDependencies entry into dependencies and delete the
devDependencies map."#,
    },
    // 7) Sorting
    RuleExplanation {
        key: "unsorted-dependencies",
        rule: RuleId::UnsortedDependencies,
        title: "Unsorted Dependencies",
        fixable: true,
        installs: false,
        description: r#"Every dependency map (dependencies, devDependencies, optionalDependencies,
peerDependencies) must be sorted by package name. Package managers write them
sorted, so unsorted maps show up as noise in diffs.

The fix sorts each map in place."#,
        remediation: r#"Sort the keys of each dependency map alphabetically."#,
    },
    // 8) Repository field
    RuleExplanation {
        key: "incorrect-repository-field",
        rule: RuleId::IncorrectRepositoryField,
        title: "Incorrect Repository Field",
        fixable: true,
        installs: false,
        description: r#"When the root declares a GitHub or GitLab repository, every package's
repository field should point at its own directory.

- root: the repository URL without a `.git` suffix
- GitHub member: `<url>/tree/<branch>/<relative dir>`
- GitLab member: `<url>/-/tree/<branch>/<relative dir>`

The branch is `master` unless `defaultBranch` is set in the root's "monofix"
block or `--default-branch` is passed. Other hosts are not checked."#,
        remediation: r#"Set each package's repository to the suggested URL, or set `defaultBranch`
if the URLs point at the wrong branch:

    "monofix": { "defaultBranch": "main" }"#,
    },
];

/// Look up a rule by key or canonical rule name, case-insensitively.
pub fn lookup_rule(query: &str) -> Option<&'static RuleExplanation> {
    let normalized = query.trim().to_lowercase().replace('_', "-");
    RULE_REGISTRY.iter().find(|rule| rule.key == normalized)
}

pub fn list_rule_keys() -> Vec<&'static str> {
    RULE_REGISTRY.iter().map(|r| r.key).collect()
}

/// One-word summary of what `fix` does for a rule.
pub fn fix_kind(rule: &RuleExplanation) -> &'static str {
    match (rule.fixable, rule.installs) {
        (false, _) => "report",
        (true, false) => "fix",
        (true, true) => "fix+install",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_key_and_rule_name() {
        assert_eq!(
            lookup_rule("external-mismatch").map(|r| r.rule),
            Some(RuleId::ExternalMismatch)
        );
        assert_eq!(
            lookup_rule("ROOT_HAS_DEV_DEPENDENCIES").map(|r| r.rule),
            Some(RuleId::RootHasDevDependencies)
        );
        assert!(lookup_rule("resolver-v2").is_none());
    }

    #[test]
    fn registry_follows_catalog_order() {
        let ids: Vec<RuleId> = RULE_REGISTRY.iter().map(|r| r.rule).collect();
        assert_eq!(ids, RuleId::ALL.to_vec());
    }

    #[test]
    fn keys_are_kebab_rule_names() {
        for rule in RULE_REGISTRY {
            assert_eq!(rule.key, rule.rule.as_str().to_lowercase().replace('_', "-"));
        }
    }
}
