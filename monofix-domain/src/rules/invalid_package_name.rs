use super::{Rule, RuleContext, Violation};
use crate::error::RuleError;
use monofix_types::RuleId;

const MAX_NAME_LENGTH: usize = 214;
const RESERVED_NAMES: [&str; 2] = ["node_modules", "favicon.ico"];
const SPECIAL_CHARACTERS: [char; 6] = ['~', '\'', '!', '(', ')', '*'];

fn is_url_safe(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~' | '!' | '*' | '\'' | '(' | ')'))
}

/// Why `name` cannot be published to npm; empty when it can.
pub fn name_problems(name: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if name.is_empty() {
        problems.push("name length must be greater than zero".to_string());
        return problems;
    }
    if name.len() > MAX_NAME_LENGTH {
        problems.push(format!("name can no longer contain more than {MAX_NAME_LENGTH} characters"));
    }
    if name.starts_with('.') {
        problems.push("name cannot start with a period".to_string());
    }
    if name.starts_with('_') {
        problems.push("name cannot start with an underscore".to_string());
    }
    if name.trim() != name {
        problems.push("name cannot contain leading or trailing spaces".to_string());
    }
    if RESERVED_NAMES.iter().any(|r| name.eq_ignore_ascii_case(r)) {
        problems.push(format!("{name} is a blacklisted name"));
    }
    if name.to_lowercase() != name {
        problems.push("name can no longer contain capital letters".to_string());
    }
    let unscoped = name.rsplit('/').next().unwrap_or(name);
    if unscoped.contains(SPECIAL_CHARACTERS) {
        problems.push("name can no longer contain special characters (\"~'!()*\")".to_string());
    }

    let url_safe = match name.strip_prefix('@') {
        Some(scoped) => match scoped.split_once('/') {
            Some((scope, pkg)) => is_url_safe(scope) && is_url_safe(pkg),
            None => false,
        },
        None => is_url_safe(name),
    };
    if !url_safe {
        problems.push("name can only contain URL-friendly characters".to_string());
    }
    problems
}

/// Package names are publishable npm names.
pub struct InvalidPackageName;

impl Rule for InvalidPackageName {
    fn id(&self) -> RuleId {
        RuleId::InvalidPackageName
    }

    fn validate(&self, index: usize, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        // An unnamed root was already accepted by discovery.
        let Some(name) = ctx.package(index).name() else {
            return Ok(Vec::new());
        };
        let problems = name_problems(name);
        if problems.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Violation::InvalidPackageName {
            package: ctx.package_ref(index),
            name: name.to_string(),
            problems,
        }])
    }

    fn can_fix(&self) -> bool {
        false
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
    fn accepts_plain_and_scoped_names() {
        for name in ["react", "@babel/core", "lodash.merge", "a-b_c", "x1"] {
            assert_eq!(name_problems(name), Vec::<String>::new(), "{name}");
        }
    }

    #[test]
    fn rejects_bad_names() {
        assert!(!name_problems("React").is_empty());
        assert!(!name_problems(".hidden").is_empty());
        assert!(!name_problems("_private").is_empty());
        assert!(!name_problems(" padded ").is_empty());
        assert!(!name_problems("node_modules").is_empty());
        assert!(!name_problems("has space").is_empty());
        assert!(!name_problems("@scope").is_empty());
        assert!(!name_problems("wow!").is_empty());
        assert!(!name_problems(&"a".repeat(215)).is_empty());
    }

    #[test]
    fn reports_without_a_fix() {
        let ws = workspace(
            Tool::Yarn,
            vec![("", json!({ "private": true })), ("packages/a", json!({ "name": "Bad" }))],
        );
        let options = RuleOptions::default();
        let ctx = RuleContext::new(&ws, &options);
        assert!(InvalidPackageName.validate(ws.root_index(), &ctx).unwrap().is_empty());
        let found = InvalidPackageName.validate(ws.index_of("Bad").unwrap(), &ctx).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].to_string().starts_with("\"Bad\" is an invalid package name"));
        assert!(!InvalidPackageName.can_fix());
    }
}
