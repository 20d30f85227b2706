//! npm range semantics on top of `semver`.
//!
//! `semver::VersionReq` speaks Cargo's dialect. npm ranges add `||`
//! alternatives, hyphen ranges, operator/version whitespace and bare exact
//! versions, so a range is translated into one `VersionReq` per alternative.

use semver::{Comparator, Op, Version, VersionReq};
use std::cmp::Ordering;

/// A parsed npm range: satisfied when any alternative is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmRange {
    alternatives: Vec<VersionReq>,
}

/// Upper end of a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpperBound {
    Exclusive(Version),
    Inclusive(Version),
    Unbounded,
}

impl UpperBound {
    fn rank(&self) -> (u8, Option<&Version>, u8) {
        match self {
            UpperBound::Exclusive(v) => (0, Some(v), 0),
            UpperBound::Inclusive(v) => (0, Some(v), 1),
            UpperBound::Unbounded => (1, None, 0),
        }
    }
}

impl Ord for UpperBound {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a_unb, a_v, a_inc) = self.rank();
        let (b_unb, b_v, b_inc) = other.rank();
        a_unb
            .cmp(&b_unb)
            .then_with(|| a_v.cmp(&b_v))
            .then_with(|| a_inc.cmp(&b_inc))
    }
}

impl PartialOrd for UpperBound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const OPERATORS: [&str; 7] = [">=", "<=", ">", "<", "=", "~", "^"];

fn is_operator_only(token: &str) -> bool {
    OPERATORS.contains(&token)
}

/// Rewrite one npm comparator token into `semver` syntax.
fn comparator_token(token: &str) -> String {
    let (op, rest) = OPERATORS
        .iter()
        .find_map(|op| token.strip_prefix(op).map(|rest| (*op, rest)))
        .unwrap_or(("", token));
    let rest = rest.trim();
    let rest = rest.strip_prefix('v').unwrap_or(rest);
    // A bare version is exact in npm but caret in Cargo. Bare x-ranges
    // (`1.x`) already parse as wildcards.
    let core = rest.split(['-', '+']).next().unwrap_or(rest);
    let is_wildcard = core.split('.').any(|p| matches!(p, "x" | "X" | "*"));
    let op = if op.is_empty() && !is_wildcard && rest.starts_with(|c: char| c.is_ascii_digit()) {
        "="
    } else {
        op
    };
    format!("{op}{rest}")
}

fn parse_alternative(part: &str) -> Option<VersionReq> {
    let part = part.trim();
    if part.is_empty() || part == "*" || part.eq_ignore_ascii_case("x") {
        return Some(VersionReq::STAR);
    }

    if let Some((lo, hi)) = part.split_once(" - ") {
        let lo = comparator_token(lo.trim()).trim_start_matches('=').to_string();
        let hi = comparator_token(hi.trim()).trim_start_matches('=').to_string();
        return VersionReq::parse(&format!(">={lo}, <={hi}")).ok();
    }

    let mut comparators = Vec::new();
    let mut pending_op: Option<&str> = None;
    for token in part.split_whitespace() {
        if is_operator_only(token) {
            if pending_op.is_some() {
                return None;
            }
            pending_op = Some(token);
            continue;
        }
        let joined = match pending_op.take() {
            Some(op) => format!("{op}{token}"),
            None => token.to_string(),
        };
        comparators.push(comparator_token(&joined));
    }
    if pending_op.is_some() || comparators.is_empty() {
        return None;
    }
    VersionReq::parse(&comparators.join(", ")).ok()
}

impl NpmRange {
    pub fn parse(range: &str) -> Option<Self> {
        let alternatives = range
            .split("||")
            .map(parse_alternative)
            .collect::<Option<Vec<_>>>()?;
        Some(Self { alternatives })
    }

    pub fn satisfies(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// Lowest version that satisfies the range.
    pub fn min_version(&self) -> Option<Version> {
        self.alternatives.iter().filter_map(min_of_req).min()
    }

    pub fn upper_bound(&self) -> UpperBound {
        self.alternatives
            .iter()
            .map(upper_of_req)
            .max()
            .unwrap_or(UpperBound::Unbounded)
    }
}

fn floor(c: &Comparator) -> Version {
    let mut v = Version::new(c.major, c.minor.unwrap_or(0), c.patch.unwrap_or(0));
    v.pre = c.pre.clone();
    v
}

/// The first version above everything `c` names (`1.2` -> `1.3.0`), if it fits in `u64`.
fn bump(c: &Comparator) -> Option<Version> {
    Some(match (c.minor, c.patch) {
        (None, _) => Version::new(c.major.checked_add(1)?, 0, 0),
        (Some(minor), None) => Version::new(c.major, minor.checked_add(1)?, 0),
        (Some(minor), Some(patch)) => Version::new(c.major, minor, patch.checked_add(1)?),
    })
}

/// An exclusive bound past the largest representable version is no bound.
fn exclusive(bound: Option<Version>) -> UpperBound {
    bound.map_or(UpperBound::Unbounded, UpperBound::Exclusive)
}

fn min_of_req(req: &VersionReq) -> Option<Version> {
    let mut candidates = vec![Version::new(0, 0, 0)];
    for c in &req.comparators {
        match c.op {
            Op::Greater => candidates.extend(bump(c)),
            _ => candidates.push(floor(c)),
        }
    }
    candidates.sort();
    candidates.into_iter().find(|v| req.matches(v))
}

fn upper_of_comparator(c: &Comparator) -> UpperBound {
    let full = c.minor.is_some() && c.patch.is_some();
    match c.op {
        Op::Exact | Op::LessEq if full => UpperBound::Inclusive(floor(c)),
        Op::Exact | Op::LessEq | Op::Wildcard => exclusive(bump(c)),
        Op::Less => UpperBound::Exclusive(floor(c)),
        Op::Tilde => match c.minor {
            Some(minor) => exclusive(minor.checked_add(1).map(|m| Version::new(c.major, m, 0))),
            None => exclusive(c.major.checked_add(1).map(|m| Version::new(m, 0, 0))),
        },
        Op::Caret => match (c.major, c.minor, c.patch) {
            (0, None, _) => UpperBound::Exclusive(Version::new(1, 0, 0)),
            (0, Some(0), None) => UpperBound::Exclusive(Version::new(0, 1, 0)),
            (0, Some(0), Some(patch)) => {
                exclusive(patch.checked_add(1).map(|p| Version::new(0, 0, p)))
            }
            (0, Some(minor), _) => exclusive(minor.checked_add(1).map(|m| Version::new(0, m, 0))),
            (major, _, _) => exclusive(major.checked_add(1).map(|m| Version::new(m, 0, 0))),
        },
        _ => UpperBound::Unbounded,
    }
}

fn upper_of_req(req: &VersionReq) -> UpperBound {
    req.comparators
        .iter()
        .map(upper_of_comparator)
        .min()
        .unwrap_or(UpperBound::Unbounded)
}

pub fn is_valid_range(range: &str) -> bool {
    NpmRange::parse(range).is_some()
}

/// The range-type prefix of a declared range: `^`, `~` or nothing.
pub fn range_type(range: &str) -> &'static str {
    match range.trim_start().chars().next() {
        Some('^') => "^",
        Some('~') => "~",
        _ => "",
    }
}

/// Whether `range` (possibly not semver at all) admits `version`.
pub fn range_satisfied_by(range: &str, version: &str) -> Option<bool> {
    let range = NpmRange::parse(range)?;
    let version = Version::parse(version.trim().trim_start_matches('v')).ok()?;
    Some(range.satisfies(&version))
}

/// Order ranges by upper bound, then by minimum version, then textually.
pub fn compare_ranges(a: &str, b: &str) -> Ordering {
    match (NpmRange::parse(a), NpmRange::parse(b)) {
        (Some(ra), Some(rb)) => ra
            .upper_bound()
            .cmp(&rb.upper_bound())
            .then_with(|| ra.min_version().cmp(&rb.min_version()))
            .then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn sat(range: &str, version: &str) -> bool {
        range_satisfied_by(range, version).expect("valid range and version")
    }

    #[test]
    fn bare_version_is_exact() {
        assert!(sat("1.2.3", "1.2.3"));
        assert!(!sat("1.2.3", "1.2.4"));
        assert!(sat("1.2", "1.2.9"));
        assert!(!sat("1.2", "1.3.0"));
    }

    #[test]
    fn alternatives_hyphens_and_spacing() {
        assert!(sat("^1.0.0 || ^2.0.0", "2.5.0"));
        assert!(!sat("^1.0.0 || ^2.0.0", "3.0.0"));
        assert!(sat("1.0.0 - 2.3", "2.3.7"));
        assert!(!sat("1.0.0 - 2.3", "2.4.0"));
        assert!(sat(">= 1.2.0 < 2", "1.9.9"));
        assert!(!sat(">= 1.2.0 < 2", "2.0.0"));
        assert!(sat("1.x", "1.4.0"));
        assert!(sat("*", "0.0.1"));
        assert!(sat("", "9.9.9"));
        assert!(sat("v1.0.0", "1.0.0"));
    }

    #[test]
    fn non_semver_specifiers_are_invalid() {
        for spec in ["latest", "workspace:*", "npm:foo@1.0.0", "file:../a", "github:o/r", ">="] {
            assert!(!is_valid_range(spec), "{spec} should not parse");
        }
    }

    #[test]
    fn min_version_of_common_ranges() {
        let min = |r: &str| NpmRange::parse(r).unwrap().min_version();
        assert_eq!(min("^1.2.3"), Some(v("1.2.3")));
        assert_eq!(min("~0.4"), Some(v("0.4.0")));
        assert_eq!(min(">1.2.3"), Some(v("1.2.4")));
        assert_eq!(min("*"), Some(v("0.0.0")));
        assert_eq!(min("^2.0.0 || ^1.0.0"), Some(v("1.0.0")));
    }

    #[test]
    fn range_type_prefix() {
        assert_eq!(range_type("^1.0.0"), "^");
        assert_eq!(range_type("~1.0.0"), "~");
        assert_eq!(range_type("1.0.0"), "");
        assert_eq!(range_type(">=1.0.0"), "");
    }

    #[test]
    fn upper_bound_ordering() {
        use std::cmp::Ordering::*;
        assert_eq!(compare_ranges("^2.0.0", "^1.9.0"), Greater);
        assert_eq!(compare_ranges("~1.2.0", "^1.0.0"), Less);
        assert_eq!(compare_ranges(">=1.0.0", "^9.0.0"), Greater);
        assert_eq!(compare_ranges("1.2.3", "<=1.2.3"), Greater);
        // Same upper bound: the higher floor wins.
        assert_eq!(compare_ranges("^1.5.0", "^1.0.0"), Greater);
    }

    #[test]
    fn bounds_past_u64_are_unbounded() {
        let max = u64::MAX;
        let caret = format!("^{max}.0.0");
        assert!(is_valid_range(&caret));
        assert_eq!(NpmRange::parse(&caret).unwrap().upper_bound(), UpperBound::Unbounded);
        assert_eq!(
            NpmRange::parse(&format!("~1.{max}.0")).unwrap().upper_bound(),
            UpperBound::Unbounded
        );
        assert_eq!(compare_ranges(&caret, "^1.0.0"), std::cmp::Ordering::Greater);
        assert_eq!(NpmRange::parse(&format!(">1.0.{max}")).unwrap().min_version(), None);
    }
}
