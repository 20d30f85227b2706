use crate::error::{DiscoveryError, DiscoveryResult};
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

const INSTALL_DIR: &str = "node_modules";
const GLOB_META: [char; 4] = ['*', '?', '[', '{'];

fn normalize(pattern: &str) -> &str {
    let p = pattern.trim();
    let p = p.strip_prefix("./").unwrap_or(p);
    p.trim_end_matches('/')
}

fn glob_error(pattern: &str, err: globset::Error) -> DiscoveryError {
    DiscoveryError::Glob {
        pattern: pattern.to_string(),
        message: err.to_string(),
    }
}

fn compile(pattern: &str) -> DiscoveryResult<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(true)
        .build()
        .map_err(|e| glob_error(pattern, e))
}

/// One include pattern, walked from its longest literal prefix.
struct Include {
    base: Utf8PathBuf,
    base_len: usize,
    matcher: GlobMatcher,
    max_depth: Option<usize>,
    /// Segments up to the first `**`; a hidden entry must be named by one
    /// starting with `.` at the same depth.
    segments: Vec<String>,
}

impl Include {
    fn new(pattern: &str) -> DiscoveryResult<Self> {
        let segments: Vec<&str> = pattern.split('/').collect();
        let base_len = segments
            .iter()
            .take_while(|s| !s.contains(GLOB_META))
            .count();
        let rest = &segments[base_len..];
        let max_depth = if rest.iter().any(|s| s.contains("**")) {
            None
        } else {
            Some(rest.len())
        };
        Ok(Self {
            base: segments[..base_len].iter().collect(),
            base_len,
            matcher: compile(pattern)?.compile_matcher(),
            max_depth,
            segments: segments
                .iter()
                .take_while(|s| !s.contains("**"))
                .map(|s| s.to_string())
                .collect(),
        })
    }

    /// Whether the walk may enter or yield `entry`.
    fn admits(&self, entry: &DirEntry) -> bool {
        let Some(name) = entry.file_name().to_str() else {
            return false;
        };
        if name == INSTALL_DIR {
            return false;
        }
        if entry.depth() == 0 || !name.starts_with('.') {
            return true;
        }
        self.segments
            .get(self.base_len + entry.depth() - 1)
            .is_some_and(|s| s.starts_with('.'))
    }
}

/// Expand workspace globs to member directories under `root`.
///
/// Only directories are returned, never anything inside `node_modules`.
/// Wildcards skip hidden directories unless the pattern spells out the
/// leading dot, and `{a,b}` alternatives are supported. Patterns starting
/// with `!` remove matches. The result is sorted and free of duplicates.
pub fn expand_globs(root: &Utf8Path, patterns: &[String]) -> DiscoveryResult<Vec<Utf8PathBuf>> {
    let mut includes = Vec::new();
    let mut excludes = GlobSetBuilder::new();
    for raw in patterns {
        match raw.trim().strip_prefix('!') {
            Some(neg) => {
                excludes.add(compile(normalize(neg))?);
            }
            None => {
                let p = normalize(raw);
                if !p.is_empty() {
                    includes.push(Include::new(p)?);
                }
            }
        }
    }
    let excludes: GlobSet = excludes
        .build()
        .map_err(|e| glob_error(&patterns.join(", "), e))?;

    let mut dirs = BTreeSet::new();
    for include in &includes {
        let walk_root = root.join(&include.base);
        if !walk_root.is_dir() {
            continue;
        }
        let mut walker = WalkDir::new(&walk_root).follow_links(true);
        if let Some(depth) = include.max_depth {
            walker = walker.max_depth(depth);
        }
        for entry in walker.into_iter().filter_entry(|e| include.admits(e)) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Unreadable directories and link loops are skipped.
                    debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let Some(path) = Utf8Path::from_path(entry.path()) else {
                continue;
            };
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            if rel.as_str().is_empty()
                || !include.matcher.is_match(rel.as_std_path())
                || excludes.is_match(rel.as_std_path())
            {
                continue;
            }
            dirs.insert(path.to_path_buf());
        }
    }

    debug!(root = %root, count = dirs.len(), "expanded workspace globs");
    Ok(dirs.into_iter().collect())
}
