//! Manifest accessor for `package.json` documents.
//!
//! Responsibilities:
//! - Load and parse a manifest, keeping unknown keys and key order intact.
//! - Typed accessors for the name, version, dependency maps and config blocks.
//! - In-place edits used by rule fixes.
//! - Re-serialize with the document's own indentation and render a unified diff.

mod error;

pub use error::{ManifestError, ManifestResult};

use camino::{Utf8Path, Utf8PathBuf};
use diffy::PatchFormatter;
use fs_err as fs;
use monofix_types::{DependencyKind, MANIFEST_FILE};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

const DEFAULT_INDENT: &str = "  ";

/// A parsed `package.json`.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: Utf8PathBuf,
    doc: Map<String, Value>,
    /// Text as last read from or written to disk.
    original: String,
    indent: String,
    /// Whether the text ends with a newline; kept as found.
    trailing_newline: bool,
}

impl Manifest {
    /// Read `<dir>/package.json`.
    pub fn load(dir: &Utf8Path) -> ManifestResult<Self> {
        let path = dir.join(MANIFEST_FILE);
        let contents = fs::read_to_string(&path)
            .map_err(|e| ManifestError::from_io(path.clone(), e))?;
        Self::parse(path, contents)
    }

    /// Parse manifest text that was read from `path`.
    pub fn parse(path: Utf8PathBuf, contents: String) -> ManifestResult<Self> {
        let value: Value = serde_json::from_str(&contents).map_err(|source| ManifestError::Parse {
            path: path.clone(),
            source,
        })?;
        let Value::Object(doc) = value else {
            return Err(ManifestError::NotAnObject { path });
        };
        let indent = detect_indent(&contents);
        let trailing_newline = contents.ends_with('\n');
        Ok(Self {
            path,
            doc,
            original: contents,
            indent,
            trailing_newline,
        })
    }

    /// Build a manifest in memory. It is considered dirty until saved.
    pub fn from_value(dir: &Utf8Path, value: Value) -> Option<Self> {
        let Value::Object(doc) = value else {
            return None;
        };
        Some(Self {
            path: dir.join(MANIFEST_FILE),
            doc,
            original: String::new(),
            indent: DEFAULT_INDENT.to_string(),
            trailing_newline: true,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Directory containing the manifest.
    pub fn dir(&self) -> &Utf8Path {
        self.path.parent().unwrap_or_else(|| Utf8Path::new(""))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.doc
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.doc.get(key)
    }

    /// Set a top-level key. An existing key keeps its position.
    pub fn set(&mut self, key: &str, value: Value) {
        self.doc.insert(key.to_string(), value);
    }

    /// Remove a top-level key, keeping the order of the others.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.doc.shift_remove(key)
    }

    /// The declared name; empty strings count as missing.
    pub fn name(&self) -> Option<&str> {
        self.doc
            .get("name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn version(&self) -> Option<&str> {
        self.doc.get("version").and_then(Value::as_str)
    }

    /// A tool-specific configuration block such as `"monofix": { ... }`.
    pub fn config_block(&self, key: &str) -> Option<&Value> {
        self.doc.get(key)
    }

    pub fn dependencies(&self, kind: DependencyKind) -> Option<&Map<String, Value>> {
        self.doc.get(kind.key()).and_then(Value::as_object)
    }

    /// `(name, range)` pairs of a category, in document order. Non-string ranges are skipped.
    pub fn dependency_entries(&self, kind: DependencyKind) -> Vec<(&str, &str)> {
        self.dependencies(kind)
            .map(|deps| {
                deps.iter()
                    .filter_map(|(name, range)| range.as_str().map(|r| (name.as_str(), r)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn dependency_range(&self, kind: DependencyKind, name: &str) -> Option<&str> {
        self.dependencies(kind)
            .and_then(|deps| deps.get(name))
            .and_then(Value::as_str)
    }

    pub fn has_dependency(&self, kind: DependencyKind, name: &str) -> bool {
        self.dependencies(kind)
            .map(|deps| deps.contains_key(name))
            .unwrap_or(false)
    }

    /// Set a dependency range, creating the category if needed.
    pub fn set_dependency(&mut self, kind: DependencyKind, name: &str, range: &str) {
        let entry = self
            .doc
            .entry(kind.key())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(deps) = entry {
            deps.insert(name.to_string(), Value::String(range.to_string()));
        }
    }

    /// Remove a dependency and return its previous range.
    pub fn remove_dependency(&mut self, kind: DependencyKind, name: &str) -> Option<Value> {
        self.doc
            .get_mut(kind.key())
            .and_then(Value::as_object_mut)
            .and_then(|deps| deps.shift_remove(name))
    }

    /// Remove a whole category. A value that is not a map stays where it is.
    pub fn take_dependencies(&mut self, kind: DependencyKind) -> Option<Map<String, Value>> {
        if !self.doc.get(kind.key()).is_some_and(Value::is_object) {
            return None;
        }
        match self.doc.shift_remove(kind.key()) {
            Some(Value::Object(deps)) => Some(deps),
            _ => None,
        }
    }

    pub fn is_dependency_map_sorted(&self, kind: DependencyKind) -> bool {
        let Some(deps) = self.dependencies(kind) else {
            return true;
        };
        let keys: Vec<&String> = deps.keys().collect();
        keys.windows(2).all(|w| w[0] <= w[1])
    }

    /// Sort a category by dependency name. Returns whether anything moved.
    pub fn sort_dependencies(&mut self, kind: DependencyKind) -> bool {
        if self.is_dependency_map_sorted(kind) {
            return false;
        }
        let Some(Value::Object(deps)) = self.doc.get_mut(kind.key()) else {
            return false;
        };
        let mut entries: Vec<(String, Value)> = std::mem::take(deps).into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        *deps = entries.into_iter().collect();
        true
    }

    /// The repository URL, whether declared as a string or as `{ "url": ... }`.
    pub fn repository_url(&self) -> Option<&str> {
        match self.doc.get("repository")? {
            Value::String(url) => Some(url.as_str()),
            Value::Object(obj) => obj.get("url").and_then(Value::as_str),
            _ => None,
        }
    }

    pub fn set_repository(&mut self, url: &str) {
        self.set("repository", Value::String(url.to_string()));
    }

    /// Serialize with the detected indentation, ending in a newline only if
    /// the file did.
    pub fn render(&self) -> ManifestResult<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(self.indent.as_bytes());
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.doc
            .serialize(&mut ser)
            .map_err(|source| ManifestError::Serialize {
                path: self.path.clone(),
                source,
            })?;
        if self.trailing_newline {
            buf.push(b'\n');
        }
        // serde_json only emits UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Whether the rendered document differs from what is on disk.
    pub fn is_dirty(&self) -> ManifestResult<bool> {
        Ok(self.render()? != self.original)
    }

    /// Record `rendered` as the on-disk state after a successful write.
    pub fn mark_saved(&mut self, rendered: String) {
        self.original = rendered;
    }

    /// Write the manifest back if it changed. Returns whether a write happened.
    pub fn save(&mut self) -> ManifestResult<bool> {
        let rendered = self.render()?;
        if rendered == self.original {
            return Ok(false);
        }
        fs::write(&self.path, &rendered)
            .map_err(|source| ManifestError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path, "wrote manifest");
        self.mark_saved(rendered);
        Ok(true)
    }

    /// Unified diff between the on-disk text and the current document,
    /// labelled with `label` (usually the path relative to the repo root).
    pub fn diff(&self, label: &str) -> ManifestResult<String> {
        let rendered = self.render()?;
        Ok(render_patch(label, &self.original, &rendered))
    }
}

fn render_patch(label: &str, old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }
    let mut out = String::new();
    out.push_str(&format!("diff --git a/{0} b/{0}\n", label));
    out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", label));

    let patch = diffy::create_patch(old, new);
    let formatter = PatchFormatter::new();
    let body = formatter.fmt_patch(&patch).to_string();
    // Skip diffy's own ---/+++ header; ours carries the label.
    for line in body.lines().skip_while(|l| l.starts_with("---") || l.starts_with("+++")) {
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Indentation of the first indented line, defaulting to two spaces.
fn detect_indent(contents: &str) -> String {
    for line in contents.lines().skip(1) {
        let indent: String = line
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        if !indent.is_empty() {
            return indent;
        }
    }
    DEFAULT_INDENT.to_string()
}
