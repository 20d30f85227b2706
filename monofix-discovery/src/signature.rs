//! Tool signature matching for a single directory.
//!
//! The matcher is pure: it sees a [`DirSnapshot`] and never touches the
//! filesystem. The sync and async root walks only differ in how they fill
//! the snapshot.

use crate::error::{DiscoveryError, DiscoveryResult};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use monofix_manifest::{Manifest, ManifestError};
use monofix_types::{MANIFEST_FILE, Tool};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub const PNPM_WORKSPACE_FILE: &str = "pnpm-workspace.yaml";
pub const LERNA_FILE: &str = "lerna.json";

/// What one directory looks like to the matcher.
#[derive(Debug, Clone)]
pub struct DirSnapshot {
    pub dir: Utf8PathBuf,
    pub manifest: Option<Manifest>,
    pub pnpm_workspace: Option<String>,
    pub lerna: Option<String>,
}

/// A matched workspace signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSignature {
    pub tool: Tool,
    pub globs: Vec<String>,
}

impl DirSnapshot {
    pub fn empty(dir: Utf8PathBuf) -> Self {
        Self {
            dir,
            manifest: None,
            pnpm_workspace: None,
            lerna: None,
        }
    }

    /// Read the directory's manifest and auxiliary files, blocking.
    pub fn read(dir: &Utf8Path) -> DiscoveryResult<Self> {
        let manifest = match Manifest::load(dir) {
            Ok(m) => Some(m),
            Err(e) if e.is_not_found() => None,
            // A directory that cannot hold a manifest.
            Err(ManifestError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotADirectory =>
            {
                None
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            pnpm_workspace: read_optional(&dir.join(PNPM_WORKSPACE_FILE))?,
            lerna: read_optional(&dir.join(LERNA_FILE))?,
        })
    }

    /// Read the directory's manifest and auxiliary files on the tokio runtime.
    pub async fn read_async(dir: &Utf8Path) -> DiscoveryResult<Self> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest = match read_optional_async(&manifest_path).await? {
            Some(text) => Some(Manifest::parse(manifest_path, text)?),
            None => None,
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
            pnpm_workspace: read_optional_async(&dir.join(PNPM_WORKSPACE_FILE)).await?,
            lerna: read_optional_async(&dir.join(LERNA_FILE)).await?,
        })
    }
}

fn is_absent(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
    )
}

fn read_optional(path: &Utf8Path) -> DiscoveryResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if is_absent(&e) => Ok(None),
        Err(e) => Err(DiscoveryError::io(path, e)),
    }
}

async fn read_optional_async(path: &Utf8Path) -> DiscoveryResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => Ok(Some(s)),
        Err(e) if is_absent(&e) => Ok(None),
        Err(e) => Err(DiscoveryError::io(path, e)),
    }
}

#[derive(Deserialize)]
struct PnpmWorkspace {
    packages: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LernaConfig {
    packages: Option<Vec<String>>,
    #[serde(default)]
    use_workspaces: bool,
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

/// Decide which workspace convention, if any, `snap` is the root of.
///
/// Precedence: yarn array, yarn map, bolt, pnpm yaml, lerna marker.
/// Every signature needs a sibling manifest.
pub fn match_signature(snap: &DirSnapshot) -> DiscoveryResult<Option<ToolSignature>> {
    let Some(manifest) = &snap.manifest else {
        return Ok(None);
    };

    if let Some(workspaces) = manifest.get("workspaces") {
        if let Some(globs) = string_list(workspaces) {
            return Ok(Some(ToolSignature {
                tool: Tool::Yarn,
                globs,
            }));
        }
        if let Some(globs) = workspaces.get("packages").and_then(string_list) {
            return Ok(Some(ToolSignature {
                tool: Tool::Yarn,
                globs,
            }));
        }
    }

    if let Some(globs) = manifest
        .get("bolt")
        .and_then(|b| b.get("workspaces"))
        .and_then(string_list)
    {
        return Ok(Some(ToolSignature {
            tool: Tool::Bolt,
            globs,
        }));
    }

    if let Some(text) = &snap.pnpm_workspace {
        let path = snap.dir.join(PNPM_WORKSPACE_FILE);
        // An empty file deserializes to unit, not to a struct.
        if !text.trim().is_empty() {
            let parsed: PnpmWorkspace = serde_yaml::from_str(text)
                .map_err(|source| DiscoveryError::Yaml { path, source })?;
            if let Some(globs) = parsed.packages {
                return Ok(Some(ToolSignature {
                    tool: Tool::Pnpm,
                    globs,
                }));
            }
        }
    }

    if let Some(text) = &snap.lerna {
        match serde_json::from_str::<LernaConfig>(text) {
            Ok(LernaConfig {
                packages: Some(globs),
                use_workspaces: false,
            }) => {
                return Ok(Some(ToolSignature {
                    tool: Tool::Lerna,
                    globs,
                }));
            }
            Ok(_) => debug!(dir = %snap.dir, "lerna.json declares no packages of its own"),
            Err(e) => debug!(dir = %snap.dir, error = %e, "ignoring unreadable lerna.json"),
        }
    }

    Ok(None)
}
