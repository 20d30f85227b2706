//! Package enumeration: globs in, validated member packages out.

use crate::error::{DiscoveryError, DiscoveryResult};
use camino::{Utf8Path, Utf8PathBuf};
use monofix_manifest::Manifest;
use monofix_types::MANIFEST_FILE;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

/// Manifest reads in flight during enumeration.
pub const FS_CONCURRENCY: usize = 32;

/// One package of the workspace.
#[derive(Debug, Clone)]
pub struct Package {
    pub dir: Utf8PathBuf,
    /// `dir` relative to the workspace root, `/`-separated; empty for the root.
    pub relative_dir: Utf8PathBuf,
    pub manifest: Manifest,
    pub is_root: bool,
}

impl Package {
    pub fn new(root: &Utf8Path, manifest: Manifest, is_root: bool) -> Self {
        let dir = manifest.dir().to_path_buf();
        let relative_dir = dir
            .strip_prefix(root)
            .map(Utf8Path::to_path_buf)
            .unwrap_or_default();
        Self {
            dir,
            relative_dir,
            manifest,
            is_root,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.manifest.name()
    }

    /// Path of the manifest relative to the root, for messages.
    pub fn manifest_label(&self) -> String {
        if self.relative_dir.as_str().is_empty() {
            MANIFEST_FILE.to_string()
        } else {
            format!("{}/{}", self.relative_dir, MANIFEST_FILE)
        }
    }
}

/// Read every directory's manifest, at most [`FS_CONCURRENCY`] at a time.
///
/// Directories without a manifest are dropped. Any other failure aborts the
/// outstanding reads and is returned.
pub async fn read_packages(root: &Utf8Path, dirs: Vec<Utf8PathBuf>) -> DiscoveryResult<Vec<Package>> {
    let permits = Arc::new(Semaphore::new(FS_CONCURRENCY));
    let mut tasks = JoinSet::new();
    for dir in dirs {
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| DiscoveryError::Task(e.to_string()))?;
            read_member_async(dir).await
        });
    }

    let mut out = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(|e| DiscoveryError::Task(e.to_string()));
        match result.and_then(|r| r) {
            Ok(Some(manifest)) => out.push(Package::new(root, manifest, false)),
            Ok(None) => {}
            Err(e) => {
                tasks.abort_all();
                return Err(e);
            }
        }
    }
    out.sort_by(|a, b| a.dir.cmp(&b.dir));
    Ok(out)
}

async fn read_member_async(dir: Utf8PathBuf) -> DiscoveryResult<Option<Manifest>> {
    let path = dir.join(MANIFEST_FILE);
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => Ok(Some(Manifest::parse(path, text)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir, "glob matched a directory without a manifest");
            Ok(None)
        }
        Err(e) => Err(DiscoveryError::io(path, e)),
    }
}

/// Blocking counterpart of [`read_packages`].
pub fn read_packages_sync(root: &Utf8Path, dirs: Vec<Utf8PathBuf>) -> DiscoveryResult<Vec<Package>> {
    let mut out = Vec::new();
    for dir in dirs {
        match Manifest::load(&dir) {
            Ok(manifest) => out.push(Package::new(root, manifest, false)),
            Err(e) if e.is_not_found() => {
                debug!(dir = %dir, "glob matched a directory without a manifest");
            }
            Err(e) => return Err(e.into()),
        }
    }
    out.sort_by(|a, b| a.dir.cmp(&b.dir));
    Ok(out)
}

/// Fail with every unnamed manifest at once.
pub fn check_names(packages: &[Package]) -> DiscoveryResult<()> {
    let mut missing: Vec<String> = packages
        .iter()
        .filter(|p| p.name().is_none())
        .map(Package::manifest_label)
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    missing.sort();
    Err(DiscoveryError::MissingNames { paths: missing })
}
