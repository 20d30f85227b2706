//! Upward root search.
//!
//! [`RootWalk`] holds the walk state and makes every decision from a
//! [`DirSnapshot`]; [`find_root`] and [`find_root_async`] only differ in how
//! they read the next snapshot.

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::signature::{DirSnapshot, match_signature};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use monofix_types::Tool;
use tracing::debug;

/// A resolved workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonorepoRoot {
    pub tool: Tool,
    pub root_dir: Utf8PathBuf,
    /// Member globs; empty for a single-package root.
    pub globs: Vec<String>,
}

/// Outcome of one walk step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Found(MonorepoRoot),
    Ascend(Utf8PathBuf),
}

#[derive(Debug, Clone)]
pub struct RootWalk {
    start: Utf8PathBuf,
    /// Closest directory at or above `start` holding a manifest.
    nearest_manifest: Option<Utf8PathBuf>,
}

impl RootWalk {
    pub fn new(start: Utf8PathBuf) -> Self {
        Self {
            start,
            nearest_manifest: None,
        }
    }

    pub fn start(&self) -> &Utf8Path {
        &self.start
    }

    /// Decide what to do with the directory described by `snap`.
    pub fn step(&mut self, snap: &DirSnapshot) -> DiscoveryResult<Step> {
        if let Some(sig) = match_signature(snap)? {
            debug!(dir = %snap.dir, tool = %sig.tool, "workspace root found");
            return Ok(Step::Found(MonorepoRoot {
                tool: sig.tool,
                root_dir: snap.dir.clone(),
                globs: sig.globs,
            }));
        }
        if snap.manifest.is_some() && self.nearest_manifest.is_none() {
            self.nearest_manifest = Some(snap.dir.clone());
        }
        match snap.dir.parent() {
            Some(parent) => Ok(Step::Ascend(parent.to_path_buf())),
            None => self.finish(),
        }
    }

    /// Filesystem boundary reached without a workspace signature.
    fn finish(&self) -> DiscoveryResult<Step> {
        match &self.nearest_manifest {
            Some(dir) => {
                debug!(dir = %dir, "no workspace signature; using single package root");
                Ok(Step::Found(MonorepoRoot {
                    tool: Tool::Root,
                    root_dir: dir.clone(),
                    globs: Vec::new(),
                }))
            }
            None => Err(DiscoveryError::NoRootFound {
                start: self.start.clone(),
            }),
        }
    }
}

/// Absolute form of `start` with `.` and `..` resolved lexically, so that
/// `parent()` walks real ancestors.
fn absolutize(start: &Utf8Path) -> DiscoveryResult<Utf8PathBuf> {
    let abs = std::path::absolute(start).map_err(|e| DiscoveryError::io(start, e))?;
    let abs = Utf8PathBuf::from_path_buf(abs).map_err(|p| {
        DiscoveryError::io(
            start,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("non UTF-8 path: {}", p.display()),
            ),
        )
    })?;
    let mut out = Utf8PathBuf::new();
    for component in abs.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_str()),
        }
    }
    Ok(out)
}

/// Find the workspace root at or above `start`, blocking.
pub fn find_root(start: &Utf8Path) -> DiscoveryResult<MonorepoRoot> {
    let start = absolutize(start)?;
    let mut walk = RootWalk::new(start.clone());
    let mut current = start;
    loop {
        let snap = DirSnapshot::read(&current)?;
        match walk.step(&snap)? {
            Step::Found(root) => return Ok(root),
            Step::Ascend(parent) => current = parent,
        }
    }
}

/// Find the workspace root at or above `start` on the tokio runtime.
pub async fn find_root_async(start: &Utf8Path) -> DiscoveryResult<MonorepoRoot> {
    let start = absolutize(start)?;
    let mut walk = RootWalk::new(start.clone());
    let mut current = start;
    loop {
        let snap = DirSnapshot::read_async(&current).await?;
        match walk.step(&snap)? {
            Step::Found(root) => return Ok(root),
            Step::Ascend(parent) => current = parent,
        }
    }
}
