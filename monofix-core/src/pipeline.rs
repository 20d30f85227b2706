//! Check and fix pipelines, plus the persistence and install steps every
//! mutating pipeline shares.

use crate::error::ToolError;
use crate::ports::{ProcessPort, RunOptions};
use crate::settings::{FixSettings, ProjectConfig};
use camino::{Utf8Path, Utf8PathBuf};
use monofix_discovery::{FS_CONCURRENCY, WorkspaceSet, discover};
use monofix_domain::{Engine, RuleOptions};
use monofix_manifest::ManifestError;
use monofix_types::RunSummary;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Discover the workspace around `start` and read its project config.
pub async fn open_workspace(start: &Utf8Path) -> Result<(WorkspaceSet, ProjectConfig), ToolError> {
    let workspace = discover(start).await?;
    let config = ProjectConfig::from_manifest(&workspace.root().manifest)?;
    info!(
        tool = %workspace.tool(),
        root = %workspace.root_dir(),
        packages = workspace.len(),
        "workspace discovered"
    );
    Ok((workspace, config))
}

/// Report every violation. Nothing is written.
pub fn run_check(workspace: &WorkspaceSet, options: &RuleOptions) -> RunSummary {
    Engine::new().check(workspace, options)
}

/// Outcome of `run_fix`.
#[derive(Debug)]
pub struct FixReport {
    pub summary: RunSummary,
    /// Manifests written to disk.
    pub written: Vec<Utf8PathBuf>,
    /// Unified diff of the pending changes; only filled on a dry run.
    pub diff: String,
    pub installed: bool,
}

/// Apply every available fix, persist changed manifests and install once
/// if any fix needs it.
pub async fn run_fix(
    mut workspace: WorkspaceSet,
    settings: &FixSettings,
    process: Arc<dyn ProcessPort>,
) -> Result<FixReport, ToolError> {
    let summary = Engine::new().fix(&mut workspace, &settings.rules);

    if settings.dry_run {
        let diff = pending_diff(&workspace)?;
        return Ok(FixReport {
            summary,
            written: Vec::new(),
            diff,
            installed: false,
        });
    }

    let written = write_manifests(&mut workspace).await?;
    let installed = if summary.requires_install && settings.install {
        run_install(&workspace, process.as_ref()).await?;
        true
    } else {
        false
    };
    Ok(FixReport {
        summary,
        written,
        diff: String::new(),
        installed,
    })
}

/// Concatenated diffs of every manifest that would change, in package order.
pub fn pending_diff(workspace: &WorkspaceSet) -> Result<String, ToolError> {
    let mut diff = String::new();
    for pkg in workspace.packages() {
        diff.push_str(&pkg.manifest.diff(&pkg.manifest_label())?);
    }
    Ok(diff)
}

/// Write every manifest whose rendering changed, at most
/// [`FS_CONCURRENCY`] at a time. Returns the written paths, sorted.
pub async fn write_manifests(workspace: &mut WorkspaceSet) -> Result<Vec<Utf8PathBuf>, ToolError> {
    let mut pending = Vec::new();
    for (index, pkg) in workspace.packages().iter().enumerate() {
        if pkg.manifest.is_dirty()? {
            pending.push((index, pkg.manifest.path().to_path_buf(), pkg.manifest.render()?));
        }
    }

    let permits = Arc::new(Semaphore::new(FS_CONCURRENCY));
    let mut tasks = JoinSet::new();
    for (index, path, rendered) in pending {
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| ToolError::Internal(e.into()))?;
            tokio::fs::write(&path, rendered.as_bytes())
                .await
                .map_err(|source| ManifestError::Io {
                    path: path.clone(),
                    source,
                })?;
            Ok::<_, ToolError>((index, path, rendered))
        });
    }

    let mut written = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let result = match joined {
            Ok(result) => result,
            Err(err) => Err(ToolError::Internal(err.into())),
        };
        match result {
            Ok((index, path, rendered)) => {
                debug!(path = %path, "wrote manifest");
                workspace.package_mut(index).manifest.mark_saved(rendered);
                written.push(path);
            }
            Err(err) => {
                tasks.abort_all();
                return Err(err);
            }
        }
    }
    written.sort();
    info!(count = written.len(), "manifests written");
    Ok(written)
}

/// Run the tool's install command in the workspace root.
pub async fn run_install(workspace: &WorkspaceSet, process: &dyn ProcessPort) -> Result<(), ToolError> {
    let spec = workspace.tool().install_command();
    info!(tool = %workspace.tool(), program = spec.program, "installing dependencies");
    let output = process
        .run(spec.program, &spec.args, RunOptions::in_dir(workspace.root_dir()))
        .await?;
    if !output.success() {
        let command = std::iter::once(spec.program.to_string())
            .chain(spec.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        return Err(ToolError::CommandFailed {
            command,
            exit_code: output.exit_code,
            stderr: output.stderr,
        });
    }
    Ok(())
}
