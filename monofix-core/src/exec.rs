//! `exec` and `run`: delegate commands to package directories.

use crate::error::ToolError;
use crate::ports::{ProcessPort, RunOptions};
use anyhow::anyhow;
use camino::Utf8PathBuf;
use monofix_discovery::{Package, WorkspaceSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Package commands in flight during `exec`.
pub const EXEC_CONCURRENCY: usize = 4;

/// Directories `exec` runs in: every member, or the root of a single-package repo.
fn exec_dirs(workspace: &WorkspaceSet) -> Vec<Utf8PathBuf> {
    if workspace.tool().is_monorepo() {
        workspace.members().map(|p| p.dir.clone()).collect()
    } else {
        vec![workspace.root_dir().to_path_buf()]
    }
}

/// Run `argv` in every package directory and return the highest exit code.
pub async fn run_exec(
    workspace: &WorkspaceSet,
    argv: &[String],
    process: Arc<dyn ProcessPort>,
) -> Result<i32, ToolError> {
    let Some((command, args)) = argv.split_first() else {
        return Err(ToolError::Internal(anyhow!("exec needs a command to run")));
    };
    let dirs = exec_dirs(workspace);
    info!(command = %command, packages = dirs.len(), "exec");

    let permits = Arc::new(Semaphore::new(EXEC_CONCURRENCY));
    let mut tasks = JoinSet::new();
    for dir in dirs {
        let permits = Arc::clone(&permits);
        let process = Arc::clone(&process);
        let command = command.clone();
        let args = args.to_vec();
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| ToolError::Internal(e.into()))?;
            let output = process.run(&command, &args, RunOptions::in_dir(dir.clone())).await?;
            debug!(dir = %dir, exit_code = output.exit_code, "exec finished");
            Ok::<_, ToolError>(output.exit_code)
        });
    }

    let mut highest = 0;
    while let Some(joined) = tasks.join_next().await {
        let result = match joined {
            Ok(result) => result,
            Err(err) => Err(ToolError::Internal(err.into())),
        };
        match result {
            Ok(code) => highest = highest.max(code),
            Err(err) => {
                tasks.abort_all();
                return Err(err);
            }
        }
    }
    Ok(highest)
}

/// Pick the package `ident` names.
///
/// An exact name or relative directory wins; otherwise `ident` must be a
/// substring of exactly one package's name or relative directory.
pub fn select_package<'a>(workspace: &'a WorkspaceSet, ident: &str) -> Result<&'a Package, ToolError> {
    let packages = workspace.packages();
    let exact = packages
        .iter()
        .find(|p| p.name() == Some(ident) || (!ident.is_empty() && p.relative_dir.as_str() == ident));
    if let Some(pkg) = exact {
        return Ok(pkg);
    }

    let matches: Vec<&Package> = packages
        .iter()
        .filter(|p| {
            p.name().is_some_and(|n| n.contains(ident))
                || (!p.relative_dir.as_str().is_empty() && p.relative_dir.as_str().contains(ident))
        })
        .collect();
    match matches.as_slice() {
        [only] => Ok(*only),
        [] => Err(ToolError::NoPackageMatch {
            ident: ident.to_string(),
            candidates: describe(packages.iter()),
        }),
        many => Err(ToolError::AmbiguousPackage {
            ident: ident.to_string(),
            candidates: describe(many.iter().copied()),
        }),
    }
}

fn describe<'a>(packages: impl Iterator<Item = &'a Package>) -> Vec<String> {
    packages
        .map(|p| match p.name() {
            Some(name) if !p.relative_dir.as_str().is_empty() => format!("{name} ({})", p.relative_dir),
            Some(name) => name.to_string(),
            None => p.manifest_label(),
        })
        .collect()
}

/// Run a package script through the tool's script runner; returns its exit code.
pub async fn run_script(
    workspace: &WorkspaceSet,
    ident: &str,
    script_args: &[String],
    process: Arc<dyn ProcessPort>,
) -> Result<i32, ToolError> {
    let pkg = select_package(workspace, ident)?;
    let spec = workspace.tool().script_command(script_args);
    info!(package = %pkg.dir, program = spec.program, "running script");
    let output = process
        .run(spec.program, &spec.args, RunOptions::in_dir(pkg.dir.clone()))
        .await?;
    Ok(output.exit_code)
}
