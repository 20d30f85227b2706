//! BDD harness (cucumber-rs).
//!
//! This crate keeps scenario tests isolated from the production crates. The
//! helpers here stage fixture repositories in scratch directories.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;

/// `tests/fixtures/<name>/repo` at the workspace root.
pub fn fixture_dir(name: &str) -> Utf8PathBuf {
    let manifest_dir = Utf8Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .unwrap_or(manifest_dir)
        .join("tests/fixtures")
        .join(name)
        .join("repo")
}

/// Copy the fixture repository `name` into `dest`.
pub fn stage_fixture(name: &str, dest: &Utf8Path) -> anyhow::Result<()> {
    copy_tree(&fixture_dir(name), dest).with_context(|| format!("stage fixture {name}"))
}

fn copy_tree(from: &Utf8Path, to: &Utf8Path) -> anyhow::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let src = Utf8PathBuf::try_from(entry.path())?;
        let Some(file_name) = src.file_name() else {
            continue;
        };
        let dst = to.join(file_name);
        if entry.file_type()?.is_dir() {
            copy_tree(&src, &dst)?;
        } else {
            fs::copy(&src, &dst)?;
        }
    }
    Ok(())
}
