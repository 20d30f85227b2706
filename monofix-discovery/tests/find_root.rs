use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use monofix_discovery::{MonorepoRoot, find_root, find_root_async};
use monofix_types::Tool;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn fixture(name: &str) -> Utf8PathBuf {
    Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("workspace root")
        .join("tests/fixtures")
        .join(name)
        .join("repo")
}

fn both(start: &Utf8Path) -> (MonorepoRoot, MonorepoRoot) {
    let sync = find_root(start).expect("find_root");
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    let asynced = rt.block_on(find_root_async(start)).expect("find_root_async");
    (sync, asynced)
}

fn assert_root(start: Utf8PathBuf, root: &Utf8Path, tool: Tool) {
    let (sync, asynced) = both(&start);
    assert_eq!(sync, asynced, "sync and async walks must agree");
    assert_eq!(sync.tool, tool);
    assert_eq!(sync.root_dir, root);
}

#[test]
fn yarn_root_from_nested_source_dir() {
    let root = fixture("basic");
    assert_root(root.join("packages/package-one/src"), &root, Tool::Yarn);
}

#[test]
fn lerna_root() {
    let root = fixture("basic-lerna");
    assert_root(root.join("packages/package-one/src"), &root, Tool::Lerna);
}

#[test]
fn pnpm_root() {
    let root = fixture("basic-pnpm");
    assert_root(root.join("packages/package-one/src"), &root, Tool::Pnpm);
}

#[test]
fn bolt_root() {
    let root = fixture("basic-bolt");
    assert_root(root.join("packages/package-one/src"), &root, Tool::Bolt);
}

#[test]
fn single_package_root() {
    let root = fixture("single-pkg");
    assert_root(root.join("src"), &root, Tool::Root);
}

#[test]
fn stray_lerna_markers_are_passed_over() {
    let root = fixture("stray-lerna");
    assert_root(root.join("packages/package-one/src"), &root, Tool::Yarn);
}

#[test]
fn relative_segments_in_start_are_resolved() {
    let root = fixture("basic");
    let start = root.join("packages/package-one/../package-two/src");
    assert_root(start, &root, Tool::Yarn);
}

fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let td = tempfile::tempdir().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).expect("utf8");
    (td, root)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// One signature at depth `d`: every start below it resolves to it,
    /// whatever plain manifests sit in between.
    #[test]
    fn signature_found_from_any_depth(
        above in 0usize..3,
        below in 0usize..5,
        plain_manifests in proptest::collection::vec(any::<bool>(), 5),
    ) {
        let (_td, tmp) = temp_root();
        let mut root = tmp.clone();
        for i in 0..above {
            root.push(format!("up{i}"));
        }
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("package.json"), r#"{"name":"r","workspaces":["packages/*"]}"#).unwrap();

        let mut start = root.join("packages");
        for i in 0..below {
            start.push(format!("d{i}"));
            fs::create_dir_all(&start).unwrap();
            if plain_manifests[i] {
                fs::write(start.join("package.json"), format!(r#"{{"name":"p{i}"}}"#)).unwrap();
            }
        }
        fs::create_dir_all(&start).unwrap();

        let (sync, asynced) = both(&start);
        prop_assert_eq!(&sync, &asynced);
        prop_assert_eq!(sync.tool, Tool::Yarn);
        prop_assert_eq!(sync.root_dir, root);
    }
}
