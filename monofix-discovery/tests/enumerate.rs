use camino::{Utf8Path, Utf8PathBuf};
use monofix_discovery::{DiscoveryError, Package, discover, discover_sync};
use monofix_types::Tool;
use pretty_assertions::assert_eq;

fn fixture(name: &str) -> Utf8PathBuf {
    Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("workspace root")
        .join("tests/fixtures")
        .join(name)
        .join("repo")
}

fn names<'a>(pkgs: impl Iterator<Item = &'a Package>) -> Vec<String> {
    pkgs.map(|p| p.name().unwrap_or_default().to_string()).collect()
}

#[tokio::test]
async fn yarn_members_sorted_then_root() {
    let set = discover(&fixture("basic")).await.expect("discover");
    assert_eq!(set.tool(), Tool::Yarn);
    assert_eq!(
        names(set.packages().iter()),
        vec![
            "@monofix/basic-fixture-pkg-one",
            "@monofix/basic-fixture-pkg-two",
            "@monofix/basic-fixture",
        ]
    );
    assert!(set.root().is_root);
    assert_eq!(set.root().relative_dir.as_str(), "");
}

#[tokio::test]
async fn pnpm_negated_glob_excludes_package() {
    let set = discover(&fixture("basic-pnpm")).await.expect("discover");
    assert_eq!(set.tool(), Tool::Pnpm);
    assert!(set.get("@monofix/pnpm-ignored").is_none());
    assert_eq!(names(set.members()), vec!["@monofix/pnpm-pkg-one"]);
}

#[tokio::test]
async fn single_package_holds_only_the_root() {
    let set = discover(&fixture("single-pkg").join("src")).await.expect("discover");
    assert_eq!(set.tool(), Tool::Root);
    assert_eq!(set.len(), 1);
    assert_eq!(set.root().name(), Some("single-pkg"));
}

#[tokio::test]
async fn missing_names_reported_together_and_placeholder_dropped() {
    let err = discover(&fixture("missing-names")).await.unwrap_err();
    match err {
        DiscoveryError::MissingNames { paths } => assert_eq!(
            paths,
            vec!["packages/alpha/package.json", "packages/zeta/package.json"]
        ),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn sync_discovery_matches_async() {
    let sync = discover_sync(&fixture("basic-bolt")).expect("discover_sync");
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    let asynced = rt
        .block_on(discover(&fixture("basic-bolt")))
        .expect("discover");
    assert_eq!(sync.tool(), Tool::Bolt);
    assert_eq!(names(sync.packages().iter()), names(asynced.packages().iter()));
}

fn write_manifest(dir: &Utf8Path, body: &str) {
    fs_err::create_dir_all(dir).unwrap();
    fs_err::write(dir.join("package.json"), body).unwrap();
}

fn scratch_repo(globs: &str) -> (tempfile::TempDir, Utf8PathBuf) {
    let td = tempfile::tempdir().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).expect("utf8");
    write_manifest(
        &root,
        &format!(r#"{{ "name": "root", "private": true, "workspaces": [{globs}] }}"#),
    );
    (td, root)
}

#[test]
fn hidden_member_directories_are_not_packages() {
    let (_td, root) = scratch_repo(r#""packages/*""#);
    write_manifest(&root.join("packages/.template"), r#"{ "version": "0.0.0" }"#);
    write_manifest(&root.join("packages/a"), r#"{ "name": "a", "version": "1.0.0" }"#);

    let set = discover_sync(&root).expect("hidden template is skipped");
    assert_eq!(names(set.members()), vec!["a"]);
}

#[test]
fn brace_globs_select_each_alternative() {
    let (_td, root) = scratch_repo(r#""packages/{core,utils}""#);
    for name in ["core", "utils", "extra"] {
        write_manifest(
            &root.join("packages").join(name),
            &format!(r#"{{ "name": "{name}", "version": "1.0.0" }}"#),
        );
    }

    let set = discover_sync(&root).expect("discover_sync");
    assert_eq!(names(set.members()), vec!["core", "utils"]);
}
