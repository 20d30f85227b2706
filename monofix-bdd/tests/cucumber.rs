use assert_cmd::Command;
use camino::Utf8PathBuf;
use cucumber::{World, given, then, when};
use fs_err as fs;
use monofix_bdd::stage_fixture;
use monofix_cli::explain::RULE_REGISTRY;
use std::collections::BTreeMap;
use tempfile::TempDir;

#[derive(Debug, Default, World)]
pub struct MonofixWorld {
    temp: Option<TempDir>,
    repo_root: Option<Utf8PathBuf>,
    /// Manifest contents captured before the last command.
    snapshots: BTreeMap<String, String>,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

fn repo_root(world: &MonofixWorld) -> &Utf8PathBuf {
    world.repo_root.as_ref().expect("repo_root set")
}

fn read_manifest(world: &MonofixWorld, rel: &str) -> serde_json::Value {
    let path = repo_root(world).join(rel);
    let contents = fs::read_to_string(&path).unwrap();
    serde_json::from_str(&contents).unwrap()
}

fn run_monofix(world: &mut MonofixWorld, args: &[&str]) {
    let root = repo_root(world).clone();
    let output = Command::cargo_bin("monofix")
        .expect("monofix binary")
        .current_dir(root.as_str())
        .args(args)
        .output()
        .expect("run monofix");
    world.exit_code = output.status.code();
    world.stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    world.stderr = String::from_utf8_lossy(&output.stderr).into_owned();
}

// ============================================================================
// Repositories
// ============================================================================

#[given(expr = "the {string} fixture repository")]
async fn fixture_repo(world: &mut MonofixWorld, name: String) {
    let td = tempfile::tempdir().expect("tempdir");
    let root = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
    stage_fixture(&name, &root).unwrap();

    for rel in manifests(&root) {
        let contents = fs::read_to_string(root.join(&rel)).unwrap();
        world.snapshots.insert(rel, contents);
    }
    world.temp = Some(td);
    world.repo_root = Some(root);
}

/// Relative paths of the root manifest and every `packages/*` manifest.
fn manifests(root: &Utf8PathBuf) -> Vec<String> {
    let mut out = vec!["package.json".to_string()];
    if let Ok(entries) = fs::read_dir(root.join("packages")) {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = format!("packages/{name}/package.json");
            if root.join(&rel).is_file() {
                out.push(rel);
            }
        }
    }
    out.sort();
    out
}

#[given(expr = "the root manifest ignores {string}")]
async fn root_ignores(world: &mut MonofixWorld, rule: String) {
    let path = repo_root(world).join("package.json");
    let mut root = read_manifest(world, "package.json");
    root["monofix"] = serde_json::json!({ "ignoredRules": [rule] });
    fs::write(&path, serde_json::to_string_pretty(&root).unwrap() + "\n").unwrap();
}

#[given(expr = "a member {string} named {string}")]
async fn member_named(world: &mut MonofixWorld, rel: String, name: String) {
    let dir = repo_root(world).join(&rel);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("package.json"),
        serde_json::to_string_pretty(&serde_json::json!({ "name": name, "version": "1.0.0" }))
            .unwrap()
            + "\n",
    )
    .unwrap();
}

// ============================================================================
// Commands
// ============================================================================

#[when(expr = "I run monofix {string}")]
async fn run_command(world: &mut MonofixWorld, args: String) {
    let args: Vec<&str> = args.split_whitespace().collect();
    run_monofix(world, &args);
}

#[when(expr = "I run monofix exec with script {string}")]
async fn run_exec_script(world: &mut MonofixWorld, script: String) {
    run_monofix(world, &["exec", "sh", "-c", &script]);
}

// ============================================================================
// Outcomes
// ============================================================================

#[then(expr = "the exit code is {int}")]
async fn assert_exit_code(world: &mut MonofixWorld, expected: i32) {
    assert_eq!(
        world.exit_code,
        Some(expected),
        "stdout:\n{}\nstderr:\n{}",
        world.stdout,
        world.stderr
    );
}

#[then(expr = "stdout contains {string}")]
async fn assert_stdout_contains(world: &mut MonofixWorld, needle: String) {
    assert!(
        world.stdout.contains(&needle),
        "expected {needle:?} in stdout, got:\n{}",
        world.stdout
    );
}

#[then(expr = "stdout does not contain {string}")]
async fn assert_stdout_lacks(world: &mut MonofixWorld, needle: String) {
    assert!(
        !world.stdout.contains(&needle),
        "unexpected {needle:?} in stdout:\n{}",
        world.stdout
    );
}

#[then(expr = "stderr contains {string}")]
async fn assert_stderr_contains(world: &mut MonofixWorld, needle: String) {
    assert!(
        world.stderr.contains(&needle),
        "expected {needle:?} in stderr, got:\n{}",
        world.stderr
    );
}

#[then("stdout lists every rule key")]
async fn assert_every_rule_listed(world: &mut MonofixWorld) {
    for rule in RULE_REGISTRY {
        assert!(world.stdout.contains(rule.key), "{} missing:\n{}", rule.key, world.stdout);
    }
}

#[then(expr = "{string} depends on {string} at {string}")]
async fn assert_dependency(world: &mut MonofixWorld, rel: String, dep: String, range: String) {
    let manifest = read_manifest(world, &rel);
    assert_eq!(
        manifest["dependencies"][&dep].as_str(),
        Some(range.as_str()),
        "{rel}: {manifest:#}"
    );
}

#[then(expr = "{string} has a dev dependency on {string} at {string}")]
async fn assert_dev_dependency(world: &mut MonofixWorld, rel: String, dep: String, range: String) {
    let manifest = read_manifest(world, &rel);
    assert_eq!(
        manifest["devDependencies"][&dep].as_str(),
        Some(range.as_str()),
        "{rel}: {manifest:#}"
    );
}

#[then(expr = "{string} has no dev dependency on {string}")]
async fn assert_no_dev_dependency(world: &mut MonofixWorld, rel: String, dep: String) {
    let manifest = read_manifest(world, &rel);
    assert!(manifest["devDependencies"].get(&dep).is_none(), "{rel}: {manifest:#}");
}

#[then(expr = "{string} has no {string} field")]
async fn assert_no_field(world: &mut MonofixWorld, rel: String, field: String) {
    let manifest = read_manifest(world, &rel);
    assert!(manifest.get(&field).is_none(), "{rel}: {manifest:#}");
}

#[then(expr = "the repository of {string} is {string}")]
async fn assert_repository(world: &mut MonofixWorld, rel: String, url: String) {
    let manifest = read_manifest(world, &rel);
    assert_eq!(manifest["repository"].as_str(), Some(url.as_str()), "{rel}");
}

#[then(expr = "the dependency keys of {string} are {string}")]
async fn assert_dependency_order(world: &mut MonofixWorld, rel: String, keys: String) {
    let manifest = read_manifest(world, &rel);
    let got: Vec<&str> = manifest["dependencies"]
        .as_object()
        .map(|deps| deps.keys().map(String::as_str).collect())
        .unwrap_or_default();
    let expected: Vec<&str> = keys.split(',').map(str::trim).collect();
    assert_eq!(got, expected, "{rel}");
}

#[then("no manifest changed")]
async fn assert_unchanged(world: &mut MonofixWorld) {
    let root = repo_root(world).clone();
    for (rel, before) in &world.snapshots {
        let now = fs::read_to_string(root.join(rel)).unwrap();
        assert_eq!(&now, before, "{rel} changed");
    }
}

#[tokio::main]
async fn main() {
    let features_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("features");
    MonofixWorld::cucumber().run_and_exit(features_path).await;
}
