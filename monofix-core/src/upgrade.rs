//! `upgrade`: move every consumer of a package (or of every package in a
//! scope) to a new version.

use crate::error::ToolError;
use crate::pipeline::{run_install, write_manifests};
use crate::ports::{ProcessPort, RegistryPort};
use crate::settings::UpgradeSettings;
use camino::Utf8PathBuf;
use monofix_discovery::WorkspaceSet;
use monofix_domain::ranges::{is_valid_range, range_type};
use monofix_types::DependencyKind;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::{OnceCell, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Registry queries in flight.
pub const REGISTRY_CONCURRENCY: usize = 8;

type TagsResult = Result<BTreeMap<String, String>, String>;

/// Memoized dist-tag lookups: each name hits the registry at most once, and
/// at most [`REGISTRY_CONCURRENCY`] lookups run at a time.
pub struct DistTagCache {
    registry: Arc<dyn RegistryPort>,
    permits: Semaphore,
    entries: Mutex<HashMap<String, Arc<OnceCell<TagsResult>>>>,
}

impl DistTagCache {
    pub fn new(registry: Arc<dyn RegistryPort>) -> Self {
        Self {
            registry,
            permits: Semaphore::new(REGISTRY_CONCURRENCY),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn cell(&self, name: &str) -> Arc<OnceCell<TagsResult>> {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(entries.entry(name.to_string()).or_default())
    }

    pub async fn dist_tags(&self, name: &str) -> Result<BTreeMap<String, String>, ToolError> {
        let cell = self.cell(name);
        let result = cell
            .get_or_init(|| async {
                let _permit = self.permits.acquire().await.map_err(|e| e.to_string())?;
                debug!(name, "querying registry");
                self.registry
                    .query_dist_tags(name)
                    .await
                    .map_err(|e| format!("{e:#}"))
            })
            .await;
        result.clone().map_err(|message| ToolError::Registry {
            name: name.to_string(),
            message,
        })
    }

    /// Version behind `tag` for `name`.
    pub async fn resolve(&self, name: &str, tag: &str) -> Result<String, ToolError> {
        self.dist_tags(name)
            .await?
            .get(tag)
            .cloned()
            .ok_or_else(|| ToolError::UnknownTag {
                name: name.to_string(),
                tag: tag.to_string(),
            })
    }
}

/// Which dependency names an upgrade request covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeTarget {
    Package(String),
    /// `@scope` or `@scope/`: every `@scope/...` package.
    Scope(String),
}

impl UpgradeTarget {
    pub fn parse(name: &str) -> Self {
        if let Some(scope) = name.strip_prefix('@') {
            let scope = scope.strip_suffix('/').unwrap_or(scope);
            if !scope.is_empty() && !scope.contains('/') {
                return UpgradeTarget::Scope(format!("@{scope}/"));
            }
        }
        UpgradeTarget::Package(name.to_string())
    }

    pub fn matches(&self, dependency: &str) -> bool {
        match self {
            UpgradeTarget::Package(name) => dependency == name,
            UpgradeTarget::Scope(prefix) => dependency.starts_with(prefix.as_str()),
        }
    }
}

/// One rewritten dependency range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeUpdate {
    pub package: String,
    pub kind: DependencyKind,
    pub dependency: String,
    pub from: String,
    pub to: String,
}

/// Outcome of `run_upgrade`.
#[derive(Debug)]
pub struct UpgradeReport {
    pub updates: Vec<RangeUpdate>,
    pub written: Vec<Utf8PathBuf>,
    pub installed: bool,
}

/// Every dependency name in the workspace that `target` covers.
fn matched_dependencies(workspace: &WorkspaceSet, target: &UpgradeTarget) -> BTreeSet<String> {
    workspace
        .packages()
        .iter()
        .flat_map(|pkg| {
            DependencyKind::ALL
                .into_iter()
                .flat_map(move |kind| pkg.manifest.dependency_entries(kind))
        })
        .filter(|(dep, _)| target.matches(dep))
        .map(|(dep, _)| dep.to_string())
        .collect()
}

/// Resolve `tag` for every name, [`REGISTRY_CONCURRENCY`] at a time.
async fn resolve_all(
    cache: Arc<DistTagCache>,
    names: &BTreeSet<String>,
    tag: &str,
) -> Result<BTreeMap<String, String>, ToolError> {
    let mut tasks = JoinSet::new();
    for name in names {
        let cache = Arc::clone(&cache);
        let name = name.clone();
        let tag = tag.to_string();
        tasks.spawn(async move {
            let version = cache.resolve(&name, &tag).await?;
            Ok::<_, ToolError>((name, version))
        });
    }
    let mut resolved = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        let result = match joined {
            Ok(result) => result,
            Err(err) => Err(ToolError::Internal(err.into())),
        };
        match result {
            Ok((name, version)) => {
                resolved.insert(name, version);
            }
            Err(err) => {
                tasks.abort_all();
                return Err(err);
            }
        }
    }
    Ok(resolved)
}

/// Rewrite every matching range in place. With `explicit` the request is
/// written verbatim; otherwise the resolved version keeps the old range type.
fn apply_versions(
    workspace: &mut WorkspaceSet,
    target: &UpgradeTarget,
    versions: &BTreeMap<String, String>,
    explicit: Option<&str>,
) -> Vec<RangeUpdate> {
    let mut updates = Vec::new();
    for index in 0..workspace.len() {
        let package = workspace.key(index).to_string();
        let manifest = &mut workspace.package_mut(index).manifest;
        for kind in DependencyKind::ALL {
            let matched: Vec<(String, String)> = manifest
                .dependency_entries(kind)
                .into_iter()
                .filter(|(dep, _)| target.matches(dep))
                .map(|(dep, range)| (dep.to_string(), range.to_string()))
                .collect();
            for (dependency, from) in matched {
                let to = match (explicit, versions.get(&dependency)) {
                    (Some(range), _) => range.to_string(),
                    (None, Some(version)) => format!("{}{version}", range_type(&from)),
                    (None, None) => continue,
                };
                if to == from {
                    continue;
                }
                manifest.set_dependency(kind, &dependency, &to);
                updates.push(RangeUpdate {
                    package: package.clone(),
                    kind,
                    dependency,
                    from,
                    to,
                });
            }
        }
    }
    updates
}

/// Upgrade every consumer of `settings.name`, persist and install.
pub async fn run_upgrade(
    mut workspace: WorkspaceSet,
    settings: &UpgradeSettings,
    registry: Arc<dyn RegistryPort>,
    process: Arc<dyn ProcessPort>,
) -> Result<UpgradeReport, ToolError> {
    let target = UpgradeTarget::parse(&settings.name);
    let names = matched_dependencies(&workspace, &target);
    if names.is_empty() {
        warn!(name = %settings.name, "no package depends on it");
        return Ok(UpgradeReport {
            updates: Vec::new(),
            written: Vec::new(),
            installed: false,
        });
    }

    let explicit = is_valid_range(&settings.tag).then_some(settings.tag.as_str());
    let versions = match explicit {
        Some(_) => BTreeMap::new(),
        None => resolve_all(Arc::new(DistTagCache::new(registry)), &names, &settings.tag).await?,
    };

    let updates = apply_versions(&mut workspace, &target, &versions, explicit);
    info!(updates = updates.len(), "ranges rewritten");
    let written = write_manifests(&mut workspace).await?;
    let installed = if !updates.is_empty() && settings.install {
        run_install(&workspace, process.as_ref()).await?;
        true
    } else {
        false
    };
    Ok(UpgradeReport {
        updates,
        written,
        installed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryRegistry;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn scope_prefixes_parse() {
        assert_eq!(UpgradeTarget::parse("@babel"), UpgradeTarget::Scope("@babel/".into()));
        assert_eq!(UpgradeTarget::parse("@babel/"), UpgradeTarget::Scope("@babel/".into()));
        assert_eq!(
            UpgradeTarget::parse("@babel/core"),
            UpgradeTarget::Package("@babel/core".into())
        );
        assert_eq!(UpgradeTarget::parse("react"), UpgradeTarget::Package("react".into()));
        assert!(UpgradeTarget::parse("@babel").matches("@babel/core"));
        assert!(!UpgradeTarget::parse("@babel").matches("@babelx/core"));
    }

    struct Counting {
        inner: InMemoryRegistry,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RegistryPort for Counting {
        async fn query_dist_tags(&self, name: &str) -> anyhow::Result<BTreeMap<String, String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.query_dist_tags(name).await
        }
    }

    #[tokio::test]
    async fn cache_queries_each_name_once() {
        let registry = Arc::new(Counting {
            inner: InMemoryRegistry::new().with_tag("react", "latest", "18.3.1"),
            calls: AtomicUsize::new(0),
        });
        let cache = DistTagCache::new(registry.clone());
        assert_eq!(cache.resolve("react", "latest").await.unwrap(), "18.3.1");
        assert_eq!(cache.resolve("react", "latest").await.unwrap(), "18.3.1");
        assert!(matches!(
            cache.resolve("react", "canary").await,
            Err(ToolError::UnknownTag { .. })
        ));
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn registry_failures_are_typed() {
        let cache = DistTagCache::new(Arc::new(InMemoryRegistry::new()));
        assert!(matches!(
            cache.resolve("ghost", "latest").await,
            Err(ToolError::Registry { .. })
        ));
    }
}
