use crate::error::{DiscoveryError, DiscoveryResult};
use crate::globs::expand_globs;
use crate::packages::{Package, check_names, read_packages, read_packages_sync};
use crate::root::{MonorepoRoot, find_root, find_root_async};
use camino::Utf8Path;
use monofix_manifest::Manifest;
use monofix_types::Tool;
use std::collections::BTreeMap;
use tracing::info;

/// Key used for a root package that has no name.
pub const UNNAMED_ROOT_KEY: &str = "<root>";

/// Every package of one repository, addressable by name.
///
/// Iteration order is members sorted by directory, then the root.
#[derive(Debug, Clone)]
pub struct WorkspaceSet {
    tool: Tool,
    packages: Vec<Package>,
    keys: Vec<String>,
    by_name: BTreeMap<String, usize>,
    root_index: usize,
}

impl WorkspaceSet {
    /// Assemble a set from an already-read root and members.
    pub fn new(tool: Tool, root: Package, members: Vec<Package>) -> DiscoveryResult<Self> {
        let mut packages = members;
        packages.push(root);
        let root_index = packages.len() - 1;

        let mut keys = Vec::with_capacity(packages.len());
        let mut by_name = BTreeMap::new();
        let mut dirs_by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (idx, pkg) in packages.iter().enumerate() {
            let key = pkg.name().unwrap_or(UNNAMED_ROOT_KEY).to_string();
            dirs_by_name
                .entry(key.clone())
                .or_default()
                .push(pkg.manifest_label());
            by_name.insert(key.clone(), idx);
            keys.push(key);
        }
        if let Some((name, dirs)) = dirs_by_name.into_iter().find(|(_, d)| d.len() > 1) {
            return Err(DiscoveryError::DuplicateNames { name, dirs });
        }

        Ok(Self {
            tool,
            packages,
            keys,
            by_name,
            root_index,
        })
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn root(&self) -> &Package {
        &self.packages[self.root_index]
    }

    pub fn root_mut(&mut self) -> &mut Package {
        &mut self.packages[self.root_index]
    }

    pub fn root_index(&self) -> usize {
        self.root_index
    }

    pub fn root_dir(&self) -> &Utf8Path {
        &self.root().dir
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// All packages, root last.
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn packages_mut(&mut self) -> &mut [Package] {
        &mut self.packages
    }

    /// Packages other than the root.
    pub fn members(&self) -> impl Iterator<Item = &Package> {
        let root = self.root_index;
        self.packages
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != root)
            .map(|(_, p)| p)
    }

    pub fn get(&self, name: &str) -> Option<&Package> {
        self.by_name.get(name).map(|&i| &self.packages[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn package(&self, index: usize) -> &Package {
        &self.packages[index]
    }

    pub fn package_mut(&mut self, index: usize) -> &mut Package {
        &mut self.packages[index]
    }

    /// Name (or synthetic key) of the package at `index`.
    pub fn key(&self, index: usize) -> &str {
        &self.keys[index]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
}

fn root_package(root: &MonorepoRoot, manifest: Manifest) -> DiscoveryResult<Package> {
    let pkg = Package::new(&root.root_dir, manifest, true);
    if root.tool == Tool::Root {
        check_names(std::slice::from_ref(&pkg))?;
    }
    Ok(pkg)
}

/// Enumerate the packages of an already-resolved root.
pub async fn load_workspace(root: &MonorepoRoot) -> DiscoveryResult<WorkspaceSet> {
    let root_manifest = Manifest::load(&root.root_dir)?;
    let root_pkg = root_package(root, root_manifest)?;
    let members = if root.tool.is_monorepo() {
        let dirs = expand_globs(&root.root_dir, &root.globs)?;
        let members = read_packages(&root.root_dir, dirs).await?;
        check_names(&members)?;
        members
    } else {
        Vec::new()
    };
    info!(root = %root.root_dir, tool = %root.tool, members = members.len(), "discovered workspace");
    WorkspaceSet::new(root.tool, root_pkg, members)
}

/// Blocking counterpart of [`load_workspace`].
pub fn load_workspace_sync(root: &MonorepoRoot) -> DiscoveryResult<WorkspaceSet> {
    let root_manifest = Manifest::load(&root.root_dir)?;
    let root_pkg = root_package(root, root_manifest)?;
    let members = if root.tool.is_monorepo() {
        let dirs = expand_globs(&root.root_dir, &root.globs)?;
        let members = read_packages_sync(&root.root_dir, dirs)?;
        check_names(&members)?;
        members
    } else {
        Vec::new()
    };
    info!(root = %root.root_dir, tool = %root.tool, members = members.len(), "discovered workspace");
    WorkspaceSet::new(root.tool, root_pkg, members)
}

/// Find the root above `start` and enumerate its packages.
pub async fn discover(start: &Utf8Path) -> DiscoveryResult<WorkspaceSet> {
    let root = find_root_async(start).await?;
    load_workspace(&root).await
}

/// Blocking counterpart of [`discover`].
pub fn discover_sync(start: &Utf8Path) -> DiscoveryResult<WorkspaceSet> {
    let root = find_root(start)?;
    load_workspace_sync(&root)
}
