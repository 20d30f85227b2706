use serde::{Deserialize, Serialize};
use std::fmt;

/// A dependency category of a package manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyKind {
    Dependencies,
    DevDependencies,
    OptionalDependencies,
    PeerDependencies,
}

impl DependencyKind {
    /// Categories that end up installed.
    pub const NORMAL: [DependencyKind; 3] = [
        DependencyKind::Dependencies,
        DependencyKind::DevDependencies,
        DependencyKind::OptionalDependencies,
    ];

    pub const ALL: [DependencyKind; 4] = [
        DependencyKind::Dependencies,
        DependencyKind::DevDependencies,
        DependencyKind::OptionalDependencies,
        DependencyKind::PeerDependencies,
    ];

    /// The manifest key holding this category.
    pub fn key(self) -> &'static str {
        match self {
            DependencyKind::Dependencies => "dependencies",
            DependencyKind::DevDependencies => "devDependencies",
            DependencyKind::OptionalDependencies => "optionalDependencies",
            DependencyKind::PeerDependencies => "peerDependencies",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
