//! Workspace discovery for JavaScript monorepos.
//!
//! Two phases, both fatal on failure:
//! 1. root search ([`find_root`] / [`find_root_async`]): walk upward from a
//!    starting directory until a directory matches a workspace signature;
//! 2. enumeration ([`load_workspace`]): expand the root's member globs and
//!    read every member manifest into a [`WorkspaceSet`].
//!
//! Nothing in this crate writes to disk.

mod error;
mod globs;
mod packages;
mod root;
mod signature;
mod workspace;

pub use error::{DiscoveryError, DiscoveryResult};
pub use globs::expand_globs;
pub use packages::{FS_CONCURRENCY, Package, check_names, read_packages, read_packages_sync};
pub use root::{MonorepoRoot, RootWalk, Step, find_root, find_root_async};
pub use signature::{DirSnapshot, LERNA_FILE, PNPM_WORKSPACE_FILE, ToolSignature, match_signature};
pub use workspace::{
    UNNAMED_ROOT_KEY, WorkspaceSet, discover, discover_sync, load_workspace, load_workspace_sync,
};
