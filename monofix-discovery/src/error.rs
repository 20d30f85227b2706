use camino::Utf8PathBuf;
use monofix_manifest::ManifestError;
use thiserror::Error;

/// Failures that stop a run before any rule executes.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no workspace root found above {start}")]
    NoRootFound { start: Utf8PathBuf },

    /// Every manifest lacking a `name`, relative to the root and sorted.
    #[error("the following package.jsons are missing the \"name\" field:\n{}", .paths.join("\n"))]
    MissingNames { paths: Vec<String> },

    #[error("package name {name:?} is declared by more than one package:\n{}", .dirs.join("\n"))]
    DuplicateNames { name: String, dirs: Vec<String> },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("io error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid yaml in {path}: {source}")]
    Yaml {
        path: Utf8PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid glob pattern {pattern:?}: {message}")]
    Glob { pattern: String, message: String },

    #[error("package read task failed: {0}")]
    Task(String),
}

impl DiscoveryError {
    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        DiscoveryError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
