//! Error types for monofix-manifest.
//!
//! `NotFound` is kept apart from other I/O failures: discovery treats a
//! missing manifest as "no package here", while any other failure is fatal.

use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    /// No `package.json` at the expected location.
    #[error("no manifest at {path}")]
    NotFound { path: Utf8PathBuf },

    /// The manifest exists but could not be read or written.
    #[error("io error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON.
    #[error("invalid json in {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The manifest is valid JSON but not an object.
    #[error("{path}: top-level value must be an object")]
    NotAnObject { path: Utf8PathBuf },

    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ManifestError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ManifestError::NotFound { .. })
    }

    /// Map an I/O error, separating out `NotFound`.
    pub fn from_io(path: Utf8PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            ManifestError::NotFound { path }
        } else {
            ManifestError::Io { path, source }
        }
    }
}

pub type ManifestResult<T> = Result<T, ManifestError>;
