use monofix_discovery::DiscoveryError;
use monofix_manifest::ManifestError;
use thiserror::Error;

/// Pipeline failure. Every variant maps to exit code 1; a delegated
/// command's own exit code is returned as a value, not as an error.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("invalid \"{key}\" block in the root package.json: {source}")]
    Config {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("`{command}` failed with exit code {exit_code}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("no version found for tag {tag:?} of {name}")]
    UnknownTag { name: String, tag: String },

    #[error("could not query the registry for {name}: {message}")]
    Registry { name: String, message: String },

    #[error("no package matches {ident:?}; available packages:\n{}", list(.candidates))]
    NoPackageMatch { ident: String, candidates: Vec<String> },

    #[error("{ident:?} matches more than one package:\n{}", list(.candidates))]
    AmbiguousPackage { ident: String, candidates: Vec<String> },

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

fn list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("  - {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ToolError {
    pub fn exit_code(&self) -> u8 {
        1
    }
}
