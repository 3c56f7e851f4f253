use std::path::PathBuf;
use tessera_compiler::CompileError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ManifestError>;

/// Failures outside the compiler proper: reading manifests and running builders.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid manifest {}: {source}", path.display())]
    Json {
        path:   PathBuf,
        source: serde_json::Error,
    },

    #[error("Unknown builder {0:?}")]
    UnknownBuilder(String),

    #[error("Invalid parameter {name:?} for builder {builder:?}: {reason}")]
    InvalidParam {
        builder: String,
        name:    String,
        reason:  String,
    },

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error(transparent)]
    Compile(#[from] CompileError),
}
