use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop a hook before it reaches a verdict.
#[derive(Debug, Error)]
pub enum HookError {
    /// Stdin was empty or not the expected JSON. The runner allows silently.
    #[error("malformed hook input: {0}")]
    Input(#[from] serde_json::Error),
    /// The file under inspection could not be read. Non-blocking (exit 1).
    #[error("error reading file {}: {source}", path.display())]
    ReadTarget {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the best-effort audit log and operation memory.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serializing state: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| StoreError::Io { path, source }
    }
}
