//! Error types for webpub-sync.

use std::path::PathBuf;

use thiserror::Error;

use webpub_core::CoreError;
use webpub_remote::RemoteError;

/// All errors that can arise from publish operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the binding store or configuration.
    #[error("{0}")]
    Core(#[from] CoreError),

    /// An error from the Web API client.
    #[error("{0}")]
    Remote(#[from] RemoteError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (change cache).
    #[error("change cache JSON error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Directory traversal failure while enumerating a folder.
    #[error("cannot enumerate folder: {0}")]
    Walk(#[from] walkdir::Error),

    /// The target lies outside the folder its binding covers.
    #[error("{target} is not inside the bound folder {root}")]
    OutsideBinding { target: PathBuf, root: PathBuf },

    /// A folder binding was asked to publish its own root as a file.
    #[error("{path} is the bound folder itself; publish a file inside it")]
    BindingRoot { path: PathBuf },

    /// A file binding was asked to publish a different file.
    #[error("{target} does not match the bound file {bound}")]
    TargetMismatch { target: PathBuf, bound: PathBuf },

    /// The target exists but is not a regular file.
    #[error("{path} is not a regular file")]
    NotAFile { path: PathBuf },

    /// A folder publish was pointed at something that is not a directory.
    #[error("{path} is not a folder")]
    NotAFolder { path: PathBuf },

    /// The activation worker is gone.
    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    /// A batch worker task panicked or was aborted.
    #[error("publish worker failed: {0}")]
    Worker(String),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
