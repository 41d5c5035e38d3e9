//! Error types for webpub-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from binding store and configuration operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bindings document exists but is not valid JSON of a known shape.
    #[error("failed to parse bindings at {path}: {source}")]
    BindingsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error (bindings save path).
    #[error("bindings JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error on config load, with file path and serde_yaml's line context.
    #[error("failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// YAML serialization error (config save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.webpub/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The configuration file did not exist at the expected path.
    #[error("config not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// No configured environment carries the requested name.
    #[error("environment '{name}' is not configured (known: {known})")]
    UnknownEnvironment { name: String, known: String },

    /// Two configured environments share a name (case-insensitively).
    #[error("environment '{name}' is configured more than once")]
    DuplicateEnvironment { name: String },
}

/// Convenience constructor for [`CoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
