//! Error types for webpub-remote.

use thiserror::Error;

/// All errors that can arise while talking to the platform's Web API.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server answered with a non-2xx status.
    ///
    /// `code` and `message` come from the `{error:{code,message}}` envelope
    /// when present; `body` always holds the raw response text.
    #[error("{message} (HTTP {status})")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        correlation_id: Option<String>,
        body: String,
    },

    /// Connection, TLS or protocol failure below the HTTP status level.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// A 2xx response whose body does not match the endpoint's DTO.
    #[error("unexpected response shape from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// A 2xx response missing something the endpoint contract requires.
    #[error("unexpected response from {endpoint}: {reason}")]
    Protocol { endpoint: String, reason: String },

    /// The environment URL cannot be turned into a Web API base URL.
    #[error("invalid environment URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// An identifier that must be a GUID is not one.
    #[error("'{0}' is not a valid record id")]
    InvalidId(String),

    /// No usable bearer token for the environment.
    #[error("no credentials for environment '{environment}': set ${variable}")]
    MissingCredentials {
        environment: String,
        variable: String,
    },
}

impl RemoteError {
    /// HTTP status, when the failure came from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Api { status, .. } => Some(*status),
            RemoteError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Provider error code from the response envelope.
    pub fn code(&self) -> Option<&str> {
        match self {
            RemoteError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            RemoteError::Api { correlation_id, .. } => correlation_id.as_deref(),
            _ => None,
        }
    }

    /// Raw response body, kept for diagnostics.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            RemoteError::Api { body, .. } if !body.is_empty() => Some(body.as_str()),
            _ => None,
        }
    }
}
