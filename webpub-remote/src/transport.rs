//! Authenticated request/response primitive.
//!
//! [`Transport`] is the seam between typed endpoint calls and the wire.
//! [`HttpTransport`] speaks OData-flavoured JSON over reqwest; tests plug in
//! recording fakes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use webpub_core::Environment;

use crate::auth::AccessToken;
use crate::dto::ErrorEnvelope;
use crate::error::RemoteError;

/// Response headers that carry the server-side correlation id, in order of
/// preference.
const CORRELATION_HEADERS: [&str; 3] = ["x-ms-service-request-id", "req_id", "request-id"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    /// `true` for verbs that change remote state.
    pub fn is_mutating(self) -> bool {
        !matches!(self, Method::Get)
    }
}

/// One Web API call. `path` is relative to the API root and already
/// URL-encoded, e.g. `webresourceset?$select=name&$filter=...`.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    /// Ask the server to echo the created/updated record.
    pub return_representation: bool,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
            return_representation: false,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
            return_representation: false,
        }
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Patch,
            path: path.into(),
            body: Some(body),
            return_representation: false,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: None,
            return_representation: false,
        }
    }

    pub fn returning_representation(mut self) -> Self {
        self.return_representation = true;
        self
    }

    /// Path without the query string, used to label errors.
    pub fn endpoint(&self) -> &str {
        self.path.split('?').next().unwrap_or(&self.path)
    }
}

/// A successful (2xx) response. Header names are lowercase.
#[derive(Debug, Clone, Default)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

impl ApiResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Parse the body into an endpoint DTO.
    pub fn json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, RemoteError> {
        let body = self.body.clone().ok_or_else(|| RemoteError::Protocol {
            endpoint: endpoint.to_string(),
            reason: "empty response body".to_string(),
        })?;
        serde_json::from_value(body).map_err(|source| RemoteError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

/// Sends one authenticated request. Non-2xx answers come back as
/// [`RemoteError::Api`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, RemoteError>;
}

/// Build the structured error for a non-2xx response.
///
/// Uses the `{error:{code,message}}` envelope when the body has one, and
/// falls back to the status line otherwise. The raw body is always kept.
pub fn api_error(status: u16, headers: &HashMap<String, String>, body: String) -> RemoteError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(&body).ok();
    let correlation_id = CORRELATION_HEADERS
        .iter()
        .find_map(|name| headers.get(*name).cloned());
    let (code, message) = match envelope {
        Some(envelope) => (envelope.error.code, envelope.error.message),
        None => (None, "request failed".to_string()),
    };
    RemoteError::Api {
        status,
        code,
        message,
        correlation_id,
        body,
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// reqwest-backed transport bound to one environment and one token.
#[derive(Clone)]
pub struct HttpTransport {
    base: Url,
    client: reqwest::Client,
    token: AccessToken,
}

impl HttpTransport {
    pub fn new(
        client: reqwest::Client,
        environment: &Environment,
        token: AccessToken,
    ) -> Result<Self, RemoteError> {
        Ok(Self {
            base: api_base_url(environment)?,
            client,
            token,
        })
    }
}

/// `<url>/api/data/<version>/` with a trailing slash so relative joins work.
pub fn api_base_url(environment: &Environment) -> Result<Url, RemoteError> {
    let root = environment.url.trim().trim_end_matches('/');
    let raw = format!("{root}/api/data/{}/", environment.api_version());
    let url = Url::parse(&raw).map_err(|e| RemoteError::InvalidUrl {
        url: environment.url.clone(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "https" | "http") {
        return Err(RemoteError::InvalidUrl {
            url: environment.url.clone(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, RemoteError> {
        let url = self
            .base
            .join(&request.path)
            .map_err(|e| RemoteError::InvalidUrl {
                url: request.path.clone(),
                reason: e.to_string(),
            })?;
        tracing::debug!(method = ?request.method, endpoint = request.endpoint(), "web api request");

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Patch => self.client.patch(url),
            Method::Delete => self.client.delete(url),
        };
        builder = builder
            .bearer_auth(self.token.secret())
            .header(ACCEPT, "application/json")
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0");
        if request.return_representation {
            builder = builder.header("Prefer", "return=representation");
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json; charset=utf-8")
                .json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let text = response.text().await?;

        if !(200..300).contains(&status) {
            let err = api_error(status, &headers, text);
            tracing::debug!(status, endpoint = request.endpoint(), error = %err, "web api error");
            return Err(err);
        }

        let body = if text.trim().is_empty() {
            None
        } else {
            Some(
                serde_json::from_str(&text).map_err(|source| RemoteError::Decode {
                    endpoint: request.endpoint().to_string(),
                    source,
                })?,
            )
        };
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

/// Turns an environment plus a token into a ready transport.
pub trait Connector: Send + Sync {
    fn connect(
        &self,
        environment: &Environment,
        token: AccessToken,
    ) -> Result<Arc<dyn Transport>, RemoteError>;
}

/// Production connector. Every transport it hands out shares one reqwest
/// connection pool.
#[derive(Clone, Default)]
pub struct HttpConnector {
    client: reqwest::Client,
}

impl HttpConnector {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Connector for HttpConnector {
    fn connect(
        &self,
        environment: &Environment,
        token: AccessToken,
    ) -> Result<Arc<dyn Transport>, RemoteError> {
        Ok(Arc::new(HttpTransport::new(
            self.client.clone(),
            environment,
            token,
        )?))
    }
}
