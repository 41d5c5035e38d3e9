//! # webpub-remote
//!
//! Client for the platform's OData-style Web API: the [`Transport`] seam and
//! its reqwest implementation, typed endpoint calls, package membership and
//! bearer credentials.

pub mod auth;
pub mod client;
pub mod dto;
pub mod error;
pub mod membership;
pub mod transport;

pub use auth::{AccessToken, AuthContext, EnvTokenProvider, StaticTokenProvider, TokenProvider};
pub use client::WebApiClient;
pub use dto::{NewWebResource, PackageId, ResourceId, WebResourceRow};
pub use error::RemoteError;
pub use membership::{MembershipChange, PackageMembership, PackageRef};
pub use transport::{
    api_error, ApiRequest, ApiResponse, Connector, HttpConnector, HttpTransport, Method,
    Transport,
};
