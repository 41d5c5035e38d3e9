//! Request and response shapes, one per endpoint.
//!
//! Responses are parsed into these at the transport boundary; anything that
//! does not fit is a [`RemoteError::Decode`](crate::RemoteError::Decode).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generated id of a web resource record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Generated id of a package (solution) record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(pub String);

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PackageId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// `{ "value": [ ... ] }` envelope returned by every collection query.
#[derive(Debug, Deserialize)]
pub struct Collection<T> {
    pub value: Vec<T>,
}

/// `solutions?$select=solutionid,uniquename`
#[derive(Debug, Clone, Deserialize)]
pub struct SolutionRow {
    pub solutionid: PackageId,
    #[serde(default)]
    pub uniquename: Option<String>,
}

/// `webresourceset?$select=webresourceid,name`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebResourceRow {
    pub webresourceid: ResourceId,
    pub name: String,
}

/// `solutioncomponents?$select=solutioncomponentid`
#[derive(Debug, Clone, Deserialize)]
pub struct SolutionComponentRow {
    pub solutioncomponentid: String,
}

/// Body of a create with `Prefer: return=representation`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedWebResource {
    pub webresourceid: ResourceId,
}

/// Non-2xx body: `{ "error": { "code": "...", "message": "..." } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body of `POST webresourceset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewWebResource {
    pub name: String,
    pub displayname: String,
    /// Base64-encoded file content.
    pub content: String,
    pub webresourcetype: u8,
}

/// Body of `PATCH webresourceset(<id>)`.
#[derive(Debug, Clone, Serialize)]
pub struct WebResourceContentPatch {
    pub content: String,
}

/// Body of the `AddSolutionComponent` action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddSolutionComponentRequest {
    pub component_id: ResourceId,
    pub component_type: u32,
    pub solution_unique_name: String,
    pub add_required_components: bool,
}

/// Body of the `PublishXml` action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishXmlRequest {
    pub parameter_xml: String,
}

impl PublishXmlRequest {
    pub fn for_resources(ids: &[ResourceId]) -> Self {
        let items: String = ids
            .iter()
            .map(|id| format!("<webresource>{{{}}}</webresource>", id.0))
            .collect();
        Self {
            parameter_xml: format!(
                "<importexportxml><webresources>{items}</webresources></importexportxml>"
            ),
        }
    }
}
