//! Typed Web API operations on top of a [`Transport`].

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::dto::{
    AddSolutionComponentRequest, Collection, CreatedWebResource, NewWebResource, PackageId,
    PublishXmlRequest, ResourceId, SolutionComponentRow, SolutionRow, WebResourceContentPatch,
    WebResourceRow,
};
use crate::error::RemoteError;
use crate::transport::{ApiRequest, ApiResponse, Transport};

const WEB_RESOURCES: &str = "webresourceset";
const SOLUTIONS: &str = "solutions";
const SOLUTION_COMPONENTS: &str = "solutioncomponents";

/// Cheap to clone: all clones share one transport.
#[derive(Clone)]
pub struct WebApiClient {
    transport: Arc<dyn Transport>,
}

impl WebApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, RemoteError> {
        self.transport.send(request).await
    }

    /// Id of the package whose unique name is `unique_name`, if any.
    pub async fn find_package_id(&self, unique_name: &str) -> Result<Option<PackageId>, RemoteError> {
        let path = format!(
            "{SOLUTIONS}?$select=solutionid,uniquename&$filter={}",
            encode_filter(&format!("uniquename eq {}", string_literal(unique_name)))
        );
        let rows: Collection<SolutionRow> = self.send(ApiRequest::get(path)).await?.json(SOLUTIONS)?;
        Ok(rows.value.into_iter().next().map(|row| row.solutionid))
    }

    /// Every web resource whose unique name equals `name`.
    ///
    /// The platform is supposed to keep names unique; callers must still treat
    /// more than one row as an ambiguity rather than pick one.
    pub async fn find_resources_by_name(
        &self,
        name: &str,
    ) -> Result<Vec<WebResourceRow>, RemoteError> {
        let path = format!(
            "{WEB_RESOURCES}?$select=webresourceid,name&$filter={}",
            encode_filter(&format!("name eq {}", string_literal(name)))
        );
        let rows: Collection<WebResourceRow> =
            self.send(ApiRequest::get(path)).await?.json(WEB_RESOURCES)?;
        Ok(rows.value)
    }

    /// Create a web resource and return its generated id.
    ///
    /// Reads the id from the echoed representation, falling back to the
    /// `OData-EntityId` header for servers that ignore `Prefer`.
    pub async fn create_resource(&self, resource: &NewWebResource) -> Result<ResourceId, RemoteError> {
        let body = to_body(WEB_RESOURCES, resource)?;
        let response = self
            .send(ApiRequest::post(WEB_RESOURCES, body).returning_representation())
            .await?;

        if response.body.is_some() {
            let created: CreatedWebResource = response.json(WEB_RESOURCES)?;
            return Ok(created.webresourceid);
        }
        response
            .header("odata-entityid")
            .and_then(id_from_entity_url)
            .map(ResourceId)
            .ok_or_else(|| RemoteError::Protocol {
                endpoint: WEB_RESOURCES.to_string(),
                reason: "create response carried neither a body nor OData-EntityId".to_string(),
            })
    }

    /// Replace the content of an existing web resource.
    pub async fn update_resource_content(
        &self,
        id: &ResourceId,
        content: String,
    ) -> Result<(), RemoteError> {
        let path = format!("{WEB_RESOURCES}({})", guid(&id.0)?);
        let body = to_body(WEB_RESOURCES, &WebResourceContentPatch { content })?;
        self.send(ApiRequest::patch(path, body)).await?;
        Ok(())
    }

    pub async fn delete_resource(&self, id: &ResourceId) -> Result<(), RemoteError> {
        let path = format!("{WEB_RESOURCES}({})", guid(&id.0)?);
        self.send(ApiRequest::delete(path)).await?;
        Ok(())
    }

    /// `true` when `object_id` is already declared a component of `package`.
    pub async fn membership_exists(
        &self,
        component_type: u32,
        object_id: &ResourceId,
        package: &PackageId,
    ) -> Result<bool, RemoteError> {
        let filter = format!(
            "componenttype eq {component_type} and objectid eq {} and _solutionid_value eq {}",
            guid(&object_id.0)?,
            guid(&package.0)?
        );
        let path = format!(
            "{SOLUTION_COMPONENTS}?$select=solutioncomponentid&$filter={}",
            encode_filter(&filter)
        );
        let rows: Collection<SolutionComponentRow> = self
            .send(ApiRequest::get(path))
            .await?
            .json(SOLUTION_COMPONENTS)?;
        Ok(!rows.value.is_empty())
    }

    /// Declare `object_id` a component of the package named `package_unique_name`.
    pub async fn add_package_component(
        &self,
        component_type: u32,
        object_id: &ResourceId,
        package_unique_name: &str,
    ) -> Result<(), RemoteError> {
        let body = to_body(
            "AddSolutionComponent",
            &AddSolutionComponentRequest {
                component_id: object_id.clone(),
                component_type,
                solution_unique_name: package_unique_name.to_string(),
                add_required_components: false,
            },
        )?;
        self.send(ApiRequest::post("AddSolutionComponent", body)).await?;
        Ok(())
    }

    /// Make the uploaded content of `ids` live.
    ///
    /// The backend rejects overlapping calls for one session; route every call
    /// through a single serialized queue.
    pub async fn activate(&self, ids: &[ResourceId]) -> Result<(), RemoteError> {
        for id in ids {
            guid(&id.0)?;
        }
        let body = to_body("PublishXml", &PublishXmlRequest::for_resources(ids))?;
        self.send(ApiRequest::post("PublishXml", body)).await?;
        Ok(())
    }
}

fn to_body<T: Serialize>(endpoint: &str, value: &T) -> Result<Value, RemoteError> {
    serde_json::to_value(value).map_err(|source| RemoteError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// OData string literal: single-quoted, embedded quotes doubled.
fn string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn encode_filter(filter: &str) -> String {
    urlencoding::encode(filter).into_owned()
}

/// Accept `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`, optionally braced.
fn guid(value: &str) -> Result<&str, RemoteError> {
    let trimmed = value.trim_start_matches('{').trim_end_matches('}');
    let groups: Vec<&str> = trimmed.split('-').collect();
    let shape_ok = groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()));
    if shape_ok {
        Ok(trimmed)
    } else {
        Err(RemoteError::InvalidId(value.to_string()))
    }
}

/// `https://org/api/data/v9.2/webresourceset(<id>)` → `<id>`
fn id_from_entity_url(url: &str) -> Option<String> {
    let start = url.rfind('(')?;
    let end = url[start..].find(')')? + start;
    let id = &url[start + 1..end];
    guid(id).ok().map(str::to_string)
}
