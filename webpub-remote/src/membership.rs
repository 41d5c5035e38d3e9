//! Package (solution) membership.

use webpub_core::PackageName;

use crate::client::WebApiClient;
use crate::dto::{PackageId, ResourceId};
use crate::error::RemoteError;

/// Solution component type code for web resources.
pub const WEB_RESOURCE_COMPONENT_TYPE: u32 = 61;

/// A package that exists on the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageRef {
    /// The built-in pseudo-package every record implicitly belongs to.
    Default,
    Named { id: PackageId, unique_name: String },
}

/// What [`PackageMembership::ensure_member`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Added,
    AlreadyMember,
    /// Target is the default pseudo-package; nothing to declare.
    Implicit,
}

#[derive(Clone)]
pub struct PackageMembership {
    client: WebApiClient,
}

impl PackageMembership {
    pub fn new(client: WebApiClient) -> Self {
        Self { client }
    }

    /// Resolve `name` to a package. `Ok(None)` means the server has no such
    /// package; the default pseudo-package always resolves without a call.
    pub async fn resolve_package(
        &self,
        name: &PackageName,
    ) -> Result<Option<PackageRef>, RemoteError> {
        if name.is_default() {
            return Ok(Some(PackageRef::Default));
        }
        let id = self.client.find_package_id(name.0.trim()).await?;
        Ok(id.map(|id| PackageRef::Named {
            id,
            unique_name: name.0.trim().to_string(),
        }))
    }

    /// Declare `resource` a member of `package` unless it already is.
    ///
    /// Check-then-add is not atomic; two concurrent callers for the same
    /// resource may both add, which the server tolerates as an upsert.
    pub async fn ensure_member(
        &self,
        package: &PackageRef,
        resource: &ResourceId,
    ) -> Result<MembershipChange, RemoteError> {
        let PackageRef::Named { id, unique_name } = package else {
            return Ok(MembershipChange::Implicit);
        };
        if self
            .client
            .membership_exists(WEB_RESOURCE_COMPONENT_TYPE, resource, id)
            .await?
        {
            return Ok(MembershipChange::AlreadyMember);
        }
        self.client
            .add_package_component(WEB_RESOURCE_COMPONENT_TYPE, resource, unique_name)
            .await?;
        tracing::debug!(package = %unique_name, resource = %resource, "added package component");
        Ok(MembershipChange::Added)
    }
}
