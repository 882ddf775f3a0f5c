//! Serverless Cloud Function control plane.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use shipyard_core::{
    AliasRoute, Artifact, ConcurrencyAllocation, FunctionIdentity, ReadinessState, RevisionId,
};
use shipyard_release::{ControlPlane, ControlPlaneError, ControlPlaneResult};

use crate::client::{Service, TencentClient};
use crate::error::TencentResult;

const VERSION_PAGE: usize = 100;

/// [`ControlPlane`] for one SCF function.
#[derive(Debug, Clone)]
pub struct ScfControlPlane {
    client: TencentClient,
    function: FunctionIdentity,
}

impl ScfControlPlane {
    /// The client is pinned to the function's region.
    pub fn new(client: TencentClient, function: FunctionIdentity) -> Self {
        let client = client.with_region(function.region.clone());
        Self { client, function }
    }

    pub fn function(&self) -> &FunctionIdentity {
        &self.function
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, action: &str, fields: Value) -> TencentResult<T> {
        let request = function_request(&self.function, fields);
        self.client.call(Service::SCF, action, &request).await
    }
}

/// `fields` plus the `Namespace` and `FunctionName` every SCF call carries.
pub fn function_request(function: &FunctionIdentity, fields: Value) -> Value {
    let mut request = json!({
        "Namespace": function.namespace,
        "FunctionName": function.name,
    });
    if let (Some(target), Value::Object(extra)) = (request.as_object_mut(), fields) {
        target.extend(extra);
    }
    request
}

/// Body of `UpdateFunctionCode` for an artifact.
pub fn update_code_fields(artifact: &Artifact) -> Value {
    match artifact {
        Artifact::Image { repository, tag } => json!({
            "Code": {
                "ImageConfig": {
                    "ImageType": "personal",
                    "ImageUri": format!("{repository}:{tag}"),
                }
            }
        }),
        Artifact::Package { bytes } => json!({ "ZipFile": STANDARD.encode(bytes) }),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FunctionStatus {
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PublishedVersion {
    function_version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProvisionedConcurrency {
    #[serde(default)]
    allocated: Vec<Allocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Allocation {
    qualifier: String,
    #[serde(default)]
    allocated_provisioned_concurrency_num: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AliasList {
    #[serde(default)]
    aliases: Vec<Alias>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Alias {
    name: String,
    function_version: String,
    #[serde(default)]
    routing_config: Option<RoutingConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RoutingConfig {
    #[serde(default)]
    additional_version_weights: Vec<VersionWeight>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VersionWeight {
    version: String,
    weight: f64,
}

impl From<Alias> for AliasRoute {
    fn from(alias: Alias) -> Self {
        let additional = alias
            .routing_config
            .unwrap_or_default()
            .additional_version_weights
            .into_iter()
            .map(|w| (w.version, w.weight))
            .collect();
        AliasRoute {
            name: alias.name,
            revision: alias.function_version,
            additional,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VersionPage {
    #[serde(default)]
    function_version: Vec<String>,
    #[serde(default)]
    total_count: usize,
}

#[derive(Debug, Deserialize)]
struct Empty {}

impl ControlPlane for ScfControlPlane {
    async fn update_head_code(&self, artifact: &Artifact) -> ControlPlaneResult<()> {
        let _: Empty = self
            .call("UpdateFunctionCode", update_code_fields(artifact))
            .await?;
        Ok(())
    }

    async fn get_status(&self, qualifier: &str) -> ControlPlaneResult<ReadinessState> {
        let status: FunctionStatus = self
            .call(
                "GetFunction",
                json!({ "Qualifier": qualifier, "ShowCode": "FALSE" }),
            )
            .await?;
        debug!(function = %self.function, %qualifier, status = %status.status, "function status");
        Ok(ReadinessState::from_status(&status.status))
    }

    async fn publish_version(&self) -> ControlPlaneResult<RevisionId> {
        let published: PublishedVersion = self.call("PublishVersion", json!({})).await?;
        if published.function_version.is_empty() {
            return Err(ControlPlaneError::Malformed(
                "PublishVersion returned no version".to_string(),
            ));
        }
        Ok(RevisionId::new(published.function_version))
    }

    async fn put_concurrency(&self, qualifier: &str, units: u32) -> ControlPlaneResult<()> {
        let _: Empty = self
            .call(
                "PutProvisionedConcurrencyConfig",
                json!({
                    "Qualifier": qualifier,
                    "VersionProvisionedConcurrencyNum": units,
                }),
            )
            .await?;
        Ok(())
    }

    async fn get_concurrency(&self) -> ControlPlaneResult<Vec<ConcurrencyAllocation>> {
        let config: ProvisionedConcurrency = self
            .call("GetProvisionedConcurrencyConfig", json!({}))
            .await?;
        Ok(config
            .allocated
            .into_iter()
            .map(|a| ConcurrencyAllocation::new(a.qualifier, a.allocated_provisioned_concurrency_num))
            .collect())
    }

    async fn delete_concurrency(&self, qualifier: &str) -> ControlPlaneResult<()> {
        let _: Empty = self
            .call(
                "DeleteProvisionedConcurrencyConfig",
                json!({ "Qualifier": qualifier }),
            )
            .await?;
        Ok(())
    }

    async fn update_alias(&self, alias: &str, qualifier: &str) -> ControlPlaneResult<()> {
        let _: Empty = self
            .call(
                "UpdateAlias",
                json!({ "Name": alias, "FunctionVersion": qualifier }),
            )
            .await?;
        Ok(())
    }

    async fn list_aliases(&self) -> ControlPlaneResult<Vec<AliasRoute>> {
        let list: AliasList = self.call("ListAliases", json!({})).await?;
        Ok(list.aliases.into_iter().map(AliasRoute::from).collect())
    }

    async fn list_versions(&self) -> ControlPlaneResult<Vec<String>> {
        let mut versions = Vec::new();
        loop {
            let page: VersionPage = self
                .call(
                    "ListVersionByFunction",
                    json!({ "Offset": versions.len(), "Limit": VERSION_PAGE }),
                )
                .await?;
            let fetched = page.function_version.len();
            versions.extend(page.function_version);
            if fetched == 0 || versions.len() >= page.total_count {
                break;
            }
        }
        Ok(versions)
    }

    async fn delete_version(&self, qualifier: &str) -> ControlPlaneResult<()> {
        let _: Empty = self
            .call("DeleteFunction", json!({ "Qualifier": qualifier }))
            .await?;
        Ok(())
    }
}
