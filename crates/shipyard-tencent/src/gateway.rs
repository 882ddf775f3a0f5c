//! API Gateway and TSE cloud-native gateway updates.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::client::{Service, TencentClient};
use crate::error::{TencentError, TencentResult};

/// `DescribeApi` fields that `ModifyApi` accepts back unchanged.
const MODIFIABLE_API_FIELDS: &[&str] = &[
    "ServiceId",
    "ApiId",
    "ApiName",
    "ApiDesc",
    "ApiType",
    "AuthType",
    "AuthRequired",
    "Protocol",
    "EnableCORS",
    "RequestConfig",
    "RequestParameters",
    "ConstantParameters",
    "ServiceTimeout",
    "ServiceParameters",
    "ResponseType",
    "ResponseSuccessExample",
    "ResponseFailExample",
    "ResponseErrorCodes",
    "OauthConfig",
    "ApiBusinessType",
    "AuthRelationApiId",
    "IsBase64Encoded",
    "IsDebugAfterCharge",
    "TargetNamespaceId",
    "UserType",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribedApi {
    result: Value,
}

#[derive(Debug, Deserialize)]
struct Empty {}

/// A single API on an API Gateway service.
#[derive(Debug, Clone)]
pub struct ApiGateway {
    client: TencentClient,
    service_id: String,
    api_id: String,
}

impl ApiGateway {
    pub fn new(client: TencentClient, service_id: impl Into<String>, api_id: impl Into<String>) -> Self {
        Self {
            client,
            service_id: service_id.into(),
            api_id: api_id.into(),
        }
    }

    /// Serve the API from a COS bucket path, then release the service.
    pub async fn route_to_cos(&self, bucket: &str, path: &str) -> TencentResult<()> {
        let described: DescribedApi = self
            .client
            .call(
                Service::API_GATEWAY,
                "DescribeApi",
                &json!({ "ServiceId": self.service_id, "ApiId": self.api_id }),
            )
            .await?;

        let request = cos_backend_request(&described.result, bucket, path)?;
        let _: Empty = self
            .client
            .call(Service::API_GATEWAY, "ModifyApi", &request)
            .await?;
        info!(service_id = %self.service_id, api_id = %self.api_id, bucket, path, "updated API backend");

        let _: Empty = self
            .client
            .call(
                Service::API_GATEWAY,
                "ReleaseService",
                &json!({
                    "ServiceId": self.service_id,
                    "EnvironmentName": "release",
                    "ReleaseDesc": format!("Route API {} to COS {bucket}{path}", self.api_id),
                }),
            )
            .await?;
        info!(service_id = %self.service_id, "released API gateway service");
        Ok(())
    }
}

/// `ModifyApi` body: the described API with its backend replaced by COS.
pub fn cos_backend_request(described: &Value, bucket: &str, path: &str) -> TencentResult<Value> {
    let Value::Object(api) = described else {
        return Err(TencentError::Malformed("DescribeApi result is not an object".to_string()));
    };

    let mut request: Map<String, Value> = MODIFIABLE_API_FIELDS
        .iter()
        .filter_map(|field| {
            api.get(*field)
                .filter(|v| !v.is_null())
                .map(|v| (field.to_string(), v.clone()))
        })
        .collect();
    request.insert("ServiceType".to_string(), json!("COS"));
    request.insert(
        "ServiceConfig".to_string(),
        json!({
            "CosConfig": {
                "Action": "GetObject",
                "BucketName": bucket,
                "Authorization": true,
                "PathMatchMode": "FullPath",
            },
            "Path": path,
        }),
    );
    Ok(Value::Object(request))
}

/// Upstream of a TSE gateway service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upstream {
    HostIp { host: String, port: u16 },
    Kubernetes,
    Registry,
    IpList,
    Scf,
}

impl Upstream {
    pub fn type_name(&self) -> &'static str {
        match self {
            Upstream::HostIp { .. } => "HostIP",
            Upstream::Kubernetes => "Kubernetes",
            Upstream::Registry => "Registry",
            Upstream::IpList => "IPList",
            Upstream::Scf => "Scf",
        }
    }

    /// Parse an upstream type name, with host and port for `HostIP`.
    pub fn parse(kind: &str, host: Option<String>, port: Option<u16>) -> TencentResult<Self> {
        match kind {
            "HostIP" => match (host, port) {
                (Some(host), Some(port)) => Ok(Upstream::HostIp { host, port }),
                _ => Err(TencentError::Unsupported(
                    "HostIP upstream needs both host and port".to_string(),
                )),
            },
            "Kubernetes" => Ok(Upstream::Kubernetes),
            "Registry" => Ok(Upstream::Registry),
            "IPList" => Ok(Upstream::IpList),
            "Scf" => Ok(Upstream::Scf),
            other => Err(TencentError::Unsupported(format!("upstream type {other}"))),
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::HostIp { host, port } => write!(f, "HostIP {host}:{port}"),
            other => f.write_str(other.type_name()),
        }
    }
}

/// Protocol of a TSE gateway service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    Http,
    #[default]
    Https,
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl FromStr for Protocol {
    type Err = TencentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            "tcp" => Ok(Protocol::Tcp),
            "udp" => Ok(Protocol::Udp),
            other => Err(TencentError::Unsupported(format!("protocol {other}"))),
        }
    }
}

/// Desired state of one TSE gateway service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TseService {
    pub name: String,
    pub protocol: Protocol,
    pub path: String,
    pub upstream: Upstream,
}

impl TseService {
    /// `ModifyCloudNativeAPIGatewayService` body. Only `HostIP` upstreams
    /// can be expressed.
    pub fn request(&self, gateway_id: &str) -> TencentResult<Value> {
        let Upstream::HostIp { host, port } = &self.upstream else {
            return Err(TencentError::Unsupported(format!(
                "{} upstreams cannot be updated yet",
                self.upstream.type_name()
            )));
        };
        Ok(json!({
            "GatewayId": gateway_id,
            "Name": self.name,
            "Protocol": self.protocol.as_str(),
            "Path": self.path,
            "UpstreamType": "HostIP",
            "UpstreamInfo": { "Host": host, "Port": port },
        }))
    }
}

/// A TSE cloud-native API gateway.
#[derive(Debug, Clone)]
pub struct TseGateway {
    client: TencentClient,
    gateway_id: String,
}

impl TseGateway {
    pub fn new(client: TencentClient, gateway_id: impl Into<String>) -> Self {
        Self {
            client,
            gateway_id: gateway_id.into(),
        }
    }

    pub async fn modify_service(&self, service: &TseService) -> TencentResult<()> {
        let request = service.request(&self.gateway_id)?;
        let _: Empty = self
            .client
            .call(Service::TSE, "ModifyCloudNativeAPIGatewayService", &request)
            .await?;
        info!(
            gateway_id = %self.gateway_id,
            service = %service.name,
            upstream = %service.upstream,
            "updated gateway service"
        );
        Ok(())
    }
}
