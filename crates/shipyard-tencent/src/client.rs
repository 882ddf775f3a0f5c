//! Signed JSON client for Tencent Cloud APIs.

use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::credential::Credential;
use crate::error::{TencentError, TencentResult};
use crate::signer::{self, CONTENT_TYPE, SigningInput};

/// A Tencent Cloud product and the API version shipyard speaks to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Service {
    pub name: &'static str,
    pub version: &'static str,
}

impl Service {
    pub const SCF: Service = Service {
        name: "scf",
        version: "2018-04-16",
    };
    pub const SSL: Service = Service {
        name: "ssl",
        version: "2019-12-05",
    };
    pub const API_GATEWAY: Service = Service {
        name: "apigateway",
        version: "2018-08-08",
    };
    pub const TSE: Service = Service {
        name: "tse",
        version: "2020-12-07",
    };

    pub fn host(&self) -> String {
        format!("{}.tencentcloudapi.com", self.name)
    }
}

#[derive(Debug, Clone)]
pub struct TencentClient {
    http: HttpClient,
    credential: Credential,
    region: Option<String>,
}

impl TencentClient {
    pub fn new(credential: Credential) -> TencentResult<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            credential,
            region: None,
        })
    }

    /// Send `X-TC-Region` with every request.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Call `action` on `service` and decode the `Response` body.
    pub async fn call<Req, Resp>(&self, service: Service, action: &str, request: &Req) -> TencentResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(request)?;
        let host = service.host();
        let timestamp = chrono::Utc::now().timestamp();
        let authorization = signer::authorization(
            &self.credential,
            &SigningInput {
                service: service.name,
                host: &host,
                action,
                payload: &payload,
                timestamp,
            },
        )?;

        let mut builder = self
            .http
            .post(format!("https://{host}/"))
            .header("Authorization", authorization)
            .header("Content-Type", CONTENT_TYPE)
            .header("Host", &host)
            .header("X-TC-Action", action)
            .header("X-TC-Timestamp", timestamp.to_string())
            .header("X-TC-Version", service.version);
        if let Some(region) = &self.region {
            builder = builder.header("X-TC-Region", region);
        }
        if let Some(token) = &self.credential.token {
            builder = builder.header("X-TC-Token", token);
        }

        debug!(service = service.name, action, "calling Tencent Cloud API");
        let body = builder.body(payload).send().await?.bytes().await?;
        parse_response(&body)
    }
}

/// Unwrap the `{"Response": {...}}` envelope, turning an `Error` into
/// [`TencentError::Api`].
pub fn parse_response<T: DeserializeOwned>(body: &[u8]) -> TencentResult<T> {
    let mut envelope: Value = serde_json::from_slice(body)?;
    let response = envelope
        .get_mut("Response")
        .map(Value::take)
        .ok_or_else(|| TencentError::Malformed("missing Response object".to_string()))?;

    if let Some(error) = response.get("Error") {
        let field = |name: &str| {
            error
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        return Err(TencentError::Api {
            code: field("Code"),
            message: field("Message"),
            request_id: response
                .get("RequestId")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    Ok(serde_json::from_value(response)?)
}
