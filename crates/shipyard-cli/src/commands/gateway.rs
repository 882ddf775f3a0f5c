//! `shipyard gateway cos | tse`

use shipyard_core::config::required;
use shipyard_tencent::{ApiGateway, Protocol, TseGateway, TseService, Upstream};

use super::Context;

pub async fn cos(ctx: &Context, bucket: &str, path: &str) -> anyhow::Result<()> {
    let gateway = &ctx.config.gateway;
    let region = required(&gateway.region, "API_GATEWAY_REGION")?;
    let service_id = required(&gateway.service_id, "API_GATEWAY_SERVICE_ID")?;
    let api_id = required(&gateway.api_id, "API_GATEWAY_API_ID")?;

    let client = ctx.client()?.with_region(region);
    ApiGateway::new(client, service_id, api_id)
        .route_to_cos(bucket, path)
        .await?;
    Ok(())
}

pub async fn tse(
    ctx: &Context,
    name: String,
    protocol: &str,
    path: String,
    upstream: &str,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let gateway = &ctx.config.gateway;
    let service = TseService {
        name,
        protocol: protocol.parse::<Protocol>()?,
        path,
        upstream: Upstream::parse(upstream, host, port)?,
    };
    let region = required(&gateway.region, "API_GATEWAY_REGION")?;
    let gateway_id = required(&gateway.tse_gateway_id, "API_GATEWAY_ID")?;

    let client = ctx.client()?.with_region(region);
    TseGateway::new(client, gateway_id)
        .modify_service(&service)
        .await?;
    Ok(())
}
