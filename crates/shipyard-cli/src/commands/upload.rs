//! `shipyard upload`

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use shipyard_core::config::required;
use shipyard_tencent::CosStore;
use shipyard_upload::Uploader;

use super::Context;

pub async fn upload(ctx: &Context, source: &Path, target: &str) -> anyhow::Result<()> {
    let upload = &ctx.config.upload;
    let region = required(&upload.region, "COS_REGION")?;
    let bucket = required(&upload.bucket, "COS_BUCKET")?;

    let store = CosStore::connect(&ctx.credential()?, &region, bucket).await;
    let report = Uploader::from_config(Arc::new(store), upload)
        .upload(source, target)
        .await?;
    info!(
        uploaded = report.uploaded.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "upload finished"
    );
    report.into_result()?;
    Ok(())
}
