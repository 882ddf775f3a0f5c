//! `shipyard publish | deploy | release | cleanup`

use anyhow::bail;
use tracing::info;

use shipyard_core::{Artifact, RevisionId};
use shipyard_release::CleanupReport;

use super::Context;
use crate::ArtifactArgs;

fn load_artifact(args: ArtifactArgs) -> anyhow::Result<Artifact> {
    let artifact = match args {
        ArtifactArgs::Image { repository, tag } => Artifact::image(repository, tag),
        ArtifactArgs::Zip { file } => Artifact::package_from_file(&file)?,
    };
    Ok(artifact)
}

fn log_cleanup(report: &CleanupReport) {
    info!(
        allocations = report.deleted_allocations.len(),
        revisions = report.deleted_revisions.len(),
        failures = report.failures.len(),
        "cleanup finished"
    );
}

pub async fn publish(ctx: &Context, args: ArtifactArgs) -> anyhow::Result<()> {
    let artifact = load_artifact(args)?;
    let mut controller = ctx.controller()?;
    let revision = controller.publish(&artifact).await?;
    println!("{revision}");
    Ok(())
}

pub async fn deploy(ctx: &Context, revision: Option<String>) -> anyhow::Result<()> {
    let Some(revision) = revision.or_else(|| ctx.config.release.version.clone()) else {
        bail!("no revision given and SCF_DEPLOY_VERSION is not set");
    };
    let mut controller = ctx.controller()?;
    let outcome = controller.promote(RevisionId::new(revision)).await?;
    log_cleanup(&outcome.cleanup);
    outcome.cleanup.into_result()?;
    Ok(())
}

pub async fn release(ctx: &Context, args: ArtifactArgs) -> anyhow::Result<()> {
    let artifact = load_artifact(args)?;
    let mut controller = ctx.controller()?;
    let outcome = controller.publish_and_deploy(&artifact).await?;
    println!("{}", outcome.revision);
    log_cleanup(&outcome.cleanup);
    outcome.cleanup.into_result()?;
    Ok(())
}

pub async fn cleanup(ctx: &Context, revision: String) -> anyhow::Result<()> {
    let mut controller = ctx.controller()?;
    let report = controller.cleanup(&RevisionId::new(revision)).await?;
    log_cleanup(&report);
    report.into_result()?;
    Ok(())
}
