//! `shipyard cert renew`

use std::path::Path;

use shipyard_cert::{AcmeRunner, DomainSet, Renewer};
use shipyard_tencent::SslAuthority;

use super::Context;

pub async fn renew(ctx: &Context, domains: &Path, force_acme: bool) -> anyhow::Result<()> {
    let domains = DomainSet::from_file(domains)?;
    let certificate = &ctx.config.certificate;

    let mut renewer = Renewer::from_config(SslAuthority::new(ctx.client()?), certificate);
    if force_acme && !certificate.run_acme {
        renewer = renewer.with_acme(AcmeRunner::from_config(certificate));
    }

    let report = renewer.renew_all(&domains).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    report.into_result()?;
    Ok(())
}
