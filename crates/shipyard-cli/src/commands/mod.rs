//! Subcommand implementations.

use anyhow::Context as _;

use shipyard_core::ShipyardConfig;
use shipyard_release::{CancelSignal, PollPolicy, ReleaseController, ReleaseSettings};
use shipyard_tencent::{Credential, ScfControlPlane, TencentClient};

pub mod cert;
pub mod gateway;
pub mod release;
pub mod upload;

/// Everything a command needs from the process.
pub struct Context {
    pub config: ShipyardConfig,
    pub cancel: CancelSignal,
}

impl Context {
    pub fn new(config: ShipyardConfig, cancel: CancelSignal) -> Self {
        Self { config, cancel }
    }

    pub fn credential(&self) -> anyhow::Result<Credential> {
        Credential::from_env().context("Tencent Cloud credentials are required")
    }

    pub fn client(&self) -> anyhow::Result<TencentClient> {
        Ok(TencentClient::new(self.credential()?)?)
    }

    /// A release controller for the configured function.
    pub fn controller(&self) -> anyhow::Result<ReleaseController<ScfControlPlane>> {
        let function = self.config.function_identity()?;
        let poll = PollPolicy::from_config(&self.config.poll)?;
        let plane = ScfControlPlane::new(self.client()?, function.clone());
        Ok(
            ReleaseController::new(function, plane, ReleaseSettings::from_config(&self.config.release))
                .with_poll_policy(poll)
                .with_cancel_signal(self.cancel.clone()),
        )
    }
}

pub fn show_config(ctx: &Context) -> anyhow::Result<()> {
    let rendered = ctx
        .config
        .to_toml_string()
        .context("failed to render configuration")?;
    print!("{rendered}");
    Ok(())
}
