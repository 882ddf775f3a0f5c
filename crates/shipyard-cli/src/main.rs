use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use shipyard_core::ShipyardConfig;
use shipyard_release::CancelSignal;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(
    name = "shipyard",
    about = "Shipyard: release serverless functions and their static assets",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to shipyard.toml. Environment variables override its values.
    #[arg(short, long, global = true, env = "SHIPYARD_CONFIG")]
    config: Option<PathBuf>,
    /// Log output format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Push new code to the function and cut an active revision.
    ///
    /// The new revision id is printed to stdout.
    Publish {
        #[command(subcommand)]
        artifact: ArtifactArgs,
    },
    /// Move the release alias to an already published revision, then clean up.
    Deploy {
        /// Revision to deploy (default: $SCF_DEPLOY_VERSION).
        revision: Option<String>,
    },
    /// Publish, deploy, and clean up in one run.
    Release {
        #[command(subcommand)]
        artifact: ArtifactArgs,
    },
    /// Delete revisions and concurrency allocations no alias still needs.
    Cleanup {
        /// The revision that must be kept.
        revision: String,
    },
    /// Upload a file or folder to the COS bucket.
    Upload {
        /// Local file or folder.
        source: PathBuf,
        /// Key (file) or key prefix (folder) in the bucket.
        target: String,
    },
    /// Point API gateways at new backends.
    Gateway {
        #[command(subcommand)]
        action: GatewayAction,
    },
    /// Certificate maintenance.
    Cert {
        #[command(subcommand)]
        action: CertAction,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Subcommand)]
pub enum ArtifactArgs {
    /// A container image from a personal registry.
    Image {
        repository: String,
        tag: String,
    },
    /// A zip package, at most 20 MiB.
    Zip { file: PathBuf },
}

#[derive(Subcommand)]
enum GatewayAction {
    /// Serve an API Gateway API from a COS bucket path.
    Cos {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        path: String,
    },
    /// Update a TSE cloud-native gateway service.
    Tse {
        /// Gateway service name.
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "https", value_parser = ["http", "https", "tcp", "udp"])]
        protocol: String,
        #[arg(long, default_value = "/")]
        path: String,
        /// Upstream type.
        #[arg(long = "type", value_parser = ["Kubernetes", "Registry", "IPList", "HostIP", "Scf"])]
        upstream: String,
        /// Upstream host or IP (HostIP).
        #[arg(long)]
        host: Option<String>,
        /// Upstream port (HostIP).
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum CertAction {
    /// Replace uploaded certificates whose local copy changed.
    Renew {
        /// JSON file mapping each domain to the resources bound to it.
        #[arg(long)]
        domains: PathBuf,
        /// Run acme.sh before comparing, regardless of configuration.
        #[arg(long)]
        acme: bool,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ShipyardConfig::load(cli.config.as_deref())?;

    let (cancel_tx, cancel) = CancelSignal::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping at the next poll");
            let _ = cancel_tx.send(true);
        }
    });

    let ctx = Context::new(config, cancel);

    match cli.command {
        Commands::Publish { artifact } => commands::release::publish(&ctx, artifact).await,
        Commands::Deploy { revision } => commands::release::deploy(&ctx, revision).await,
        Commands::Release { artifact } => commands::release::release(&ctx, artifact).await,
        Commands::Cleanup { revision } => commands::release::cleanup(&ctx, revision).await,
        Commands::Upload { source, target } => commands::upload::upload(&ctx, &source, &target).await,
        Commands::Gateway { action } => match action {
            GatewayAction::Cos { bucket, path } => commands::gateway::cos(&ctx, &bucket, &path).await,
            GatewayAction::Tse {
                name,
                protocol,
                path,
                upstream,
                host,
                port,
            } => commands::gateway::tse(&ctx, name, &protocol, path, &upstream, host, port).await,
        },
        Commands::Cert { action } => match action {
            CertAction::Renew { domains, acme } => commands::cert::renew(&ctx, &domains, acme).await,
        },
        Commands::Config => commands::show_config(&ctx),
    }
}
