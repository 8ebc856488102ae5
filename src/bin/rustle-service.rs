use anyhow::{Context, Result};
use clap::Parser;
use rustle_service::cli::{execute, print_failure, print_outcome, ServiceCli};
use rustle_service::config::DaemonSettings;
use rustle_service::platform::{create_controller, service_descriptor, PlatformKind};
use rustle_service::service_managers::ControllerContext;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ServiceCli::parse();

    // Initialize tracing
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    debug!("Starting rustle-service v{}", env!("CARGO_PKG_VERSION"));

    let settings = match &cli.config {
        Some(path) => DaemonSettings::load(path)
            .await
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => DaemonSettings::default(),
    };

    let ctx = ControllerContext::from_settings(&settings);
    let kind = PlatformKind::detect(&ctx.root);
    let descriptor = service_descriptor(kind, &settings)
        .context("Failed to describe the current executable")?;
    info!(
        service = descriptor.service_name(),
        platform = %kind,
        verb = cli.command.name(),
        "dispatching"
    );

    let controller = create_controller(kind, descriptor, &ctx);
    match execute(controller.as_ref(), &cli.command).await {
        Ok(outcome) => {
            print_outcome(controller.service_name(), outcome);
            Ok(())
        }
        Err(e) => {
            print_failure(cli.command.name(), controller.service_name(), &e);
            std::process::exit(1);
        }
    }
}
