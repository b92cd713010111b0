//! posbridge console
//!
//! Plays the embedding POS page for the bridge: posted steps are written to
//! stdout as JSON lines, host messages and cashier actions are read from
//! stdin, and logs go to stderr.

mod actions;
mod config;
mod page;
mod shutdown;

use actions::Console;
use anyhow::Context;
use clap::Parser;
use config::{ConfigLoader, GatewaySettings};
use page::{ConsoleWindow, LogUi};
use posbridge_core::channel::HostChannel;
use posbridge_core::context::TransactionContext;
use posbridge_core::coordinator::{
    CoordinatorHandle, Phase, TransactionCoordinator, command_channel,
};
use posbridge_core::events::{FlowReporter, flow_event_channel};
use posbridge_sdk::client::GatewayClient;
use shutdown::shutdown_signal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// posbridge console - drive the payment bridge from a terminal
#[derive(Parser, Debug)]
#[command(name = "posbridge-console")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./posbridge.toml")]
    config: PathBuf,

    /// Launch query string (e.g., "amount=10.00&origin=https%3A%2F%2Fshop.test&register_id=r1")
    #[arg(short, long, default_value = "")]
    query: String,

    /// Override the gateway base URL
    #[arg(long, env = "POSBRIDGE_GATEWAY")]
    gateway: Option<Url>,

    /// Behave as a page that is not framed by a host
    #[arg(long, default_value = "false")]
    not_embedded: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting posbridge-console v{}", env!("CARGO_PKG_VERSION"));

    let config_loader = ConfigLoader::new(&args.config, args.gateway, args.not_embedded);
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let context = TransactionContext::extract(&args.query);
    tracing::info!(
        present = context.present_fields(),
        amount = ?context.amount,
        register_id = ?context.register_id,
        "Launch parameters parsed"
    );

    let target_origin = context
        .origin
        .clone()
        .or_else(|| loaded_config.host.default_origin.clone())
        .context("no target origin in launch parameters and host.default_origin is unset")?;

    let (event_tx, mut event_rx) = flow_event_channel();
    let reporter = FlowReporter::new(event_tx);

    let window = Arc::new(ConsoleWindow::stdout(loaded_config.host.embedded));
    let channel = HostChannel::new(window, &target_origin, reporter.clone())
        .with_context(|| format!("invalid target origin {target_origin:?}"))?;
    tracing::info!(target_origin = %channel.target_origin(), "Host channel ready");

    let gateway = build_gateway(&loaded_config.gateway)?;
    tracing::info!(base_url = %gateway.base_url(), "Gateway client ready");

    let coordinator_config = loaded_config.coordinator;
    let coordinator = TransactionCoordinator::new(
        context,
        channel.clone(),
        Arc::new(gateway),
        Arc::new(LogUi::new(loaded_config.templates_dir)),
        coordinator_config,
        reporter,
    );
    let phase_rx = coordinator.subscribe_phase();

    let (command_tx, command_rx) = command_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let coordinator_task = tokio::spawn(coordinator.run(command_rx, shutdown_rx));

    let events_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            tracing::warn!(event = %event, "Flow event");
        }
    });

    let console = Console::new(CoordinatorHandle::new(command_tx), channel);
    let grace = coordinator_config
        .decline_delay
        .max(coordinator_config.exit_delay);

    let input_done = async {
        console.run(BufReader::new(tokio::io::stdin())).await?;
        tracing::info!("Input closed, waiting for the attempt to finish");
        drain(phase_rx, grace).await;
        Ok::<(), std::io::Error>(())
    };

    tokio::select! {
        result = input_done => result.context("failed to read console input")?,
        _ = shutdown_signal() => {}
    }

    // Signal the coordinator to stop
    let _ = shutdown_tx.send(true);
    coordinator_task.await?;

    // The last reporter goes away with the console's channel handle.
    drop(console);
    events_task.await?;

    tracing::info!("Console shutdown complete");
    Ok(())
}

fn build_gateway(settings: &GatewaySettings) -> anyhow::Result<GatewayClient> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = settings.request_timeout {
        builder = builder.timeout(timeout);
    }
    let http = builder.build().context("failed to build HTTP client")?;
    Ok(GatewayClient::new(settings.base_url.clone()).with_http_client(http))
}

/// Wait until no attempt is in flight, then give a scheduled DECLINE or EXIT
/// time to go out.
async fn drain(mut phase_rx: watch::Receiver<Phase>, grace: Duration) {
    let settled = phase_rx
        .wait_for(|phase| matches!(phase, Phase::Idle | Phase::Terminal))
        .await
        .map(|phase| *phase);
    if let Ok(Phase::Terminal) = settled {
        tokio::time::sleep(grace).await;
    }
}

/// Initialize the tracing subscriber with environment-based filtering.
///
/// Logs go to stderr; stdout carries only posted steps.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper_util=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
