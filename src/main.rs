use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use murmur::cli;
use murmur::node::Controller;
use murmur::settings::{self, RunMode};
use murmur::simulation::Simulation;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse args and env vars
    let settings = cli::Cli::parse().into_settings();
    settings.validate()?;
    info!(
        "Starting {} {} in {} mode",
        settings::APP_NAME,
        settings::APP_VERSION,
        settings.run_mode
    );

    match settings.run_mode {
        RunMode::Node => {
            let controller = Controller::bind(settings).await?;
            info!("Listening for gossip on {}", controller.node_id());
            let status = controller.run().await?;
            info!(
                "Left the group with {} members in view",
                status.members.len()
            );
        }
        RunMode::Simulate => {
            let mut simulation = Simulation::new(settings.simulation, settings.protocol)?;
            let report = simulation.run()?;
            info!("Simulation report: {}", serde_json::to_string(&report)?);
            println!(
                "ticks={} failed={} converged={} failures_detected={}",
                report.ticks,
                report.failed.len(),
                report.converged(),
                report.failures_detected()
            );
        }
    }

    Ok(())
}
