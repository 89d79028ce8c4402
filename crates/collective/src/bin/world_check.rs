//! World-check binary entry point
//!
//! Container entry for the dist pipeline steps: joins the rendezvous group
//! described by the environment and verifies the computed world size.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use collective::{verify_world_size, GroupConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "world_check=info,collective=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GroupConfig::from_env_or(GroupConfig::new(0, 1))?;
    tracing::info!(
        rank = config.rank,
        world_size = config.world_size,
        master = %config.master_endpoint(),
        "starting world-size check"
    );

    let computed = verify_world_size(&config).await?;
    tracing::info!(computed, "world size verified");
    Ok(())
}
