use gossip_rs::{
    api::{config::GossipConfigBuilder, gossip::GossipCluster},
    Result,
};

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_level(true)
        .init();

    let config = GossipConfigBuilder::from_env()?.build();
    let cluster = GossipCluster::try_new(config).await?;
    cluster.run().await?;

    tokio::signal::ctrl_c().await?;
    cluster.shutdown();

    tracing::info!(
        "[{}] final status: {}",
        cluster.config().id(),
        cluster.status_json()?
    );

    Ok(())
}
