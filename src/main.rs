use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_pipeline::config::AppConfig;
use order_pipeline::messaging::{EventConsumer, RedpandaClient, RedpandaSubscriber};
use order_pipeline::metrics::{self, Metrics};
use order_pipeline::pricing::HttpPricingClient;
use order_pipeline::service::OrderService;
use order_pipeline::store::PostgresOrderStore;
use order_pipeline::utils::{retry_with_backoff, RetryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_pipeline=debug"))
        )
        .init();

    tracing::info!("🚀 Starting order pipeline");

    let config = AppConfig::from_env()?;

    // === 1. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let system = actix_web::rt::System::new();
        if let Err(e) = system.block_on(metrics::start_metrics_server(metrics_registry, metrics_port)) {
            tracing::error!(error = %e, "Metrics server error");
        }
    });

    // === 2. Order store (Postgres may still be starting) ===
    tracing::info!("Connecting to Postgres...");
    let store = retry_with_backoff(RetryConfig::default(), |_attempt| {
        PostgresOrderStore::connect(&config.database_url, config.database_max_connections)
    })
    .await
    .into_result()?;
    store.ensure_schema().await?;

    // === 3. Bus and catalog clients ===
    let publisher = Arc::new(RedpandaClient::new(&config.kafka_brokers, config.publish_timeout)?);
    let pricing = Arc::new(HttpPricingClient::new(&config.catalog_url, config.catalog_timeout)?);

    let service = Arc::new(
        OrderService::new(pricing, Arc::new(store), publisher, metrics.clone())
            .with_topic(config.order_created_topic.clone()),
    );

    // === 4. Consumer loop, started once ===
    let subscriber = RedpandaSubscriber::new(&config.kafka_brokers);
    let mut consumer = EventConsumer::new(metrics.clone());
    consumer
        .start(
            &subscriber,
            &config.order_created_topic,
            &config.consumer_group,
            service.clone(),
        )
        .await?;

    tracing::info!(
        topic = %config.order_created_topic,
        group_id = %config.consumer_group,
        "Order pipeline running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    consumer.stop().await;

    tracing::info!("👋 Order pipeline stopped");
    Ok(())
}
