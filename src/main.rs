use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trendcast::config::Config;
use trendcast::services::{
    FeatureAssembler, LogSink, PredictionScheduler, RandomForestModel, SqliteSink,
};
use trendcast::sources::PriceFeed;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trendcast=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };
    info!(
        "Starting Trendcast: {} {} ({:?} feed, {:?} schema)",
        config.exchange, config.pair, config.feed_mode, config.feature_schema
    );

    let assembler = FeatureAssembler::new(config.feature_schema, config.price_change);

    // The classifier must load before any fetch happens
    let classifier =
        match RandomForestModel::load(&config.classifier_path, &assembler.column_names()) {
            Ok(classifier) => classifier,
            Err(e) => {
                error!(
                    "Failed to load classifier from {:?}: {}",
                    config.classifier_path, e
                );
                return Err(e.into());
            }
        };

    let feed = PriceFeed::from_config(&config);
    let mut scheduler = PredictionScheduler::new(
        feed,
        assembler,
        Box::new(classifier),
        config.prediction_interval(),
    )
    .with_sink(Box::new(LogSink));

    if let Some(ref path) = config.sqlite_path {
        match SqliteSink::new(path) {
            Ok(sink) => scheduler = scheduler.with_sink(Box::new(sink)),
            Err(e) => warn!("SQLite sink disabled ({:?}): {}", path, e),
        }
    }

    if config.seed_history {
        scheduler.seed_history().await;
    }

    // Ctrl-C stops the loop
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            // Keep the sender alive so the scheduler keeps running
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
        let _ = shutdown_tx.send(());
    });

    scheduler.run(shutdown_rx).await;

    Ok(())
}
