//! # Currency Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Build the Frankfurter client with a per-attempt timeout
//! - Create the shared resilience policy, cache and rate service
//! - Start the HTTP server

mod config;

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use currency_hex::{
    RateService, cache::RateCache, inbound::HttpServer, resilience::ResiliencePolicy,
};
use exchange_rates::FrankfurterClient;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "info,currency_app=debug,currency_hex=debug,exchange_rates=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = config::Config::from_env()?;
    init_tracing(config.json_logs);

    tracing::info!("Starting currency server on port {}", config.port);
    tracing::info!(
        upstream = %config.frankfurter_base_url,
        timeout_secs = config.upstream_timeout.as_secs(),
        "Using rate provider"
    );

    let http = reqwest::Client::builder()
        .timeout(config.upstream_timeout)
        .build()?;
    let provider = FrankfurterClient::with_http_client(&config.frankfurter_base_url, http);

    // One policy and one cache for the whole process
    let policy = Arc::new(ResiliencePolicy::default());
    let cache = Arc::new(RateCache::with_config(config.cache.clone()));
    let service = RateService::new(provider, policy, cache);

    let server = HttpServer::with_rate_limit(service, config.rate_limit_per_minute);
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    Ok(())
}
