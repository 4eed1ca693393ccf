use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wvwlink::server::{
    config::Config,
    platform::http::HttpPlatform,
    startup::{self, Engine},
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let http = match startup::build_http_client(&config) {
        Ok(http) => http,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    let platform = Arc::new(HttpPlatform::new(
        http,
        &config.platform_api_url,
        &config.platform_token,
    ));

    let engine = match Engine::start(&config, platform).await {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };

    info!("wvwlink is running, press Ctrl+C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }

    if let Err(e) = engine.shutdown().await {
        error!("Shutdown failed: {}", e);
    }
}
