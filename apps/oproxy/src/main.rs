use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use oproxy_core::Core;
use oproxy_provider_core::Provider;
use oproxy_provider_impl::OllamaProvider;
use tracing::info;

mod cli;
mod config;

use crate::cli::Cli;
use crate::config::GlobalConfig;

const DEFAULT_LOG_FILTER: &str = "oproxy=info,oproxy_core=info,oproxy_provider_impl=info";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = match GlobalConfig::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("oproxy failed to load config: {err}");
            std::process::exit(2);
        }
    };
    init_tracing(config.log_json);
    if let Err(err) = run(config).await {
        eprintln!("oproxy failed: {err}");
        std::process::exit(1);
    }
}

async fn run(config: GlobalConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!(
        host = %config.host,
        port = config.port,
        upstream = %config.upstream,
        log_json = config.log_json,
        "config loaded"
    );

    let provider: Arc<dyn Provider> = Arc::new(OllamaProvider::new(config.upstream.clone()));
    let core = Core::new(provider);
    let app = core.router();

    let bind = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(addr = %bind, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("shutdown complete");

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("ctrl-c received");
    }
}
