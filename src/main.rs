use anyhow::Result;
use clap::Parser;
use clarifin::{
    backend::hosted::HostedBackend, config::AppConfig, storage::Storage, AppContext,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "clarifin",
    about = "Clarifin client engine — session bootstrap and loan workflows",
    version
)]
struct Args {
    /// Data directory for the local store and config file
    #[arg(long, env = "CLARIFIN_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CLARIFIN_LOG")]
    log: Option<String>,

    /// Base URL of the hosted identity/data service
    #[arg(long, env = "CLARIFIN_BACKEND_URL")]
    backend_url: Option<String>,

    /// Publishable project api key
    #[arg(long, env = "CLARIFIN_API_KEY")]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Arc::new(AppConfig::new(
        args.data_dir,
        args.log,
        args.backend_url,
        args.api_key,
    ));
    setup_logging(&config.log, &config.log_format);

    let storage = Arc::new(Storage::new(&config.data_dir).await?);
    let backend = Arc::new(HostedBackend::new(
        &config.backend_url,
        &config.api_key,
        Arc::clone(&storage),
    )?);
    let ctx = AppContext::new(Arc::clone(&config), storage, backend);

    ctx.auth.start().await;
    info!(
        backend = %config.backend_url,
        data_dir = %config.data_dir.display(),
        "clarifin engine ready"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    ctx.auth.shutdown();
    Ok(())
}

fn setup_logging(level: &str, format: &str) {
    if format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(level).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(level).compact().init();
    }
}
