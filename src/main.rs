//! mixcut - audio clip service
//!
//! Upload, trim, concatenate, and synthesize short audio clips, backed by
//! an external ffmpeg engine invoked per operation.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mixcut::{AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting mixcut");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    info!("Database: {}", config.database_path.display());
    info!("Temp dir: {}", config.temp_dir.display());

    let db_pool = mixcut::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    let state = AppState::from_config(&config, db_pool);
    let app = mixcut::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.port)).await?;
    info!("Listening on http://127.0.0.1:{}", config.port);
    info!("Health check: http://127.0.0.1:{}/health", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
