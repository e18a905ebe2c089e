// Rifle Results - Web Server
// JSON report API over the results database

use anyhow::{Context, Result};
use rifle_results::api::{router, AppState};
use rifle_results::config::{self, AppConfig};
use rifle_results::db;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rifle_results=info,tower_http=info,info")),
        )
        .init();

    let app_config = AppConfig::from_env()?;
    let db_path = config::database_path();
    if !db_path.exists() {
        anyhow::bail!(
            "database not found at {:?}; run `rifle-results import-shooters` first",
            db_path
        );
    }

    let conn = db::open_database(&db_path)?;
    info!("Database opened: {:?}", db_path);

    let state = AppState::new(conn, app_config.mcsi_engine()?, app_config.reports.clone());
    let app = router(state);

    let addr = config::server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("   API: http://{}/api/health", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
