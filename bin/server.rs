// BSSID Locator - Web Server
// REST API with Axum, plus the built web front-end

use anyhow::{Context, Result};
use bssid_locator::api::{router, AppState};
use bssid_locator::{init_tracing, ClientConfig, LocationClient, ServerConfig};
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env().context("Failed to read BSSID_LOCATOR_* environment")?;
    init_tracing(&config.log_level);

    println!("🌐 BSSID Locator - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let client_config = ClientConfig::default().with_timeout(Duration::from_secs(config.timeout_secs));
    let client = LocationClient::new(client_config).context("Failed to build HTTP client")?;
    let state = AppState { client };

    let web_dir = Path::new(&config.web_dir);
    if web_dir.is_dir() {
        println!("✓ Serving front-end from {}", web_dir.display());
    } else {
        println!("⚠️  {} not found, serving API only", web_dir.display());
    }
    let app = router(state, Some(web_dir));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!(%addr, "listening");
    println!("\n🚀 Server running on http://localhost:{}", config.port);
    println!("   API: http://localhost:{}/api/geolocate", config.port);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
