// Student Records - Web Server
// REST API with Axum

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::sync::Arc;
use student_records::{api, logging, RecordStore, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    let _logger = logging::init_logging(&config.log)?;

    let store = RecordStore::open(&config.store.database)
        .with_context(|| format!("failed to open {}", config.store.database.display()))?;
    info!(
        "event=server_init status=ok database={} web_dir={}",
        config.store.database.display(),
        config.web_dir.display()
    );

    let app = api::router(Arc::new(store), &config.web_dir);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    info!("event=server_start status=ok addr={}", addr);
    println!("🚀 Server running on http://{}", addr);
    println!("   Press Ctrl+C to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("event=server_stop status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a signal handler, run until the process is killed
        log::error!("event=signal_listen status=error error={}", e);
        std::future::pending::<()>().await;
    }
}
