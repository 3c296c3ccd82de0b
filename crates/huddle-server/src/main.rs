// Huddle server entry point.
//
// Startup sequence:
// 1. Load config
// 2. Initialize tracing
// 3. Build the live hub and the store
// 4. Bind both listeners
// 5. Spawn the WebSocket server task
// 6. Serve HTTP until Ctrl+C

use std::sync::Arc;

use anyhow::Context;
use huddle_core::Store;
use huddle_server::config::{self, Config};
use huddle_server::http::{self, AppState};
use huddle_server::ws_server::{self, LiveHub};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config (before tracing, since it decides where logs go)
    let config = config::load_config().context("failed to load configuration")?;

    // 2. Initialize tracing
    init_tracing(&config)?;
    info!("Huddle starting up");

    // 3. Live hub and store
    let hub = LiveHub::default();
    let store = Store::new(Arc::new(hub.clone()));
    let state = AppState::new(store, config.server.ws_port);

    // 4. Bind listeners
    let http_listener = TcpListener::bind(config.http_addr())
        .await
        .with_context(|| format!("failed to bind HTTP server on {}", config.http_addr()))?;
    let ws_listener = TcpListener::bind(config.ws_addr())
        .await
        .with_context(|| format!("failed to bind WebSocket server on {}", config.ws_addr()))?;

    // 5. WebSocket server task
    let ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_server::run(ws_listener, hub).await {
            error!("WebSocket server error: {}", e);
        }
    });

    // 6. HTTP until Ctrl+C
    info!(
        "Application ready. Admin dashboard at http://{}/admin",
        config.http_addr()
    );
    tokio::select! {
        result = http::serve(http_listener, state) => {
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C received, shutting down");
        }
    }

    ws_handle.abort();
    info!("Huddle shut down cleanly");
    Ok(())
}

/// Initialize tracing to stderr, or to the configured log file.
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let default_filter = config
        .logging
        .filter
        .clone()
        .unwrap_or_else(|| "huddle_server=info,huddle_core=info,warn".to_string());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true);

    match &config.logging.file {
        Some(path) => {
            let path = std::path::Path::new(path);
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            }
            let log_file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            let subscriber = builder
                .with_writer(Arc::new(log_file))
                .with_ansi(false)
                .with_thread_ids(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
        None => {
            let subscriber = builder.with_writer(std::io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("failed to set tracing subscriber")?;
        }
    }

    Ok(())
}
