use std::sync::Arc;

use anyhow::Context;
use socketioxide::SocketIo;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use courtmaster_backend::audit::AuditLogger;
use courtmaster_backend::config::AppConfig;
use courtmaster_backend::events::{EventDispatcher, SocketDispatcher};
use courtmaster_backend::handlers::{on_connect, router, AppState};
use courtmaster_backend::persistence::MemoryStore;

// ─── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courtmaster_backend=info,socketioxide=warn".into()),
        )
        .init();

    let config = AppConfig::from_env();
    info!("🎾 CourtMaster scheduling backend starting...");

    let store = Arc::new(MemoryStore::open(&config.state_file).await);

    // Build Socket.IO layer
    let (socket_layer, io) = SocketIo::builder().build_layer();
    io.ns("/", on_connect);

    // Notification fan-out runs after each schedule, never inside it
    let mut dispatchers: Vec<Arc<dyn EventDispatcher>> =
        vec![Arc::new(SocketDispatcher::new(io.clone()))];
    if let Some(path) = &config.audit_log_path {
        let audit = AuditLogger::open(path)
            .await
            .with_context(|| format!("opening audit log {}", path.display()))?;
        dispatchers.push(Arc::new(audit));
    }

    let state = AppState::new(store, dispatchers, config.defaults.clone());

    // CORS: dashboards are served from a different origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state).layer(socket_layer).layer(cors);

    let addr = format!("0.0.0.0:{}", config.port);
    info!("🚀 Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}
