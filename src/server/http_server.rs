//! HTTP server exposing watches over WebSocket.
//!
//! `GET /{*path}` upgrades to a WebSocket subscribed to `root/path`;
//! `GET /` watches the root itself. `GET /health` answers `OK`.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, RawQuery, State};
use axum::response::Response;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::watcher::WatchRegistry;

use super::session::{Session, parse_options};

/// State shared by every connection.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<WatchRegistry>,
    pub keepalive: Duration,
    pub subscriber_buffer: usize,
}

impl AppState {
    pub fn new(registry: Arc<WatchRegistry>, settings: &Settings) -> Self {
        Self {
            registry,
            keepalive: Duration::from_secs(settings.server.keepalive_secs.max(1)),
            subscriber_buffer: settings.watch.subscriber_buffer,
        }
    }
}

/// Build the router; exposed for embedding and tests.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(watch_root))
        .route("/{*path}", get(watch_path))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn watch_root(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    ws: WebSocketUpgrade,
) -> Response {
    upgrade(state, String::new(), query, ws)
}

async fn watch_path(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    ws: WebSocketUpgrade,
) -> Response {
    upgrade(state, path, query, ws)
}

fn upgrade(state: AppState, path: String, query: Option<String>, ws: WebSocketUpgrade) -> Response {
    let options = parse_options(query.as_deref());
    let session = Session::new(
        state.registry,
        path,
        options,
        state.keepalive,
        state.subscriber_buffer,
    );
    ws.on_upgrade(move |socket| session.run(socket))
}

/// Run the server until Ctrl+C, then stop every monitor.
pub async fn serve_http(settings: Settings) -> anyhow::Result<()> {
    let registry = Arc::new(WatchRegistry::new(&settings.root, settings.watch.clone())?);
    let bind = settings.server.bind.clone();

    crate::log_event!(
        "server",
        "starting",
        "root {} on {bind}",
        registry.root().display()
    );

    let app = router(AppState::new(registry.clone(), &settings));
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    eprintln!("argus listening on ws://{bind}/<path>");
    eprintln!("Watch root: {}", registry.root().display());
    eprintln!("Press Ctrl+C to stop the server");

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            result?;
        }
        _ = shutdown_signal() => {
            eprintln!("Shutting down...");
        }
    }

    registry.shutdown();
    crate::log_event!("server", "stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[server] failed to listen for ctrl+c: {e}");
        std::future::pending::<()>().await;
    }
}
