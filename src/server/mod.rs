//! WebSocket front end: one session per connection, all sharing a registry.

#[cfg(feature = "http-server")]
pub mod http_server;
#[cfg(feature = "http-server")]
pub mod session;

#[cfg(feature = "http-server")]
pub use http_server::{AppState, router, serve_http};

#[cfg(not(feature = "http-server"))]
pub async fn serve_http(_settings: crate::Settings) -> anyhow::Result<()> {
    eprintln!("HTTP server support is not compiled in.");
    eprintln!("Please rebuild with: cargo build --features http-server");
    std::process::exit(1);
}
