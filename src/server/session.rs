//! One WebSocket connection subscribed to a watched path.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::watcher::{OptionRequest, SubscribeError, Subscriber, WatchRegistry};

/// Parse repeated `enable` / `disable` query parameters.
///
/// Values are trimmed; other parameters and malformed queries are ignored.
pub fn parse_options(query: Option<&str>) -> OptionRequest {
    let pairs: Vec<(String, String)> = match query {
        Some(q) => serde_urlencoded::from_str(q).unwrap_or_else(|e| {
            tracing::warn!("[session] ignoring malformed query {q:?}: {e}");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let mut request = OptionRequest::default();
    for (key, value) in pairs {
        let value = value.trim().to_string();
        match key.as_str() {
            "enable" => request.enable.push(value),
            "disable" => request.disable.push(value),
            _ => {}
        }
    }
    request
}

/// Lifecycle of a single subscriber connection.
pub struct Session {
    registry: Arc<WatchRegistry>,
    path: String,
    options: OptionRequest,
    keepalive: Duration,
    subscriber_buffer: usize,
}

impl Session {
    pub fn new(
        registry: Arc<WatchRegistry>,
        path: String,
        options: OptionRequest,
        keepalive: Duration,
        subscriber_buffer: usize,
    ) -> Self {
        Self {
            registry,
            path,
            options,
            keepalive,
            subscriber_buffer,
        }
    }

    /// Subscribe, then pump queued events and keepalive pings until the
    /// connection goes away.
    pub async fn run(self, socket: WebSocket) {
        let (mut sink, mut stream) = socket.split();
        let (subscriber, mut rx) = Subscriber::channel(self.subscriber_buffer);

        // Recursive watch setup walks the tree and holds the path's entry lock
        let registry = self.registry.clone();
        let path = self.path.clone();
        let options = self.options.clone();
        let subscribed = tokio::task::spawn_blocking(move || {
            registry.subscribe(&path, &options, subscriber)
        })
        .await;

        let subscribed = match subscribed {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("[session] subscribe task for /{} failed: {e}", self.path);
                let _ = sink.close().await;
                return;
            }
        };

        let handle = match subscribed {
            Ok(handle) => Some(handle),
            Err(SubscribeError::NoOptionsSelected) => {
                crate::debug_event!("session", "inert", "no options for /{}", self.path);
                None
            }
            Err(e) => {
                tracing::warn!("[session] subscribe to /{} failed: {e}", self.path);
                if let Some(text) = e.diagnostic() {
                    let _ = sink.send(Message::Text(text.to_string().into())).await;
                }
                let _ = sink.close().await;
                return;
            }
        };

        crate::debug_event!("session", "opened", "/{}", self.path);

        let mut keepalive = interval_at(Instant::now() + self.keepalive, self.keepalive);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = keepalive.tick() => {
                    if sink.send(Message::Ping(Default::default())).await.is_err() {
                        break;
                    }
                }

                Some(payload) = rx.recv() => {
                    if let Err(e) = sink.send(Message::Text(payload.to_string().into())).await {
                        crate::debug_event!("session", "write failed", "{e}");
                        break;
                    }
                }

                incoming = stream.next() => match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        crate::debug_event!("session", "read failed", "{e}");
                        break;
                    }
                    // Inbound data is ignored
                    Some(Ok(_)) => {}
                },
            }
        }

        if let Some(handle) = handle {
            let registry = self.registry.clone();
            if let Err(e) =
                tokio::task::spawn_blocking(move || registry.unsubscribe(&handle)).await
            {
                tracing::error!("[session] unsubscribe task for /{} failed: {e}", self.path);
            }
        }
        crate::debug_event!("session", "closed", "/{}", self.path);
    }
}
