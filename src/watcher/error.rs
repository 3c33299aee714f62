//! Error types for the watch registry and event delivery.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the underlying filesystem watcher.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}

/// Reasons a subscribe request does not attach.
#[derive(Error, Debug)]
pub enum SubscribeError {
    #[error("Path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    #[error("Path {path} is outside the watch root")]
    PathOutsideRoot { path: PathBuf },

    /// Resolved option set was empty; the request is silently dropped.
    #[error("No event categories selected")]
    NoOptionsSelected,

    #[error("Cannot start observer for {path}: {source}")]
    MonitorStartFailed {
        path: PathBuf,
        #[source]
        source: WatchError,
    },
}

impl SubscribeError {
    /// Text sent to the subscriber before its connection is closed.
    ///
    /// `None` means the session stays open without a subscription.
    pub fn diagnostic(&self) -> Option<&'static str> {
        match self {
            SubscribeError::PathNotFound { .. } | SubscribeError::PathOutsideRoot { .. } => {
                Some("Path does not exist.")
            }
            SubscribeError::MonitorStartFailed { .. } => Some("Cannot start observer"),
            SubscribeError::NoOptionsSelected => None,
        }
    }
}

/// Failure to queue a message for one subscriber.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("subscriber {id} is closed")]
    Closed { id: u64 },

    #[error("subscriber {id} queue is full")]
    Full { id: u64 },
}
