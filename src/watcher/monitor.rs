//! Running filesystem watch bound to one [`WatchHandler`].

use std::path::Path;
use std::sync::Arc;

use notify::{Event, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use crate::config::WatchConfig;

use super::error::WatchError;
use super::handler::WatchHandler;
use super::translate::EventTranslator;

/// A recursive `notify` watcher plus the task dispatching its events.
///
/// The backend thread only pushes raw events into a channel; translation,
/// filtering and fan-out happen on the dispatch task.
pub struct Monitor {
    _watcher: notify::RecommendedWatcher,
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

impl Monitor {
    /// Start watching `path` recursively and feed `handler`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        path: &Path,
        handler: Arc<WatchHandler>,
        config: &WatchConfig,
    ) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel(config.event_buffer.max(1));

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        watcher
            .watch(path, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let cancel = CancellationToken::new();
        let translator = EventTranslator::new(path.to_path_buf(), config.rename_window_ms);
        let task = tokio::spawn(dispatch(
            rx,
            translator,
            handler,
            cancel.clone(),
            Duration::from_millis(config.rename_window_ms.max(1)),
        ));

        Ok(Self {
            _watcher: watcher,
            cancel,
            _task: task,
        })
    }

    /// Stop the dispatch task and release the backend watch.
    pub fn stop(self) {
        self.cancel.cancel();
        drop(self._watcher);
    }

}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

async fn dispatch(
    mut rx: mpsc::Receiver<notify::Result<Event>>,
    mut translator: EventTranslator,
    handler: Arc<WatchHandler>,
    cancel: CancellationToken,
    tick: Duration,
) {
    let root = handler.root().display().to_string();
    crate::debug_event!("monitor", "dispatching", "{root}");

    // One interval for the whole loop so a steady event stream cannot starve
    // the expiry flush
    let mut expiry = interval(tick);
    expiry.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            res = rx.recv() => match res {
                Some(Ok(event)) => {
                    // Expired halves happened before this event
                    for fs_event in translator.flush_expired() {
                        handler.on_event(&fs_event);
                    }
                    for fs_event in translator.translate(event) {
                        handler.on_event(&fs_event);
                    }
                }
                Some(Err(e)) => {
                    tracing::error!("[monitor] watch error on {root}: {e}");
                }
                None => break,
            },

            _ = expiry.tick(), if translator.has_pending() => {
                for fs_event in translator.flush_expired() {
                    handler.on_event(&fs_event);
                }
            }
        }
    }

    crate::debug_event!("monitor", "dispatch ended", "{root}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::{EventCategories, Subscriber};
    use notify::EventKind;
    use notify::event::{DataChange, ModifyKind, RenameMode};
    use std::path::PathBuf;

    const LEFT: &str = r#"{"event_type":"deleted","is_directory":false,"src_path":"/left"}"#;

    fn raw(kind: EventKind, path: &str) -> notify::Result<Event> {
        Ok(Event::new(kind).add_path(PathBuf::from(path)))
    }

    #[tokio::test]
    async fn test_expired_rename_flushed_during_steady_events() {
        let root = PathBuf::from("/watched/a");
        let handler = Arc::new(WatchHandler::new(root.clone(), EventCategories::all()));
        let (sub, mut out) = Subscriber::channel(256);
        handler.add_subscriber(sub);

        let (tx, rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(dispatch(
            rx,
            EventTranslator::new(root, 50),
            handler,
            cancel.clone(),
            Duration::from_millis(50),
        ));

        let from = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
            .add_path(PathBuf::from("/watched/a/left"))
            .set_tracker(1);
        tx.send(Ok(from)).await.unwrap();

        // Raw events arrive faster than the rename window for the whole run
        for _ in 0..25 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tx.send(raw(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                "/watched/a/busy",
            ))
            .await
            .unwrap();
        }
        cancel.cancel();
        task.await.unwrap();

        let mut messages = Vec::new();
        while let Ok(payload) = out.try_recv() {
            messages.push(payload.to_string());
        }

        let deleted = messages
            .iter()
            .position(|m| m == LEFT)
            .expect("expired rename never reported");
        // Reported in arrival order, ahead of the later modifications
        assert!(deleted < messages.len() - 1);
        assert!(deleted < 10, "deletion held back until message {deleted}");
    }
}
