//! Per-path fan-out of filtered events to subscribers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::error::DeliveryError;
use super::event::{FsEvent, should_forward};
use super::options::EventCategories;

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Serialized message shared by every subscriber of a handler.
pub type Payload = Arc<str>;

/// Handle to one session's outbound message queue.
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: u64,
    tx: mpsc::Sender<Payload>,
}

impl Subscriber {
    /// Wrap a queue sender, assigning a process-unique id.
    pub fn new(tx: mpsc::Sender<Payload>) -> Self {
        Self {
            id: NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed),
            tx,
        }
    }

    /// Create a subscriber together with the receiving end of its queue.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Payload>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queue a message without waiting.
    pub fn deliver(&self, payload: Payload) -> Result<(), DeliveryError> {
        self.tx.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full { id: self.id },
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed { id: self.id },
        })
    }
}

/// Subscribers and options for one watched path.
///
/// Only the registry adds or removes subscribers; the monitor's dispatch
/// task calls [`WatchHandler::on_event`].
#[derive(Debug)]
pub struct WatchHandler {
    root: PathBuf,
    options: EventCategories,
    subscribers: Mutex<IndexMap<u64, Subscriber>>,
}

impl WatchHandler {
    pub fn new(root: PathBuf, options: EventCategories) -> Self {
        Self {
            root,
            options,
            subscribers: Mutex::new(IndexMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> EventCategories {
        self.options
    }

    pub fn add_subscriber(&self, subscriber: Subscriber) {
        self.subscribers.lock().insert(subscriber.id, subscriber);
    }

    /// Remove a subscriber by id. Unknown ids are ignored.
    pub fn remove_subscriber(&self, id: u64) -> bool {
        self.subscribers.lock().swap_remove(&id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Filter `event` and queue it for every subscriber.
    ///
    /// Returns how many subscribers accepted the message. A closed or full
    /// queue is logged and skipped.
    pub fn on_event(&self, event: &FsEvent) -> usize {
        let Some(message) = should_forward(event, self.options, &self.root) else {
            crate::debug_event!(
                "handler",
                "filtered",
                "{} {}",
                event.kind.as_str(),
                event.src_path.display()
            );
            return 0;
        };

        let payload: Payload = match serde_json::to_string(&message) {
            Ok(json) => json.into(),
            Err(e) => {
                tracing::error!("[handler] failed to serialize event: {e}");
                return 0;
            }
        };

        let subscribers = self.subscribers.lock();
        let mut delivered = 0;
        for subscriber in subscribers.values() {
            match subscriber.deliver(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(e @ DeliveryError::Full { .. }) => {
                    tracing::warn!("[handler] dropped event for {}: {e}", self.root.display());
                }
                Err(e) => {
                    crate::debug_event!("handler", "skipped", "{e}");
                }
            }
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(options: EventCategories) -> WatchHandler {
        WatchHandler::new(PathBuf::from("/watched/a"), options)
    }

    #[test]
    fn test_add_remove_subscribers() {
        let handler = handler(EventCategories::all());
        let (first, _rx1) = Subscriber::channel(4);
        let (second, _rx2) = Subscriber::channel(4);
        let first_id = first.id();

        assert!(handler.is_empty());
        handler.add_subscriber(first);
        handler.add_subscriber(second);
        assert_eq!(handler.len(), 2);

        assert!(handler.remove_subscriber(first_id));
        assert!(!handler.remove_subscriber(first_id));
        assert_eq!(handler.len(), 1);
    }

    #[test]
    fn test_subscriber_ids_are_unique() {
        let (a, _rx_a) = Subscriber::channel(1);
        let (b, _rx_b) = Subscriber::channel(1);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_fan_out_to_every_subscriber() {
        let handler = handler(EventCategories::all());
        let (first, mut rx1) = Subscriber::channel(4);
        let (second, mut rx2) = Subscriber::channel(4);
        handler.add_subscriber(first);
        handler.add_subscriber(second);

        let delivered = handler.on_event(&FsEvent::created("/watched/a/x.txt", false));
        assert_eq!(delivered, 2);

        let expected = r#"{"event_type":"created","is_directory":false,"src_path":"/x.txt"}"#;
        assert_eq!(rx1.try_recv().unwrap().as_ref(), expected);
        assert_eq!(rx2.try_recv().unwrap().as_ref(), expected);
    }

    #[test]
    fn test_filtered_event_is_not_sent() {
        let handler = handler(EventCategories::CREATED_DIR);
        let (sub, mut rx) = Subscriber::channel(4);
        handler.add_subscriber(sub);

        assert_eq!(handler.on_event(&FsEvent::created("/watched/a/x.txt", false)), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_subscriber_does_not_block_others() {
        let handler = handler(EventCategories::all());
        let (gone, rx_gone) = Subscriber::channel(4);
        let (alive, mut rx_alive) = Subscriber::channel(4);
        handler.add_subscriber(gone);
        handler.add_subscriber(alive);
        drop(rx_gone);

        let delivered = handler.on_event(&FsEvent::deleted("/watched/a/old", true));
        assert_eq!(delivered, 1);
        assert!(rx_alive.try_recv().is_ok());
        // A failed delivery never detaches the subscriber
        assert_eq!(handler.len(), 2);
    }

    #[test]
    fn test_full_subscriber_does_not_block_others() {
        let handler = handler(EventCategories::all());
        let (slow, _rx_slow) = Subscriber::channel(1);
        let (fast, mut rx_fast) = Subscriber::channel(8);
        handler.add_subscriber(slow);
        handler.add_subscriber(fast);

        assert_eq!(handler.on_event(&FsEvent::modified("/watched/a/f", false)), 2);
        assert_eq!(handler.on_event(&FsEvent::modified("/watched/a/f", false)), 1);
        assert_eq!(handler.on_event(&FsEvent::modified("/watched/a/f", false)), 1);

        let mut received = 0;
        while rx_fast.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 3);
    }

    #[test]
    fn test_delivery_preserves_order() {
        let handler = handler(EventCategories::all());
        let (sub, mut rx) = Subscriber::channel(8);
        handler.add_subscriber(sub);

        handler.on_event(&FsEvent::created("/watched/a/1", false));
        handler.on_event(&FsEvent::modified("/watched/a/2", false));
        handler.on_event(&FsEvent::deleted("/watched/a/3", false));

        let order: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|p| p.to_string())
            .collect();
        assert_eq!(order.len(), 3);
        assert!(order[0].contains("\"/1\""));
        assert!(order[1].contains("\"/2\""));
        assert!(order[2].contains("\"/3\""));
    }
}
