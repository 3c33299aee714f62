//! Pairing of split rename notifications.
//!
//! Backends report a rename as a "from" half and a "to" half sharing a
//! tracker id. A "from" with no matching "to" inside the window means the
//! path left the watched tree and is reported as a deletion.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Tracks rename halves waiting for their partner.
#[derive(Debug)]
pub struct RenameTracker {
    /// Unpaired "from" halves: tracker -> (path, time seen).
    pending: HashMap<usize, (PathBuf, Instant)>,
    /// How long a "from" half may wait for its "to" half.
    window: Duration,
}

impl RenameTracker {
    pub fn new(window_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            window: Duration::from_millis(window_ms),
        }
    }

    /// Record a "from" half.
    pub fn record_from(&mut self, tracker: usize, path: PathBuf) {
        self.pending.insert(tracker, (path, Instant::now()));
    }

    /// Whether a "from" half with this tracker is waiting.
    pub fn is_pending(&self, tracker: usize) -> bool {
        self.pending.contains_key(&tracker)
    }

    /// Claim the "from" half matching a "to" or combined rename.
    ///
    /// Returns the source path if one was pending.
    pub fn take_match(&mut self, tracker: usize) -> Option<PathBuf> {
        self.pending.remove(&tracker).map(|(path, _)| path)
    }

    /// Take every "from" half that waited longer than the window.
    pub fn take_expired(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        let mut expired = Vec::new();

        self.pending.retain(|_, (path, seen)| {
            if now.duration_since(*seen) >= self.window {
                expired.push(path.clone());
                false
            } else {
                true
            }
        });

        expired
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
