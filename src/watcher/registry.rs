//! Process-wide table of active watches, one monitor per path.
//!
//! The registry resolves requested paths against the configured root,
//! shares a single [`Monitor`] + [`WatchHandler`] pair between every
//! subscriber of the same path, and tears the pair down when the last
//! subscriber leaves.
//!
//! Create-or-attach and detach-then-teardown both run while holding the
//! table's entry lock for the path, so concurrent sessions never start two
//! monitors for one path or stop a monitor another session just joined.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::config::WatchConfig;

use super::error::{SubscribeError, WatchError};
use super::handler::{Subscriber, WatchHandler};
use super::monitor::Monitor;
use super::options::EventCategories;

/// Event categories requested by a subscriber, as raw tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionRequest {
    pub enable: Vec<String>,
    pub disable: Vec<String>,
}

impl OptionRequest {
    pub fn new(enable: Vec<String>, disable: Vec<String>) -> Self {
        Self { enable, disable }
    }

    pub fn resolve(&self) -> EventCategories {
        EventCategories::resolve(&self.enable, &self.disable)
    }
}

/// Proof of a successful subscribe, needed to unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedHandle {
    path: PathBuf,
    subscriber_id: u64,
}

impl AttachedHandle {
    /// Canonical watched path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn subscriber_id(&self) -> u64 {
        self.subscriber_id
    }
}

/// Starts the monitor for a newly watched path.
type MonitorStarter = fn(&Path, Arc<WatchHandler>, &WatchConfig) -> Result<Monitor, WatchError>;

struct WatchEntry {
    handler: Arc<WatchHandler>,
    monitor: Monitor,
}

/// Registry of watched paths.
pub struct WatchRegistry {
    root: PathBuf,
    config: WatchConfig,
    entries: DashMap<PathBuf, WatchEntry>,
    monitors_started: AtomicU64,
    start_monitor: MonitorStarter,
}

impl WatchRegistry {
    /// Create a registry confined to `root`.
    ///
    /// The root is canonicalized so containment checks survive symlinks.
    pub fn new(root: impl AsRef<Path>, config: WatchConfig) -> std::io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        Ok(Self {
            root,
            config,
            entries: DashMap::new(),
            monitors_started: AtomicU64::new(0),
            start_monitor: Monitor::start,
        })
    }

    #[cfg(test)]
    fn with_monitor_starter(mut self, start_monitor: MonitorStarter) -> Self {
        self.start_monitor = start_monitor;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a root-relative request into a canonical watched path.
    pub fn resolve_path(&self, requested: &str) -> Result<PathBuf, SubscribeError> {
        let relative = Path::new(requested.trim_start_matches('/'));
        let joined = self.root.join(relative);

        // Reject absolute or prefixed components that would replace the root
        if relative
            .components()
            .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
        {
            return Err(SubscribeError::PathOutsideRoot { path: joined });
        }

        let canonical = joined
            .canonicalize()
            .map_err(|_| SubscribeError::PathNotFound {
                path: joined.clone(),
            })?;

        if !canonical.starts_with(&self.root) {
            return Err(SubscribeError::PathOutsideRoot { path: canonical });
        }

        Ok(canonical)
    }

    /// Attach `subscriber` to the watch for `requested`, starting one if needed.
    ///
    /// Requested options only apply when this call creates the watch; later
    /// subscribers share the options of the existing handler.
    ///
    /// Starting a monitor registers the whole tree with the backend and
    /// blocks, so async callers run this on a blocking thread.
    pub fn subscribe(
        &self,
        requested: &str,
        options: &OptionRequest,
        subscriber: Subscriber,
    ) -> Result<AttachedHandle, SubscribeError> {
        let path = self.resolve_path(requested)?;
        let handle = AttachedHandle {
            path: path.clone(),
            subscriber_id: subscriber.id(),
        };

        match self.entries.entry(path) {
            Entry::Occupied(entry) => {
                let handler = &entry.get().handler;
                handler.add_subscriber(subscriber);
                crate::debug_event!(
                    "registry",
                    "attached",
                    "{} ({} subscribers)",
                    handle.path.display(),
                    handler.len()
                );
            }
            Entry::Vacant(entry) => {
                let categories = options.resolve();
                if categories.is_empty() {
                    crate::debug_event!("registry", "no options selected", "{requested}");
                    return Err(SubscribeError::NoOptionsSelected);
                }

                let handler = Arc::new(WatchHandler::new(handle.path.clone(), categories));
                let monitor = (self.start_monitor)(&handle.path, handler.clone(), &self.config)
                    .map_err(|source| {
                        tracing::error!(
                            "[registry] cannot start monitor for {}: {source}",
                            handle.path.display()
                        );
                        SubscribeError::MonitorStartFailed {
                            path: handle.path.clone(),
                            source,
                        }
                    })?;
                self.monitors_started.fetch_add(1, Ordering::Relaxed);

                handler.add_subscriber(subscriber);
                entry.insert(WatchEntry { handler, monitor });

                crate::log_event!(
                    "registry",
                    "monitor started",
                    "{} [{}]",
                    handle.path.display(),
                    categories.tokens().join(",")
                );
            }
        }

        Ok(handle)
    }

    /// Detach a subscriber; stop the monitor if it was the last one.
    pub fn unsubscribe(&self, handle: &AttachedHandle) {
        match self.entries.entry(handle.path.clone()) {
            Entry::Occupied(entry) => {
                let handler = &entry.get().handler;
                handler.remove_subscriber(handle.subscriber_id);

                if handler.is_empty() {
                    let watch = entry.remove();
                    watch.monitor.stop();
                    crate::log_event!("registry", "monitor stopped", "{}", handle.path.display());
                } else {
                    crate::debug_event!(
                        "registry",
                        "detached",
                        "{} ({} subscribers)",
                        handle.path.display(),
                        handler.len()
                    );
                }
            }
            Entry::Vacant(_) => {
                tracing::warn!(
                    "[registry] unsubscribe for unknown watch {}",
                    handle.path.display()
                );
            }
        }
    }

    /// Stop every monitor and clear the table.
    pub fn shutdown(&self) {
        let paths: Vec<PathBuf> = self.entries.iter().map(|e| e.key().clone()).collect();
        for path in paths {
            if let Some((_, watch)) = self.entries.remove(&path) {
                watch.monitor.stop();
            }
        }
        crate::log_event!("registry", "shut down");
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Subscriber count for a watched path, if it is being watched.
    pub fn subscriber_count(&self, path: &Path) -> Option<usize> {
        self.entries.get(path).map(|e| e.handler.len())
    }

    /// Options in effect for a watched path.
    pub fn options(&self, path: &Path) -> Option<EventCategories> {
        self.entries.get(path).map(|e| e.handler.options())
    }

    /// Number of watched paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total monitors started over the registry's lifetime.
    pub fn monitors_started(&self) -> u64 {
        self.monitors_started.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("root", &self.root)
            .field("watches", &self.entries.len())
            .finish()
    }
}
