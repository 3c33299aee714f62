//! Filesystem events and the filter that turns them into subscriber messages.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::options::EventCategories;

/// What happened to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Modified,
    Deleted,
    Moved { dest_path: PathBuf },
}

impl FsEventKind {
    /// Wire name used in `event_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            FsEventKind::Created => "created",
            FsEventKind::Modified => "modified",
            FsEventKind::Deleted => "deleted",
            FsEventKind::Moved { .. } => "moved",
        }
    }
}

/// A single filesystem change reported by a monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub is_directory: bool,
    pub src_path: PathBuf,
}

impl FsEvent {
    pub fn created(path: impl Into<PathBuf>, is_directory: bool) -> Self {
        Self::new(FsEventKind::Created, path, is_directory)
    }

    pub fn modified(path: impl Into<PathBuf>, is_directory: bool) -> Self {
        Self::new(FsEventKind::Modified, path, is_directory)
    }

    pub fn deleted(path: impl Into<PathBuf>, is_directory: bool) -> Self {
        Self::new(FsEventKind::Deleted, path, is_directory)
    }

    pub fn moved(from: impl Into<PathBuf>, to: impl Into<PathBuf>, is_directory: bool) -> Self {
        Self::new(
            FsEventKind::Moved {
                dest_path: to.into(),
            },
            from,
            is_directory,
        )
    }

    fn new(kind: FsEventKind, path: impl Into<PathBuf>, is_directory: bool) -> Self {
        Self {
            kind,
            is_directory,
            src_path: path.into(),
        }
    }

    /// The category this event falls under.
    pub fn category(&self) -> EventCategories {
        match (&self.kind, self.is_directory) {
            (FsEventKind::Created, false) => EventCategories::CREATED_FILE,
            (FsEventKind::Created, true) => EventCategories::CREATED_DIR,
            (FsEventKind::Modified, false) => EventCategories::MODIFIED_FILE,
            (FsEventKind::Modified, true) => EventCategories::MODIFIED_DIR,
            (FsEventKind::Deleted, false) => EventCategories::DELETED_FILE,
            (FsEventKind::Deleted, true) => EventCategories::DELETED_DIR,
            (FsEventKind::Moved { .. }, false) => EventCategories::MOVED_FILE,
            (FsEventKind::Moved { .. }, true) => EventCategories::MOVED_DIR,
        }
    }
}

/// Root-relative event payload sent to subscribers as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedMessage {
    pub event_type: &'static str,
    pub is_directory: bool,
    pub src_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_path: Option<String>,
}

/// Decide whether `event` passes `options`, and normalize it if so.
pub fn should_forward(
    event: &FsEvent,
    options: EventCategories,
    root: &Path,
) -> Option<NormalizedMessage> {
    if !options.contains(event.category()) {
        return None;
    }

    let dest_path = match &event.kind {
        FsEventKind::Moved { dest_path } => Some(relative_to_root(dest_path, root)),
        _ => None,
    };

    Some(NormalizedMessage {
        event_type: event.kind.as_str(),
        is_directory: event.is_directory,
        src_path: relative_to_root(&event.src_path, root),
        dest_path,
    })
}

/// Strip the watch root from `path`, keeping the leading separator.
///
/// `/watched/a/x.txt` under `/watched/a` becomes `/x.txt`; the root itself
/// becomes an empty string. Paths outside the root are returned unchanged.
pub fn relative_to_root(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rest) => rest
            .components()
            .map(|c| format!("/{}", c.as_os_str().to_string_lossy()))
            .collect(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}
