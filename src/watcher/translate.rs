//! Translation of raw `notify` events into [`FsEvent`]s.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};
use walkdir::WalkDir;

use super::event::FsEvent;
use super::rename::RenameTracker;

/// Stateful translator for one monitor.
///
/// Besides the event itself, creations, deletions and moves emit a
/// `modified` event for each affected parent directory inside the root.
#[derive(Debug)]
pub struct EventTranslator {
    root: PathBuf,
    renames: RenameTracker,
    /// Directories under the root, for classifying paths that already vanished.
    directories: HashSet<PathBuf>,
}

impl EventTranslator {
    pub fn new(root: PathBuf, rename_window_ms: u64) -> Self {
        let directories = scan_directories(&root);
        Self {
            root,
            renames: RenameTracker::new(rename_window_ms),
            directories,
        }
    }

    pub fn translate(&mut self, event: Event) -> Vec<FsEvent> {
        let mut out = Vec::new();
        let tracker = event.tracker();

        match event.kind {
            EventKind::Create(kind) => {
                for path in event.paths {
                    let is_directory = match kind {
                        CreateKind::Folder => true,
                        CreateKind::File => false,
                        _ => path.is_dir(),
                    };
                    self.remember(&path, is_directory);
                    self.push_with_parent(&mut out, FsEvent::created(path, is_directory));
                }
            }

            EventKind::Remove(kind) => {
                for path in event.paths {
                    let known = self.forget(&path);
                    let is_directory = known || matches!(kind, RemoveKind::Folder);
                    self.push_with_parent(&mut out, FsEvent::deleted(path, is_directory));
                }
            }

            EventKind::Modify(ModifyKind::Name(mode)) => {
                self.translate_rename(&mut out, mode, tracker, event.paths);
            }

            EventKind::Modify(_) => {
                for path in event.paths {
                    let is_directory = path.is_dir() || self.directories.contains(&path);
                    out.push(FsEvent::modified(path, is_directory));
                }
            }

            // Access, Any and Other carry nothing subscribers can use
            _ => {}
        }

        out
    }

    /// Report "from" halves whose partner never arrived as deletions.
    pub fn flush_expired(&mut self) -> Vec<FsEvent> {
        let mut out = Vec::new();
        for path in self.renames.take_expired() {
            let is_directory = self.forget(&path);
            self.push_with_parent(&mut out, FsEvent::deleted(path, is_directory));
        }
        out
    }

    pub fn has_pending(&self) -> bool {
        self.renames.has_pending()
    }

    fn translate_rename(
        &mut self,
        out: &mut Vec<FsEvent>,
        mode: RenameMode,
        tracker: Option<usize>,
        mut paths: Vec<PathBuf>,
    ) {
        match (mode, tracker) {
            (RenameMode::Both, _) if paths.len() >= 2 => {
                if let Some(tracker) = tracker {
                    self.renames.take_match(tracker);
                }
                let to = paths.swap_remove(1);
                let from = paths.swap_remove(0);
                let is_directory = self.relocate(&from, &to) || to.is_dir();
                self.push_moved(out, from, to, is_directory);
            }

            (RenameMode::From, Some(tracker)) => {
                for path in paths {
                    self.renames.record_from(tracker, path);
                }
            }

            // The combined event follows and carries both paths
            (RenameMode::To, Some(tracker)) if self.renames.is_pending(tracker) => {}

            (RenameMode::To, _) => {
                for path in paths {
                    let is_directory = path.is_dir();
                    self.remember(&path, is_directory);
                    self.push_with_parent(out, FsEvent::created(path, is_directory));
                }
            }

            (RenameMode::From, None) => {
                for path in paths {
                    let is_directory = self.forget(&path);
                    self.push_with_parent(out, FsEvent::deleted(path, is_directory));
                }
            }

            // Single-path renames without pairing information
            _ => {
                for path in paths {
                    let event = if path.exists() {
                        let is_directory = path.is_dir();
                        self.remember(&path, is_directory);
                        FsEvent::created(path, is_directory)
                    } else {
                        let is_directory = self.forget(&path);
                        FsEvent::deleted(path, is_directory)
                    };
                    self.push_with_parent(out, event);
                }
            }
        }
    }

    /// Record a directory that appeared, along with anything already inside it.
    fn remember(&mut self, path: &Path, is_directory: bool) {
        if is_directory {
            self.directories.insert(path.to_path_buf());
            self.directories.extend(scan_directories(path));
        }
    }

    /// Drop a vanished path and its descendants; true if it was a directory.
    fn forget(&mut self, path: &Path) -> bool {
        if !self.directories.remove(path) {
            return false;
        }
        self.directories.retain(|dir| !dir.starts_with(path));
        true
    }

    /// Move known directories under `from` to `to`; true if `from` was one.
    fn relocate(&mut self, from: &Path, to: &Path) -> bool {
        let moved: Vec<PathBuf> = self
            .directories
            .iter()
            .filter(|dir| dir.starts_with(from))
            .cloned()
            .collect();

        for dir in &moved {
            self.directories.remove(dir);
            if let Ok(suffix) = dir.strip_prefix(from) {
                let target = to.join(suffix);
                if target.starts_with(&self.root) {
                    self.directories.insert(target);
                }
            }
        }

        !moved.is_empty()
    }

    fn push_moved(&self, out: &mut Vec<FsEvent>, from: PathBuf, to: PathBuf, is_directory: bool) {
        let from_parent = self.parent_in_root(&from);
        let to_parent = self.parent_in_root(&to);

        out.push(FsEvent::moved(from, to, is_directory));
        if let Some(parent) = &from_parent {
            out.push(FsEvent::modified(parent.clone(), true));
        }
        if let Some(parent) = to_parent {
            if from_parent.as_ref() != Some(&parent) {
                out.push(FsEvent::modified(parent, true));
            }
        }
    }

    fn push_with_parent(&self, out: &mut Vec<FsEvent>, event: FsEvent) {
        let parent = self.parent_in_root(&event.src_path);
        out.push(event);
        if let Some(parent) = parent {
            out.push(FsEvent::modified(parent, true));
        }
    }

    fn parent_in_root(&self, path: &Path) -> Option<PathBuf> {
        path.parent()
            .filter(|parent| parent.starts_with(&self.root))
            .map(Path::to_path_buf)
    }
}

/// Every directory at or below `root`, without following symlinks.
fn scan_directories(root: &Path) -> HashSet<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect()
}
