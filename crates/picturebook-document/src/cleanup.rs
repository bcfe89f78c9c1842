// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Temp files — deferred removal of derived image files.
//
// Pre-processors write temporary copies that stay on disk until the book is
// saved. They are then removed on a background thread; failures are logged
// and otherwise ignored.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread::JoinHandle;

use tracing::{debug, warn};

/// Registry of temporary files created on behalf of a book.
#[derive(Debug, Default)]
pub struct TempFiles {
    paths: Mutex<Vec<PathBuf>>,
}

impl TempFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a temporary file.
    pub fn register(&self, path: PathBuf) {
        debug!(path = %path.display(), "Tracking temporary file");
        self.lock().push(path);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Start deleting every registered file on one background thread and
    /// return immediately. Dropping the returned handle detaches the worker.
    pub fn dispatch(&self) -> CleanupHandle {
        let paths = std::mem::take(&mut *self.lock());
        let len = paths.len();
        if paths.is_empty() {
            return CleanupHandle { len, worker: None };
        }

        let spawned = std::thread::Builder::new()
            .name("picturebook-cleanup".into())
            .spawn({
                let paths = paths.clone();
                move || paths.iter().for_each(|path| remove_quietly(path))
            });

        let worker = match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(error = %err, "Cleanup thread unavailable; removing inline");
                paths.iter().for_each(|path| remove_quietly(path));
                None
            }
        };

        CleanupHandle { len, worker }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PathBuf>> {
        self.paths.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for TempFiles {
    /// Files still registered at drop time (the book was never saved) are
    /// removed synchronously.
    fn drop(&mut self) {
        let paths = std::mem::take(
            self.paths
                .get_mut()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for path in paths {
            remove_quietly(&path);
        }
    }
}

/// Background cleanup in flight.
#[derive(Debug, Default)]
pub struct CleanupHandle {
    len: usize,
    worker: Option<JoinHandle<()>>,
}

impl CleanupHandle {
    /// Number of files being removed.
    pub fn file_count(&self) -> usize {
        self.len
    }

    /// Block until every removal has finished.
    pub fn wait(self) {
        if let Some(worker) = self.worker {
            if worker.join().is_err() {
                warn!("Cleanup thread panicked");
            }
        }
    }
}

fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed temporary file"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "Could not remove temporary file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn dispatch_removes_registered_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = TempFiles::new();
        let a = touch(dir.path(), "a.png");
        let b = touch(dir.path(), "b.png");
        files.register(a.clone());
        files.register(b.clone());

        let handle = files.dispatch();
        assert_eq!(handle.file_count(), 2);
        assert!(files.is_empty());
        handle.wait();

        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[test]
    fn many_files_share_one_worker() {
        let dir = tempfile::tempdir().unwrap();
        let files = TempFiles::new();
        let paths: Vec<PathBuf> = (0..200)
            .map(|i| touch(dir.path(), &format!("{i}.png")))
            .collect();
        for path in &paths {
            files.register(path.clone());
        }

        let handle = files.dispatch();
        assert_eq!(handle.file_count(), 200);
        assert!(handle.worker.is_some());
        handle.wait();
        assert!(paths.iter().all(|p| !p.exists()));
    }

    #[test]
    fn nothing_registered_spawns_nothing() {
        let handle = TempFiles::new().dispatch();
        assert_eq!(handle.file_count(), 0);
        assert!(handle.worker.is_none());
        handle.wait();
    }

    #[test]
    fn missing_files_are_ignored() {
        let files = TempFiles::new();
        files.register(PathBuf::from("/nonexistent/picturebook-gone.png"));
        files.dispatch().wait();
    }

    #[test]
    fn drop_removes_unsaved_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.png");
        {
            let files = TempFiles::new();
            files.register(a.clone());
            assert_eq!(files.len(), 1);
        }
        assert!(!a.exists());
    }
}
