// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Discovery — expand sources into image paths and feed them to a book.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use picturebook_core::error::{PicturebookError, Result};
use picturebook_core::human_errors::humanize_error;
use picturebook_core::{BookConfig, IndexMode};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::book::{AddOutcome, AddReport, PictureBook};

/// Extensions picked up when walking directories.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// Turns sources into candidate paths and processes them on a worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indexer {
    mode: IndexMode,
    /// Pool size; 0 lets rayon pick one thread per core.
    workers: usize,
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new(IndexMode::Directory, 0)
    }
}

impl Indexer {
    pub fn new(mode: IndexMode, workers: usize) -> Self {
        Self { mode, workers }
    }

    pub fn from_config(config: &BookConfig) -> Self {
        Self::new(config.index_mode, config.workers)
    }

    /// Expand `sources` into candidate paths, in discovery order.
    ///
    /// Entries that cannot be read come back as `Discovery` errors in place,
    /// so one unreadable directory does not hide the rest.
    pub fn discover<P: AsRef<Path>>(&self, sources: &[P]) -> Vec<Result<PathBuf>> {
        let mut found = Vec::new();
        for source in sources {
            let source = source.as_ref();
            match self.mode {
                IndexMode::Directory => walk_directory(source, &mut found),
                IndexMode::Files => found.push(Ok(source.to_path_buf())),
                IndexMode::FileList => read_file_list(source, &mut found),
            }
        }
        debug!(mode = %self.mode, candidates = found.len(), "Discovery finished");
        found
    }

    /// Discover paths and call `visit` for each one on the worker pool.
    ///
    /// Stops at the first error `visit` returns. With a single worker the
    /// paths are visited in discovery order on the calling thread.
    #[instrument(skip_all, fields(mode = %self.mode, workers = self.workers))]
    pub fn index_paths<P, F>(&self, sources: &[P], visit: F) -> Result<()>
    where
        P: AsRef<Path>,
        F: Fn(Result<PathBuf>) -> Result<()> + Send + Sync,
    {
        let candidates = self.discover(sources);

        if self.workers == 1 {
            return candidates.into_iter().try_for_each(visit);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("picturebook-worker-{i}"))
            .build()
            .map_err(|err| PicturebookError::Io(std::io::Error::other(err.to_string())))?;

        pool.install(|| candidates.into_par_iter().try_for_each(&visit))
    }
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn walk_directory(root: &Path, found: &mut Vec<Result<PathBuf>>) {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && is_supported_image(entry.path()) {
                    found.push(Ok(entry.into_path()));
                }
            }
            Err(err) => found.push(Err(PicturebookError::Discovery(format!(
                "{}: {err}",
                err.path().unwrap_or(root).display()
            )))),
        }
    }
}

/// One path per line; blank lines and `#` comments are ignored.
fn read_file_list(list: &Path, found: &mut Vec<Result<PathBuf>>) {
    let body = match std::fs::read_to_string(list) {
        Ok(body) => body,
        Err(err) => {
            found.push(Err(PicturebookError::Discovery(format!(
                "{}: {err}",
                list.display()
            ))));
            return;
        }
    };

    found.extend(
        body.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| Ok(PathBuf::from(line))),
    );
}

impl PictureBook {
    /// Add every picture the indexer finds under `sources`.
    ///
    /// Per-path failures are logged and counted; a fatal error stops the run
    /// and is returned.
    #[instrument(skip_all, fields(sources = sources.len()))]
    pub fn add_pictures<P: AsRef<Path>>(
        &self,
        indexer: &Indexer,
        sources: &[P],
    ) -> Result<AddReport> {
        let added = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        indexer.index_paths(sources, |candidate| {
            match candidate.and_then(|path| self.add_picture(&path)) {
                Ok(AddOutcome::Added { .. }) => {
                    added.fetch_add(1, Ordering::Relaxed);
                }
                Ok(AddOutcome::Skipped) => {
                    skipped.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) if !err.is_fatal() => {
                    let human = humanize_error(&err);
                    warn!(error = %err, suggestion = %human.suggestion, "{}", human.message);
                    failed.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => return Err(err),
            }
            Ok(())
        })?;

        let report = AddReport {
            added: added.into_inner(),
            skipped: skipped.into_inner(),
            failed: failed.into_inner(),
        };
        info!(
            added = report.added,
            skipped = report.skipped,
            failed = report.failed,
            "Indexing finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use image::{DynamicImage, Rgb, RgbImage};

    use super::*;
    use crate::options::Options;

    fn write_png(path: &Path) {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(24, 16, Rgb([10, 20, 30])))
            .save(path)
            .unwrap();
    }

    fn album() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();
        write_png(&dir.path().join("c.png"));
        write_png(&dir.path().join("a.png"));
        write_png(&dir.path().join("b").join("d.png"));
        std::fs::write(dir.path().join("notes.txt"), "not a picture").unwrap();
        dir
    }

    #[test]
    fn directory_mode_walks_sorted_and_skips_non_images() {
        let dir = album();
        let found: Vec<PathBuf> = Indexer::new(IndexMode::Directory, 1)
            .discover(&[dir.path()])
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.png"),
                PathBuf::from("b/d.png"),
                PathBuf::from("c.png")
            ]
        );
    }

    #[test]
    fn missing_directory_is_a_discovery_error() {
        let found = Indexer::default().discover(&[Path::new("/nonexistent/picturebook")]);
        assert_eq!(found.len(), 1);
        assert!(matches!(found[0], Err(PicturebookError::Discovery(_))));
    }

    #[test]
    fn file_list_ignores_blanks_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.txt");
        std::fs::write(&list, "# holiday\n/p/one.jpg\n\n  /p/two.png  \n").unwrap();

        let found: Vec<PathBuf> = Indexer::new(IndexMode::FileList, 1)
            .discover(&[&list])
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(
            found,
            vec![PathBuf::from("/p/one.jpg"), PathBuf::from("/p/two.png")]
        );
    }

    #[test]
    fn files_mode_passes_sources_through() {
        let found = Indexer::new(IndexMode::Files, 1).discover(&["x.tiff", "y.jpg"]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].as_ref().unwrap(), Path::new("x.tiff"));
    }

    #[test]
    fn single_worker_visits_in_discovery_order() {
        let dir = album();
        let seen = Mutex::new(Vec::new());
        Indexer::new(IndexMode::Directory, 1)
            .index_paths(&[dir.path()], |candidate| {
                seen.lock().unwrap().push(candidate?);
                Ok(())
            })
            .unwrap();

        let seen = seen.into_inner().unwrap();
        let expected: Vec<PathBuf> = Indexer::new(IndexMode::Directory, 1)
            .discover(&[dir.path()])
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn add_pictures_counts_outcomes() {
        let dir = album();
        std::fs::write(dir.path().join("broken.jpg"), b"garbage").unwrap();

        let book = PictureBook::new(
            Options::default()
                .with_filter(|path: &Path| -> Result<bool> { Ok(!path.ends_with("c.png")) }),
        )
        .unwrap();
        let report = book
            .add_pictures(&Indexer::new(IndexMode::Directory, 4), &[dir.path()])
            .unwrap();

        assert_eq!(
            report,
            AddReport {
                added: 2,
                skipped: 1,
                failed: 1
            }
        );
        assert_eq!(book.page_count(), 2);
    }

    #[test]
    fn fatal_errors_stop_the_run() {
        let dir = album();
        let misconfigured = |_: &Path| -> Result<bool> {
            Err(PicturebookError::InvalidPattern {
                pattern: "(".into(),
                reason: "unclosed group".into(),
            })
        };
        let book = PictureBook::new(Options::default().with_filter(misconfigured)).unwrap();

        let err = book
            .add_pictures(&Indexer::new(IndexMode::Directory, 2), &[dir.path()])
            .unwrap_err();
        assert!(matches!(err, PicturebookError::InvalidPattern { .. }));
        assert_eq!(book.page_count(), 0);
    }
}
