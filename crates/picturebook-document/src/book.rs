// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Picture book — the document being assembled.
//
// A `PictureBook` is shared by reference across worker threads. The rendered
// pages, their images and the page counter live behind one mutex so that
// allocating a page number and emitting its page is a single step. The
// `PdfDocument` itself is only assembled when the book is saved, which
// consumes the book.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use picturebook_core::error::{PicturebookError, Result};
use printpdf::{
    ImageOptimizationOptions, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, RawImage, XObject,
    XObjectId,
};
use tracing::{debug, info, instrument, warn};

use crate::cleanup::{CleanupHandle, TempFiles};
use crate::layout::PageGeometry;
use crate::options::Options;
use crate::render::PageRenderer;

/// Title written into the PDF /Info dictionary.
const DOCUMENT_TITLE: &str = "Picture Book";

/// What happened to one candidate path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The picture became page `page` (1-based).
    Added { page: u32 },
    /// The filter rejected the path.
    Skipped,
}

/// Totals for a batch of paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddReport {
    pub added: usize,
    pub skipped: usize,
    /// Paths that failed with a recoverable error.
    pub failed: usize,
}

/// Mutable document state, only reachable through the book's lock.
pub(crate) struct BookState {
    pub(crate) pages: Vec<PdfPage>,
    /// Print-resolution pixels for every page, keyed by the id its page uses.
    pub(crate) images: Vec<(XObjectId, RawImage)>,
    /// Number of the last page emitted; 0 while empty.
    pub(crate) page_count: u32,
}

/// A PDF picture book under construction.
pub struct PictureBook {
    pub(crate) options: Options,
    pub(crate) geometry: PageGeometry,
    pub(crate) renderer: PageRenderer,
    state: Mutex<BookState>,
    pub(crate) temp_files: TempFiles,
}

impl fmt::Debug for PictureBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PictureBook")
            .field("options", &self.options)
            .field("geometry", &self.geometry)
            .field("pages", &self.page_count())
            .field("temp_files", &self.temp_files.len())
            .finish()
    }
}

impl PictureBook {
    /// Create an empty book. Fails when the options leave no positive canvas.
    #[instrument(skip_all)]
    pub fn new(options: Options) -> Result<Self> {
        options.check()?;
        let geometry = PageGeometry::new(&options.page, options.dpi)?;
        let renderer = PageRenderer::new(geometry, options.border, options.caption_style.clone());

        info!(
            page_width_in = geometry.page_width_in,
            page_height_in = geometry.page_height_in,
            dpi = geometry.dpi,
            canvas_width = geometry.canvas.width,
            canvas_height = geometry.canvas.height,
            "Picture book created"
        );

        Ok(Self {
            options,
            geometry,
            renderer,
            state: Mutex::new(BookState {
                pages: Vec::new(),
                images: Vec::new(),
                page_count: 0,
            }),
            temp_files: TempFiles::new(),
        })
    }

    /// Pages emitted so far.
    pub fn page_count(&self) -> u32 {
        self.lock_state().page_count
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Nothing panics while holding the lock, so a poisoned state is still
    /// consistent.
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, BookState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Serialise the book to `path`.
    ///
    /// The PDF is written to a temporary file next to `path` and renamed into
    /// place, so a failed save never leaves a partial file behind. Temporary
    /// images are then removed in the background; see
    /// [`SavedBook::wait_for_cleanup`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(self, path: impl AsRef<Path>) -> Result<SavedBook> {
        let path = path.as_ref();
        let Self {
            state, temp_files, ..
        } = self;
        let BookState {
            pages,
            images,
            page_count,
        } = state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if pages.is_empty() {
            warn!("Saving a picture book with no pages");
        }

        let mut doc = PdfDocument::new(DOCUMENT_TITLE);
        doc.resources.xobjects.map.extend(
            images
                .into_iter()
                .map(|(id, image)| (id, XObject::Image(image))),
        );
        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = doc.save(&save_options(), &mut warnings);
        if !warnings.is_empty() {
            debug!(warnings = warnings.len(), "PDF serialised with warnings");
        }
        if bytes.is_empty() {
            return Err(PicturebookError::Pdf("serialiser produced no output".into()));
        }

        write_atomically(path, &bytes)?;
        info!(pages = page_count, bytes = bytes.len(), "Picture book saved");

        Ok(SavedBook {
            path: path.to_path_buf(),
            pages: page_count,
            cleanup: temp_files.dispatch(),
        })
    }
}

/// A book that has been written to disk.
#[derive(Debug)]
pub struct SavedBook {
    path: PathBuf,
    pages: u32,
    cleanup: CleanupHandle,
}

impl SavedBook {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> u32 {
        self.pages
    }

    /// Block until the temporary images have been removed.
    pub fn wait_for_cleanup(self) {
        self.cleanup.wait();
    }
}

/// Images are already at print resolution, so printpdf must not downsample
/// them to its default size cap.
fn save_options() -> PdfSaveOptions {
    PdfSaveOptions {
        image_optimization: Some(ImageOptimizationOptions {
            max_image_size: None,
            ..ImageOptimizationOptions::default()
        }),
        ..PdfSaveOptions::default()
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::Builder::new()
        .prefix(".picturebook-")
        .suffix(".pdf.part")
        .tempfile_in(dir)
        .map_err(|err| {
            PicturebookError::TempFile(format!("cannot stage output in {}: {err}", dir.display()))
        })?;

    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged
        .persist(path)
        .map_err(|err| PicturebookError::Io(err.error))?;
    Ok(())
}
