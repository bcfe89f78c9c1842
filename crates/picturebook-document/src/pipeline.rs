// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-image pipeline: filter → pre-process → caption → decode → layout → page.
//
// Everything up to layout runs on the caller's thread without touching the
// book's lock. Only page-number allocation and rendering are serialised.

use std::path::{Path, PathBuf};

use picturebook_core::ErrorClass;
use picturebook_core::error::{PicturebookError, Result};
use printpdf::XObjectId;
use tracing::{debug, info, instrument};

use crate::book::{AddOutcome, PictureBook};
use crate::image::ImageProcessor;
use crate::preprocess::per_image;
use crate::render::PageDescriptor;

impl PictureBook {
    /// Run one image through the pipeline and append it as the next page.
    ///
    /// Safe to call from many threads at once. Errors concern this path only;
    /// the book stays usable.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn add_picture(&self, path: &Path) -> Result<AddOutcome> {
        let accepted = self
            .options
            .filter
            .accepts(path)
            .map_err(|err| hook_error(err, |reason| PicturebookError::Filter {
                path: path.to_path_buf(),
                reason,
            }))?;
        if !accepted {
            debug!("Rejected by filter");
            return Ok(AddOutcome::Skipped);
        }

        let working = self.preprocess(path)?;

        let caption = self
            .options
            .caption
            .caption_for(path)
            .map_err(|err| match err {
                PicturebookError::Caption { .. } => err,
                other => hook_error(other, |reason| PicturebookError::Caption {
                    path: path.to_path_buf(),
                    reason,
                }),
            })?;

        let image = ImageProcessor::open(&working)?;
        let (natural_width, natural_height) = (image.width(), image.height());
        let placement = self
            .geometry
            .place(f64::from(natural_width), f64::from(natural_height))?;
        // One canvas unit is one pixel at the book's DPI, so the placement
        // size is the print resolution.
        let raw = image
            .resize_to(
                placement.width.round() as u32,
                placement.height.round() as u32,
            )
            .into_raw_image();
        let image_id = XObjectId::new();

        let page_number = {
            let mut state = self.lock_state();
            let page_number = state.page_count + 1;
            let descriptor = PageDescriptor {
                page_number,
                source: path.to_path_buf(),
                natural_width,
                natural_height,
                placement,
                caption,
            };

            let page = self.renderer.render(&image_id, &descriptor, &raw)?;
            state.pages.push(page);
            state.images.push((image_id, raw));
            state.page_count = page_number;

            if self.options.debug {
                info!(
                    page = page_number,
                    natural_width,
                    natural_height,
                    width = placement.width,
                    height = placement.height,
                    x = placement.x,
                    y = placement.y,
                    caption = %descriptor.caption,
                    "Page layout"
                );
            }
            page_number
        };

        debug!(page = page_number, "Picture added");
        Ok(AddOutcome::Added { page: page_number })
    }

    /// Run the pre-processor chain, registering every derived file for
    /// cleanup. Returns the path to decode.
    fn preprocess(&self, original: &Path) -> Result<PathBuf> {
        let mut current = original.to_path_buf();

        for preprocessor in &self.options.preprocessors {
            match preprocessor.process(&current) {
                Ok(Some(derived)) if derived != current => {
                    self.temp_files.register(derived.clone());
                    current = derived;
                }
                Ok(_) => {}
                Err(err) => return Err(per_image(original, err)),
            }
        }

        Ok(current)
    }
}

/// Hook failures skip the path unless they are configuration errors.
fn hook_error(
    err: PicturebookError,
    wrap: impl FnOnce(String) -> PicturebookError,
) -> PicturebookError {
    match err.class() {
        ErrorClass::Configuration => err,
        _ => wrap(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use image::{DynamicImage, Rgb, RgbImage};

    use super::*;
    use crate::options::Options;
    use crate::preprocess::{PreProcessor, RotatePreProcessor};
    use crate::preprocess::tests::write_oriented_jpeg;

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 140, 200])))
            .save(&path)
            .unwrap();
        path
    }

    fn io_error(what: &str) -> PicturebookError {
        PicturebookError::Io(std::io::Error::other(what.to_string()))
    }

    #[test]
    fn first_picture_is_page_one() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "a.png", 60, 40);

        let book = PictureBook::new(Options::default().with_debug(true)).unwrap();
        assert_eq!(book.add_picture(&png).unwrap(), AddOutcome::Added { page: 1 });
        assert_eq!(book.add_picture(&png).unwrap(), AddOutcome::Added { page: 2 });
        assert_eq!(book.page_count(), 2);
    }

    #[test]
    fn rejecting_filter_adds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "a.png", 60, 40);

        let book = PictureBook::new(
            Options::default().with_filter(|_: &Path| -> Result<bool> { Ok(false) }),
        )
        .unwrap();
        assert_eq!(book.add_picture(&png).unwrap(), AddOutcome::Skipped);
        assert_eq!(book.page_count(), 0);
    }

    #[test]
    fn filter_errors_are_recoverable() {
        let book = PictureBook::new(
            Options::default().with_filter(|_: &Path| -> Result<bool> { Err(io_error("boom")) }),
        )
        .unwrap();
        let err = book.add_picture(Path::new("a.png")).unwrap_err();
        assert!(matches!(err, PicturebookError::Filter { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn filtered_failed_and_good_paths_yield_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let filtered = write_png(dir.path(), "filtered.png", 30, 30);
        let broken = write_png(dir.path(), "broken.png", 30, 30);
        let good = write_png(dir.path(), "good.png", 30, 30);

        let options = Options::default()
            .with_filter(|path: &Path| -> Result<bool> { Ok(!path.ends_with("filtered.png")) })
            .with_preprocessor(|path: &Path| -> Result<Option<PathBuf>> {
                if path.ends_with("broken.png") {
                    Err(io_error("cannot rotate"))
                } else {
                    Ok(None)
                }
            });
        let book = PictureBook::new(options).unwrap();

        assert_eq!(book.add_picture(&filtered).unwrap(), AddOutcome::Skipped);
        let err = book.add_picture(&broken).unwrap_err();
        assert!(matches!(err, PicturebookError::PreProcess { .. }));
        assert!(!err.is_fatal());
        assert_eq!(book.add_picture(&good).unwrap(), AddOutcome::Added { page: 1 });
        assert_eq!(book.page_count(), 1);
    }

    #[test]
    fn undecodable_image_does_not_consume_a_page_number() {
        let dir = tempfile::tempdir().unwrap();
        let junk = dir.path().join("junk.png");
        std::fs::write(&junk, b"not an image").unwrap();
        let good = write_png(dir.path(), "good.png", 30, 30);

        let book = PictureBook::new(Options::default()).unwrap();
        let err = book.add_picture(&junk).unwrap_err();
        assert!(matches!(err, PicturebookError::ImageInfoUnavailable { .. }));
        assert_eq!(book.add_picture(&good).unwrap(), AddOutcome::Added { page: 1 });
    }

    #[test]
    fn caption_errors_are_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "a.png", 30, 30);

        let book = PictureBook::new(
            Options::default()
                .with_caption(|_: &Path| -> Result<String> { Err(io_error("no metadata")) }),
        )
        .unwrap();
        let err = book.add_picture(&png).unwrap_err();
        assert!(matches!(err, PicturebookError::Caption { .. }));
        assert_eq!(book.page_count(), 0);
    }

    #[test]
    fn concurrent_adds_number_pages_without_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..12)
            .map(|i| write_png(dir.path(), &format!("{i}.png"), 20 + i, 30))
            .collect();

        let book = PictureBook::new(Options::default()).unwrap();
        let pages: Vec<u32> = std::thread::scope(|scope| {
            let handles: Vec<_> = paths
                .iter()
                .map(|path| {
                    let book = &book;
                    scope.spawn(move || match book.add_picture(path).unwrap() {
                        AddOutcome::Added { page } => page,
                        AddOutcome::Skipped => panic!("nothing should be skipped"),
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let unique: HashSet<u32> = pages.iter().copied().collect();
        assert_eq!(unique.len(), 12);
        assert_eq!(unique, (1..=12).collect::<HashSet<u32>>());
        assert_eq!(book.page_count(), 12);
    }

    #[test]
    fn saved_pdf_has_one_page_per_picture() {
        let dir = tempfile::tempdir().unwrap();
        let book = PictureBook::new(Options::default()).unwrap();
        for (i, (w, h)) in [(60, 40), (40, 60), (3000, 2000)].into_iter().enumerate() {
            let png = write_png(dir.path(), &format!("{i}.png"), w, h);
            book.add_picture(&png).unwrap();
        }

        let out = dir.path().join("book.pdf");
        let saved = book.save(&out).unwrap();
        assert_eq!(saved.page_count(), 3);
        saved.wait_for_cleanup();

        let pdf = lopdf::Document::load(&out).unwrap();
        assert_eq!(pdf.get_pages().len(), 3);
    }

    /// Pixel sizes of every image XObject in a saved PDF.
    fn embedded_image_sizes(path: &Path) -> Vec<(i64, i64)> {
        let pdf = lopdf::Document::load(path).unwrap();
        pdf.objects
            .values()
            .filter_map(|object| object.as_stream().ok())
            .filter(|stream| {
                stream
                    .dict
                    .get(b"Subtype")
                    .and_then(|subtype| subtype.as_name())
                    .is_ok_and(|name| name == b"Image")
            })
            .map(|stream| {
                let width = stream.dict.get(b"Width").unwrap().as_i64().unwrap();
                let height = stream.dict.get(b"Height").unwrap().as_i64().unwrap();
                (width, height)
            })
            .collect()
    }

    #[test]
    fn images_are_embedded_at_print_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "wide.png", 3000, 2000);

        // Letter portrait at 300 dpi: 6.5in usable width is 1950 pixels.
        let book = PictureBook::new(Options::default().with_dpi(300.0)).unwrap();
        book.add_picture(&png).unwrap();
        let out = dir.path().join("hi.pdf");
        book.save(&out).unwrap().wait_for_cleanup();
        assert_eq!(embedded_image_sizes(&out), vec![(1950, 1300)]);

        let book = PictureBook::new(Options::default()).unwrap();
        book.add_picture(&png).unwrap();
        let out = dir.path().join("lo.pdf");
        book.save(&out).unwrap().wait_for_cleanup();
        assert_eq!(embedded_image_sizes(&out), vec![(975, 650)]);
    }

    #[test]
    fn small_images_keep_their_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "small.png", 60, 40);

        let book = PictureBook::new(Options::default()).unwrap();
        book.add_picture(&png).unwrap();
        let out = dir.path().join("small.pdf");
        book.save(&out).unwrap().wait_for_cleanup();
        assert_eq!(embedded_image_sizes(&out), vec![(60, 40)]);
    }

    #[test]
    fn derived_images_are_removed_after_save() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "a.png", 40, 40);

        let derived: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
        let record = Arc::clone(&derived);
        let options = Options::default().with_preprocessor(
            move |path: &Path| -> Result<Option<PathBuf>> {
                let copy = ImageProcessor::open(path)?.write_temp()?;
                record.lock().unwrap().push(copy.clone());
                Ok(Some(copy))
            },
        );

        let book = PictureBook::new(options).unwrap();
        book.add_picture(&png).unwrap();
        book.add_picture(&png).unwrap();

        let created = derived.lock().unwrap().clone();
        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|p| p.exists()));

        let saved = book.save(dir.path().join("book.pdf")).unwrap();
        saved.wait_for_cleanup();
        assert!(created.iter().all(|p| !p.exists()));
        assert!(png.exists());
    }

    #[test]
    fn rotated_copy_is_tracked_and_removed_after_save() {
        let dir = tempfile::tempdir().unwrap();
        let jpg = write_oriented_jpeg(dir.path(), "sideways.jpg", 40, 20, 6);

        let derived: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
        let record = Arc::clone(&derived);
        let options = Options::default().with_preprocessor(
            move |path: &Path| -> Result<Option<PathBuf>> {
                let rotated = RotatePreProcessor.process(path)?;
                record.lock().unwrap().extend(rotated.clone());
                Ok(rotated)
            },
        );

        let book = PictureBook::new(options).unwrap();
        assert_eq!(book.add_picture(&jpg).unwrap(), AddOutcome::Added { page: 1 });
        assert_eq!(book.temp_files.len(), 1);

        let rotated = derived.lock().unwrap().clone();
        assert_eq!(rotated.len(), 1);
        assert!(rotated[0].exists());

        let out = dir.path().join("rotated.pdf");
        book.save(&out).unwrap().wait_for_cleanup();
        // The upright copy is 20x40, so the page image is portrait.
        assert_eq!(embedded_image_sizes(&out), vec![(20, 40)]);
        assert!(!rotated[0].exists());
        assert!(jpg.exists());
    }

    #[test]
    fn chain_feeds_each_output_to_the_next_step() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "a.png", 40, 40);
        let seen: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
        let record = Arc::clone(&seen);

        let options = Options::default()
            .with_preprocessor(|path: &Path| -> Result<Option<PathBuf>> {
                Ok(Some(ImageProcessor::open(path)?.write_temp()?))
            })
            .with_preprocessor(move |path: &Path| -> Result<Option<PathBuf>> {
                record.lock().unwrap().push(path.to_path_buf());
                Ok(Some(path.to_path_buf()))
            });

        let book = PictureBook::new(options).unwrap();
        book.add_picture(&png).unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_ne!(seen[0], png);
        // Returning the input path is "unchanged": only one file is tracked.
        assert_eq!(book.temp_files.len(), 1);
    }
}
