// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pre-processors — produce derived copies of an image (rotated, halftoned)
// that are placed on the page instead of the original.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use picturebook_core::error::{PicturebookError, Result};
use picturebook_core::{HalftoneMode, PreProcessMode};
use tracing::{debug, instrument};

use crate::image::processor::ImageProcessor;

/// Transforms an image before it is laid out.
///
/// `Ok(None)` (or returning the input path) means nothing needed to change.
/// `Ok(Some(path))` names a new, independently readable image file; the book
/// takes ownership of it and deletes it after saving.
pub trait PreProcessor: Send + Sync {
    fn process(&self, path: &Path) -> Result<Option<PathBuf>>;
}

impl<F> PreProcessor for F
where
    F: Fn(&Path) -> Result<Option<PathBuf>> + Send + Sync,
{
    fn process(&self, path: &Path) -> Result<Option<PathBuf>> {
        self(path)
    }
}

/// Leaves every image as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl PreProcessor for Identity {
    fn process(&self, _path: &Path) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Build the pre-processor chain for a list of configured modes.
pub fn preprocessors_from_modes(
    modes: &[PreProcessMode],
    halftone: HalftoneMode,
) -> Vec<Arc<dyn PreProcessor>> {
    modes
        .iter()
        .map(|mode| -> Arc<dyn PreProcessor> {
            match mode {
                PreProcessMode::Rotate => Arc::new(RotatePreProcessor),
                PreProcessMode::Halftone => Arc::new(HalftonePreProcessor::new(halftone)),
            }
        })
        .collect()
}

/// Parse mode names and build the chain. An unknown name is a configuration
/// error.
pub fn preprocessors_from_strs<S: AsRef<str>>(
    names: &[S],
    halftone: HalftoneMode,
) -> Result<Vec<Arc<dyn PreProcessor>>> {
    let modes = names
        .iter()
        .map(|name| name.as_ref().parse())
        .collect::<Result<Vec<PreProcessMode>>>()?;
    Ok(preprocessors_from_modes(&modes, halftone))
}

// -- Rotation -----------------------------------------------------------------

/// Applies the EXIF orientation of JPEG files so photos taken sideways print
/// upright. Other formats, and JPEGs without an orientation tag, are left
/// alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct RotatePreProcessor;

impl PreProcessor for RotatePreProcessor {
    #[instrument(skip(self), fields(path = %path.display()))]
    fn process(&self, path: &Path) -> Result<Option<PathBuf>> {
        if !is_jpeg(path) {
            return Ok(None);
        }

        let orientation = match read_exif_orientation(path)? {
            Some(o) if o != 1 => o,
            _ => return Ok(None),
        };

        debug!(orientation, "Rotating according to EXIF orientation");
        let derived = ImageProcessor::open(path)?
            .apply_orientation(orientation)
            .write_temp()?;
        Ok(Some(derived))
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
}

/// Read the EXIF orientation tag. `None` when the file carries no EXIF data or
/// no orientation.
pub fn read_exif_orientation(path: &Path) -> Result<Option<u32>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let exif = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(exif::Error::Io(err)) => return Err(err.into()),
        Err(_) => return Ok(None),
    };

    Ok(exif
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0)))
}

// -- Halftone -----------------------------------------------------------------

/// Replaces the image with a halftoned copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct HalftonePreProcessor {
    mode: HalftoneMode,
}

impl HalftonePreProcessor {
    pub fn new(mode: HalftoneMode) -> Self {
        Self { mode }
    }
}

impl PreProcessor for HalftonePreProcessor {
    #[instrument(skip(self), fields(path = %path.display(), mode = ?self.mode))]
    fn process(&self, path: &Path) -> Result<Option<PathBuf>> {
        let derived = ImageProcessor::open(path)?.halftone(self.mode).write_temp()?;
        Ok(Some(derived))
    }
}

/// Wrap a pre-processor failure as a per-image error, keeping configuration
/// errors fatal.
pub(crate) fn per_image(path: &Path, err: PicturebookError) -> PicturebookError {
    match err.class() {
        picturebook_core::ErrorClass::Configuration => err,
        _ => PicturebookError::PreProcess {
            path: path.to_path_buf(),
            reason: err.to_string(),
        },
    }
}
