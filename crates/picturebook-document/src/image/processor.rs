// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode, orient, halftone, and write derived copies of
// source images. Operates on in-memory images using the `image` and
// `imageproc` crates.

use std::borrow::Cow;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, Luma};
use imageproc::contrast::otsu_level;
use picturebook_core::HalftoneMode;
use picturebook_core::error::{PicturebookError, Result};
use printpdf::{RawImage, RawImageData, RawImageFormat};
use tracing::{debug, info, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// Transformations consume `self` and return a new `ImageProcessor`, enabling
/// method chaining:
///
/// ```ignore
/// let derived = ImageProcessor::open("photo.jpg")?
///     .apply_orientation(6)
///     .halftone(HalftoneMode::Atkinson)
///     .write_temp()?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
    /// Encoding of the source file, reused for derived copies.
    format: Option<ImageFormat>,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode an image file, sniffing its format from the content.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |reason: String| PicturebookError::ImageInfoUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        let reader = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|err| unavailable(err.to_string()))?;
        let format = reader.format();
        let image = reader.decode().map_err(|err| unavailable(err.to_string()))?;

        debug!(
            width = image.width(),
            height = image.height(),
            ?format,
            "Image decoded"
        );
        Ok(Self { image, format })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage, format: Option<ImageFormat>) -> Self {
        Self { image, format }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Encoding the image was decoded from, if known.
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Apply an EXIF orientation value (1-8) so the image displays upright.
    /// Unknown values leave the image untouched.
    pub fn apply_orientation(self, orientation: u32) -> Self {
        let image = match orientation {
            2 => self.image.fliph(),
            3 => self.image.rotate180(),
            4 => self.image.flipv(),
            5 => self.image.rotate90().fliph(),
            6 => self.image.rotate90(),
            7 => self.image.rotate270().fliph(),
            8 => self.image.rotate270(),
            _ => self.image,
        };
        Self {
            image,
            format: self.format,
        }
    }

    /// Resample to exactly `width` x `height` pixels. Does nothing when the
    /// image already has that size.
    pub fn resize_to(self, width: u32, height: u32) -> Self {
        if (self.image.width(), self.image.height()) == (width, height) {
            return self;
        }
        debug!(
            from_width = self.image.width(),
            from_height = self.image.height(),
            width,
            height,
            "Resampling image"
        );
        Self {
            image: self
                .image
                .resize_exact(width.max(1), height.max(1), FilterType::CatmullRom),
            format: self.format,
        }
    }

    /// Halftone the image.
    ///
    /// The image is reduced to half size, converted to grayscale, dithered, and
    /// scaled back up to its original dimensions so the dots stay visible in
    /// print.
    #[instrument(skip(self), fields(width = self.image.width(), height = self.image.height()))]
    pub fn halftone(self, mode: HalftoneMode) -> Self {
        let (width, height) = (self.image.width(), self.image.height());
        info!(?mode, "Halftoning image");

        let thumb = self
            .image
            .resize((width / 2).max(1), (height / 2).max(1), FilterType::Lanczos3);
        let gray = thumb.to_luma8();

        let dithered = match mode {
            HalftoneMode::Atkinson => atkinson(&gray),
            HalftoneMode::Threshold => threshold(&gray, otsu_level(&gray)),
        };

        let restored =
            DynamicImage::ImageLuma8(dithered).resize_exact(width, height, FilterType::Lanczos3);
        debug!("Halftone complete");

        Self {
            image: restored,
            format: self.format,
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Write the image to a new temporary file, encoded like the source where
    /// possible, and return its path.
    ///
    /// The file is not deleted automatically; whoever requested the derived
    /// copy owns it.
    pub fn write_temp(&self) -> Result<PathBuf> {
        let format = match self.format {
            Some(f @ (ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif)) => f,
            _ => ImageFormat::Png,
        };
        let extension = format.extensions_str().first().copied().unwrap_or("png");

        let mut file = tempfile::Builder::new()
            .prefix("picturebook-")
            .suffix(&format!(".{extension}"))
            .tempfile()
            .map_err(|err| PicturebookError::TempFile(err.to_string()))?;

        let encodable = encodable_for(&self.image, format);
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            encodable.write_to(&mut writer, format).map_err(|err| {
                PicturebookError::TempFile(format!("image encoding failed: {err}"))
            })?;
        }

        let path = file
            .into_temp_path()
            .keep()
            .map_err(|err| PicturebookError::TempFile(err.to_string()))?;
        debug!(path = %path.display(), ?format, "Derived image written");
        Ok(path)
    }

    /// Convert to the raw RGB pixel form `printpdf` embeds.
    pub fn into_raw_image(self) -> RawImage {
        let width = self.image.width() as usize;
        let height = self.image.height() as usize;
        let rgb = self.image.into_rgb8();
        RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width,
            height,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        }
    }
}

/// Convert to a pixel layout the target encoder accepts.
fn encodable_for(image: &DynamicImage, format: ImageFormat) -> Cow<'_, DynamicImage> {
    match (format, image) {
        (ImageFormat::Jpeg, DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_)) => {
            Cow::Borrowed(image)
        }
        (ImageFormat::Jpeg, _) => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        (ImageFormat::Gif, DynamicImage::ImageRgba8(_)) => Cow::Borrowed(image),
        (ImageFormat::Gif, _) => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
        _ => Cow::Borrowed(image),
    }
}

// -- Dithering ----------------------------------------------------------------

/// Atkinson error diffusion. Spreads 6/8 of the quantisation error to six
/// neighbours, which keeps highlights and shadows crisp.
fn atkinson(gray: &GrayImage) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (w, h) = (width as i64, height as i64);
    let mut levels: Vec<f32> = gray.pixels().map(|p| p.0[0] as f32).collect();

    const NEIGHBOURS: [(i64, i64); 6] = [(1, 0), (2, 0), (-1, 1), (0, 1), (1, 1), (0, 2)];

    let mut output = GrayImage::new(width, height);
    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            let old = levels[idx];
            let new = if old < 128.0 { 0.0 } else { 255.0 };
            let error = (old - new) / 8.0;
            output.put_pixel(x as u32, y as u32, Luma([new as u8]));

            for (dx, dy) in NEIGHBOURS {
                let (nx, ny) = (x + dx, y + dy);
                if nx >= 0 && nx < w && ny < h {
                    levels[(ny * w + nx) as usize] += error;
                }
            }
        }
    }
    output
}

fn threshold(gray: &GrayImage, level: u8) -> GrayImage {
    let mut output = gray.clone();
    for pixel in output.pixels_mut() {
        pixel.0[0] = if pixel.0[0] <= level { 0 } else { 255 };
    }
    output
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    use super::*;

    fn striped(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, _| {
            let v = ((x * 255) / width.max(1)) as u8;
            Rgb([v, v, v])
        }))
    }

    #[test]
    fn orientation_6_turns_portrait_into_landscape() {
        let processor = ImageProcessor::from_dynamic(striped(10, 20), None);
        let rotated = processor.apply_orientation(6);
        assert_eq!((rotated.width(), rotated.height()), (20, 10));
    }

    #[test]
    fn orientation_1_and_unknown_are_identity() {
        let processor = ImageProcessor::from_dynamic(striped(10, 20), None);
        let same = processor.apply_orientation(1).apply_orientation(42);
        assert_eq!((same.width(), same.height()), (10, 20));
    }

    #[test]
    fn atkinson_output_is_binary() {
        let gray = striped(32, 8).to_luma8();
        let dithered = atkinson(&gray);
        assert!(dithered.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        // A left-to-right gradient has both black and white dots.
        assert!(dithered.pixels().any(|p| p.0[0] == 0));
        assert!(dithered.pixels().any(|p| p.0[0] == 255));
    }

    #[test]
    fn threshold_splits_at_level() {
        let gray = GrayImage::from_fn(4, 1, |x, _| Luma([(x * 80) as u8]));
        let out = threshold(&gray, 100);
        let values: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![0, 0, 255, 255]);
    }

    #[test]
    fn halftone_preserves_dimensions() {
        let processor = ImageProcessor::from_dynamic(striped(41, 17), Some(ImageFormat::Png));
        let out = processor.halftone(HalftoneMode::Threshold);
        assert_eq!((out.width(), out.height()), (41, 17));
        assert_eq!(out.format(), Some(ImageFormat::Png));
    }

    #[test]
    fn write_temp_round_trips_through_open() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(12, 7, Rgba([10, 20, 30, 255])));
        let processor = ImageProcessor::from_dynamic(image, Some(ImageFormat::Jpeg));

        let path = processor.write_temp().unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));

        let reopened = ImageProcessor::open(&path).unwrap();
        assert_eq!((reopened.width(), reopened.height()), (12, 7));
        assert_eq!(reopened.format(), Some(ImageFormat::Jpeg));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn open_reports_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-an-image.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = ImageProcessor::open(&path).err().unwrap();
        assert!(matches!(err, PicturebookError::ImageInfoUnavailable { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn resize_to_hits_exact_size() {
        let processor = ImageProcessor::from_dynamic(striped(300, 200), Some(ImageFormat::Png));
        let out = processor.resize_to(150, 100);
        assert_eq!((out.width(), out.height()), (150, 100));
        assert_eq!(out.format(), Some(ImageFormat::Png));

        let same = out.resize_to(150, 100);
        assert_eq!((same.width(), same.height()), (150, 100));
    }

    #[test]
    fn raw_image_is_rgb8() {
        let raw = ImageProcessor::from_dynamic(striped(3, 2), None).into_raw_image();
        assert_eq!((raw.width, raw.height), (3, 2));
        match raw.pixels {
            RawImageData::U8(bytes) => assert_eq!(bytes.len(), 3 * 2 * 3),
            _ => panic!("expected 8-bit pixels"),
        }
    }
}
