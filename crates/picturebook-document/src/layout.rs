// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page geometry — borders, the printable canvas, and fitting images onto it.
//
// All layout math happens in "canvas units": inches multiplied by the book's
// DPI, so an image's pixel dimensions can be compared with the canvas
// directly. Conversion to PDF points only happens at render time.

use picturebook_core::PageSetup;
use picturebook_core::error::{PicturebookError, Result};

/// Top border in inches; the other borders derive from it.
const BORDER_TOP_IN: f64 = 1.0;

/// The bottom border is taller to leave room for a caption line.
const BORDER_BOTTOM_FACTOR: f64 = 1.5;

/// Upper bound on shrink passes in [`fit`]. Two passes always suffice with
/// exact arithmetic; the rest absorbs floating-point rounding.
const MAX_FIT_PASSES: usize = 8;

/// Page margins in canvas units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Border {
    pub fn from_dpi(dpi: f64) -> Self {
        let top = BORDER_TOP_IN * dpi;
        Self {
            top,
            bottom: top * BORDER_BOTTOM_FACTOR,
            left: top,
            right: top,
        }
    }
}

/// Usable page area, in canvas units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

/// Final size and top-left position of an image on its page, in canvas units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
}

impl Placement {
    /// Bottom edge of the image, measured from the top of the page.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Everything about the page box that stays fixed for a book's lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Page width in inches.
    pub page_width_in: f64,
    /// Page height in inches.
    pub page_height_in: f64,
    pub dpi: f64,
    pub border: Border,
    pub canvas: Canvas,
}

impl PageGeometry {
    /// Derive borders and canvas for a page setup at the given resolution.
    pub fn new(setup: &PageSetup, dpi: f64) -> Result<Self> {
        let (w, h) = setup.dimensions_in();
        Self::from_inches(w, h, dpi)
    }

    pub fn from_inches(page_width_in: f64, page_height_in: f64, dpi: f64) -> Result<Self> {
        if !(dpi.is_finite() && dpi > 0.0) {
            return Err(PicturebookError::InvalidDimensions(format!(
                "dpi must be positive, got {dpi}"
            )));
        }

        let border = Border::from_dpi(dpi);
        let canvas = Canvas {
            width: page_width_in * dpi - (border.left + border.right),
            height: page_height_in * dpi - (border.top + border.bottom),
        };

        if !(canvas.width > 0.0 && canvas.height > 0.0) {
            return Err(PicturebookError::InvalidDimensions(format!(
                "a {page_width_in} x {page_height_in} in page leaves no canvas inside its borders"
            )));
        }

        Ok(Self {
            page_width_in,
            page_height_in,
            dpi,
            border,
            canvas,
        })
    }

    /// Fit and position an image of the given natural size on this page.
    pub fn place(&self, natural_width: f64, natural_height: f64) -> Result<Placement> {
        place(natural_width, natural_height, &self.canvas, &self.border)
    }

    /// Convert canvas units to PDF points.
    pub fn to_points(&self, units: f64) -> f32 {
        (units / self.dpi * 72.0) as f32
    }

    /// Page height in PDF points.
    pub fn page_height_pt(&self) -> f32 {
        (self.page_height_in * 72.0) as f32
    }
}

/// Shrink `(natural_width, natural_height)` until it fits inside
/// `(max_width, max_height)`, preserving the aspect ratio.
///
/// Sizes that already fit are returned unchanged; images are never enlarged.
/// Whichever bound was binding last is hit exactly.
pub fn fit(
    natural_width: f64,
    natural_height: f64,
    max_width: f64,
    max_height: f64,
) -> Result<(f64, f64)> {
    let usable = |v: f64| v.is_finite() && v > 0.0;

    if !usable(natural_width) || !usable(natural_height) {
        return Err(PicturebookError::ZeroDimension {
            width: natural_width,
            height: natural_height,
        });
    }
    if !usable(max_width) || !usable(max_height) {
        return Err(PicturebookError::InvalidDimensions(format!(
            "cannot fit into a {max_width} x {max_height} area"
        )));
    }

    let (mut w, mut h) = (natural_width, natural_height);

    for _ in 0..MAX_FIT_PASSES {
        if w <= max_width && h <= max_height {
            break;
        }
        if w > max_width {
            h = h * max_width / w;
            w = max_width;
        }
        if h > max_height {
            w = w * max_height / h;
            h = max_height;
        }
    }

    Ok((w.min(max_width), h.min(max_height)))
}

/// Fit an image to the canvas, then position it.
///
/// Horizontally the image is centred in the canvas. Vertically it sits one
/// top border further down when it is short enough to leave that room, and
/// directly under the top border otherwise.
pub fn place(
    natural_width: f64,
    natural_height: f64,
    canvas: &Canvas,
    border: &Border,
) -> Result<Placement> {
    let (width, height) = fit(natural_width, natural_height, canvas.width, canvas.height)?;

    let mut x = border.left;
    let mut y = border.top;

    if width < canvas.width {
        x += (canvas.width - width) / 2.0;
    }

    if height < canvas.height - border.top {
        y += border.top;
    }

    Ok(Placement {
        width,
        height,
        x,
        y,
    })
}
