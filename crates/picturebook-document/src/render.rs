// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page renderer — turns one laid-out picture into a `printpdf` 0.8 page.
//
// printpdf 0.8 uses a data-oriented API: pages are `PdfPage` structs holding
// `Vec<Op>` operation lists, and images are referenced by `XObjectId`. The
// book keeps the images itself and registers them on a `PdfDocument` at save
// time. Layout works top-down in canvas units; PDF space is bottom-up in
// points, so every y coordinate is flipped here.

use std::path::PathBuf;

use picturebook_core::error::{PicturebookError, Result};
use printpdf::{
    BuiltinFont, Color, LinePoint, Mm, Op, PaintMode, PdfPage, Point, Polygon,
    PolygonRing, Pt, RawImage, Rgb, TextItem, WindingOrder, XObjectId, XObjectTransform,
};
use tracing::{debug, instrument};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::layout::{PageGeometry, Placement};

/// Space between the bottom of the frame and the top of the caption line.
const CAPTION_GAP_PT: f32 = 6.0;

/// Width of the frame's outline stroke.
const FRAME_STROKE_PT: f32 = 0.5;

/// One page's worth of layout, built per image and discarded after rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDescriptor {
    pub page_number: u32,
    pub source: PathBuf,
    pub natural_width: u32,
    pub natural_height: u32,
    pub placement: Placement,
    /// Caption as supplied by the caption provider; empty for none.
    pub caption: String,
}

/// Font, size and colour for captions. Fixed for a book's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub font: BuiltinFont,
    pub size: Pt,
    /// RGB components in 0.0..=1.0.
    pub color: (f32, f32, f32),
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font: BuiltinFont::Helvetica,
            size: Pt(10.0),
            color: (0.0, 0.0, 0.0),
        }
    }
}

/// Builds one `PdfPage` per placed image.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    geometry: PageGeometry,
    /// Frame thickness around each image, in inches.
    border_in: f64,
    caption_style: CaptionStyle,
}

impl PageRenderer {
    pub fn new(geometry: PageGeometry, border_in: f64, caption_style: CaptionStyle) -> Self {
        Self {
            geometry,
            border_in,
            caption_style,
        }
    }

    /// Build the page showing `image`, which the caller stores under
    /// `image_id` until the document is serialised.
    #[instrument(skip_all, fields(page = descriptor.page_number, path = %descriptor.source.display()))]
    pub fn render(
        &self,
        image_id: &XObjectId,
        descriptor: &PageDescriptor,
        image: &RawImage,
    ) -> Result<PdfPage> {
        if image.width == 0 || image.height == 0 {
            return Err(PicturebookError::DegenerateImage {
                path: descriptor.source.clone(),
            });
        }

        let ops = self.page_ops(image_id, descriptor, image.width, image.height);

        debug!(ops = ops.len(), "Page rendered");
        Ok(PdfPage::new(
            Mm((self.geometry.page_width_in * 25.4) as f32),
            Mm((self.geometry.page_height_in * 25.4) as f32),
            ops,
        ))
    }

    /// Operation list for one page: frame, image, then caption.
    pub(crate) fn page_ops(
        &self,
        image_id: &XObjectId,
        descriptor: &PageDescriptor,
        pixel_width: usize,
        pixel_height: usize,
    ) -> Vec<Op> {
        let g = &self.geometry;
        let p = &descriptor.placement;
        let page_h = g.page_height_pt();

        let x = g.to_points(p.x);
        let w = g.to_points(p.width);
        let h = g.to_points(p.height);
        // Bottom edge of the image in PDF space.
        let y = page_h - g.to_points(p.bottom());
        let frame = (self.border_in * 72.0) as f32;

        let mut ops = vec![
            Op::SaveGraphicsState,
            Op::SetFillColor { col: black() },
            Op::SetOutlineColor { col: black() },
            Op::SetOutlineThickness {
                pt: Pt(FRAME_STROKE_PT),
            },
            Op::DrawPolygon {
                polygon: rectangle(x - frame, y - frame, w + frame * 2.0, h + frame * 2.0),
            },
            Op::RestoreGraphicsState,
            Op::UseXobject {
                id: image_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(x)),
                    translate_y: Some(Pt(y)),
                    // At the book's DPI one pixel is one canvas unit, so the
                    // scale is fitted size over embedded pixel size.
                    scale_x: Some((p.width / pixel_width as f64) as f32),
                    scale_y: Some((p.height / pixel_height as f64) as f32),
                    dpi: Some(g.dpi as f32),
                    rotate: None,
                },
            },
        ];

        let caption = transliterate(&descriptor.caption);
        if !caption.trim().is_empty() {
            let style = &self.caption_style;
            let (r, gr, b) = style.color;
            let baseline = y - frame - CAPTION_GAP_PT - style.size.0;

            ops.extend([
                Op::StartTextSection,
                Op::SetFillColor {
                    col: Color::Rgb(Rgb {
                        r,
                        g: gr,
                        b,
                        icc_profile: None,
                    }),
                },
                Op::SetTextCursor {
                    pos: Point {
                        x: Pt(x),
                        y: Pt(baseline),
                    },
                },
                Op::SetFontSizeBuiltinFont {
                    size: style.size,
                    font: style.font.clone(),
                },
                Op::WriteTextBuiltinFont {
                    items: vec![TextItem::Text(caption)],
                    font: style.font.clone(),
                },
                Op::EndTextSection,
            ]);
        }

        ops
    }
}

fn black() -> Color {
    Color::Rgb(Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        icc_profile: None,
    })
}

/// Filled and stroked rectangle with its lower-left corner at `(x, y)`.
fn rectangle(x: f32, y: f32, width: f32, height: f32) -> Polygon {
    let corner = |cx: f32, cy: f32| LinePoint {
        p: Point {
            x: Pt(cx),
            y: Pt(cy),
        },
        bezier: false,
    };

    Polygon {
        rings: vec![PolygonRing {
            points: vec![
                corner(x, y),
                corner(x + width, y),
                corner(x + width, y + height),
                corner(x, y + height),
            ],
        }],
        mode: PaintMode::FillStroke,
        winding_order: WindingOrder::NonZero,
    }
}

/// Reduce text to what the builtin PDF fonts can show.
///
/// Accents are stripped, typographic punctuation becomes its ASCII cousin, a
/// handful of letters are spelled out, and anything else unrepresentable
/// becomes `?`.
pub fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for c in text.nfkd() {
        if is_combining_mark(c) {
            continue;
        }
        match c {
            ' '..='~' => out.push(c),
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => out.push('"'),
            '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
            '\u{2022}' | '\u{00B7}' => out.push('*'),
            'ß' => out.push_str("ss"),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'þ' => out.push_str("th"),
            'Þ' => out.push_str("Th"),
            'ø' => out.push('o'),
            'Ø' => out.push('O'),
            'ł' => out.push('l'),
            'Ł' => out.push('L'),
            'đ' | 'ð' => out.push('d'),
            'Đ' | 'Ð' => out.push('D'),
            c if c.is_whitespace() => out.push(' '),
            _ => out.push('?'),
        }
    }

    out
}
