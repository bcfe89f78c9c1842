// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// picturebook-document — Assembles image files into a PDF picture book.
//
// Provides page geometry (fit and placement), the page renderer, the per-image
// pipeline with its filter, pre-process and caption hooks, directory discovery,
// and the `PictureBook` document that ties them together.

pub mod book;
pub mod caption;
pub mod cleanup;
pub mod filter;
pub mod image;
pub mod index;
pub mod layout;
pub mod options;
pub mod pipeline;
pub mod preprocess;
pub mod render;

// Re-export the primary types so callers can use `picturebook_document::PictureBook` etc.
pub use book::{AddOutcome, AddReport, PictureBook, SavedBook};
pub use caption::{CaptionProvider, caption_from_mode, caption_from_str};
pub use filter::{AcceptAll, Filter, RegexFilter};
pub use crate::image::ImageProcessor;
pub use index::Indexer;
pub use layout::{Border, Canvas, PageGeometry, Placement, fit, place};
pub use options::Options;
pub use preprocess::{PreProcessor, preprocessors_from_modes, preprocessors_from_strs};
pub use render::{CaptionStyle, PageDescriptor, PageRenderer};
