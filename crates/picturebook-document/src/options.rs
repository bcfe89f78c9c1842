// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Book options — the immutable settings a `PictureBook` is built from.

use std::fmt;
use std::sync::Arc;

use picturebook_core::error::{PicturebookError, Result};
use picturebook_core::{BookConfig, Orientation, PageSetup, PaperSize};

use crate::caption::{CaptionProvider, FilenameCaption, caption_from_mode};
use crate::filter::{AcceptAll, Filter, RegexFilter};
use crate::preprocess::{PreProcessor, preprocessors_from_modes};
use crate::render::CaptionStyle;

/// Everything a book needs to lay out and render pages.
///
/// Hooks are shared trait objects, so options can be cloned cheaply and the
/// same filter or caption provider can back several books.
#[derive(Clone)]
pub struct Options {
    pub page: PageSetup,
    /// Layout resolution in dots per inch.
    pub dpi: f64,
    /// Thickness of the frame drawn around each image, in inches.
    pub border: f64,
    /// Log per-page layout decisions at `info`.
    pub debug: bool,
    pub filter: Arc<dyn Filter>,
    /// Applied in order; each one sees the previous one's output.
    pub preprocessors: Vec<Arc<dyn PreProcessor>>,
    pub caption: Arc<dyn CaptionProvider>,
    pub caption_style: CaptionStyle,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            page: PageSetup::new(Orientation::Portrait, PaperSize::Letter),
            dpi: 150.0,
            border: 0.01,
            debug: false,
            filter: Arc::new(AcceptAll),
            preprocessors: Vec::new(),
            caption: Arc::new(FilenameCaption),
            caption_style: CaptionStyle::default(),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("page", &self.page)
            .field("dpi", &self.dpi)
            .field("border", &self.border)
            .field("debug", &self.debug)
            .field("preprocessors", &self.preprocessors.len())
            .field("caption_style", &self.caption_style)
            .finish_non_exhaustive()
    }
}

impl Options {
    /// Build options from a configuration, resolving every mode string and
    /// compiling the include/exclude patterns. Any failure here is a
    /// configuration error and no book is created.
    pub fn from_config(config: &BookConfig) -> Result<Self> {
        config.validate()?;

        let filter: Arc<dyn Filter> = if config.include.is_empty() && config.exclude.is_empty() {
            Arc::new(AcceptAll)
        } else {
            Arc::new(RegexFilter::new(&config.include, &config.exclude)?)
        };

        Ok(Self {
            page: config.page_setup()?,
            dpi: config.dpi,
            border: config.border,
            debug: config.debug,
            filter,
            preprocessors: preprocessors_from_modes(&config.pre_process, config.halftone),
            caption: caption_from_mode(config.caption),
            caption_style: CaptionStyle::default(),
        })
    }

    pub fn with_page(mut self, page: PageSetup) -> Self {
        self.page = page;
        self
    }

    pub fn with_dpi(mut self, dpi: f64) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_border(mut self, border: f64) -> Self {
        self.border = border;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Append a pre-processor to the end of the chain.
    pub fn with_preprocessor(mut self, preprocessor: impl PreProcessor + 'static) -> Self {
        self.preprocessors.push(Arc::new(preprocessor));
        self
    }

    pub fn with_caption(mut self, caption: impl CaptionProvider + 'static) -> Self {
        self.caption = Arc::new(caption);
        self
    }

    pub fn with_caption_style(mut self, style: CaptionStyle) -> Self {
        self.caption_style = style;
        self
    }

    /// Reject values that would make layout meaningless.
    pub(crate) fn check(&self) -> Result<()> {
        if !(self.dpi.is_finite() && self.dpi > 0.0) {
            return Err(PicturebookError::InvalidDimensions(format!(
                "dpi must be positive, got {}",
                self.dpi
            )));
        }
        if !(self.border.is_finite() && self.border >= 0.0) {
            return Err(PicturebookError::InvalidDimensions(format!(
                "border must not be negative, got {}",
                self.border
            )));
        }
        Ok(())
    }
}
