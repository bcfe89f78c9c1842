// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Book configuration: the plain-data form of a picture book's options.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PicturebookError, Result};
use crate::types::{
    CaptionMode, HalftoneMode, IndexMode, Orientation, PageSetup, PaperSize, PreProcessMode,
};

/// Persistent picture book settings.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    /// Page orientation.
    pub orientation: Orientation,
    /// Paper size name (`letter`, `a4`, ... or `custom`).
    pub size: String,
    /// Page width in inches, used when `size` is `custom`.
    pub width: f64,
    /// Page height in inches, used when `size` is `custom`.
    pub height: f64,
    /// Layout resolution in dots per inch.
    pub dpi: f64,
    /// Thickness of the frame drawn around each image, in inches.
    pub border: f64,
    /// Caption source.
    pub caption: CaptionMode,
    /// Pre-processing steps, applied in order.
    pub pre_process: Vec<PreProcessMode>,
    /// Algorithm for the `halftone` step.
    pub halftone: HalftoneMode,
    /// Regexes that every included path must match.
    pub include: Vec<String>,
    /// Regexes that exclude a path when any of them match.
    pub exclude: Vec<String>,
    /// How sources are expanded into image paths.
    pub index_mode: IndexMode,
    /// Worker threads for image processing (0 = one per core).
    pub workers: usize,
    /// Output PDF path.
    pub filename: PathBuf,
    /// Log per-page layout decisions.
    pub debug: bool,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            orientation: Orientation::Portrait,
            size: "letter".into(),
            width: 8.5,
            height: 11.0,
            dpi: 150.0,
            border: 0.01,
            caption: CaptionMode::Default,
            pre_process: Vec::new(),
            halftone: HalftoneMode::Atkinson,
            include: Vec::new(),
            exclude: Vec::new(),
            index_mode: IndexMode::Directory,
            workers: 0,
            filename: PathBuf::from("picturebook.pdf"),
            debug: false,
        }
    }
}

impl BookConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the numeric settings and resolve the page setup.
    pub fn validate(&self) -> Result<()> {
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
        self.page_setup().map(|_| ())
    }

    /// Resolve `orientation`, `size`, `width` and `height` into a page setup.
    pub fn page_setup(&self) -> Result<PageSetup> {
        let paper = PaperSize::parse(&self.size, self.width, self.height)?;
        Ok(PageSetup::new(self.orientation, paper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config = BookConfig::from_json("{}").unwrap();
        assert_eq!(config, BookConfig::default());
        assert_eq!(config.page_setup().unwrap().dimensions_in(), (8.5, 11.0));
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config = BookConfig::from_json(
            r#"{ "orientation": "L", "size": "a4", "pre_process": ["rotate", "halftone"],
                 "caption": "parent", "index_mode": "filelist" }"#,
        )
        .unwrap();
        assert_eq!(config.orientation, Orientation::Landscape);
        assert_eq!(
            config.pre_process,
            vec![PreProcessMode::Rotate, PreProcessMode::Halftone]
        );
        assert_eq!(config.caption, CaptionMode::Parent);
        assert_eq!(config.index_mode, IndexMode::FileList);
    }

    #[test]
    fn unknown_pre_process_is_a_configuration_error() {
        let err = BookConfig::from_json(r#"{ "pre_process": ["sepia"] }"#).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn non_positive_dpi_is_rejected() {
        let err = BookConfig::from_json(r#"{ "dpi": 0 }"#).unwrap_err();
        assert!(matches!(err, PicturebookError::InvalidDimensions(_)));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        std::fs::write(&path, r#"{ "dpi": 300, "debug": true }"#).unwrap();

        let config = BookConfig::load(&path).unwrap();
        assert_eq!(config.dpi, 300.0);
        assert!(config.debug);
    }

    #[test]
    fn round_trips_through_json() {
        let config = BookConfig {
            include: vec![r"\.jpg$".into()],
            workers: 4,
            ..BookConfig::default()
        };
        let raw = serde_json::to_string(&config).unwrap();
        assert_eq!(BookConfig::from_json(&raw).unwrap(), config);
    }
}
