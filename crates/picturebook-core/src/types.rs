// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Picturebook.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PicturebookError;

const MM_PER_INCH: f64 = 25.4;

/// Page orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    #[serde(alias = "p", alias = "P")]
    Portrait,
    #[serde(alias = "l", alias = "L")]
    Landscape,
}

impl FromStr for Orientation {
    type Err = PicturebookError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "p" | "portrait" => Ok(Self::Portrait),
            "l" | "landscape" => Ok(Self::Landscape),
            _ => Err(PicturebookError::InvalidOrientation(value.to_string())),
        }
    }
}

/// Standard paper sizes, plus a custom size given in inches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    #[default]
    Letter,
    Legal,
    Tabloid,
    A3,
    A4,
    A5,
    Custom { width_in: f64, height_in: f64 },
}

impl PaperSize {
    /// Portrait dimensions in inches (width, height).
    pub fn dimensions_in(&self) -> (f64, f64) {
        match self {
            Self::Letter => (8.5, 11.0),
            Self::Legal => (8.5, 14.0),
            Self::Tabloid => (11.0, 17.0),
            Self::A3 => (297.0 / MM_PER_INCH, 420.0 / MM_PER_INCH),
            Self::A4 => (210.0 / MM_PER_INCH, 297.0 / MM_PER_INCH),
            Self::A5 => (148.0 / MM_PER_INCH, 210.0 / MM_PER_INCH),
            Self::Custom {
                width_in,
                height_in,
            } => (*width_in, *height_in),
        }
    }

    /// Resolve a size name. `custom` takes its dimensions from `width_in` and
    /// `height_in`; named sizes ignore them.
    pub fn parse(name: &str, width_in: f64, height_in: f64) -> Result<Self, PicturebookError> {
        let size = match name.trim().to_ascii_lowercase().as_str() {
            "letter" => Self::Letter,
            "legal" => Self::Legal,
            "tabloid" | "ledger" => Self::Tabloid,
            "a3" => Self::A3,
            "a4" => Self::A4,
            "a5" => Self::A5,
            "custom" => Self::Custom {
                width_in,
                height_in,
            },
            _ => return Err(PicturebookError::InvalidPageSize(name.to_string())),
        };
        let (w, h) = size.dimensions_in();
        if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
            return Err(PicturebookError::InvalidPageSize(format!(
                "{name} ({w} x {h} in)"
            )));
        }
        Ok(size)
    }
}

/// Paper size plus orientation: everything needed to know the page box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    pub orientation: Orientation,
    pub paper: PaperSize,
}

impl PageSetup {
    pub fn new(orientation: Orientation, paper: PaperSize) -> Self {
        Self { orientation, paper }
    }

    /// Page dimensions in inches after applying the orientation.
    pub fn dimensions_in(&self) -> (f64, f64) {
        let (w, h) = self.paper.dimensions_in();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

/// Named pre-processing steps that can be chained from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreProcessMode {
    /// Apply the EXIF orientation to JPEG files.
    Rotate,
    /// Halftone the image using the configured [`HalftoneMode`].
    Halftone,
}

impl FromStr for PreProcessMode {
    type Err = PicturebookError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rotate" => Ok(Self::Rotate),
            "halftone" => Ok(Self::Halftone),
            _ => Err(PicturebookError::InvalidPreProcess(value.to_string())),
        }
    }
}

/// Halftoning algorithm used by the `halftone` pre-process step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HalftoneMode {
    /// Atkinson error diffusion.
    #[default]
    Atkinson,
    /// Global threshold at the Otsu level.
    Threshold,
}

impl FromStr for HalftoneMode {
    type Err = PicturebookError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "atkinson" => Ok(Self::Atkinson),
            "threshold" => Ok(Self::Threshold),
            _ => Err(PicturebookError::InvalidPreProcess(format!(
                "halftone:{value}"
            ))),
        }
    }
}

/// Where a page caption comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionMode {
    /// Same as [`CaptionMode::Filename`].
    #[default]
    Default,
    /// The image's file name.
    Filename,
    /// `parent_directory/file_name`.
    Parent,
    /// Cooper Hewitt shoebox metadata from an `index.json` beside the image.
    CooperHewitt,
    /// No caption.
    None,
}

impl FromStr for CaptionMode {
    type Err = PicturebookError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "filename" => Ok(Self::Filename),
            "parent" => Ok(Self::Parent),
            "cooperhewitt" => Ok(Self::CooperHewitt),
            "none" => Ok(Self::None),
            _ => Err(PicturebookError::InvalidCaption(value.to_string())),
        }
    }
}

/// How source arguments are turned into candidate image paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// Walk each source directory recursively.
    #[default]
    Directory,
    /// Each source is an image path.
    Files,
    /// Each source is a text file listing one image path per line.
    FileList,
}

impl FromStr for IndexMode {
    type Err = PicturebookError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "directory" => Ok(Self::Directory),
            "files" => Ok(Self::Files),
            "filelist" => Ok(Self::FileList),
            _ => Err(PicturebookError::InvalidIndexMode(value.to_string())),
        }
    }
}

impl fmt::Display for IndexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Directory => "directory",
            Self::Files => "files",
            Self::FileList => "filelist",
        };
        f.write_str(name)
    }
}
