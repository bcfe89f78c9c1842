// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Picturebook.

use std::path::PathBuf;

use thiserror::Error;

/// How an error affects a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad configuration. Raised before any page is written; aborts the run.
    Configuration,
    /// A single image could not be used. Logged, the image is skipped, the
    /// run continues.
    Recoverable,
    /// Filesystem or PDF output failure. Fatal for the operation in progress.
    Resource,
}

/// Top-level error type for all Picturebook operations.
#[derive(Debug, Error)]
pub enum PicturebookError {
    // -- Configuration errors --
    #[error("invalid orientation: {0:?} (expected portrait or landscape)")]
    InvalidOrientation(String),

    #[error("invalid page size: {0:?}")]
    InvalidPageSize(String),

    #[error("invalid page geometry: {0}")]
    InvalidDimensions(String),

    #[error("invalid or unsupported pre-process mode: {0:?}")]
    InvalidPreProcess(String),

    #[error("invalid caption type: {0:?}")]
    InvalidCaption(String),

    #[error("invalid index mode: {0:?}")]
    InvalidIndexMode(String),

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("configuration error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Per-image errors --
    #[error("filter failed for {path}: {reason}")]
    Filter { path: PathBuf, reason: String },

    #[error("pre-processing failed for {path}: {reason}")]
    PreProcess { path: PathBuf, reason: String },

    #[error("caption lookup failed for {path}: {reason}")]
    Caption { path: PathBuf, reason: String },

    #[error("cannot read image information for {path}: {reason}")]
    ImageInfoUnavailable { path: PathBuf, reason: String },

    #[error("image {path} has a zero width or height")]
    DegenerateImage { path: PathBuf },

    #[error("cannot fit an image of {width}x{height}")]
    ZeroDimension { width: f64, height: f64 },

    #[error("discovery failed: {0}")]
    Discovery(String),

    // -- Resource errors --
    #[error("temporary file error: {0}")]
    TempFile(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF output failed: {0}")]
    Pdf(String),
}

impl PicturebookError {
    /// Classify this error for the run-level abort/continue decision.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidOrientation(_)
            | Self::InvalidPageSize(_)
            | Self::InvalidDimensions(_)
            | Self::InvalidPreProcess(_)
            | Self::InvalidCaption(_)
            | Self::InvalidIndexMode(_)
            | Self::InvalidPattern { .. }
            | Self::Serialization(_) => ErrorClass::Configuration,

            Self::Filter { .. }
            | Self::PreProcess { .. }
            | Self::Caption { .. }
            | Self::ImageInfoUnavailable { .. }
            | Self::DegenerateImage { .. }
            | Self::ZeroDimension { .. }
            | Self::Discovery(_) => ErrorClass::Recoverable,

            Self::TempFile(_) | Self::Io(_) | Self::Pdf(_) => ErrorClass::Resource,
        }
    }

    /// True when the whole run must stop.
    pub fn is_fatal(&self) -> bool {
        self.class() != ErrorClass::Recoverable
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PicturebookError>;
