// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the command line.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity picks the label the message is printed under. Whether a run stops
// is decided by `PicturebookError::is_fatal`.

use crate::error::{ErrorClass, PicturebookError};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// One picture was left out; the book is still produced.
    Skipped,
    /// The user must change a flag or config value before trying again.
    ActionRequired,
    /// Disk or output problem; nothing was produced.
    Failed,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Label the message is printed under.
    pub severity: Severity,
}

/// Convert a `PicturebookError` into a `HumanError`.
pub fn humanize_error(err: &PicturebookError) -> HumanError {
    match err {
        // -- Configuration --
        PicturebookError::InvalidOrientation(value) => HumanError {
            message: format!("\"{value}\" is not a page orientation."),
            suggestion: "Use --orientation portrait (P) or landscape (L).".into(),
            severity: Severity::ActionRequired,
        },

        PicturebookError::InvalidPageSize(value) => HumanError {
            message: format!("\"{value}\" is not a page size we know."),
            suggestion: "Use letter, legal, tabloid, a3, a4, a5, or custom with --width and --height in inches.".into(),
            severity: Severity::ActionRequired,
        },

        PicturebookError::InvalidDimensions(detail) => HumanError {
            message: "The page settings leave no room for pictures.".into(),
            suggestion: format!("Check --dpi, --border and the page size. ({detail})"),
            severity: Severity::ActionRequired,
        },

        PicturebookError::InvalidPreProcess(value) => HumanError {
            message: format!("\"{value}\" is not a pre-processing step."),
            suggestion: "Use --pre-process rotate and/or --pre-process halftone.".into(),
            severity: Severity::ActionRequired,
        },

        PicturebookError::InvalidCaption(value) => HumanError {
            message: format!("\"{value}\" is not a caption type."),
            suggestion: "Use default, filename, parent, cooperhewitt or none.".into(),
            severity: Severity::ActionRequired,
        },

        PicturebookError::InvalidIndexMode(value) => HumanError {
            message: format!("\"{value}\" is not a way of finding pictures."),
            suggestion: "Use --mode directory, files or filelist.".into(),
            severity: Severity::ActionRequired,
        },

        PicturebookError::InvalidPattern { pattern, reason } => HumanError {
            message: format!("The pattern \"{pattern}\" is not a valid regular expression."),
            suggestion: format!("Fix the --include/--exclude pattern. ({reason})"),
            severity: Severity::ActionRequired,
        },

        PicturebookError::Serialization(detail) => HumanError {
            message: "The configuration file could not be read.".into(),
            suggestion: format!("Check the JSON syntax and field values. ({detail})"),
            severity: Severity::ActionRequired,
        },

        // -- Per-image --
        PicturebookError::Filter { path, reason } => skipped(
            format!("{} was left out because its filter failed.", path.display()),
            reason,
        ),

        PicturebookError::PreProcess { path, reason } => skipped(
            format!("{} could not be prepared for printing.", path.display()),
            reason,
        ),

        PicturebookError::Caption { path, reason } => skipped(
            format!("No caption could be found for {}.", path.display()),
            reason,
        ),

        PicturebookError::ImageInfoUnavailable { path, reason } => skipped(
            format!("{} does not look like a readable image.", path.display()),
            reason,
        ),

        PicturebookError::DegenerateImage { path } => HumanError {
            message: format!("{} is empty (zero pixels wide or tall).", path.display()),
            suggestion: "Re-export the picture and try again.".into(),
            severity: Severity::Skipped,
        },

        PicturebookError::ZeroDimension { width, height } => HumanError {
            message: format!("A picture measuring {width} x {height} cannot be placed."),
            suggestion: "Re-export the picture and try again.".into(),
            severity: Severity::Skipped,
        },

        PicturebookError::Discovery(detail) => skipped(
            "Part of a folder could not be searched for pictures.".into(),
            detail,
        ),

        // -- Resources --
        PicturebookError::TempFile(detail) => HumanError {
            message: "A temporary working file could not be created.".into(),
            suggestion: format!("Check free disk space in the temp directory. ({detail})"),
            severity: Severity::Failed,
        },

        PicturebookError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "A file or folder couldn't be found.".into(),
                suggestion: "Check the paths you passed and try again.".into(),
                severity: Severity::Failed,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "Picturebook doesn't have permission to use that file.".into(),
                suggestion: "Check the file permissions, or write the book somewhere else with --filename.".into(),
                severity: Severity::Failed,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: format!("Try again. If this keeps happening, your disk may be full. ({io_err})"),
                severity: Severity::Failed,
            },
        },

        PicturebookError::Pdf(detail) => HumanError {
            message: "The PDF could not be written.".into(),
            suggestion: format!("No partial book was left behind; try again. ({detail})"),
            severity: Severity::Failed,
        },
    }
}

fn skipped(message: String, reason: &str) -> HumanError {
    HumanError {
        message,
        suggestion: format!("The rest of the book is unaffected. ({reason})"),
        severity: Severity::Skipped,
    }
}

impl Severity {
    /// Prefix the CLI prints before the message.
    pub fn label(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::ActionRequired => "action required",
            Self::Failed => "error",
        }
    }
}

impl From<ErrorClass> for Severity {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::Configuration => Self::ActionRequired,
            ErrorClass::Recoverable => Self::Skipped,
            ErrorClass::Resource => Self::Failed,
        }
    }
}
