// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Caption providers — the text printed under each picture.

use std::path::Path;
use std::sync::Arc;

use chrono::DateTime;
use picturebook_core::CaptionMode;
use picturebook_core::error::{PicturebookError, Result};
use serde_json::Value;
use tracing::debug;

/// Produces the caption for an image. An empty string means no caption.
pub trait CaptionProvider: Send + Sync {
    fn caption_for(&self, path: &Path) -> Result<String>;
}

impl<F> CaptionProvider for F
where
    F: Fn(&Path) -> Result<String> + Send + Sync,
{
    fn caption_for(&self, path: &Path) -> Result<String> {
        self(path)
    }
}

/// Build the provider for a configured caption mode.
pub fn caption_from_mode(mode: CaptionMode) -> Arc<dyn CaptionProvider> {
    match mode {
        CaptionMode::Default | CaptionMode::Filename => Arc::new(FilenameCaption),
        CaptionMode::Parent => Arc::new(ParentCaption),
        CaptionMode::CooperHewitt => Arc::new(ShoeboxCaption),
        CaptionMode::None => Arc::new(NoCaption),
    }
}

/// Parse a caption mode name and build its provider.
pub fn caption_from_str(name: &str) -> Result<Arc<dyn CaptionProvider>> {
    Ok(caption_from_mode(name.parse()?))
}

/// No caption at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCaption;

impl CaptionProvider for NoCaption {
    fn caption_for(&self, _path: &Path) -> Result<String> {
        Ok(String::new())
    }
}

/// The image's file name, e.g. `Sunset.jpg`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameCaption;

impl CaptionProvider for FilenameCaption {
    fn caption_for(&self, path: &Path) -> Result<String> {
        Ok(file_name(path))
    }
}

/// The image's directory and file name, e.g. `Iceland/Sunset.jpg`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentCaption;

impl CaptionProvider for ParentCaption {
    fn caption_for(&self, path: &Path) -> Result<String> {
        let name = file_name(path);
        let parent = path
            .parent()
            .and_then(Path::file_name)
            .map(|p| p.to_string_lossy().into_owned());

        Ok(match parent {
            Some(parent) if !parent.is_empty() => format!("{parent}/{name}"),
            _ => name,
        })
    }
}

/// Cooper Hewitt shoebox exports: each image sits next to an `index.json`
/// describing the collection object it depicts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShoeboxCaption;

impl CaptionProvider for ShoeboxCaption {
    fn caption_for(&self, path: &Path) -> Result<String> {
        let failed = |reason: String| PicturebookError::Caption {
            path: path.to_path_buf(),
            reason,
        };

        let index = path
            .parent()
            .map(|dir| dir.join("index.json"))
            .ok_or_else(|| failed("image has no parent directory".into()))?;

        let body = std::fs::read_to_string(&index)
            .map_err(|err| failed(format!("{}: {err}", index.display())))?;
        let item: Value = serde_json::from_str(&body)
            .map_err(|err| failed(format!("{}: {err}", index.display())))?;

        shoebox_caption(&item).map_err(failed)
    }
}

fn shoebox_caption(item: &Value) -> std::result::Result<String, String> {
    let kind = item
        .get("refers_to_a")
        .and_then(Value::as_str)
        .ok_or("unknown shoebox item")?;
    if kind != "object" {
        return Err(format!("unsupported shoebox item: {kind}"));
    }

    let object = &item["refers_to"];
    let title = object
        .get("title")
        .and_then(Value::as_str)
        .ok_or("object information missing title")?;
    let accession = object
        .get("accession_number")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let object_id = object.get("id").and_then(as_int).unwrap_or_default();
    let created = item.get("created").and_then(as_int).unwrap_or_default();

    let date = DateTime::from_timestamp(created, 0)
        .map(|dt| dt.format("%b %d, %Y").to_string())
        .unwrap_or_default();

    debug!(title, accession, object_id, "Shoebox caption resolved");
    Ok(format!("{title}, {accession} ({object_id}), {date}"))
}

/// Shoebox exports are inconsistent about quoting numbers.
fn as_int(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
