// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filters — decide which discovered paths become pages.

use std::path::Path;

use picturebook_core::error::{PicturebookError, Result};
use regex::Regex;

/// Decides whether a candidate path is included in the book.
///
/// Returning `Ok(false)` skips the path silently. An error also skips the
/// path, but is reported.
pub trait Filter: Send + Sync {
    fn accepts(&self, path: &Path) -> Result<bool>;
}

impl<F> Filter for F
where
    F: Fn(&Path) -> Result<bool> + Send + Sync,
{
    fn accepts(&self, path: &Path) -> Result<bool> {
        self(path)
    }
}

/// Accepts every path.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Filter for AcceptAll {
    fn accepts(&self, _path: &Path) -> Result<bool> {
        Ok(true)
    }
}

/// Include/exclude filter over the full path string.
///
/// A path is accepted when it matches *every* include pattern and *none* of
/// the exclude patterns. With no patterns at all, everything is accepted.
#[derive(Debug, Clone, Default)]
pub struct RegexFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl RegexFilter {
    /// Compile include and exclude patterns. An invalid pattern is a
    /// configuration error.
    pub fn new<I, E>(include: I, exclude: E) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Ok(Self {
            include: compile_all(include)?,
            exclude: compile_all(exclude)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

impl Filter for RegexFilter {
    fn accepts(&self, path: &Path) -> Result<bool> {
        let text = path.to_string_lossy();

        if !self.include.iter().all(|re| re.is_match(&text)) {
            return Ok(false);
        }
        if self.exclude.iter().any(|re| re.is_match(&text)) {
            return Ok(false);
        }
        Ok(true)
    }
}

fn compile_all<P>(patterns: P) -> Result<Vec<Regex>>
where
    P: IntoIterator,
    P::Item: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            Regex::new(pattern).map_err(|err| PicturebookError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: err.to_string(),
            })
        })
        .collect()
}
