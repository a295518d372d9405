//! Filename sanitization.
//!
//! Turns an arbitrary media title into a single path segment that is safe on
//! Windows, macOS and Linux filesystems. The transformation is pure: the same
//! title always produces the same name.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use unicode_general_category::{get_general_category, GeneralCategory};

/// Default maximum length of a sanitized name, in UTF-16 code units.
pub const DEFAULT_MAX_LENGTH: usize = 255;

/// Characters that are rejected by at least one common filesystem.
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Errors produced by [`sanitize`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    /// The title cannot produce a usable file name.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// A filesystem-safe, lower-cased file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SanitizedName(String);

impl SanitizedName {
    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the file name obtained by appending `extension`.
    pub fn with_extension(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension.trim_start_matches('.'))
    }

    /// Consumes the name and returns the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SanitizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SanitizedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Sanitizes `raw_title` with the default maximum length.
pub fn sanitize_default(raw_title: &str) -> Result<SanitizedName, SanitizeError> {
    sanitize(raw_title, DEFAULT_MAX_LENGTH)
}

/// Sanitizes `raw_title` into a safe file stem of at most `max_length`
/// UTF-16 code units.
pub fn sanitize(raw_title: &str, max_length: usize) -> Result<SanitizedName, SanitizeError> {
    if raw_title.trim().is_empty() {
        return Err(SanitizeError::InvalidArgument(
            "filename cannot be empty or whitespace".to_string(),
        ));
    }
    if max_length == 0 {
        return Err(SanitizeError::InvalidArgument(
            "max_length must be greater than zero".to_string(),
        ));
    }

    // 1. Characters illegal on common filesystems, plus C0 control bytes.
    let replaced: String = raw_title
        .chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || (c as u32) < 0x20 {
                '_'
            } else {
                c
            }
        })
        .collect();

    // 2. Remaining control and invisible characters.
    let visible: String = replaced.chars().filter(|c| !is_invisible(*c)).collect();

    // 3 and 4. Relative path components and home-directory expansion.
    let no_traversal = visible.replace("..", "_").replace('~', "_");

    // 5. Whitespace runs become a single underscore.
    let collapsed = collapse_whitespace(&no_traversal);

    // 6. Leading and trailing dots.
    let trimmed = collapsed.trim_matches('.');

    // 7 and 8. Length bound, then case folding. Lower-casing can grow a
    // string, so the bound is applied again afterwards.
    let lowered = truncate_utf16(trimmed, max_length).to_lowercase();
    let name = truncate_utf16(&lowered, max_length).to_string();

    if name.is_empty() {
        return Err(SanitizeError::InvalidArgument(format!(
            "title {:?} has no usable characters",
            raw_title
        )));
    }

    Ok(SanitizedName(name))
}

fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_run = false;
    for c in input.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push('_');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Truncates to at most `max_units` UTF-16 code units without splitting a
/// character.
fn truncate_utf16(input: &str, max_units: usize) -> &str {
    let mut units = 0;
    for (idx, c) in input.char_indices() {
        units += c.len_utf16();
        if units > max_units {
            return &input[..idx];
        }
    }
    input
}

/// Unicode "Other" characters (general category `C*`): controls, format
/// characters, private use, surrogates and unassigned code points.
fn is_invisible(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::PrivateUse
            | GeneralCategory::Surrogate
            | GeneralCategory::Unassigned
    )
}
