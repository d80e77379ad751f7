//! Frame-number placeholders in path templates
//!
//! Three conventions are recognized, first match wins:
//!
//! 1. A run of `#` glyphs: `render.####.exr` (width = run length)
//! 2. A printf width specifier: `render.%04d.exr` (width = declared width)
//! 3. The last run of decimal digits: `render.0101.exr` (width = run length,
//!    the digits are also kept as the literal frame number)

use crate::error::{Result, SequenceError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Widest printf placeholder taken as a frame-number field
const MAX_DIGIT_WIDTH: usize = 32;

/// Which placeholder convention a template used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderKind {
    Hashes,
    Printf,
    Literal,
}

/// How a frame number is embedded in a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramePattern {
    /// Everything before the placeholder, directories included
    pub prefix: String,
    /// Everything after the placeholder
    pub suffix: String,
    /// Zero-padding width of the frame number
    pub digit_width: usize,
    /// Frame number when the template was a concrete path
    pub literal_number: Option<u64>,
    pub kind: PlaceholderKind,
}

/// Parse a path template into a [`FramePattern`].
///
/// Returns `NoFramePattern` when the path carries no recognizable frame
/// number; callers should treat the path as a single file.
pub fn parse_pattern(path: &str) -> Result<FramePattern> {
    if let Some((start, end)) = find_hash_run(path) {
        return Ok(FramePattern::from_span(path, start, end, end - start, None, PlaceholderKind::Hashes));
    }

    if let Some((start, end, width)) = find_printf_width(path) {
        return Ok(FramePattern::from_span(path, start, end, width, None, PlaceholderKind::Printf));
    }

    if let Some((start, end)) = find_last_digit_run(path) {
        let number = path[start..end]
            .parse::<u64>()
            .map_err(|_| SequenceError::FrameNumberTooLarge(path.to_string()))?;
        return Ok(FramePattern::from_span(
            path,
            start,
            end,
            end - start,
            Some(number),
            PlaceholderKind::Literal,
        ));
    }

    Err(SequenceError::NoFramePattern(path.to_string()))
}

impl FramePattern {
    fn from_span(
        path: &str,
        start: usize,
        end: usize,
        digit_width: usize,
        literal_number: Option<u64>,
        kind: PlaceholderKind,
    ) -> Self {
        Self {
            prefix: path[..start].to_string(),
            suffix: path[end..].to_string(),
            digit_width,
            literal_number,
            kind,
        }
    }

    /// Concrete path for `frame`, zero-padded to `digit_width`.
    ///
    /// Numbers wider than `digit_width` are written in full.
    pub fn expand_path(&self, frame: u64) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            frame,
            self.suffix,
            width = self.digit_width
        )
    }

    /// File name (no directory) of `frame`.
    pub fn file_name(&self, frame: u64) -> String {
        format!(
            "{}{:0width$}{}",
            self.file_prefix(),
            frame,
            self.suffix,
            width = self.digit_width
        )
    }

    /// Directory the sequence lives in (`.` for bare file names).
    pub fn directory(&self) -> PathBuf {
        let (dir, _) = self.split_prefix();
        if dir.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(dir)
        }
    }

    /// Part of the prefix after the last path separator.
    pub fn file_prefix(&self) -> &str {
        self.split_prefix().1
    }

    fn split_prefix(&self) -> (&str, &str) {
        match self.prefix.rfind(std::path::is_separator) {
            Some(i) => self.prefix.split_at(i + 1),
            None => ("", self.prefix.as_str()),
        }
    }

    /// Frame number of `name` if it is exactly `<file prefix><digits><suffix>`
    /// with `digit_width` digits. Prefix and suffix compare literally.
    pub fn frame_from_file_name(&self, name: &str) -> Option<u64> {
        let digits = name
            .strip_prefix(self.file_prefix())?
            .strip_suffix(self.suffix.as_str())?;

        if digits.len() != self.digit_width || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Template in printf syntax, as ffmpeg's image2 demuxer expects it.
    pub fn to_printf(&self) -> String {
        format!("{}%0{}d{}", self.prefix, self.digit_width, self.suffix)
    }

    /// Template in `#` syntax.
    pub fn to_hashes(&self) -> String {
        format!("{}{}{}", self.prefix, "#".repeat(self.digit_width), self.suffix)
    }
}

fn find_hash_run(path: &str) -> Option<(usize, usize)> {
    let start = path.find('#')?;
    let len = path[start..].bytes().take_while(|&b| b == b'#').count();
    Some((start, start + len))
}

/// First `%<width>d` with a width in `1..=MAX_DIGIT_WIDTH`.
fn find_printf_width(path: &str) -> Option<(usize, usize, usize)> {
    let bytes = path.as_bytes();
    for (pos, _) in path.match_indices('%') {
        let digits_end = pos + 1 + bytes[pos + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits_end == pos + 1 || bytes.get(digits_end) != Some(&b'd') {
            continue;
        }
        match path[pos + 1..digits_end].parse::<usize>() {
            Ok(width) if (1..=MAX_DIGIT_WIDTH).contains(&width) => return Some((pos, digits_end + 1, width)),
            _ => continue,
        }
    }
    None
}

fn find_last_digit_run(path: &str) -> Option<(usize, usize)> {
    let bytes = path.as_bytes();
    let end = bytes.iter().rposition(|b| b.is_ascii_digit())? + 1;
    let start = bytes[..end]
        .iter()
        .rposition(|b| !b.is_ascii_digit())
        .map_or(0, |i| i + 1);
    Some((start, end))
}
