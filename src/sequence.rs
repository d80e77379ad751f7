//! Sequence discovery on disk

use crate::error::{Result, SequenceError};
use crate::pattern::{parse_pattern, FramePattern};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Inclusive frame interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFrameRange")]
pub struct FrameRange {
    pub start: u64,
    pub end: u64,
}

#[derive(Deserialize)]
struct RawFrameRange {
    start: u64,
    end: u64,
}

impl TryFrom<RawFrameRange> for FrameRange {
    type Error = SequenceError;

    fn try_from(raw: RawFrameRange) -> Result<Self> {
        FrameRange::new(raw.start, raw.end)
    }
}

impl FrameRange {
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(SequenceError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Saturates at `u64::MAX` for the full `0..=u64::MAX` span.
    pub fn frame_count(&self) -> u64 {
        if self.end < self.start {
            return 0;
        }
        (self.end - self.start).saturating_add(1)
    }

    pub fn frames(&self) -> std::ops::RangeInclusive<u64> {
        self.start..=self.end
    }
}

impl std::fmt::Display for FrameRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Names of the regular files in `dir`.
///
/// Directories and symlinks are skipped, as are names that are not UTF-8.
/// The listing is read eagerly.
pub fn list_files(dir: impl AsRef<Path>) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            names.insert(name);
        }
    }
    Ok(names)
}

/// Outer frame range of every listed name matching `pattern`.
///
/// All names are scanned, so gaps and listing order do not matter. Returns
/// `None` when nothing matches.
pub fn find_sequence_range<I, S>(names: I, pattern: &FramePattern) -> Option<FrameRange>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut bounds: Option<(u64, u64)> = None;
    for name in names {
        if let Some(frame) = pattern.frame_from_file_name(name.as_ref()) {
            bounds = Some(match bounds {
                Some((lo, hi)) => (lo.min(frame), hi.max(frame)),
                None => (frame, frame),
            });
        }
    }
    bounds.map(|(start, end)| FrameRange { start, end })
}

/// Frames in `range` whose expanded path is a file.
///
/// Symlinks are followed, so frames filled by an earlier run count.
pub fn existing_frames(pattern: &FramePattern, range: FrameRange) -> BTreeSet<u64> {
    range
        .frames()
        .filter(|&frame| Path::new(&pattern.expand_path(frame)).is_file())
        .collect()
}

/// Delete the files of `range`, e.g. a temporary intermediate sequence.
///
/// Missing frames are skipped. Returns how many files were removed.
pub fn remove_frames(pattern: &FramePattern, range: FrameRange) -> Result<usize> {
    let mut removed = 0;
    for frame in range.frames() {
        let path = PathBuf::from(pattern.expand_path(frame));
        if path.symlink_metadata().is_ok() {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    debug!("Removed {} frame(s) of {} in {}", removed, pattern.to_hashes(), range);
    Ok(removed)
}

/// A sequence found on disk: its pattern plus the range its files span.
#[derive(Debug, Clone, Serialize)]
pub struct Sequence {
    pub pattern: FramePattern,
    pub range: FrameRange,
}

impl Sequence {
    /// Parse `template`, list its directory once and compute the range.
    pub fn scan(template: &str) -> Result<Self> {
        let pattern = parse_pattern(template)?;
        Self::scan_pattern(pattern)
    }

    pub fn scan_pattern(pattern: FramePattern) -> Result<Self> {
        let directory = pattern.directory();
        let names = list_files(&directory)?;
        debug!("Scanned {} file(s) in {}", names.len(), directory.display());

        let range = find_sequence_range(&names, &pattern).ok_or_else(|| {
            SequenceError::NoMatchingFiles {
                pattern: pattern.to_hashes(),
                directory: directory.display().to_string(),
            }
        })?;

        Ok(Self { pattern, range })
    }

    pub fn frame_path(&self, frame: u64) -> PathBuf {
        PathBuf::from(self.pattern.expand_path(frame))
    }

    pub fn first_frame_path(&self) -> PathBuf {
        self.frame_path(self.range.start)
    }

    pub fn existing_frames(&self) -> BTreeSet<u64> {
        existing_frames(&self.pattern, self.range)
    }
}
