use thiserror::Error;

use crate::probe::ProbeError;
use crate::tool::ToolError;

#[derive(Error, Debug)]
pub enum SequenceError {
    /// The path carries no `#` run, `%0Nd` specifier or digit run.
    #[error("No frame pattern in path: {0}")]
    NoFramePattern(String),

    #[error("Frame number too large in path: {0}")]
    FrameNumberTooLarge(String),

    #[error("No files matching {pattern} in {directory}")]
    NoMatchingFiles { pattern: String, directory: String },

    #[error("Invalid frame range: {start} > {end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("Unresolved gap, no earlier frame to copy for: {0:?}")]
    UnresolvedGap(Vec<u64>),

    /// Size-dependent fill requested but the reference frame is absent.
    #[error("Sizing reference frame {frame} is missing")]
    MissingSizingReference { frame: u64 },

    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SequenceError {
    /// Errors that mean "not a sequence / nothing to do" rather than failure.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            SequenceError::NoFramePattern(_) | SequenceError::NoMatchingFiles { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SequenceError>;
