//! mediaseq - frame-sequence pattern resolver for image-sequence tooling
//!
//! Detects frame-number placeholders in path templates, finds the frame range
//! of a sequence on disk and plans (and optionally writes) substitutes for
//! missing frames so an encoder receives a contiguous sequence.
//! Image probing and canvas generation can shell out to OpenImageIO's `iinfo`
//! and ImageMagick's `magick`, or stay in-process with the `image` crate.

mod error;
pub mod fill;
pub mod materialize;
pub mod pattern;
pub mod probe;
mod resolver;
pub mod sequence;
pub mod tool;

pub use error::{Result, SequenceError};
pub use fill::{build_fill_plan, FillEntry, FillPlan, FillSource, FillStrategy};
pub use materialize::{CanvasBackend, FillMaterializer, FilledFrames};
pub use pattern::{parse_pattern, FramePattern, PlaceholderKind};
pub use probe::{Dimensions, ImageProbe, ProbeBackend, ProbeError};
pub use resolver::{FillConfig, ResolvedPlan, SequenceResolver};
pub use sequence::{find_sequence_range, list_files, FrameRange, Sequence};
pub use tool::{ToolCommand, ToolError};
