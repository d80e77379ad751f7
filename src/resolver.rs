//! Sequence pattern resolver: parse, scan, plan and fill in one place

use crate::error::Result;
use crate::fill::{build_fill_plan, FillPlan, FillStrategy};
use crate::materialize::{CanvasBackend, FillMaterializer, FilledFrames};
use crate::pattern::{parse_pattern, FramePattern};
use crate::probe::ProbeBackend;
use crate::sequence::{existing_frames, FrameRange, Sequence};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FillConfig {
    pub strategy: FillStrategy,
    /// Frames that must exist afterwards; defaults to the range found on disk
    pub frame_range: Option<FrameRange>,
    /// Earliest copy source and sizing reference; defaults to the range start
    pub start_number: Option<u64>,
    pub probe: ProbeBackend,
    pub canvas: CanvasBackend,
    /// Treat unresolved gaps as an error
    pub strict: bool,
}

/// A fill plan together with the inputs it was computed from
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPlan {
    pub pattern: FramePattern,
    pub range: FrameRange,
    pub start_number: u64,
    pub strategy: FillStrategy,
    pub plan: FillPlan,
}

pub struct SequenceResolver {
    config: FillConfig,
}

impl SequenceResolver {
    pub fn new(config: FillConfig) -> Self {
        Self { config }
    }

    /// Plan substitutes for the gaps of the sequence behind `template`.
    pub fn plan(&self, template: &str) -> Result<ResolvedPlan> {
        let pattern = parse_pattern(template)?;

        let range = match self.config.frame_range {
            Some(range) => range,
            None => Sequence::scan_pattern(pattern.clone())?.range,
        };
        let start_number = self.config.start_number.unwrap_or(range.start);

        // Copy sources may sit before the requested range
        let span = FrameRange::new(start_number.min(range.start), range.end.max(start_number))?;
        let existing = existing_frames(&pattern, span);
        debug!(
            "{} of {} frame(s) present in {}",
            existing.len(),
            span.frame_count(),
            span
        );

        let probe = self.config.probe.build();
        let plan = build_fill_plan(range, start_number, self.config.strategy, &existing, |frame| {
            let reference = pattern.expand_path(frame);
            Ok(probe.dimensions(Path::new(&reference))?)
        })?;

        if self.config.strict {
            plan.ensure_resolved()?;
        }

        Ok(ResolvedPlan {
            pattern,
            range,
            start_number,
            strategy: self.config.strategy,
            plan,
        })
    }

    /// Plan and write the substitutes.
    ///
    /// The returned guard deletes the written files when dropped.
    pub fn fill(&self, template: &str) -> Result<(ResolvedPlan, FilledFrames)> {
        let resolved = self.plan(template)?;
        let materializer = FillMaterializer::new(self.config.canvas.build());
        let filled = materializer.materialize(&resolved.pattern, &resolved.plan)?;

        info!(
            "{}: {} frame(s) filled in {}, {} unresolved",
            resolved.pattern.to_hashes(),
            filled.len(),
            resolved.range,
            resolved.plan.unresolved.len()
        );
        Ok((resolved, filled))
    }
}

impl Default for SequenceResolver {
    fn default() -> Self {
        Self::new(FillConfig::default())
    }
}
