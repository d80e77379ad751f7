//! Missing-frame fill planning
//!
//! A plan lists, for every frame absent from a requested range, where a
//! substitute should come from. Frames are visited from the end of the range
//! backwards, so a `previous` lookup always lands on an original file and
//! never on a substitute planned earlier in the same pass.

use crate::error::{Result, SequenceError};
use crate::probe::Dimensions;
use crate::sequence::FrameRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FillStrategy {
    /// Link to the closest earlier frame
    #[default]
    Previous,
    Black,
    Checkerboard,
}

impl FillStrategy {
    pub fn as_str(&self) -> &str {
        match self {
            FillStrategy::Previous => "previous",
            FillStrategy::Black => "black",
            FillStrategy::Checkerboard => "checkerboard",
        }
    }
}

impl std::fmt::Display for FillStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a substitute frame comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FillSource {
    CopyFromFrame { from_frame: u64 },
    SolidColor { width: u32, height: u32 },
    Checkerboard { width: u32, height: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillEntry {
    pub frame: u64,
    #[serde(flatten)]
    pub source: FillSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillPlan {
    /// Substitutes in visit order (descending frame numbers)
    pub entries: Vec<FillEntry>,
    /// Missing frames with no earlier frame to copy from
    pub unresolved: Vec<u64>,
}

impl FillPlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Fail with `UnresolvedGap` if any missing frame could not be planned.
    pub fn ensure_resolved(&self) -> Result<()> {
        if self.unresolved.is_empty() {
            Ok(())
        } else {
            Err(SequenceError::UnresolvedGap(self.unresolved.clone()))
        }
    }
}

/// Plan substitutes for the frames of `range` missing from `existing`.
///
/// `start_number` bounds the backward search of `previous` and names the
/// frame whose size the `black` and `checkerboard` substitutes take.
/// `reference_size` is asked for that size at most once, and only when a gap
/// actually needs it. If the start frame itself is missing in that case the
/// plan fails with `MissingSizingReference`.
pub fn build_fill_plan<F>(
    range: FrameRange,
    start_number: u64,
    strategy: FillStrategy,
    existing: &BTreeSet<u64>,
    mut reference_size: F,
) -> Result<FillPlan>
where
    F: FnMut(u64) -> Result<Dimensions>,
{
    let mut plan = FillPlan::default();
    let mut size: Option<Dimensions> = None;

    for frame in range.frames().rev() {
        if existing.contains(&frame) {
            continue;
        }

        let source = match strategy {
            FillStrategy::Previous => {
                match closest_before(existing, start_number, frame) {
                    Some(found) => FillSource::CopyFromFrame { from_frame: found },
                    None => {
                        plan.unresolved.push(frame);
                        continue;
                    }
                }
            }
            FillStrategy::Black | FillStrategy::Checkerboard => {
                let dims = match size {
                    Some(dims) => dims,
                    None => {
                        if !existing.contains(&start_number) {
                            return Err(SequenceError::MissingSizingReference {
                                frame: start_number,
                            });
                        }
                        let dims = reference_size(start_number)?;
                        size = Some(dims);
                        dims
                    }
                };
                if strategy == FillStrategy::Black {
                    FillSource::SolidColor {
                        width: dims.width,
                        height: dims.height,
                    }
                } else {
                    FillSource::Checkerboard {
                        width: dims.width,
                        height: dims.height,
                    }
                }
            }
        };

        plan.entries.push(FillEntry { frame, source });
    }

    if !plan.unresolved.is_empty() {
        warn!("No earlier frame to copy for: {:?}", plan.unresolved);
    }
    debug!(
        "Fill plan for {} ({}): {} entries, {} unresolved",
        range,
        strategy,
        plan.entries.len(),
        plan.unresolved.len()
    );

    Ok(plan)
}

/// Highest present frame in `[start_number, frame)`.
fn closest_before(existing: &BTreeSet<u64>, start_number: u64, frame: u64) -> Option<u64> {
    if start_number >= frame {
        return None;
    }
    existing.range(start_number..frame).next_back().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(frames: &[u64]) -> BTreeSet<u64> {
        frames.iter().copied().collect()
    }

    fn no_size(_: u64) -> Result<Dimensions> {
        panic!("size should not be probed")
    }

    fn copy(frame: u64, from: u64) -> FillEntry {
        FillEntry {
            frame,
            source: FillSource::CopyFromFrame { from_frame: from },
        }
    }

    #[test]
    fn test_previous_links_to_closest_original() {
        let range = FrameRange::new(101, 105).unwrap();
        let plan = build_fill_plan(range, 101, FillStrategy::Previous, &set(&[101, 103]), no_size).unwrap();

        assert_eq!(plan.entries, vec![copy(105, 103), copy(104, 103), copy(102, 101)]);
        assert!(plan.unresolved.is_empty());
        assert!(plan.ensure_resolved().is_ok());
    }

    #[test]
    fn test_previous_on_long_sparse_range() {
        let range = FrameRange::new(0, 400_000).unwrap();
        let plan = build_fill_plan(range, 0, FillStrategy::Previous, &set(&[0, 250_000]), no_size).unwrap();

        assert_eq!(plan.len(), 399_999);
        assert!(plan.unresolved.is_empty());
        assert_eq!(plan.entries[0], copy(400_000, 250_000));
        assert_eq!(plan.entries[149_999], copy(250_001, 250_000));
        assert_eq!(plan.entries[150_000], copy(249_999, 0));
        assert_eq!(*plan.entries.last().unwrap(), copy(1, 0));
    }

    #[test]
    fn test_complete_range_gives_empty_plan() {
        let range = FrameRange::new(1, 4).unwrap();
        for strategy in [FillStrategy::Previous, FillStrategy::Black, FillStrategy::Checkerboard] {
            let plan = build_fill_plan(range, 1, strategy, &set(&[1, 2, 3, 4]), no_size).unwrap();
            assert!(plan.is_empty());
            assert!(plan.unresolved.is_empty());
        }
    }

    #[test]
    fn test_previous_without_source_is_unresolved() {
        let range = FrameRange::new(101, 102).unwrap();
        let plan = build_fill_plan(range, 101, FillStrategy::Previous, &set(&[]), no_size).unwrap();

        assert!(plan.is_empty());
        assert_eq!(plan.unresolved, vec![102, 101]);
        assert!(matches!(
            plan.ensure_resolved(),
            Err(SequenceError::UnresolvedGap(frames)) if frames == vec![102, 101]
        ));
    }

    #[test]
    fn test_previous_search_stops_at_start_number() {
        // Frame 10 exists but lies before the start number
        let range = FrameRange::new(12, 14).unwrap();
        let plan = build_fill_plan(range, 12, FillStrategy::Previous, &set(&[10, 13]), no_size).unwrap();

        assert_eq!(plan.entries, vec![copy(14, 13)]);
        assert_eq!(plan.unresolved, vec![12]);
    }

    #[test]
    fn test_black_uses_start_frame_size() {
        let range = FrameRange::new(101, 104).unwrap();
        let mut probed = Vec::new();
        let plan = build_fill_plan(range, 101, FillStrategy::Black, &set(&[101]), |frame| {
            probed.push(frame);
            Ok(Dimensions::new(1920, 1080))
        })
        .unwrap();

        let frames: Vec<u64> = plan.entries.iter().map(|e| e.frame).collect();
        assert_eq!(frames, vec![104, 103, 102]);
        for entry in &plan.entries {
            assert_eq!(entry.source, FillSource::SolidColor { width: 1920, height: 1080 });
        }
        assert_eq!(probed, vec![101]);
    }

    #[test]
    fn test_checkerboard_entries() {
        let range = FrameRange::new(1, 3).unwrap();
        let plan = build_fill_plan(range, 1, FillStrategy::Checkerboard, &set(&[1, 3]), |_| {
            Ok(Dimensions::new(640, 360))
        })
        .unwrap();

        assert_eq!(
            plan.entries,
            vec![FillEntry {
                frame: 2,
                source: FillSource::Checkerboard { width: 640, height: 360 },
            }]
        );
    }

    #[test]
    fn test_sized_fill_without_reference_fails() {
        let range = FrameRange::new(101, 103).unwrap();
        let err = build_fill_plan(range, 101, FillStrategy::Black, &set(&[102, 103]), no_size).unwrap_err();
        assert!(matches!(err, SequenceError::MissingSizingReference { frame: 101, .. }));
        assert!(!err.is_skippable());
    }

    #[test]
    fn test_strategy_parsing() {
        use clap::ValueEnum;

        assert_eq!(FillStrategy::from_str("previous", false).unwrap(), FillStrategy::Previous);
        assert_eq!(FillStrategy::from_str("Black", true).unwrap(), FillStrategy::Black);
        assert_eq!(
            FillStrategy::from_str("checkerboard", false).unwrap(),
            FillStrategy::Checkerboard
        );
        assert!(FillStrategy::from_str("white", true).is_err());
        assert_eq!(FillStrategy::Checkerboard.to_string(), "checkerboard");
    }

    #[test]
    fn test_plan_serializes_with_tagged_sources() {
        let entry = copy(102, 101);
        let json = serde_json::to_value(entry).unwrap();
        assert_eq!(json["frame"], 102);
        assert_eq!(json["source"], "copy_from_frame");
        assert_eq!(json["from_frame"], 101);

        let back: FillEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
