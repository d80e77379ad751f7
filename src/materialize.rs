//! Writing planned substitute frames to disk

use crate::error::Result;
use crate::fill::{FillPlan, FillSource};
use crate::pattern::FramePattern;
use crate::probe::Dimensions;
use crate::tool::ToolCommand;
use image::{DynamicImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ImageMagick's `pattern:checkerboard` look: 15px squares in two greys
const CHECKER_SIZE: u32 = 15;
const CHECKER_LIGHT: Rgb<u8> = Rgb([0x99, 0x99, 0x99]);
const CHECKER_DARK: Rgb<u8> = Rgb([0x66, 0x66, 0x66]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasKind {
    Black,
    Checkerboard,
}

impl CanvasKind {
    fn magick_source(&self) -> &str {
        match self {
            CanvasKind::Black => "canvas:black",
            CanvasKind::Checkerboard => "pattern:checkerboard",
        }
    }
}

/// Produces a generated image file of a given size
pub trait CanvasRenderer {
    fn render(&self, kind: CanvasKind, size: Dimensions, target: &Path) -> Result<()>;
}

/// Which [`CanvasRenderer`] implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CanvasBackend {
    /// ImageMagick `magick`
    #[default]
    Magick,
    /// Drawn with the `image` crate
    Builtin,
}

impl CanvasBackend {
    pub fn build(self) -> Box<dyn CanvasRenderer> {
        match self {
            CanvasBackend::Magick => Box::new(MagickCanvas::default()),
            CanvasBackend::Builtin => Box::new(ImageCanvas),
        }
    }
}

pub struct MagickCanvas {
    program: String,
}

impl MagickCanvas {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for MagickCanvas {
    fn default() -> Self {
        Self::new("magick")
    }
}

impl CanvasRenderer for MagickCanvas {
    fn render(&self, kind: CanvasKind, size: Dimensions, target: &Path) -> Result<()> {
        ToolCommand::new(self.program.as_str())
            .args(&["-size", &size.to_string(), kind.magick_source()])
            .path(target)
            .execute()?;
        Ok(())
    }
}

/// Pure Rust canvas; the format follows the target extension.
pub struct ImageCanvas;

impl CanvasRenderer for ImageCanvas {
    fn render(&self, kind: CanvasKind, size: Dimensions, target: &Path) -> Result<()> {
        let pixels = RgbImage::from_fn(size.width, size.height, |x, y| match kind {
            CanvasKind::Black => Rgb([0, 0, 0]),
            CanvasKind::Checkerboard => {
                if (x / CHECKER_SIZE + y / CHECKER_SIZE) % 2 == 0 {
                    CHECKER_LIGHT
                } else {
                    CHECKER_DARK
                }
            }
        });
        let canvas = DynamicImage::ImageRgb8(pixels);

        // OpenEXR only takes float pixels
        let is_exr = target
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("exr"));
        if is_exr {
            DynamicImage::ImageRgb32F(canvas.to_rgb32f()).save(target)?;
        } else {
            canvas.save(target)?;
        }
        Ok(())
    }
}

/// Files created by [`FillMaterializer::materialize`].
///
/// Dropping the guard removes them again, the way substitutes are discarded
/// once an encode has consumed the sequence. Call [`FilledFrames::keep`] to
/// leave them on disk.
#[derive(Debug, Default)]
pub struct FilledFrames {
    paths: Vec<PathBuf>,
    keep: bool,
}

impl FilledFrames {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Leave the files in place and hand back their paths.
    pub fn keep(mut self) -> Vec<PathBuf> {
        self.keep = true;
        std::mem::take(&mut self.paths)
    }

    /// Remove the files now, reporting the first failure.
    pub fn cleanup(mut self) -> Result<usize> {
        let paths = std::mem::take(&mut self.paths);
        let mut removed = 0;
        let mut first_error = None;
        for path in &paths {
            match fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!("Failed to remove {}: {}", path.display(), e);
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(removed),
        }
    }
}

impl Drop for FilledFrames {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        for path in &self.paths {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

pub struct FillMaterializer {
    canvas: Box<dyn CanvasRenderer>,
}

impl FillMaterializer {
    pub fn new(canvas: Box<dyn CanvasRenderer>) -> Self {
        Self { canvas }
    }

    /// Create one file per plan entry.
    ///
    /// Copies become symlinks to the source frame's file name, so links stay
    /// valid when the directory moves. If a step fails, the files created so
    /// far are removed with the returned guard's drop.
    pub fn materialize(&self, pattern: &FramePattern, plan: &FillPlan) -> Result<FilledFrames> {
        let mut filled = FilledFrames::default();

        for entry in &plan.entries {
            let target = PathBuf::from(pattern.expand_path(entry.frame));
            clear_dangling_link(&target)?;
            match entry.source {
                FillSource::CopyFromFrame { from_frame } => {
                    let source = PathBuf::from(pattern.expand_path(from_frame));
                    link_frame(&pattern.file_name(from_frame), &source, &target)?;
                    debug!("Linked {} -> {}", target.display(), source.display());
                }
                FillSource::SolidColor { width, height } => {
                    self.canvas
                        .render(CanvasKind::Black, Dimensions::new(width, height), &target)?;
                }
                FillSource::Checkerboard { width, height } => {
                    self.canvas.render(
                        CanvasKind::Checkerboard,
                        Dimensions::new(width, height),
                        &target,
                    )?;
                }
            }
            filled.paths.push(target);
        }

        if !filled.is_empty() {
            info!("Filled {} missing frame(s) of {}", filled.len(), pattern.to_hashes());
        }
        Ok(filled)
    }
}

/// A planned frame can still be a broken symlink (left by an earlier fill
/// whose source was deleted). Remove it so the new file is created in its
/// place rather than through it.
fn clear_dangling_link(target: &Path) -> std::io::Result<()> {
    let is_link = match target.symlink_metadata() {
        Ok(meta) => meta.file_type().is_symlink(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if is_link && !target.exists() {
        warn!("Replacing dangling link {}", target.display());
        fs::remove_file(target)?;
    }
    Ok(())
}

#[cfg(unix)]
fn link_frame(source_name: &str, _source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(source_name, target)
}

#[cfg(windows)]
fn link_frame(source_name: &str, _source: &Path, target: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(source_name, target)
}

#[cfg(not(any(unix, windows)))]
fn link_frame(_source_name: &str, source: &Path, target: &Path) -> std::io::Result<()> {
    fs::copy(source, target).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::FillEntry;
    use crate::pattern::parse_pattern;

    #[test]
    fn test_builtin_checkerboard_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("checker.png");
        ImageCanvas
            .render(CanvasKind::Checkerboard, Dimensions::new(40, 20), &target)
            .unwrap();

        let img = image::open(&target).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (40, 20));
        assert_eq!(*img.get_pixel(0, 0), CHECKER_LIGHT);
        assert_eq!(*img.get_pixel(CHECKER_SIZE, 0), CHECKER_DARK);
        assert_eq!(*img.get_pixel(CHECKER_SIZE, CHECKER_SIZE), CHECKER_LIGHT);
    }

    #[test]
    fn test_builtin_black_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("black.png");
        ImageCanvas
            .render(CanvasKind::Black, Dimensions::new(8, 4), &target)
            .unwrap();

        let img = image::open(&target).unwrap().to_rgb8();
        assert!(img.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_guard_removes_on_drop_unless_kept() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = parse_pattern(&format!("{}/f.##.png", dir.path().display())).unwrap();
        let plan = FillPlan {
            entries: vec![FillEntry {
                frame: 2,
                source: FillSource::SolidColor { width: 4, height: 4 },
            }],
            unresolved: Vec::new(),
        };
        let materializer = FillMaterializer::new(Box::new(ImageCanvas));

        let filled = materializer.materialize(&pattern, &plan).unwrap();
        let path = filled.paths()[0].clone();
        assert!(path.exists());
        drop(filled);
        assert!(!path.exists());

        let kept = materializer.materialize(&pattern, &plan).unwrap().keep();
        assert!(kept[0].exists());
    }

    #[test]
    fn test_magick_canvas_reports_missing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let canvas = MagickCanvas::new("mediaseq-no-such-magick");
        let err = canvas
            .render(CanvasKind::Black, Dimensions::new(2, 2), &dir.path().join("x.png"))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::SequenceError::Tool(crate::tool::ToolError::NotInstalled(_))
        ));
    }
}
