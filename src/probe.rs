//! Image dimension probing

use crate::tool::{ToolCommand, ToolError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Could not read dimensions of {path}: {detail}")]
    Unreadable { path: String, detail: String },

    #[error("Zero-sized image: {0}")]
    ZeroSized(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Reports the pixel size of an existing image file
pub trait ImageProbe {
    fn dimensions(&self, path: &Path) -> Result<Dimensions, ProbeError>;
}

/// Which [`ImageProbe`] implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProbeBackend {
    /// OpenImageIO `iinfo`
    Iinfo,
    /// Header read through the `image` crate
    #[default]
    Decoder,
}

impl ProbeBackend {
    pub fn build(self) -> Box<dyn ImageProbe> {
        match self {
            ProbeBackend::Iinfo => Box::new(IinfoProbe::default()),
            ProbeBackend::Decoder => Box::new(DecoderProbe),
        }
    }
}

/// Shells out to OpenImageIO's `iinfo`.
///
/// `iinfo` prints `<name> : <W> x <H>, <channels>, <format>`.
pub struct IinfoProbe {
    program: String,
}

impl IinfoProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for IinfoProbe {
    fn default() -> Self {
        Self::new("iinfo")
    }
}

impl ImageProbe for IinfoProbe {
    fn dimensions(&self, path: &Path) -> Result<Dimensions, ProbeError> {
        let output = ToolCommand::new(self.program.as_str()).path(path).execute()?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        let dims = parse_iinfo_dimensions(&stdout).ok_or_else(|| {
            ProbeError::Unreadable {
                path: path.display().to_string(),
                detail: stdout.trim().to_string(),
            }
        })?;
        check_nonzero(dims, path)
    }
}

/// Reads the image header with the `image` crate; no external binary needed.
pub struct DecoderProbe;

impl ImageProbe for DecoderProbe {
    fn dimensions(&self, path: &Path) -> Result<Dimensions, ProbeError> {
        let (width, height) = image::image_dimensions(path)?;
        check_nonzero(Dimensions::new(width, height), path)
    }
}

fn check_nonzero(dims: Dimensions, path: &Path) -> Result<Dimensions, ProbeError> {
    if dims.width == 0 || dims.height == 0 {
        return Err(ProbeError::ZeroSized(path.display().to_string()));
    }
    Ok(dims)
}

/// Find the first `W x H` that follows a `:` in `iinfo` output.
///
/// Every colon is tried because file names may contain colons themselves.
pub fn parse_iinfo_dimensions(output: &str) -> Option<Dimensions> {
    output.lines().find_map(|line| {
        line.match_indices(':').find_map(|(pos, _)| {
            let field = line[pos + 1..].split(',').next()?;
            let (w, h) = field.split_once('x')?;
            let width = w.trim().parse().ok()?;
            let height = h.trim().parse().ok()?;
            Some(Dimensions::new(width, height))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iinfo_line() {
        let out = "render.0101.exr :  1920 x 1080, 4 channel, half openexr\n";
        assert_eq!(parse_iinfo_dimensions(out), Some(Dimensions::new(1920, 1080)));
    }

    #[test]
    fn test_parse_iinfo_colon_in_name() {
        let out = "C:\\renders\\take:2.0001.tif : 2048 x 858, 3 channel, uint16 tiff";
        assert_eq!(parse_iinfo_dimensions(out), Some(Dimensions::new(2048, 858)));
    }

    #[test]
    fn test_parse_iinfo_garbage() {
        assert_eq!(parse_iinfo_dimensions(""), None);
        assert_eq!(parse_iinfo_dimensions("iinfo: could not open file"), None);
    }

    #[test]
    fn test_decoder_probe_reads_png_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.png");
        image::RgbImage::new(64, 36).save(&path).unwrap();

        let dims = DecoderProbe.dimensions(&path).unwrap();
        assert_eq!(dims, Dimensions::new(64, 36));
        assert_eq!(dims.to_string(), "64x36");
    }

    #[test]
    fn test_decoder_probe_missing_file() {
        assert!(DecoderProbe.dimensions(Path::new("/nonexistent/frame.png")).is_err());
    }
}
