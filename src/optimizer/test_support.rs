//! In-memory `ImageBackend` for exercising the pipeline without external tools.
//!
//! Fake images are text files: a header line `FAKE <w>x<h>` (plus ` opt` once recompressed)
//! followed by padding. Anything else fails to probe, like a corrupt file would.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use crate::error::OptimizeError;
use crate::format::{Compressor, ImageMetadata, ImageTask};
use crate::image_processor::ImageBackend;

const OPTIMIZED: &str = " opt";

pub fn fake_image(width: u32, height: u32, size: usize, optimized: bool) -> Vec<u8> {
    let mut bytes = format!(
        "FAKE {}x{}{}\n",
        width,
        height,
        if optimized { OPTIMIZED } else { "" }
    )
    .into_bytes();
    if bytes.len() < size {
        bytes.resize(size, b'.');
    }
    bytes
}

pub fn write_fake(path: &Path, width: u32, height: u32, size: usize) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, fake_image(width, height, size, false)).unwrap();
}

pub fn parse_fake(bytes: &[u8]) -> Option<(ImageMetadata, bool)> {
    let text = std::str::from_utf8(bytes).ok()?;
    let header = text.lines().next()?.strip_prefix("FAKE ")?;
    let optimized = header.ends_with(OPTIMIZED);
    let dims = header.trim_end_matches(OPTIMIZED);
    let (w, h) = dims.split_once('x')?;
    Some((
        ImageMetadata {
            width: w.parse().ok()?,
            height: h.parse().ok()?,
        },
        optimized,
    ))
}

/// Configurable fake backend
pub struct FakeBackend {
    /// Fraction of the size kept by recompression
    pub compress_ratio: f64,
    /// Recompression returns more bytes than it was given
    pub compress_grows: bool,
    pub failing_compressors: HashSet<Compressor>,
    pub fail_resize: bool,
    pub calls: Mutex<Vec<String>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            compress_ratio: 0.5,
            compress_grows: false,
            failing_compressors: HashSet::new(),
            fail_resize: false,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageBackend for FakeBackend {
    async fn probe(&self, task: &ImageTask) -> Result<ImageMetadata, OptimizeError> {
        self.record(format!("probe {}", task.display_name()));
        let bytes = tokio::fs::read(&task.path).await?;
        parse_fake(&bytes)
            .map(|(meta, _)| meta)
            .ok_or_else(|| OptimizeError::Probe(format!("{}: not a decodable image", task.path.display())))
    }

    async fn resize(&self, task: &ImageTask, target: ImageMetadata) -> Result<Vec<u8>, OptimizeError> {
        self.record(format!("resize {} {}", task.display_name(), target));
        if self.fail_resize {
            return Err(OptimizeError::Resize("fake resizer failure".into()));
        }
        let bytes = tokio::fs::read(&task.path).await?;
        let (meta, _) = parse_fake(&bytes).ok_or_else(|| OptimizeError::Resize("not an image".into()))?;
        let area_ratio = (target.width as f64 * target.height as f64) / (meta.width as f64 * meta.height as f64);
        let size = (bytes.len() as f64 * area_ratio) as usize;
        Ok(fake_image(target.width, target.height, size, false))
    }

    async fn compress(&self, compressor: Compressor, input: &[u8]) -> Result<Vec<u8>, OptimizeError> {
        self.record(format!("compress {}", compressor.label()));
        if self.failing_compressors.contains(&compressor) {
            return Err(OptimizeError::Compression(format!("fake {} failure", compressor.label())));
        }
        let (meta, optimized) =
            parse_fake(input).ok_or_else(|| OptimizeError::Compression("not an image".into()))?;
        if self.compress_grows {
            return Ok(fake_image(meta.width, meta.height, input.len() + 100, true));
        }
        if optimized {
            return Ok(input.to_vec());
        }
        let size = (input.len() as f64 * self.compress_ratio) as usize;
        Ok(fake_image(meta.width, meta.height, size, true))
    }
}
