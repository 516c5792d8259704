//! # Image Format Module
//!
//! Insieme chiuso delle estensioni riconosciute e mapping estensione → compressore.
//!
//! ## Estensioni (6):
//! `jpg`, `jpeg`, `png`, `gif`, `webp`, `svg` (case-insensitive in discovery)
//!
//! ## Compressori (5):
//! | Estensione  | Compressore | Tipo |
//! |-------------|-------------|------|
//! | jpg, jpeg   | `Jpeg`      | lossy, qualità 80 |
//! | png         | `Png`       | quantizzazione 0.65-0.8 |
//! | gif         | `Gif`       | lossless strutturale |
//! | svg         | `Svg`       | ottimizzazione markup |
//! | webp        | `Webp`      | lossy, qualità 80 |
//!
//! Il `match` esaustivo su `ImageExtension` garantisce a compile time che ogni estensione
//! abbia un compressore.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One of the recognized image file extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageExtension {
    Jpg,
    Jpeg,
    Png,
    Gif,
    Webp,
    Svg,
}

impl ImageExtension {
    /// Parse an extension (without the dot), ignoring case
    pub fn parse(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" => Some(Self::Jpg),
            "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    /// Extension of a path, if it is one of the recognized ones
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::parse)
    }

    /// Lowercase tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Svg => "svg",
        }
    }

    /// Recompression strategy for this extension
    pub fn compressor(&self) -> Compressor {
        match self {
            Self::Jpg | Self::Jpeg => Compressor::Jpeg,
            Self::Png => Compressor::Png,
            Self::Gif => Compressor::Gif,
            Self::Webp => Compressor::Webp,
            Self::Svg => Compressor::Svg,
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Svg)
    }
}

impl fmt::Display for ImageExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format-specific recompression capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compressor {
    /// Lossy re-encode at the configured JPEG quality
    Jpeg,
    /// Palette quantization within the configured quality range
    Png,
    /// Lossless structural optimization
    Gif,
    /// Markup-level optimization
    Svg,
    /// Lossy re-encode at the configured WebP quality
    Webp,
}

impl Compressor {
    /// Human-readable name used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Gif => "GIF",
            Self::Svg => "SVG",
            Self::Webp => "WebP",
        }
    }

    /// File extension used for scratch files handed to external tools
    pub fn scratch_extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Svg => "svg",
            Self::Webp => "webp",
        }
    }
}

/// A discovered image waiting to be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTask {
    pub path: PathBuf,
    pub extension: ImageExtension,
}

impl ImageTask {
    /// Build a task if the path carries a recognized extension
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let extension = ImageExtension::from_path(&path)?;
        Some(Self { path, extension })
    }

    /// File name for log messages
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned()
    }
}

/// Dimensions reported by the probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
}

impl ImageMetadata {
    /// Target dimensions when the image is wider than `max_width`, aspect ratio preserved.
    /// `None` means no resize (never upscales).
    pub fn downscaled_to(&self, max_width: u32) -> Option<ImageMetadata> {
        if self.width <= max_width {
            return None;
        }
        let height = (self.height as f64 * max_width as f64 / self.width as f64).round() as u32;
        Some(ImageMetadata {
            width: max_width,
            height: height.max(1),
        })
    }
}

impl fmt::Display for ImageMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
