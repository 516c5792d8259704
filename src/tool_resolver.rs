//! # Tool Path Resolver
//!
//! Finds the external image tools either in a bundled tools directory or on the system `PATH`.
//!
//! Lookup order:
//! 1. `IMAGE_SHRINKER_TOOLS_DIR` (or `TOOLS_DIR`) → `<dir>/<platform>/<tool>[.exe]`
//!    or `<dir>/<platform>/<tool>/<tool>[.exe]`
//! 2. System `PATH` (skipped by `ToolPathResolver::bundled_only`)

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Every binary the shrinker may invoke
pub const KNOWN_TOOLS: &[(&str, &str)] = &[
    ("magick", "Resize / probe (ImageMagick 7)"),
    ("convert", "Resize (ImageMagick 6)"),
    ("identify", "Probe fallback (ImageMagick 6)"),
    ("vips", "Resize (libvips)"),
    ("cjpeg", "JPEG recompression (mozjpeg)"),
    ("jpegoptim", "JPEG recompression"),
    ("pngquant", "PNG palette quantization"),
    ("gifsicle", "GIF lossless optimization"),
    ("svgo", "SVG markup optimization"),
    ("cwebp", "WebP recompression"),
];

/// Tool path resolver for bundled and system-installed tools
pub struct ToolPathResolver {
    tools_dir: Option<PathBuf>,
    search_path: bool,
}

impl ToolPathResolver {
    /// Create a new path resolver from the environment
    pub fn new() -> Self {
        Self::with_tools_dir(Self::detect_tools_dir())
    }

    /// Create a resolver with an explicit tools directory
    pub fn with_tools_dir(tools_dir: Option<PathBuf>) -> Self {
        Self {
            tools_dir,
            search_path: true,
        }
    }

    /// Only tools inside `tools_dir`, never from `PATH`
    pub fn bundled_only(tools_dir: PathBuf) -> Self {
        Self {
            tools_dir: Some(tools_dir),
            search_path: false,
        }
    }

    pub fn searches_path(&self) -> bool {
        self.search_path
    }

    /// Bundled tools directory in use, if any
    pub fn tools_dir(&self) -> Option<&Path> {
        self.tools_dir.as_deref()
    }

    fn detect_tools_dir() -> Option<PathBuf> {
        for var in ["IMAGE_SHRINKER_TOOLS_DIR", "TOOLS_DIR"] {
            if let Ok(dir) = env::var(var) {
                let path = PathBuf::from(dir);
                if path.is_dir() {
                    debug!("Found tools directory via {}: {:?}", var, path);
                    return Some(path);
                }
                debug!("{} points to a missing directory: {:?}", var, path);
            }
        }
        None
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        if let Some(ref tools_dir) = self.tools_dir {
            if let Some(bundled) = Self::bundled_tool_path(tools_dir, tool_name) {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled);
                return Some(bundled);
            }
        }

        if !self.search_path {
            return None;
        }

        let system = Self::find_in_system_path(tool_name);
        if system.is_none() {
            debug!("Tool not found: {}", tool_name);
        }
        system
    }

    fn executable_name(tool_name: &str) -> String {
        if cfg!(windows) {
            format!("{}.exe", tool_name)
        } else {
            tool_name.to_string()
        }
    }

    fn bundled_tool_path(tools_dir: &Path, tool_name: &str) -> Option<PathBuf> {
        let platform = if cfg!(target_os = "macos") {
            "darwin"
        } else {
            env::consts::OS
        };
        let exe = Self::executable_name(tool_name);

        [
            tools_dir.join(platform).join(&exe),
            tools_dir.join(platform).join(tool_name).join(&exe),
        ]
        .into_iter()
        .find(|path| path.is_file())
    }

    fn find_in_system_path(tool_name: &str) -> Option<PathBuf> {
        let exe = Self::executable_name(tool_name);
        env::split_paths(&env::var_os("PATH")?)
            .map(|dir| dir.join(&exe))
            .find(|path| path.is_file())
    }

    /// Check if a specific tool is available
    pub fn is_tool_available(&self, tool_name: &str) -> bool {
        self.resolve_tool(tool_name).is_some()
    }

    /// Install hint for a tool on Debian-like systems
    pub fn install_hint(tool_name: &str) -> &'static str {
        match tool_name {
            "magick" | "convert" | "identify" => "sudo apt-get install imagemagick",
            "vips" => "sudo apt-get install libvips-tools",
            "cjpeg" => "install mozjpeg (https://github.com/mozilla/mozjpeg)",
            "jpegoptim" => "sudo apt-get install jpegoptim",
            "pngquant" => "sudo apt-get install pngquant",
            "gifsicle" => "sudo apt-get install gifsicle",
            "svgo" => "npm install -g svgo",
            "cwebp" => "sudo apt-get install webp",
            _ => "see your package manager",
        }
    }

    /// Get a report of tool availability
    pub fn get_tools_report(&self) -> String {
        let mut report = String::from("Tool availability:\n");
        for (tool, purpose) in KNOWN_TOOLS {
            match self.resolve_tool(tool) {
                Some(path) => report.push_str(&format!("  [x] {} -> {:?} ({})\n", tool, path, purpose)),
                None => report.push_str(&format!(
                    "  [ ] {} ({}) - {}\n",
                    tool,
                    purpose,
                    Self::install_hint(tool)
                )),
            }
        }
        report
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}
