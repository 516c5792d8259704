//! # Image Processing Module
//!
//! Questo modulo definisce i collaboratori esterni della pipeline (probe, resize,
//! ricompressione) dietro il trait `ImageBackend`, e la loro implementazione di produzione
//! `ExternalToolBackend` che delega a tool esterni specializzati.
//!
//! ## Formati e tool
//!
//! | Formato | Probe | Resize | Ricompressione |
//! |---------|-------|--------|----------------|
//! | JPEG    | `image` / identify | magick, convert, vips | cjpeg (mozjpeg) `-quality 80`, jpegoptim `--max=80` |
//! | PNG     | `image` / identify | magick, convert, vips | pngquant `--quality=65-80` |
//! | GIF     | `image` / identify | magick, convert (coalesce) | gifsicle `-O3` |
//! | WebP    | `image` / identify | magick, convert, vips | cwebp `-q 80` |
//! | SVG     | `roxmltree` | riscrittura tag radice | svgo |
//!
//! ## Strategia
//!
//! - Ogni operazione lavora su una directory scratch (`tempfile`) rimossa al drop: il file
//!   originale non viene mai toccato da questo modulo, solo letto.
//! - I tool vengono provati in ordine di preferenza; si passa al successivo se fallisce o se
//!   non lascia output.
//! - I tool arrivano da `PlatformCommands`, iniettabile con `with_platform`.
//! - Nessun tool disponibile → `OptimizeError::MissingDependency` (errore per-file).
//! - pngquant esce con 98/99 quando non riesce a rispettare la qualità minima: il
//!   contenuto viene restituito invariato e il commit condizionale lo scarta.
//!
//! ## Esempio
//!
//! ```ignore
//! let backend = ExternalToolBackend::new(Config::default());
//! let meta = backend.probe(&task).await?;
//! let smaller = backend.compress(task.extension.compressor(), &bytes).await?;
//! ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::args;
use crate::config::Config;
use crate::error::OptimizeError;
use crate::format::{Compressor, ImageExtension, ImageMetadata, ImageTask};
use crate::platform::PlatformCommands;
use crate::svg;
use crate::tool_resolver::ToolPathResolver;
use crate::utils::to_string_vec;

/// The external operations the single-image transformer relies on.
///
/// Implementations must not modify the file they are given; they only return bytes.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Read pixel dimensions, failing for corrupt or unsupported content
    async fn probe(&self, task: &ImageTask) -> Result<ImageMetadata, OptimizeError>;

    /// Produce the image re-encoded at exactly `target` dimensions
    async fn resize(&self, task: &ImageTask, target: ImageMetadata) -> Result<Vec<u8>, OptimizeError>;

    /// Recompress raw bytes of the compressor's format
    async fn compress(&self, compressor: Compressor, input: &[u8]) -> Result<Vec<u8>, OptimizeError>;

    /// Log which capabilities are usable; called once before the run
    async fn report_capabilities(&self) {}
}

/// Where a tool leaves its result
#[derive(Debug, Clone, PartialEq)]
enum ToolOutput {
    File(PathBuf),
    Stdout,
}

/// One candidate command for an operation
#[derive(Debug, Clone)]
struct ToolInvocation {
    tool: &'static str,
    args: Vec<String>,
    output: ToolOutput,
    /// Exit codes meaning "ran fine, could not do better than the input"
    unchanged_codes: &'static [i32],
}

impl ToolInvocation {
    fn to_file(tool: &'static str, args: Vec<String>, output: &Path) -> Self {
        Self {
            tool,
            args,
            output: ToolOutput::File(output.to_path_buf()),
            unchanged_codes: &[],
        }
    }

    fn to_stdout(tool: &'static str, args: Vec<String>) -> Self {
        Self {
            tool,
            args,
            output: ToolOutput::Stdout,
            unchanged_codes: &[],
        }
    }
}

enum PlanOutcome {
    Bytes(Vec<u8>),
    Unchanged,
}

/// Production backend: `image` crate probing plus external command-line tools
pub struct ExternalToolBackend {
    config: Config,
    platform: Arc<PlatformCommands>,
}

impl ExternalToolBackend {
    /// Tools from the bundled tools directory or `PATH`
    pub fn new(config: Config) -> Self {
        Self::with_platform(config, PlatformCommands::with_resolver(ToolPathResolver::new()))
    }

    pub fn with_platform(config: Config, platform: PlatformCommands) -> Self {
        Self {
            config,
            platform: Arc::new(platform),
        }
    }

    fn scratch_dir() -> Result<tempfile::TempDir, OptimizeError> {
        Ok(tempfile::Builder::new().prefix("image-shrinker-").tempdir()?)
    }

    /// Recompression commands for a format, in order of preference
    fn compression_plan(&self, compressor: Compressor, input: &Path, output: &Path) -> Vec<ToolInvocation> {
        match compressor {
            Compressor::Jpeg => vec![
                ToolInvocation::to_file(
                    "cjpeg",
                    args![
                        "-quality", self.config.jpeg_quality,
                        "-optimize", "-progressive",
                        "-outfile", output.display(),
                        input.display(),
                    ],
                    output,
                ),
                ToolInvocation::to_stdout(
                    "jpegoptim",
                    args![format!("--max={}", self.config.jpeg_quality), "--stdout", input.display()],
                ),
            ],
            Compressor::Png => vec![ToolInvocation {
                unchanged_codes: &[98, 99],
                ..ToolInvocation::to_file(
                    "pngquant",
                    args![
                        format!("--quality={}", self.config.png_quality_arg()),
                        "--force",
                        "--output", output.display(),
                        input.display(),
                    ],
                    output,
                )
            }],
            Compressor::Gif => vec![ToolInvocation::to_file(
                "gifsicle",
                [to_string_vec(["-O3", "--no-warnings"]), args![input.display(), "-o", output.display()]].concat(),
                output,
            )],
            Compressor::Svg => vec![ToolInvocation::to_file(
                "svgo",
                args![input.display(), "-o", output.display()],
                output,
            )],
            Compressor::Webp => vec![ToolInvocation::to_file(
                "cwebp",
                args![
                    "-q", self.config.webp_quality,
                    "-m", 4,
                    "-quiet",
                    input.display(),
                    "-o", output.display(),
                ],
                output,
            )],
        }
    }

    /// Raster resize commands, in order of preference
    fn resize_plan(extension: ImageExtension, input: &Path, output: &Path, target: ImageMetadata) -> Vec<ToolInvocation> {
        // exact geometry: aspect ratio is already preserved by `target`
        let geometry = format!("{}x{}!", target.width, target.height);
        let magick_args = if extension == ImageExtension::Gif {
            args![
                input.display(), "-coalesce",
                "-resize", geometry,
                "-layers", "Optimize",
                output.display(),
            ]
        } else {
            args![
                input.display(),
                "-resize", geometry,
                "-quality", 95,
                output.display(),
            ]
        };

        let mut plan = vec![
            ToolInvocation::to_file("magick", magick_args.clone(), output),
            ToolInvocation::to_file("convert", magick_args, output),
        ];

        // vips flattens animations
        if extension != ImageExtension::Gif {
            plan.push(ToolInvocation::to_file(
                "vips",
                args![
                    "thumbnail",
                    input.display(),
                    format!("{}[Q=95]", output.display()),
                    target.width,
                    "--height", target.height,
                    "--size", "down",
                ],
                output,
            ));
        }
        plan
    }

    /// Try each invocation whose tool is installed until one succeeds
    async fn run_plan(&self, label: &str, plan: &[ToolInvocation]) -> Result<PlanOutcome, OptimizeError> {
        let platform = &self.platform;
        let mut last_failure = None;

        for invocation in plan {
            if !platform.is_command_available(invocation.tool).await {
                continue;
            }

            let tool_path = platform.get_tool_path(invocation.tool);
            debug!("{} with {:?}: {:?}", label, tool_path, invocation.args);

            let start_time = std::time::Instant::now();
            let output = Command::new(&tool_path).args(&invocation.args).output().await?;
            let elapsed = start_time.elapsed();

            if output.status.success() {
                let bytes = match &invocation.output {
                    ToolOutput::Stdout => output.stdout,
                    ToolOutput::File(path) => match tokio::fs::read(path).await {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            warn!("{} wrote no output with {} ({}), trying next tool", label, invocation.tool, e);
                            last_failure = Some(format!("{} left no output file: {}", invocation.tool, e));
                            continue;
                        }
                    },
                };
                if bytes.is_empty() {
                    warn!("{} produced no output with {}, trying next tool", label, invocation.tool);
                    last_failure = Some(format!("{} produced an empty result", invocation.tool));
                    continue;
                }
                debug!("{} completed with {} in {:?}", label, invocation.tool, elapsed);
                return Ok(PlanOutcome::Bytes(bytes));
            }

            if let Some(code) = output.status.code() {
                if invocation.unchanged_codes.contains(&code) {
                    debug!("{} could not improve the input ({} exit {})", label, invocation.tool, code);
                    return Ok(PlanOutcome::Unchanged);
                }
            }

            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "{} failed with {} after {:?} ({}), trying next tool",
                label,
                invocation.tool,
                elapsed,
                stderr.trim()
            );
            last_failure = Some(format!("{} exited with {}: {}", invocation.tool, output.status, stderr.trim()));
        }

        match last_failure {
            Some(reason) => Err(OptimizeError::Compression(format!("{}: {}", label, reason))),
            None => {
                let tools: Vec<&str> = plan.iter().map(|i| i.tool).collect();
                Err(OptimizeError::MissingDependency(format!(
                    "{} needs one of: {}",
                    label,
                    tools.join(", ")
                )))
            }
        }
    }

    /// Dimensions through ImageMagick, for files the `image` crate cannot read
    async fn identify_dimensions(&self, path: &Path) -> Option<ImageMetadata> {
        let platform = &self.platform;
        let first_frame = format!("{}[0]", path.display());
        let candidates = [
            ("magick", args!["identify", "-format", "%w %h", first_frame]),
            ("identify", args!["-format", "%w %h", first_frame]),
        ];

        for (tool, args) in candidates {
            if !platform.is_command_available(tool).await {
                continue;
            }
            let output = match Command::new(platform.get_tool_path(tool)).args(&args).output().await {
                Ok(output) if output.status.success() => output,
                _ => continue,
            };
            let text = String::from_utf8_lossy(&output.stdout);
            let mut parts = text.split_whitespace().map(|p| p.parse::<u32>());
            if let (Some(Ok(width)), Some(Ok(height))) = (parts.next(), parts.next()) {
                if width > 0 && height > 0 {
                    return Some(ImageMetadata { width, height });
                }
            }
        }
        None
    }
}

#[async_trait]
impl ImageBackend for ExternalToolBackend {
    async fn probe(&self, task: &ImageTask) -> Result<ImageMetadata, OptimizeError> {
        if task.extension.is_vector() {
            let doc = tokio::fs::read(&task.path).await?;
            return svg::dimensions(&doc);
        }

        let path = task.path.clone();
        let decoded = tokio::task::spawn_blocking(move || image::image_dimensions(&path))
            .await
            .map_err(|e| OptimizeError::Probe(format!("probe task failed: {}", e)))?;

        match decoded {
            Ok((width, height)) => Ok(ImageMetadata { width, height }),
            Err(e) => match self.identify_dimensions(&task.path).await {
                Some(meta) => {
                    debug!("image crate could not read {} ({}), identify did", task.path.display(), e);
                    Ok(meta)
                }
                None => Err(OptimizeError::Probe(format!("{}: {}", task.path.display(), e))),
            },
        }
    }

    async fn resize(&self, task: &ImageTask, target: ImageMetadata) -> Result<Vec<u8>, OptimizeError> {
        if task.extension.is_vector() {
            let doc = tokio::fs::read(&task.path).await?;
            return svg::resize(&doc, target);
        }

        let scratch = Self::scratch_dir()?;
        let output = scratch.path().join(format!("resized.{}", task.extension));
        let plan = Self::resize_plan(task.extension, &task.path, &output, target);

        match self.run_plan("Resize", &plan).await {
            Ok(PlanOutcome::Bytes(bytes)) => Ok(bytes),
            Ok(PlanOutcome::Unchanged) => Err(OptimizeError::Resize("resizer reported no output".into())),
            Err(OptimizeError::Compression(reason)) => Err(OptimizeError::Resize(reason)),
            Err(e) => Err(e),
        }
    }

    async fn compress(&self, compressor: Compressor, input: &[u8]) -> Result<Vec<u8>, OptimizeError> {
        let scratch = Self::scratch_dir()?;
        let ext = compressor.scratch_extension();
        let input_path = scratch.path().join(format!("input.{}", ext));
        let output_path = scratch.path().join(format!("output.{}", ext));
        tokio::fs::write(&input_path, input).await?;

        let plan = self.compression_plan(compressor, &input_path, &output_path);
        match self.run_plan(compressor.label(), &plan).await? {
            PlanOutcome::Bytes(bytes) => Ok(bytes),
            PlanOutcome::Unchanged => Ok(input.to_vec()),
        }
    }

    async fn report_capabilities(&self) {
        let platform = &self.platform;
        let categories: [(&str, &[&str]); 6] = [
            ("Resize", &["magick", "convert", "vips"]),
            ("JPEG", &["cjpeg", "jpegoptim"]),
            ("PNG", &["pngquant"]),
            ("GIF", &["gifsicle"]),
            ("SVG", &["svgo"]),
            ("WebP", &["cwebp"]),
        ];

        let mut available = Vec::new();
        for (category, tools) in categories {
            let mut found = None;
            for tool in tools {
                if platform.is_command_available(tool).await {
                    found = Some(*tool);
                    break;
                }
            }
            match found {
                Some(tool) => available.push(format!("{} ({})", category, tool)),
                None => warn!(
                    "No {} tool found (install one of: {}); those files will be reported as errors",
                    category,
                    tools.join(", ")
                ),
            }
        }

        if !available.is_empty() {
            info!("Available tools: {}", available.join(", "));
        }
        debug!("{}", platform.get_tools_report());
    }
}
