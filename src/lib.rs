//! # vidascii - video to colored ASCII, rendered in a real terminal
//!
//! `vidascii` plays a video as colored ASCII art in the terminal and records
//! what the terminal shows back into a new video.
//!
//! Each frame is reduced to one cell per character: brightness picks a glyph
//! from a ramp, and the color is quantized to the 16-color console palette.
//! Before drawing, the renderer reads back what the terminal currently shows
//! and rewrites only the cells whose glyph changed. After drawing, the whole
//! screen is captured as an image.
//!
//! ## Example
//!
//! Rendering a directory of numbered frames onto an in-memory terminal:
//!
//! ```no_run
//! use vidascii::terminal::MemoryTerminal;
//! use vidascii::{Size, VideoConverter};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let converter = VideoConverter::new();
//! let mut terminal = MemoryTerminal::new(Size::new(80, 24));
//! let summary = converter.render_frames(
//!     Path::new("frames"),
//!     Path::new("capture"),
//!     &mut terminal,
//!     |p| println!("{}", p.message),
//! )?;
//! println!("{} frames, {} cells written", summary.frames, summary.cells_written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Progress Reporting
//!
//! [`VideoConverter::convert_video`] reports each phase through a callback:
//!
//! ```no_run
//! use vidascii::{ProgressPhase, VideoConverter, VideoOptions};
//! use std::path::Path;
//!
//! let converter = VideoConverter::new();
//! converter.convert_video(
//!     Path::new("video.mp4"),
//!     Path::new("output.mp4"),
//!     &VideoOptions::default(),
//!     |progress| match progress.phase {
//!         ProgressPhase::ExtractingFrames => eprintln!("Extracting frames..."),
//!         ProgressPhase::RenderingFrames => {}
//!         ProgressPhase::Assembling => eprintln!("Encoding..."),
//!         ProgressPhase::Complete => eprintln!("Done!"),
//!     },
//! ).unwrap();
//! ```

use anyhow::{anyhow, Context};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

pub mod error;
pub mod ffmpeg;
pub mod glyph;
pub mod grid;
pub mod palette;
pub mod pipeline;
pub mod raster;
pub mod renderer;
pub mod sink;
pub mod snapshot;
pub mod source;
pub mod staging;
pub mod terminal;

pub use error::{Error, Result};
pub use ffmpeg::{FfmpegConfig, FrameRate, Trim};
pub use glyph::BrightnessRamp;
pub use grid::{Grid, Size};
pub use palette::PaletteColor;
pub use pipeline::{CapturePipeline, PipelineSummary};
pub use raster::Rasterizer;
pub use renderer::FrameRenderer;
pub use sink::{DirectorySink, FrameImage, FrameSink};
pub use source::FrameSource;

use staging::StagingGuard;
use terminal::{AnsiTerminal, TerminalDevice};

/// Represents the current phase of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressPhase {
    /// Splitting the input video into frames with ffmpeg
    ExtractingFrames,
    /// Drawing frames in the terminal and capturing the screen
    RenderingFrames,
    /// Encoding captured frames and muxing the original audio
    Assembling,
    /// Conversion completed successfully
    Complete,
}

/// Progress information for conversion operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Current phase of the conversion
    pub phase: ProgressPhase,
    /// Number of items completed in the current phase
    pub completed: usize,
    /// Total number of items in the current phase (0 if unknown)
    pub total: usize,
    /// Percentage complete (0.0 to 100.0)
    pub percentage: f64,
    /// Human-readable message describing current status
    pub message: String,
}

impl Progress {
    pub fn extracting_frames() -> Self {
        Self {
            phase: ProgressPhase::ExtractingFrames,
            completed: 0,
            total: 0,
            percentage: 0.0,
            message: "Extracting frames from video...".to_string(),
        }
    }

    pub fn rendering_frames(completed: usize, total: usize) -> Self {
        let percentage = if total > 0 {
            (completed as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        Self {
            phase: ProgressPhase::RenderingFrames,
            completed,
            total,
            percentage,
            message: format!("Rendering frame {} of {}", completed, total),
        }
    }

    pub fn assembling() -> Self {
        Self {
            phase: ProgressPhase::Assembling,
            completed: 0,
            total: 0,
            percentage: 0.0,
            message: "Assembling video...".to_string(),
        }
    }

    pub fn complete(total_frames: usize) -> Self {
        Self {
            phase: ProgressPhase::Complete,
            completed: total_frames,
            total: total_frames,
            percentage: 100.0,
            message: format!("Conversion complete: {} frames", total_frames),
        }
    }
}

/// Quality preset: the x264 CRF used when encoding, 1 (best) to 51 (worst).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub quality: u8,
}

/// Application configuration, read from `vidascii.json`.
///
/// Every field is optional in the file; missing ones take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub presets: HashMap<String, Preset>,
    pub default_preset: String,
    /// Glyphs from dimmest to brightest.
    pub ramp: String,
    /// One of [`pipeline::FILTER_NAMES`].
    pub resize_filter: String,
    /// Font for screen capture. Common monospace fonts are tried when unset.
    pub font_path: Option<PathBuf>,
    pub font_size: f32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub staging_dir: PathBuf,
    pub output_name: String,
    pub frame_digits: usize,
    /// Number of the first extracted frame file.
    pub first_frame_index: u64,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        let presets = [("default", 23), ("small", 35), ("best", 1)]
            .into_iter()
            .map(|(name, quality)| (name.to_string(), Preset { quality }))
            .collect();
        Self {
            presets,
            default_preset: "default".to_string(),
            ramp: glyph::DEFAULT_RAMP.to_string(),
            resize_filter: "triangle".to_string(),
            font_path: None,
            font_size: 16.0,
            cell_width: 10,
            cell_height: 20,
            staging_dir: PathBuf::from("temp"),
            output_name: "output.mp4".to_string(),
            frame_digits: 8,
            first_frame_index: 1,
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

/// Inclusive range of accepted x264 CRF values.
pub const QUALITY_RANGE: std::ops::RangeInclusive<u8> = 1..=51;

/// Accepted capture cell box edge, in pixels.
pub const CELL_PIXELS: std::ops::RangeInclusive<u32> = 1..=raster::MAX_CELL_PIXELS;

impl AppConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ramp.is_empty() {
            return Err(anyhow!("ramp must contain at least one character"));
        }
        if let Some(c) = self.ramp.chars().find(|c| !glyph::is_printable_glyph(*c)) {
            return Err(anyhow!(
                "ramp contains {:?}; only space and visible ASCII characters can be drawn",
                c
            ));
        }
        for (name, preset) in &self.presets {
            if !QUALITY_RANGE.contains(&preset.quality) {
                return Err(anyhow!(
                    "preset '{}' has quality {}, expected 1-51",
                    name,
                    preset.quality
                ));
            }
        }
        if !self.presets.contains_key(&self.default_preset) {
            return Err(anyhow!("default preset '{}' is not defined", self.default_preset));
        }
        if !CELL_PIXELS.contains(&self.cell_width) || !CELL_PIXELS.contains(&self.cell_height) {
            return Err(anyhow!(
                "cell_width and cell_height must be between {} and {} pixels",
                CELL_PIXELS.start(),
                CELL_PIXELS.end()
            ));
        }
        if !(1..=12).contains(&self.frame_digits) {
            return Err(anyhow!("frame_digits must be between 1 and 12"));
        }
        if pipeline::parse_filter(&self.resize_filter).is_none() {
            return Err(anyhow!(
                "unknown resize_filter '{}', expected one of: {}",
                self.resize_filter,
                pipeline::FILTER_NAMES.join(", ")
            ));
        }
        Ok(())
    }

    pub fn brightness_ramp(&self) -> anyhow::Result<BrightnessRamp> {
        BrightnessRamp::new(&self.ramp).ok_or_else(|| anyhow!("invalid ramp {:?}", self.ramp))
    }

    pub fn filter(&self) -> anyhow::Result<FilterType> {
        pipeline::parse_filter(&self.resize_filter)
            .ok_or_else(|| anyhow!("unknown resize_filter '{}'", self.resize_filter))
    }

    pub fn ffmpeg_config(&self) -> FfmpegConfig {
        FfmpegConfig::new(&self.ffmpeg, &self.ffprobe)
    }

    pub fn preset(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }
}

/// Options for one video conversion
#[derive(Debug, Clone)]
pub struct VideoOptions {
    /// x264 CRF for the output, 1 (best) to 51 (worst)
    pub quality: u8,
    /// Start time (e.g., "00:01:23.456" or "83.456")
    pub start: Option<String>,
    /// End time (e.g., "00:01:23.456" or "83.456")
    pub end: Option<String>,
    /// Let ffmpeg scale frames to the terminal grid during extraction
    pub prescale: bool,
    /// Leave the staging directory on disk afterwards
    pub keep_staging: bool,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            quality: 23,
            start: None,
            end: None,
            prescale: true,
            keep_staging: false,
        }
    }
}

impl VideoOptions {
    pub fn trim(&self) -> Trim {
        Trim::new(self.start.clone(), self.end.clone())
    }
}

/// Main entry point: renders frame directories or whole videos.
pub struct VideoConverter {
    config: AppConfig,
}

impl VideoConverter {
    /// Create a converter with default configuration
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Create a converter with custom configuration
    pub fn with_config(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Load configuration from a JSON file
    pub fn from_config_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&text).context("parsing config json")?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Rasterizer for screen capture, using the configured or a discovered font.
    pub fn rasterizer(&self) -> anyhow::Result<Rasterizer> {
        let c = &self.config;
        Ok(Rasterizer::discover(
            c.font_path.as_deref(),
            c.font_size,
            c.cell_width,
            c.cell_height,
        )?)
    }

    /// Render the numbered frames in `frames_dir` on `device` and save one
    /// capture per frame into `output_dir`, numbered from 0.
    ///
    /// The grid size is the device's size.
    pub fn render_frames<D, F>(
        &self,
        frames_dir: &Path,
        output_dir: &Path,
        device: &mut D,
        mut progress: F,
    ) -> anyhow::Result<PipelineSummary>
    where
        D: TerminalDevice + ?Sized,
        F: FnMut(Progress),
    {
        let frames = FrameSource::open(frames_dir, self.config.first_frame_index)?;
        progress(Progress::rendering_frames(0, frames.len()));
        self.render_source(frames, output_dir, device, progress)
    }

    fn render_source<D, F>(
        &self,
        frames: FrameSource,
        output_dir: &Path,
        device: &mut D,
        progress: F,
    ) -> anyhow::Result<PipelineSummary>
    where
        D: TerminalDevice + ?Sized,
        F: FnMut(Progress),
    {
        let renderer = FrameRenderer::new(self.config.brightness_ramp()?, device.size());
        let mut sink = DirectorySink::new(output_dir, self.config.frame_digits)?;
        let summary = CapturePipeline::new(device, renderer)
            .with_filter(self.config.filter()?)
            .run(frames, &mut sink, progress)?;
        Ok(summary)
    }

    /// Convert `input` into an ASCII-art video at `output`.
    ///
    /// Takes over the controlling terminal (alternate screen) while frames
    /// render, and restores it before encoding starts.
    pub fn convert_video<F>(
        &self,
        input: &Path,
        output: &Path,
        opts: &VideoOptions,
        mut progress: F,
    ) -> anyhow::Result<PipelineSummary>
    where
        F: FnMut(Progress),
    {
        if !QUALITY_RANGE.contains(&opts.quality) {
            return Err(anyhow!("quality {} is outside 1-51", opts.quality));
        }
        if !input.is_file() {
            return Err(anyhow!("input {} does not exist", input.display()));
        }
        let tools = self.config.ffmpeg_config();
        tools.check()?;

        let size = terminal::detect_size().context("reading terminal size")?;
        if size.is_empty() {
            return Err(anyhow!("terminal is too small ({})", size));
        }
        log::info!("rendering {} on a {} grid", input.display(), size);

        let mut staging = StagingGuard::create(&self.config.staging_dir)?;
        if opts.keep_staging {
            staging.keep();
        }
        let frames_dir = staging.subdir("frames")?;
        let capture_dir = staging.subdir("capture")?;
        let trim = opts.trim();
        let digits = self.config.frame_digits;

        progress(Progress::extracting_frames());
        ffmpeg::extract_frames(
            &tools,
            input,
            &frames_dir,
            digits,
            self.config.first_frame_index,
            opts.prescale.then_some(size),
            &trim,
        )?;
        let rate = ffmpeg::probe_frame_rate(&tools, input)?;
        log::info!("source frame rate {} ({:.3} fps)", rate, rate.as_f64());

        let rasterizer = self.rasterizer()?;
        let frames = FrameSource::open(&frames_dir, self.config.first_frame_index)?;
        // Callers must stop drawing on the terminal once this arrives; any
        // byte that bypasses the device would desync its display memory.
        progress(Progress::rendering_frames(0, frames.len()));
        let summary = {
            let mut term = AnsiTerminal::new(BufWriter::new(io::stdout()), size, rasterizer);
            #[cfg(windows)]
            term.attach_console(terminal::ConsoleReader::stdout()?);
            term.enter()?;
            let result = self.render_source(frames, &capture_dir, &mut term, &mut progress);
            term.leave()?;
            result?
        };

        progress(Progress::assembling());
        let video = staging.path().join("video.mp4");
        ffmpeg::encode_frames(&tools, &capture_dir, digits, 0, rate, opts.quality, &video)?;
        ffmpeg::mux_audio(&tools, &video, input, &trim, output)?;

        progress(Progress::complete(summary.frames));
        log::info!("wrote {}", output.display());
        Ok(summary)
    }
}

impl Default for VideoConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = AppConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.preset("default"), Some(&Preset { quality: 23 }));
        assert_eq!(cfg.preset("small"), Some(&Preset { quality: 35 }));
        assert_eq!(cfg.preset("best"), Some(&Preset { quality: 1 }));
        assert_eq!(cfg.filter().unwrap(), FilterType::Triangle);
        assert_eq!(cfg.brightness_ramp().unwrap().as_str(), " .-+o#@");
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let cfg: AppConfig = serde_json::from_str(r#"{"ramp": " .:#", "cell_width": 8}"#).unwrap();
        assert_eq!(cfg.ramp, " .:#");
        assert_eq!(cfg.cell_width, 8);
        assert_eq!(cfg.cell_height, 20);
        assert_eq!(cfg.frame_digits, 8);
        cfg.validate().unwrap();
    }

    #[test]
    fn validation_rejects_bad_values() {
        let bad = |f: fn(&mut AppConfig)| {
            let mut cfg = AppConfig::default();
            f(&mut cfg);
            cfg.validate().is_err()
        };
        assert!(bad(|c| c.ramp.clear()));
        assert!(bad(|c| c.ramp = " .é".into()));
        assert!(bad(|c| c.ramp = "\t.@".into()));
        assert!(bad(|c| c.ramp = " .\u{7f}".into()));
        assert!(bad(|c| {
            c.presets.insert("zero".into(), Preset { quality: 0 });
        }));
        assert!(bad(|c| {
            c.presets.insert("huge".into(), Preset { quality: 52 });
        }));
        assert!(bad(|c| c.default_preset = "missing".into()));
        assert!(bad(|c| c.cell_height = 0));
        assert!(bad(|c| c.cell_width = 257));
        assert!(bad(|c| c.cell_height = u32::MAX));
        assert!(bad(|c| c.frame_digits = 0));
        assert!(bad(|c| c.frame_digits = 13));
        assert!(bad(|c| c.resize_filter = "bicubic".into()));
    }

    #[test]
    fn with_config_validates() {
        let cfg = AppConfig {
            ramp: String::new(),
            ..AppConfig::default()
        };
        assert!(VideoConverter::with_config(cfg).is_err());
    }

    #[test]
    fn config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vidascii.json");
        let cfg = AppConfig {
            resize_filter: "nearest".into(),
            ..AppConfig::default()
        };
        fs::write(&path, serde_json::to_string_pretty(&cfg).unwrap()).unwrap();
        let converter = VideoConverter::from_config_file(&path).unwrap();
        assert_eq!(converter.config(), &cfg);

        fs::write(&path, r#"{"frame_digits": 40}"#).unwrap();
        assert!(VideoConverter::from_config_file(&path).is_err());
    }

    #[test]
    fn progress_percentages() {
        assert_eq!(Progress::rendering_frames(1, 4).percentage, 25.0);
        assert_eq!(Progress::rendering_frames(0, 0).percentage, 0.0);
        assert_eq!(Progress::complete(7).completed, 7);
    }
}
