//! Frame-by-frame render and capture loop.

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

use crate::error::{Error, Result};
use crate::renderer::FrameRenderer;
use crate::sink::{FrameImage, FrameSink};
use crate::snapshot::read_snapshot;
use crate::terminal::TerminalDevice;
use crate::Progress;

/// Resize filter names accepted in configuration.
pub const FILTER_NAMES: &[&str] = &["nearest", "triangle", "catmullrom", "gaussian", "lanczos3"];

/// Parse a resize filter name, case-insensitively.
pub fn parse_filter(name: &str) -> Option<FilterType> {
    match name.to_ascii_lowercase().as_str() {
        "nearest" => Some(FilterType::Nearest),
        "triangle" => Some(FilterType::Triangle),
        "catmullrom" => Some(FilterType::CatmullRom),
        "gaussian" => Some(FilterType::Gaussian),
        "lanczos3" => Some(FilterType::Lanczos3),
        _ => None,
    }
}

/// Totals for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineSummary {
    pub frames: usize,
    pub cells_written: usize,
}

/// Drives frames through a single terminal device, one at a time.
///
/// Each frame is resized to the grid, drawn over whatever the device reports
/// it is currently showing, captured, and handed to the sink. The first
/// failure stops the run; no frame is skipped.
pub struct CapturePipeline<'a, D: TerminalDevice + ?Sized> {
    device: &'a mut D,
    renderer: FrameRenderer,
    filter: FilterType,
    start_sequence: u64,
}

impl<'a, D: TerminalDevice + ?Sized> CapturePipeline<'a, D> {
    pub fn new(device: &'a mut D, renderer: FrameRenderer) -> Self {
        Self {
            device,
            renderer,
            filter: FilterType::Triangle,
            start_sequence: 0,
        }
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Sequence number of the first captured frame.
    pub fn with_start_sequence(mut self, start: u64) -> Self {
        self.start_sequence = start;
        self
    }

    pub fn renderer(&self) -> &FrameRenderer {
        &self.renderer
    }

    /// Render every frame into `sink`, calling `progress` after each one.
    pub fn run<I, S, F>(&mut self, frames: I, sink: &mut S, mut progress: F) -> Result<PipelineSummary>
    where
        I: IntoIterator<Item = Result<DynamicImage>>,
        S: FrameSink + ?Sized,
        F: FnMut(Progress),
    {
        let frames = frames.into_iter();
        let total = frames.size_hint().1.unwrap_or(0);
        let mut summary = PipelineSummary::default();

        for frame in frames {
            let frame = self.fit(frame?);
            let sequence = self.start_sequence + summary.frames as u64;
            summary.cells_written += self.process(&frame, sequence, sink)?;
            summary.frames += 1;
            progress(Progress::rendering_frames(summary.frames, total.max(summary.frames)));
        }

        if summary.frames == 0 {
            return Err(Error::exhausted("no frames to render"));
        }
        log::info!(
            "rendered {} frames, {} cells written",
            summary.frames,
            summary.cells_written
        );
        Ok(summary)
    }

    /// Run and keep every captured frame in memory.
    pub fn run_collect<I>(&mut self, frames: I) -> Result<Vec<FrameImage>>
    where
        I: IntoIterator<Item = Result<DynamicImage>>,
    {
        let mut out = Vec::new();
        self.run(frames, &mut out, |_| {})?;
        Ok(out)
    }

    fn fit(&self, frame: DynamicImage) -> RgbImage {
        let size = self.renderer.size();
        let (w, h) = (size.width as u32, size.height as u32);
        if frame.width() == w && frame.height() == h {
            return frame.into_rgb8();
        }
        frame.resize_exact(w, h, self.filter).into_rgb8()
    }

    fn process<S: FrameSink + ?Sized>(&mut self, frame: &RgbImage, sequence: u64, sink: &mut S) -> Result<usize> {
        let size = self.renderer.size();
        if self.device.size() != size {
            return Err(Error::DimensionMismatch {
                what: "terminal",
                expected: size,
                actual: self.device.size(),
            });
        }
        let previous = read_snapshot(&mut *self.device, 0, 0, size.width, size.height)?;
        let written = self.renderer.render(&mut *self.device, frame, &previous)?;
        let image = self.device.capture()?;
        sink.push(FrameImage { sequence, image })?;
        log::debug!("frame {} captured, {} cells changed", sequence, written);
        Ok(written)
    }
}
