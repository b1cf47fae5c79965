//! ffmpeg and ffprobe invocations for frame extraction and video assembly.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command as ProcCommand, Stdio};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};

use crate::grid::Size;

/// Where to find the ffmpeg tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl FfmpegConfig {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Fail early with a readable message if either tool is missing.
    pub fn check(&self) -> Result<()> {
        for tool in [&self.ffmpeg, &self.ffprobe] {
            ProcCommand::new(tool)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .with_context(|| format!("{} not found; install ffmpeg or set its path in the config", tool.display()))?;
        }
        Ok(())
    }
}

/// Optional start and end timestamps, as `SS[.ms]`, `MM:SS` or `HH:MM:SS`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trim {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl Trim {
    pub fn new(start: Option<String>, end: Option<String>) -> Self {
        Self { start, end }
    }

    fn active_start(&self) -> Option<&str> {
        self.start.as_deref().filter(|s| !s.is_empty() && *s != "0")
    }

    fn active_end(&self) -> Option<&str> {
        self.end.as_deref().filter(|e| !e.is_empty())
    }

    /// Arguments placed before the `-i` they apply to.
    fn seek_args(&self) -> Vec<OsString> {
        match self.active_start() {
            Some(s) => vec!["-ss".into(), s.into()],
            None => Vec::new(),
        }
    }

    /// Output duration limit. With a start time the end is converted to a
    /// duration; an end at or before the start is ignored.
    fn duration_args(&self) -> Vec<OsString> {
        let Some(end) = self.active_end() else {
            return Vec::new();
        };
        match self.active_start() {
            Some(start) => {
                let duration = parse_timestamp(end) - parse_timestamp(start);
                if duration > 0.0 {
                    vec!["-t".into(), duration.to_string().into()]
                } else {
                    Vec::new()
                }
            }
            None => vec!["-t".into(), end.into()],
        }
    }
}

/// Seconds in a `[[HH:]MM:]SS[.ms]` timestamp. Unparseable parts count as 0.
pub fn parse_timestamp(s: &str) -> f64 {
    s.split(':').rev().enumerate().fold(0.0, |acc, (i, v)| {
        acc + v.trim().parse::<f64>().unwrap_or(0.0) * 60f64.powi(i as i32)
    })
}

/// A video frame rate as ffprobe reports it, e.g. `30000/1001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl FromStr for FrameRate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (num, den) = match s.split_once('/') {
            Some((n, d)) => (n.trim(), d.trim()),
            None => (s, "1"),
        };
        let num: u32 = num.parse().with_context(|| format!("bad frame rate numerator in {:?}", s))?;
        let den: u32 = den.parse().with_context(|| format!("bad frame rate denominator in {:?}", s))?;
        if num == 0 || den == 0 {
            bail!("frame rate {:?} is not usable", s);
        }
        Ok(Self { num, den })
    }
}

fn frame_pattern(dir: &Path, digits: usize) -> PathBuf {
    dir.join(format!("%0{}d.png", digits))
}

/// Arguments for splitting `input` into numbered PNGs in `out_dir`.
pub(crate) fn extract_args(
    input: &Path,
    out_dir: &Path,
    digits: usize,
    first_index: u64,
    scale: Option<Size>,
    trim: &Trim,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-loglevel".into(), "error".into(), "-y".into()];
    args.extend(trim.seek_args());
    args.push("-i".into());
    args.push(input.into());
    args.extend(trim.duration_args());
    if let Some(size) = scale {
        args.push("-vf".into());
        args.push(format!("scale={}:{}:flags=bilinear", size.width, size.height).into());
    }
    args.push("-start_number".into());
    args.push(first_index.to_string().into());
    args.push(frame_pattern(out_dir, digits).into());
    args
}

/// Arguments for encoding numbered PNGs from `frames_dir` into `output`.
pub(crate) fn encode_args(
    frames_dir: &Path,
    digits: usize,
    start_number: u64,
    rate: FrameRate,
    quality: u8,
    output: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-loglevel".into(), "error".into(), "-y".into()];
    args.push("-framerate".into());
    args.push(rate.to_string().into());
    args.push("-start_number".into());
    args.push(start_number.to_string().into());
    args.push("-i".into());
    args.push(frame_pattern(frames_dir, digits).into());
    // libx264 with yuv420p needs even dimensions
    args.push("-vf".into());
    args.push("pad=ceil(iw/2)*2:ceil(ih/2)*2".into());
    for a in ["-c:v", "libx264", "-crf"] {
        args.push(a.into());
    }
    args.push(quality.to_string().into());
    args.push("-pix_fmt".into());
    args.push("yuv420p".into());
    args.push(output.into());
    args
}

/// Arguments for copying `video` and taking audio, if any, from `original`.
pub(crate) fn mux_args(video: &Path, original: &Path, trim: &Trim, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-loglevel".into(), "error".into(), "-y".into()];
    args.push("-i".into());
    args.push(video.into());
    args.extend(trim.seek_args());
    args.push("-i".into());
    args.push(original.into());
    args.extend(trim.duration_args());
    for a in ["-map", "0:v", "-map", "1:a?", "-c:v", "copy", "-c:a", "aac", "-shortest"] {
        args.push(a.into());
    }
    args.push(output.into());
    args
}

fn run(tool: &Path, args: &[OsString], what: &str) -> Result<()> {
    log::debug!("{} {:?}", tool.display(), args);
    let output = ProcCommand::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("running {} for {}", tool.display(), what))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("{} failed ({}): {}", what, output.status, stderr.trim()));
    }
    Ok(())
}

/// Split `input` into `out_dir/%0Nd.png`, numbered from `first_index`.
///
/// With `scale`, frames are scaled to exactly the grid size so the render
/// loop does no resampling of its own.
pub fn extract_frames(
    config: &FfmpegConfig,
    input: &Path,
    out_dir: &Path,
    digits: usize,
    first_index: u64,
    scale: Option<Size>,
    trim: &Trim,
) -> Result<()> {
    let args = extract_args(input, out_dir, digits, first_index, scale, trim);
    run(&config.ffmpeg, &args, "frame extraction")
}

/// Frame rate of the first video stream of `input`.
pub fn probe_frame_rate(config: &FfmpegConfig, input: &Path) -> Result<FrameRate> {
    let output = ProcCommand::new(&config.ffprobe)
        .args(["-v", "error", "-select_streams", "v:0", "-show_entries", "stream=r_frame_rate"])
        .args(["-of", "default=noprint_wrappers=1:nokey=1"])
        .arg(input)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("running {}", config.ffprobe.display()))?;
    if !output.status.success() {
        bail!(
            "ffprobe failed on {}: {}",
            input.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    let text = String::from_utf8_lossy(&output.stdout);
    let line = text.lines().next().unwrap_or("").to_string();
    line.parse()
        .with_context(|| format!("reading frame rate of {}", input.display()))
}

/// Encode numbered PNGs into an H.264 video at constant quality `quality`
/// (CRF, 1 = best, 51 = worst).
pub fn encode_frames(
    config: &FfmpegConfig,
    frames_dir: &Path,
    digits: usize,
    start_number: u64,
    rate: FrameRate,
    quality: u8,
    output: &Path,
) -> Result<()> {
    let args = encode_args(frames_dir, digits, start_number, rate, quality, output);
    run(&config.ffmpeg, &args, "video encoding")
}

/// Combine the encoded `video` with the audio of `original`. Inputs without
/// an audio stream produce a silent output.
pub fn mux_audio(config: &FfmpegConfig, video: &Path, original: &Path, trim: &Trim, output: &Path) -> Result<()> {
    let args = mux_args(video, original, trim, output);
    run(&config.ffmpeg, &args, "audio muxing")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    fn position(args: &[String], flag: &str) -> Option<usize> {
        args.iter().position(|a| a == flag)
    }

    #[test]
    fn timestamps_parse() {
        assert_eq!(parse_timestamp("83.5"), 83.5);
        assert_eq!(parse_timestamp("01:23"), 83.0);
        assert_eq!(parse_timestamp("1:00:00"), 3600.0);
        assert_eq!(parse_timestamp("junk"), 0.0);
    }

    #[test]
    fn frame_rate_parses_and_displays() {
        let ntsc: FrameRate = "30000/1001\n".parse().unwrap();
        assert_eq!(ntsc, FrameRate { num: 30000, den: 1001 });
        assert_eq!(ntsc.to_string(), "30000/1001");
        assert!((ntsc.as_f64() - 29.97).abs() < 0.01);

        let pal: FrameRate = "25/1".parse().unwrap();
        assert_eq!(pal.to_string(), "25");
        assert_eq!("24".parse::<FrameRate>().unwrap(), FrameRate { num: 24, den: 1 });

        assert!("0/0".parse::<FrameRate>().is_err());
        assert!("".parse::<FrameRate>().is_err());
        assert!("abc/1".parse::<FrameRate>().is_err());
    }

    #[test]
    fn extract_without_trim() {
        let args = strings(&extract_args(
            Path::new("in.mp4"),
            Path::new("temp/frames"),
            8,
            1,
            None,
            &Trim::default(),
        ));
        assert!(position(&args, "-ss").is_none());
        assert!(position(&args, "-t").is_none());
        assert!(position(&args, "-vf").is_none());
        assert_eq!(args.last().unwrap(), &Path::new("temp/frames").join("%08d.png").to_string_lossy());
        let start = position(&args, "-start_number").unwrap();
        assert_eq!(args[start + 1], "1");
    }

    #[test]
    fn start_and_end_become_seek_and_duration() {
        let trim = Trim::new(Some("00:00:10".into()), Some("00:00:25.5".into()));
        let args = strings(&extract_args(Path::new("in.mp4"), Path::new("f"), 8, 1, None, &trim));
        let ss = position(&args, "-ss").unwrap();
        let input = position(&args, "-i").unwrap();
        let t = position(&args, "-t").unwrap();
        assert!(ss < input && input < t);
        assert_eq!(args[ss + 1], "00:00:10");
        assert_eq!(args[t + 1], "15.5");
    }

    #[test]
    fn end_alone_is_a_duration_and_zero_start_is_ignored() {
        let trim = Trim::new(Some("0".into()), Some("12".into()));
        let args = strings(&extract_args(Path::new("in.mp4"), Path::new("f"), 8, 1, None, &trim));
        assert!(position(&args, "-ss").is_none());
        assert_eq!(args[position(&args, "-t").unwrap() + 1], "12");

        let backwards = Trim::new(Some("20".into()), Some("10".into()));
        let args = strings(&extract_args(Path::new("in.mp4"), Path::new("f"), 8, 1, None, &backwards));
        assert!(position(&args, "-t").is_none());
    }

    #[test]
    fn prescale_uses_exact_grid() {
        let args = strings(&extract_args(
            Path::new("in.mp4"),
            Path::new("f"),
            4,
            0,
            Some(Size::new(120, 33)),
            &Trim::default(),
        ));
        assert_eq!(args[position(&args, "-vf").unwrap() + 1], "scale=120:33:flags=bilinear");
    }

    #[test]
    fn encode_sets_rate_start_and_quality() {
        let rate = FrameRate { num: 24000, den: 1001 };
        let args = strings(&encode_args(Path::new("cap"), 8, 0, rate, 23, Path::new("video.mp4")));
        assert_eq!(args[position(&args, "-framerate").unwrap() + 1], "24000/1001");
        assert_eq!(args[position(&args, "-start_number").unwrap() + 1], "0");
        assert_eq!(args[position(&args, "-crf").unwrap() + 1], "23");
        assert_eq!(args[position(&args, "-pix_fmt").unwrap() + 1], "yuv420p");
        assert!(position(&args, "-framerate").unwrap() < position(&args, "-i").unwrap());
        assert_eq!(args.last().unwrap(), "video.mp4");
    }

    #[test]
    fn mux_maps_optional_audio_and_trims_the_original() {
        let trim = Trim::new(Some("5".into()), None);
        let args = strings(&mux_args(Path::new("v.mp4"), Path::new("orig.mkv"), &trim, Path::new("out.mp4")));
        assert!(args.windows(2).any(|w| w == ["-map", "1:a?"]));
        assert!(args.windows(2).any(|w| w == ["-c:v", "copy"]));
        // the seek applies to the second input only
        let ss = position(&args, "-ss").unwrap();
        assert_eq!(args[ss + 2], "-i");
        assert_eq!(args[ss + 3], "orig.mkv");
    }
}
