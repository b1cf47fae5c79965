use anyhow::{anyhow, Context, Result};
use clap::Parser;
use dialoguer::{theme::ColorfulTheme, FuzzySelect, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::time::Duration;
use vidascii::{AppConfig, Progress, ProgressPhase, VideoConverter, VideoOptions, QUALITY_RANGE};
use walkdir::WalkDir;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm", "wmv", "flv", "m4v"];

fn load_config() -> Result<AppConfig> {
    // Look for vidascii.json in app data, current dir fallback, then built-in default
    let mut tried: Vec<PathBuf> = Vec::new();
    if let Some(mut d) = dirs::data_dir() {
        d.push("vidascii");
        d.push("vidascii.json");
        tried.push(d);
    }
    tried.push(PathBuf::from("vidascii.json"));

    for p in &tried {
        if p.exists() {
            let text =
                fs::read_to_string(p).with_context(|| format!("reading config {}", p.display()))?;
            let cfg: AppConfig = serde_json::from_str(&text)
                .with_context(|| format!("parsing config json {}", p.display()))?;
            log::info!("config loaded from {}", p.display());
            return Ok(cfg);
        }
    }

    Ok(AppConfig::default())
}

// --- LOGS --- //

/// Appends log lines to a file. Stdout is the render canvas, so nothing may
/// be logged there.
struct FileLogger {
    file: Mutex<File>,
    level: log::LevelFilter,
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("vidascii")
        .join("vidascii.log")
}

fn init_logging(path: &Path, verbose: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    log::set_boxed_logger(Box::new(FileLogger {
        file: Mutex::new(file),
        level,
    }))
    .map_err(|e| anyhow!("installing logger: {}", e))?;
    log::set_max_level(level);
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about = "Play a video as colored ASCII art in the terminal and record it to a new video.")]
struct Args {
    /// Input video file
    input: Option<PathBuf>,

    /// Output video file (defaults to output_name from the config)
    out: Option<PathBuf>,

    /// Output quality as x264 CRF, 1 (best) to 51 (worst)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=51))]
    quality: Option<u8>,

    /// Use the default quality preset
    #[arg(long, default_value_t = false, conflicts_with_all = &["small", "best"])]
    default: bool,

    /// Use the small-file quality preset
    #[arg(long, short, default_value_t = false, conflicts_with_all = &["default", "best"])]
    small: bool,

    /// Use the best quality preset
    #[arg(long, short, default_value_t = false, conflicts_with_all = &["default", "small"])]
    best: bool,

    /// Start time (e.g., 00:01:23.456 or 83.456)
    #[arg(long)]
    start: Option<String>,

    /// End time (e.g., 00:01:23.456 or 83.456)
    #[arg(long)]
    end: Option<String>,

    /// Monospace font used to capture the screen
    #[arg(long)]
    font: Option<PathBuf>,

    /// Glyphs from dimmest to brightest
    #[arg(long)]
    ramp: Option<String>,

    /// Keep extracted and captured frames after finishing
    #[arg(long, default_value_t = false)]
    keep_staging: bool,

    /// Show the finished video in the file manager
    #[arg(long, default_value_t = false)]
    reveal: bool,

    /// Log file (defaults to the user cache directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log debug details
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let mut args = Args::parse();
    let is_interactive = !(args.default || args.small || args.best);

    let log_path = args.log_file.clone().unwrap_or_else(default_log_path);
    if let Err(e) = init_logging(&log_path, args.verbose) {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    let mut cfg = load_config()?;
    if let Some(font) = args.font.take() {
        cfg.font_path = Some(font);
    }
    if let Some(ramp) = args.ramp.take() {
        cfg.ramp = ramp;
    }
    let converter = VideoConverter::with_config(cfg.clone())?;

    // --- Interactive Prompts ---
    if args.input.is_none() {
        if !is_interactive {
            return Err(anyhow!("Input file must be provided when using a preset."));
        }
        let files = find_video_files();
        if files.is_empty() {
            return Err(anyhow!("No video files found in current directory."));
        }
        let selection = FuzzySelect::with_theme(&ColorfulTheme::default())
            .with_prompt("Choose a video")
            .default(0)
            .items(&files)
            .interact()?;
        args.input = Some(PathBuf::from(&files[selection]));
    }
    let input_path = args
        .input
        .clone()
        .ok_or_else(|| anyhow!("no input file"))?;

    let active_preset_name = if args.small {
        "small"
    } else if args.best {
        "best"
    } else {
        cfg.default_preset.as_str()
    };
    let active = cfg
        .preset(active_preset_name)
        .ok_or_else(|| anyhow!("Missing preset '{}' in config", active_preset_name))?;

    let quality = match args.quality {
        Some(q) => q,
        None if is_interactive => Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Quality (1 = best, 51 = smallest)")
            .default(active.quality)
            .validate_with(|q: &u8| -> std::result::Result<(), String> {
                if QUALITY_RANGE.contains(q) {
                    Ok(())
                } else {
                    Err("Enter a number from 1 to 51".to_string())
                }
            })
            .interact_text()?,
        None => active.quality,
    };

    if is_interactive {
        if args.start.is_none() {
            args.start = Some(
                Input::new()
                    .with_prompt("Start time (e.g., 00:00:05)")
                    .default("0".to_string())
                    .interact_text()?,
            );
        }
        if args.end.is_none() {
            args.end = Some(
                Input::new()
                    .with_prompt("End time (e.g., 00:00:10) (optional)")
                    .allow_empty(true)
                    .default(String::new())
                    .show_default(false)
                    .interact_text()?,
            );
        }
        let _: String = Input::new()
            .with_prompt("Maximize the terminal window, then press enter")
            .allow_empty(true)
            .interact_text()?;
    }

    let output_path = args.out.unwrap_or_else(|| PathBuf::from(&cfg.output_name));
    let video_opts = VideoOptions {
        quality,
        start: args.start.clone().filter(|s| !s.trim().is_empty()),
        end: args.end.clone().filter(|s| !s.trim().is_empty()),
        prescale: true,
        keep_staging: args.keep_staging,
    };
    log::info!(
        "converting {} -> {} at quality {}",
        input_path.display(),
        output_path.display(),
        quality
    );

    // --- Execution ---
    // No spinner may tick while the terminal is the render canvas.
    let mut spinner: Option<ProgressBar> = None;
    let result = converter.convert_video(&input_path, &output_path, &video_opts, |progress: Progress| {
        match progress.phase {
            ProgressPhase::ExtractingFrames | ProgressPhase::Assembling => {
                if let Some(pb) = spinner.take() {
                    pb.finish_and_clear();
                }
                spinner = Some(new_spinner(&progress.message));
            }
            ProgressPhase::RenderingFrames => {
                if let Some(pb) = spinner.take() {
                    pb.finish_and_clear();
                }
            }
            ProgressPhase::Complete => {
                if let Some(pb) = spinner.take() {
                    pb.finish_with_message("Done");
                }
            }
        }
    });
    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            log::error!("conversion failed: {:#}", e);
            return Err(e);
        }
    };

    println!(
        "Wrote {} ({} frames, {} cells drawn)",
        output_path.display(),
        summary.frames,
        summary.cells_written
    );
    if args.keep_staging {
        println!("Frames kept in {}", cfg.staging_dir.display());
    }
    if args.reveal {
        reveal(&output_path);
    }
    Ok(())
}

/// Platform file manager invocation that shows `path` selected, or its
/// folder where selection is unsupported.
fn reveal_command(path: &Path) -> (&'static str, Vec<OsString>) {
    if cfg!(windows) {
        let mut select = OsString::from("/select,");
        select.push(path);
        ("explorer.exe", vec![select])
    } else if cfg!(target_os = "macos") {
        ("open", vec![OsString::from("-R"), path.as_os_str().to_owned()])
    } else {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        ("xdg-open", vec![dir.as_os_str().to_owned()])
    }
}

fn reveal(path: &Path) {
    let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let (program, args) = reveal_command(&path);
    // explorer.exe exits non-zero even on success, so only spawning is checked
    if let Err(e) = Command::new(program).args(&args).spawn() {
        log::warn!("could not open file manager with {}: {}", program, e);
        eprintln!("Could not open the file manager: {}", e);
    }
}

fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn find_video_files() -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(".")
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_file()
                && e.path().extension().is_some_and(|ext| {
                    ext.to_str()
                        .map(|s| VIDEO_EXTENSIONS.contains(&s.to_ascii_lowercase().as_str()))
                        .unwrap_or(false)
                })
        })
        .filter_map(|e| e.path().to_str().map(str::to_string))
        .collect();
    files.sort();
    files
}
