//! Example: Render a directory of numbered frames headlessly
//!
//! Run with: cargo run --example render_frames -- <frames_dir> [capture_dir]
//!
//! Frames must be named 00000001.png, 00000002.png, ... as ffmpeg writes them
//! with `%08d.png`. Captures are written to the capture directory.

use std::path::PathBuf;
use vidascii::terminal::MemoryTerminal;
use vidascii::{Rasterizer, Size, VideoConverter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let frames_dir = PathBuf::from(args.next().unwrap_or_else(|| "frames".to_string()));
    let capture_dir = PathBuf::from(args.next().unwrap_or_else(|| "capture".to_string()));

    if !frames_dir.is_dir() {
        println!("Note: {} not found.", frames_dir.display());
        println!("Extract some frames first, e.g.: ffmpeg -i video.mp4 frames/%08d.png");
        return Ok(());
    }

    let converter = VideoConverter::new();
    let cfg = converter.config();
    let rasterizer = Rasterizer::discover(None, cfg.font_size, cfg.cell_width, cfg.cell_height)?;
    let mut terminal = MemoryTerminal::new(Size::new(80, 24)).with_rasterizer(rasterizer);

    println!("Rendering {} -> {}", frames_dir.display(), capture_dir.display());
    let summary = converter.render_frames(&frames_dir, &capture_dir, &mut terminal, |p| {
        if p.completed > 0 && p.completed % 25 == 0 {
            println!("{}", p.message);
        }
    })?;

    println!(
        "✓ {} frames captured, {} cells drawn ({:.1} per frame)",
        summary.frames,
        summary.cells_written,
        summary.cells_written as f64 / summary.frames as f64
    );
    Ok(())
}
