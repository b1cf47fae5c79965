//! Terminal devices the renderer draws on.
//!
//! A device is cursor-addressable for writes, can read back its display
//! memory (see [`ScreenReader`]) and can capture the whole screen as pixels.
//! [`AnsiTerminal`] drives a real terminal through escape sequences;
//! [`MemoryTerminal`] is an in-memory stand-in for tests and headless runs.
//! On Windows, `ConsoleReader` reads the console's own screen buffer.

mod ansi;
mod console;
mod memory;
mod screen;

pub use ansi::AnsiTerminal;
#[cfg(windows)]
pub use console::ConsoleReader;
pub use console::MAX_READ_BYTES;
pub use memory::{CellWrite, MemoryTerminal};
pub use screen::Screen;

use image::RgbImage;

use crate::error::Result;
use crate::grid::Size;
use crate::palette::PaletteColor;
use crate::snapshot::ScreenReader;

/// What one cell of display memory holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenCell {
    pub glyph: char,
    pub color: PaletteColor,
}

impl ScreenCell {
    pub const fn new(glyph: char, color: PaletteColor) -> Self {
        Self { glyph, color }
    }
}

impl Default for ScreenCell {
    fn default() -> Self {
        Self::new(' ', DEFAULT_FOREGROUND)
    }
}

/// Foreground color of a freshly reset terminal.
pub const DEFAULT_FOREGROUND: PaletteColor = PaletteColor::Gray;

/// A terminal the renderer can write cells to and read back from.
pub trait TerminalDevice: ScreenReader {
    /// Geometry of the drawable area. Fixed for the device's lifetime.
    fn size(&self) -> Size;

    fn move_to(&mut self, col: u16, row: u16) -> Result<()>;

    fn set_foreground(&mut self, color: PaletteColor) -> Result<()>;

    /// Write one glyph at the cursor and advance it.
    fn write_glyph(&mut self, glyph: char) -> Result<()>;

    /// Push any buffered output to the display.
    fn flush(&mut self) -> Result<()>;

    /// Grab the whole visible screen as an image.
    fn capture(&mut self) -> Result<RgbImage>;
}

/// Drawable size of the controlling terminal.
///
/// The last row is left out: writing the bottom-right cell would scroll the
/// screen on terminals without deferred wrapping.
pub fn detect_size() -> Result<Size> {
    let (cols, rows) = crossterm::terminal::size()?;
    Ok(Size::new(cols, rows.saturating_sub(1)))
}
