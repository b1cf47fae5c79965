//! Sixteen-color terminal palette and the threshold quantizer.

use crossterm::style::Color;
use image::Rgb;

/// One of the 16 classic console colors.
///
/// The discriminant is a 4-bit index: bit 3 is "bright", bits 2/1/0 are
/// red/green/blue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PaletteColor {
    #[default]
    Black = 0,
    DarkBlue = 1,
    DarkGreen = 2,
    DarkCyan = 3,
    DarkRed = 4,
    DarkMagenta = 5,
    DarkYellow = 6,
    Gray = 7,
    DarkGray = 8,
    Blue = 9,
    Green = 10,
    Cyan = 11,
    Red = 12,
    Magenta = 13,
    Yellow = 14,
    White = 15,
}

pub const ALL_COLORS: [PaletteColor; 16] = [
    PaletteColor::Black,
    PaletteColor::DarkBlue,
    PaletteColor::DarkGreen,
    PaletteColor::DarkCyan,
    PaletteColor::DarkRed,
    PaletteColor::DarkMagenta,
    PaletteColor::DarkYellow,
    PaletteColor::Gray,
    PaletteColor::DarkGray,
    PaletteColor::Blue,
    PaletteColor::Green,
    PaletteColor::Cyan,
    PaletteColor::Red,
    PaletteColor::Magenta,
    PaletteColor::Yellow,
    PaletteColor::White,
];

const BRIGHT: u8 = 0b1000;
const RED: u8 = 0b0100;
const GREEN: u8 = 0b0010;
const BLUE: u8 = 0b0001;

/// Map a pixel to a palette color by channel thresholds.
///
/// This is not a nearest-color search: "bright" is set when any channel is
/// above 128, and each of R/G/B contributes its bit when above 64.
pub fn quantize(px: Rgb<u8>) -> PaletteColor {
    let [r, g, b] = px.0;
    let mut index = 0u8;
    if r > 128 || g > 128 || b > 128 {
        index |= BRIGHT;
    }
    if r > 64 {
        index |= RED;
    }
    if g > 64 {
        index |= GREEN;
    }
    if b > 64 {
        index |= BLUE;
    }
    PaletteColor::from_index(index)
}

impl PaletteColor {
    /// Color for a 4-bit palette index. Only the low four bits are used.
    pub fn from_index(index: u8) -> Self {
        ALL_COLORS[(index & 0x0f) as usize]
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    /// The crossterm color used when emitting escape sequences.
    pub fn to_crossterm(self) -> Color {
        match self {
            PaletteColor::Black => Color::Black,
            PaletteColor::DarkBlue => Color::DarkBlue,
            PaletteColor::DarkGreen => Color::DarkGreen,
            PaletteColor::DarkCyan => Color::DarkCyan,
            PaletteColor::DarkRed => Color::DarkRed,
            PaletteColor::DarkMagenta => Color::DarkMagenta,
            PaletteColor::DarkYellow => Color::DarkYellow,
            PaletteColor::Gray => Color::Grey,
            PaletteColor::DarkGray => Color::DarkGrey,
            PaletteColor::Blue => Color::Blue,
            PaletteColor::Green => Color::Green,
            PaletteColor::Cyan => Color::Cyan,
            PaletteColor::Red => Color::Red,
            PaletteColor::Magenta => Color::Magenta,
            PaletteColor::Yellow => Color::Yellow,
            PaletteColor::White => Color::White,
        }
    }

    /// Position in the ANSI 16-color table (SGR 30-37 / 90-97, `38;5;n`).
    ///
    /// ANSI orders the low bits as blue/green/red the other way round, so
    /// the red and blue bits swap.
    pub fn ansi_index(self) -> u8 {
        let i = self.index();
        (i & BRIGHT) | ((i & RED) >> 2) | (i & GREEN) | ((i & BLUE) << 2)
    }

    /// Inverse of [`ansi_index`](Self::ansi_index). Indices above 15 are
    /// outside the palette.
    pub fn from_ansi_index(ansi: u16) -> Option<Self> {
        if ansi > 15 {
            return None;
        }
        let a = ansi as u8;
        let index = (a & BRIGHT) | ((a & 0b0001) << 2) | (a & GREEN) | ((a & 0b0100) >> 2);
        Some(Self::from_index(index))
    }

    /// RGB used when rasterizing the screen (legacy console palette).
    pub fn rgb(self) -> Rgb<u8> {
        Rgb(match self {
            PaletteColor::Black => [0, 0, 0],
            PaletteColor::DarkBlue => [0, 0, 128],
            PaletteColor::DarkGreen => [0, 128, 0],
            PaletteColor::DarkCyan => [0, 128, 128],
            PaletteColor::DarkRed => [128, 0, 0],
            PaletteColor::DarkMagenta => [128, 0, 128],
            PaletteColor::DarkYellow => [128, 128, 0],
            PaletteColor::Gray => [192, 192, 192],
            PaletteColor::DarkGray => [128, 128, 128],
            PaletteColor::Blue => [0, 0, 255],
            PaletteColor::Green => [0, 255, 0],
            PaletteColor::Cyan => [0, 255, 255],
            PaletteColor::Red => [255, 0, 0],
            PaletteColor::Magenta => [255, 0, 255],
            PaletteColor::Yellow => [255, 255, 0],
            PaletteColor::White => [255, 255, 255],
        })
    }
}
