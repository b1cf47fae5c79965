//! Whole-screen capture: turns display memory into pixels.

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontRef, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::grid::{Grid, Size};
use crate::terminal::ScreenCell;

/// Monospace fonts tried when none is configured, first readable wins.
pub const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/gnu-free/FreeMono.otf",
    "/System/Library/Fonts/Menlo.ttc",
    "/Library/Fonts/Courier New.ttf",
    "C:\\Windows\\Fonts\\consola.ttf",
    "C:\\Windows\\Fonts\\cour.ttf",
];

const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// Largest cell box edge; larger values are clamped.
pub const MAX_CELL_PIXELS: u32 = 256;

/// Draws a cell grid into an image, one `cell_width × cell_height` box per
/// cell.
///
/// Without a font every visible glyph becomes a solid block of its color,
/// which keeps capture deterministic on machines with no fonts installed.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    font: Option<Vec<u8>>,
    scale: PxScale,
    cell_width: u32,
    cell_height: u32,
}

impl Rasterizer {
    /// A rasterizer that draws solid blocks.
    pub fn blocks(cell_width: u32, cell_height: u32) -> Self {
        Self {
            font: None,
            scale: PxScale::from(cell_height as f32),
            cell_width: cell_width.clamp(1, MAX_CELL_PIXELS),
            cell_height: cell_height.clamp(1, MAX_CELL_PIXELS),
        }
    }

    pub fn from_font_file(path: &Path, font_size: f32, cell_width: u32, cell_height: u32) -> Result<Self> {
        let data = fs::read(path).map_err(|e| Error::Font {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        FontRef::try_from_slice(&data).map_err(|e| Error::Font {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self {
            font: Some(data),
            scale: PxScale::from(font_size),
            ..Self::blocks(cell_width, cell_height)
        })
    }

    /// Use `font_path` if given, otherwise the first usable entry of
    /// [`FONT_CANDIDATES`], otherwise fall back to blocks.
    pub fn discover(font_path: Option<&Path>, font_size: f32, cell_width: u32, cell_height: u32) -> Result<Self> {
        if let Some(path) = font_path {
            return Self::from_font_file(path, font_size, cell_width, cell_height);
        }
        for candidate in FONT_CANDIDATES.iter().map(PathBuf::from) {
            if !candidate.is_file() {
                continue;
            }
            match Self::from_font_file(&candidate, font_size, cell_width, cell_height) {
                Ok(r) => {
                    log::info!("capture font: {}", candidate.display());
                    return Ok(r);
                }
                Err(e) => log::debug!("skipping font candidate: {}", e),
            }
        }
        log::warn!("no monospace font found, captures will use solid blocks");
        Ok(Self::blocks(cell_width, cell_height))
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Pixel dimensions of a capture of a `size` grid.
    pub fn image_size(&self, size: Size) -> (u32, u32) {
        (size.width as u32 * self.cell_width, size.height as u32 * self.cell_height)
    }

    pub fn render(&self, cells: &Grid<ScreenCell>) -> RgbImage {
        let (width, height) = self.image_size(cells.size());
        let mut buf = vec![0u8; width as usize * height as usize * 3];
        let band_len = width as usize * self.cell_height as usize * 3;
        if band_len == 0 {
            return RgbImage::new(width, height);
        }

        // One band of pixel rows per terminal row; bands never overlap.
        buf.par_chunks_mut(band_len)
            .zip(cells.rows().collect::<Vec<_>>().into_par_iter())
            .for_each(|(band, row)| self.draw_row(band, width, row));

        RgbImage::from_raw(width, height, buf).unwrap_or_else(|| RgbImage::new(width, height))
    }

    fn draw_row(&self, band: &mut [u8], width: u32, row: &[ScreenCell]) {
        for px in band.chunks_exact_mut(3) {
            px.copy_from_slice(&BACKGROUND.0);
        }
        let font = self.font.as_deref().and_then(|data| FontRef::try_from_slice(data).ok());
        for (col, cell) in row.iter().enumerate() {
            if cell.glyph == ' ' {
                continue;
            }
            let x0 = col as u32 * self.cell_width;
            match &font {
                Some(font) => self.draw_glyph(band, width, x0, font, cell),
                None => self.fill_cell(band, width, x0, cell.color.rgb()),
            }
        }
    }

    fn fill_cell(&self, band: &mut [u8], width: u32, x0: u32, color: Rgb<u8>) {
        for y in 0..self.cell_height {
            for x in x0..x0 + self.cell_width {
                let i = (y as usize * width as usize + x as usize) * 3;
                band[i..i + 3].copy_from_slice(&color.0);
            }
        }
    }

    fn draw_glyph(&self, band: &mut [u8], width: u32, x0: u32, font: &FontRef<'_>, cell: &ScreenCell) {
        let scaled = font.as_scaled(self.scale);
        let id = font.glyph_id(cell.glyph);
        let advance = scaled.h_advance(id);
        let left = x0 as f32 + ((self.cell_width as f32 - advance) / 2.0).max(0.0);
        let baseline = (self.cell_height as f32 + scaled.ascent() + scaled.descent()) / 2.0;
        let glyph = id.with_scale_and_position(self.scale, point(left, baseline));
        let Some(outlined) = font.outline_glyph(glyph) else {
            return;
        };

        let fg = cell.color.rgb();
        let bounds = outlined.px_bounds();
        let (cell_min_x, cell_max_x) = (x0 as i32, (x0 + self.cell_width) as i32);
        outlined.draw(|gx, gy, coverage| {
            let x = bounds.min.x as i32 + gx as i32;
            let y = bounds.min.y as i32 + gy as i32;
            if x < cell_min_x || x >= cell_max_x || y < 0 || y >= self.cell_height as i32 {
                return;
            }
            let i = (y as usize * width as usize + x as usize) * 3;
            for c in 0..3 {
                let bg = band[i + c] as f32;
                band[i + c] = (bg + (fg.0[c] as f32 - bg) * coverage.clamp(0.0, 1.0)).round() as u8;
            }
        });
    }
}
