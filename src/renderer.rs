//! Per-frame glyph computation and minimal terminal update.

use image::RgbImage;

use crate::error::{Error, Result};
use crate::glyph::BrightnessRamp;
use crate::grid::{Grid, Size};
use crate::palette::{quantize, PaletteColor};
use crate::terminal::TerminalDevice;

/// Desired state of one cell for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphCell {
    pub glyph: char,
    pub color: PaletteColor,
}

/// Renders frames of a fixed size onto a terminal, touching only cells whose
/// glyph changed.
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    ramp: BrightnessRamp,
    size: Size,
}

impl FrameRenderer {
    pub fn new(ramp: BrightnessRamp, size: Size) -> Self {
        Self { ramp, size }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn ramp(&self) -> &BrightnessRamp {
        &self.ramp
    }

    /// Glyph and color for every cell of `frame`.
    pub fn desired(&self, frame: &RgbImage) -> Result<Grid<GlyphCell>> {
        self.check_frame(frame)?;
        let cells = frame
            .pixels()
            .map(|px| GlyphCell {
                glyph: self.ramp.glyph(*px),
                color: quantize(*px),
            })
            .collect();
        Grid::from_cells(self.size, cells).ok_or(Error::DimensionMismatch {
            what: "frame",
            expected: self.size,
            actual: image_size(frame),
        })
    }

    /// Draw `frame` over what `previous` says is on screen and return the
    /// number of cells written.
    ///
    /// Only the glyph is compared. A cell whose color changed but whose glyph
    /// did not keeps its old color on screen.
    pub fn render<D>(&self, device: &mut D, frame: &RgbImage, previous: &Grid<char>) -> Result<usize>
    where
        D: TerminalDevice + ?Sized,
    {
        if previous.size() != self.size {
            return Err(Error::DimensionMismatch {
                what: "snapshot",
                expected: self.size,
                actual: previous.size(),
            });
        }
        let desired = self.desired(frame)?;

        let mut written = 0;
        for (row, (want, have)) in desired.rows().zip(previous.rows()).enumerate() {
            for (col, (cell, shown)) in want.iter().zip(have).enumerate() {
                if cell.glyph == *shown {
                    continue;
                }
                device.move_to(col as u16, row as u16)?;
                device.set_foreground(cell.color)?;
                device.write_glyph(cell.glyph)?;
                written += 1;
            }
        }

        device.move_to(0, 0)?;
        device.flush()?;
        log::trace!("frame rendered, {} of {} cells written", written, self.size.area());
        Ok(written)
    }

    fn check_frame(&self, frame: &RgbImage) -> Result<()> {
        let actual = image_size(frame);
        if actual != self.size {
            return Err(Error::DimensionMismatch {
                what: "frame",
                expected: self.size,
                actual,
            });
        }
        Ok(())
    }
}

/// Image dimensions as a cell size, saturating at `u16::MAX`.
pub(crate) fn image_size(img: &RgbImage) -> Size {
    let (w, h) = img.dimensions();
    Size::new(w.min(u16::MAX as u32) as u16, h.min(u16::MAX as u32) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{read_snapshot, Region, ScreenReader};
    use crate::terminal::{AnsiTerminal, MemoryTerminal};
    use crate::raster::Rasterizer;
    use image::Rgb;
    use std::collections::BTreeSet;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn frame(width: u32, height: u32, f: impl Fn(u32, u32) -> Rgb<u8>) -> RgbImage {
        RgbImage::from_fn(width, height, f)
    }

    fn renderer(width: u16, height: u16) -> FrameRenderer {
        FrameRenderer::new(BrightnessRamp::default(), Size::new(width, height))
    }

    #[test]
    fn identical_snapshot_writes_nothing() {
        let r = renderer(3, 2);
        let img = frame(3, 2, |x, _| if x == 1 { WHITE } else { BLACK });
        let mut term = MemoryTerminal::with_lines(&[" @ ", " @ "]).unwrap();
        let previous = read_snapshot(&mut term, 0, 0, 3, 2).unwrap();
        assert_eq!(r.render(&mut term, &img, &previous).unwrap(), 0);
        assert!(term.writes().is_empty());
    }

    #[test]
    fn single_difference_writes_one_cell_at_its_position() {
        let r = renderer(3, 2);
        let img = frame(3, 2, |_, _| BLACK);
        let mut term = MemoryTerminal::with_lines(&["   ", " x "]).unwrap();
        let previous = read_snapshot(&mut term, 0, 0, 3, 2).unwrap();
        assert_eq!(r.render(&mut term, &img, &previous).unwrap(), 1);
        let writes = term.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!((writes[0].col, writes[0].row, writes[0].glyph), (1, 1, ' '));
    }

    #[test]
    fn writes_are_exactly_the_changed_glyphs() {
        // all black except (1,1), which is white
        let r = renderer(2, 2);
        let img = frame(2, 2, |x, y| if (x, y) == (1, 1) { WHITE } else { BLACK });
        let mut term = MemoryTerminal::with_lines(&["ab", "cd"]).unwrap();
        let previous = read_snapshot(&mut term, 0, 0, 2, 2).unwrap();
        let desired = r.desired(&img).unwrap();
        let expected: BTreeSet<(u16, u16)> = (0..2)
            .flat_map(|row| (0..2).map(move |col| (col, row)))
            .filter(|&(col, row)| desired.get(col, row).unwrap().glyph != *previous.get(col, row).unwrap())
            .collect();

        let written = r.render(&mut term, &img, &previous).unwrap();
        let actual: BTreeSet<(u16, u16)> = term.writes().iter().map(|w| (w.col, w.row)).collect();
        assert_eq!(actual, expected);
        assert_eq!(written, 4);
        assert_eq!(term.read_region(Region::new(0, 0, 2, 2)).unwrap().lines(), vec!["  ", " @"]);
    }

    #[test]
    fn matching_glyph_is_left_alone() {
        let r = renderer(2, 2);
        let img = frame(2, 2, |x, y| if (x, y) == (1, 1) { WHITE } else { BLACK });
        let mut term = MemoryTerminal::with_lines(&["ab", "c@"]).unwrap();
        let previous = read_snapshot(&mut term, 0, 0, 2, 2).unwrap();
        assert_eq!(r.render(&mut term, &img, &previous).unwrap(), 3);
        assert!(term.writes().iter().all(|w| (w.col, w.row) != (1, 1)));
    }

    #[test]
    fn color_only_change_is_not_redrawn() {
        let r = renderer(1, 1);
        // both are '#', one White and one Yellow
        let white = frame(1, 1, |_, _| Rgb([183, 183, 183]));
        let yellow = frame(1, 1, |_, _| Rgb([255, 255, 40]));
        let a = r.desired(&white).unwrap().cells()[0];
        let b = r.desired(&yellow).unwrap().cells()[0];
        assert_eq!((a.glyph, a.color), ('#', PaletteColor::White));
        assert_eq!((b.glyph, b.color), ('#', PaletteColor::Yellow));

        let mut term = MemoryTerminal::new(Size::new(1, 1));
        let previous = read_snapshot(&mut term, 0, 0, 1, 1).unwrap();
        assert_eq!(r.render(&mut term, &white, &previous).unwrap(), 1);

        let previous = read_snapshot(&mut term, 0, 0, 1, 1).unwrap();
        assert_eq!(r.render(&mut term, &yellow, &previous).unwrap(), 0);
        assert_eq!(term.cells().get(0, 0).unwrap().color, PaletteColor::White);
    }

    #[test]
    fn cursor_is_restored_to_origin() {
        let r = renderer(3, 1);
        let img = frame(3, 1, |_, _| WHITE);
        let mut term = MemoryTerminal::new(Size::new(3, 1));
        let previous = read_snapshot(&mut term, 0, 0, 3, 1).unwrap();
        r.render(&mut term, &img, &previous).unwrap();
        assert_eq!(term.cursor(), (0, 0));
    }

    #[test]
    fn render_then_read_back_matches_desired() {
        let r = renderer(4, 3);
        let img = frame(4, 3, |x, y| Rgb([(x * 80) as u8, (y * 120) as u8, 40]));
        let desired = r.desired(&img).unwrap();

        let mut ansi = AnsiTerminal::new(Vec::new(), Size::new(4, 3), Rasterizer::blocks(1, 1));
        let previous = read_snapshot(&mut ansi, 0, 0, 4, 3).unwrap();
        r.render(&mut ansi, &img, &previous).unwrap();
        let after = read_snapshot(&mut ansi, 0, 0, 4, 3).unwrap();
        assert_eq!(after, desired.map(|c| c.glyph));
        assert_eq!(ansi.screen().cursor(), (0, 0));

        let mut memory = MemoryTerminal::new(Size::new(4, 3));
        let previous = read_snapshot(&mut memory, 0, 0, 4, 3).unwrap();
        r.render(&mut memory, &img, &previous).unwrap();
        assert_eq!(memory.cells(), ansi.screen().cells());
    }

    #[test]
    fn size_mismatches_are_caught_before_any_write() {
        let r = renderer(2, 2);
        let mut term = MemoryTerminal::new(Size::new(2, 2));
        let good_snapshot = read_snapshot(&mut term, 0, 0, 2, 2).unwrap();

        let wide = frame(3, 2, |_, _| WHITE);
        let err = r.render(&mut term, &wide, &good_snapshot).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { what: "frame", .. }));

        let short = read_snapshot(&mut term, 0, 0, 2, 1).unwrap();
        let img = frame(2, 2, |_, _| WHITE);
        let err = r.render(&mut term, &img, &short).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { what: "snapshot", .. }));
        assert!(term.writes().is_empty());
    }
}
