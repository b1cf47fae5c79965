//! Reading back what the terminal currently shows.
//!
//! The renderer keeps no copy of the previous frame. Instead it asks the
//! device for the characters actually on screen and diffs against those, so
//! the device's display memory is the only frame state in the system.

use crate::error::{Error, Result};
use crate::grid::{Grid, Size};

/// A rectangle of cells, `x`/`y` being the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Region {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole screen for a given size.
    pub const fn full(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Whether the region lies inside a buffer of `bounds`.
    pub fn fits_within(&self, bounds: Size) -> bool {
        self.x as u32 + self.width as u32 <= bounds.width as u32
            && self.y as u32 + self.height as u32 <= bounds.height as u32
    }
}

/// Read access to a terminal's display memory.
pub trait ScreenReader {
    /// Characters inside `region`, row-major. Must not change the display.
    fn read_region(&mut self, region: Region) -> Result<Grid<char>>;
}

/// Take a snapshot of `width × height` cells starting at (`x`, `y`).
///
/// Fails with [`Error::BufferRead`] when the region is empty, when the
/// device cannot serve it, or when it answers with a grid of the wrong
/// shape.
pub fn read_snapshot<R: ScreenReader + ?Sized>(
    reader: &mut R,
    x: u16,
    y: u16,
    width: u16,
    height: u16,
) -> Result<Grid<char>> {
    let region = Region::new(x, y, width, height);
    if region.size().is_empty() {
        return Err(Error::buffer_read(format!("cannot read an empty region {}", region.size())));
    }

    let grid = reader.read_region(region)?;
    if grid.size() != region.size() {
        return Err(Error::buffer_read(format!(
            "device returned {} for a {} read",
            grid.size(),
            region.size()
        )));
    }
    log::trace!("snapshot {}x{} at ({}, {})", width, height, x, y);
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Grid<char>);

    impl ScreenReader for Fixed {
        fn read_region(&mut self, _region: Region) -> Result<Grid<char>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn region_bounds() {
        let bounds = Size::new(10, 5);
        assert!(Region::new(0, 0, 10, 5).fits_within(bounds));
        assert!(Region::new(9, 4, 1, 1).fits_within(bounds));
        assert!(!Region::new(9, 4, 2, 1).fits_within(bounds));
        assert!(!Region::new(0, 0, 10, 6).fits_within(bounds));
        assert!(!Region::new(u16::MAX, 0, 1, 1).fits_within(bounds));
    }

    #[test]
    fn empty_region_is_a_read_error() {
        let mut reader = Fixed(Grid::from_lines(&["ab"]).unwrap());
        let err = read_snapshot(&mut reader, 0, 0, 0, 1).unwrap_err();
        assert!(matches!(err, Error::BufferRead { .. }));
    }

    #[test]
    fn wrong_shaped_answer_is_rejected() {
        let mut reader = Fixed(Grid::from_lines(&["ab"]).unwrap());
        assert!(read_snapshot(&mut reader, 0, 0, 2, 1).is_ok());
        let err = read_snapshot(&mut reader, 0, 0, 1, 2).unwrap_err();
        assert!(matches!(err, Error::BufferRead { .. }));
    }
}
