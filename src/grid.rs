//! Fixed-size, row-major cell grids.

use std::fmt;

/// Terminal geometry in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A `width × height` grid stored row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    size: Size,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Create a grid with every cell set to `fill`.
    pub fn filled(size: Size, fill: T) -> Self {
        Self {
            size,
            cells: vec![fill; size.area()],
        }
    }
}

impl<T> Grid<T> {
    /// Build a grid from row-major cells. Returns `None` when the cell count
    /// does not match `size`.
    pub fn from_cells(size: Size, cells: Vec<T>) -> Option<Self> {
        (cells.len() == size.area()).then_some(Self { size, cells })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn get(&self, col: u16, row: u16) -> Option<&T> {
        self.index(col, row).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, col: u16, row: u16) -> Option<&mut T> {
        self.index(col, row).map(move |i| &mut self.cells[i])
    }

    /// Iterate over rows as slices.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks() panics on zero, and an empty grid has no rows anyway
        self.cells.chunks(self.size.width.max(1) as usize)
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// Map every cell into a new grid of the same size.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            size: self.size,
            cells: self.cells.iter().map(f).collect(),
        }
    }

    fn index(&self, col: u16, row: u16) -> Option<usize> {
        if col < self.size.width && row < self.size.height {
            Some(row as usize * self.size.width as usize + col as usize)
        } else {
            None
        }
    }
}

impl Grid<char> {
    /// Build a character grid from equal-length lines.
    ///
    /// ```
    /// use vidascii::Grid;
    ///
    /// let grid = Grid::from_lines(&["ab", "cd"]).unwrap();
    /// assert_eq!(grid.get(1, 1), Some(&'d'));
    /// ```
    pub fn from_lines(lines: &[&str]) -> Option<Self> {
        let height = u16::try_from(lines.len()).ok()?;
        let width = lines.first().map(|l| l.chars().count()).unwrap_or(0);
        let width = u16::try_from(width).ok()?;
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for line in lines {
            if line.chars().count() != width as usize {
                return None;
            }
            cells.extend(line.chars());
        }
        Self::from_cells(Size::new(width, height), cells)
    }

    /// Rows as owned strings.
    pub fn lines(&self) -> Vec<String> {
        self.rows().map(|row| row.iter().collect()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_cells_rejects_wrong_length() {
        assert!(Grid::from_cells(Size::new(2, 2), vec![0u8; 3]).is_none());
        assert!(Grid::from_cells(Size::new(2, 2), vec![0u8; 4]).is_some());
    }

    #[test]
    fn get_is_row_major() {
        let grid = Grid::from_lines(&["abc", "def"]).unwrap();
        assert_eq!(grid.size(), Size::new(3, 2));
        assert_eq!(grid.get(0, 1), Some(&'d'));
        assert_eq!(grid.get(2, 0), Some(&'c'));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.get(0, 2), None);
    }

    #[test]
    fn from_lines_rejects_ragged_rows() {
        assert!(Grid::from_lines(&["ab", "c"]).is_none());
    }

    #[test]
    fn lines_round_trip() {
        let grid = Grid::from_lines(&["xy", "zw"]).unwrap();
        assert_eq!(grid.lines(), vec!["xy".to_string(), "zw".to_string()]);
    }
}
