//! Reading the Windows console's own screen buffer.
//!
//! The console keeps the characters it shows in a screen buffer that
//! `ReadConsoleOutputCharacterW` reads back without changing it. Each row of
//! a region is one call, and a single call may not ask for more than 64K of
//! buffer.

use crate::error::{Error, Result};

/// Largest buffer one console read call accepts.
pub const MAX_READ_BYTES: usize = 64 * 1024;

/// `ERROR_NOT_ENOUGH_MEMORY`, what the console reports for oversized reads.
const NOT_ENOUGH_MEMORY: i32 = 8;

/// Fail the way the console would for a read of `chars` UTF-16 units.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn check_read_len(chars: usize) -> Result<()> {
    if chars * std::mem::size_of::<u16>() > MAX_READ_BYTES {
        return Err(Error::BufferRead {
            code: Some(NOT_ENOUGH_MEMORY),
            message: format!(
                "reading {} cells needs more than {} bytes of console buffer",
                chars, MAX_READ_BYTES
            ),
        });
    }
    Ok(())
}

/// One glyph per cell. A short read means the buffer shrank under us.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn decode_row(units: &[u16], width: usize) -> Result<Vec<char>> {
    if units.len() != width {
        return Err(Error::buffer_read(format!(
            "console returned {} of {} cells",
            units.len(),
            width
        )));
    }
    Ok(units
        .iter()
        .map(|u| char::from_u32(u32::from(*u)).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect())
}

#[cfg(windows)]
pub use self::win::ConsoleReader;

#[cfg(windows)]
mod win {
    use std::io;

    use windows_sys::Win32::Foundation::{HANDLE, INVALID_HANDLE_VALUE};
    use windows_sys::Win32::System::Console::{
        GetConsoleScreenBufferInfo, GetStdHandle, ReadConsoleOutputCharacterW,
        CONSOLE_SCREEN_BUFFER_INFO, COORD, STD_OUTPUT_HANDLE,
    };

    use super::{check_read_len, decode_row};
    use crate::error::{Error, Result};
    use crate::grid::Grid;
    use crate::snapshot::{Region, ScreenReader};

    /// Reads the active console screen buffer of this process.
    ///
    /// Regions are relative to the visible window, matching the coordinates
    /// cursor movement uses.
    pub struct ConsoleReader {
        handle: HANDLE,
    }

    impl ConsoleReader {
        pub fn stdout() -> Result<Self> {
            // SAFETY: no preconditions; the result is checked below.
            let handle = unsafe { GetStdHandle(STD_OUTPUT_HANDLE) };
            if handle == INVALID_HANDLE_VALUE || handle.is_null() {
                return Err(Error::buffer_read_os(&io::Error::last_os_error()));
            }
            Ok(Self { handle })
        }

        fn buffer_info(&self) -> Result<CONSOLE_SCREEN_BUFFER_INFO> {
            // SAFETY: plain-old-data struct, fully written on success.
            let mut info: CONSOLE_SCREEN_BUFFER_INFO = unsafe { std::mem::zeroed() };
            let ok = unsafe { GetConsoleScreenBufferInfo(self.handle, &mut info) };
            if ok == 0 {
                return Err(Error::buffer_read_os(&io::Error::last_os_error()));
            }
            Ok(info)
        }
    }

    fn coord(x: i32, y: i32) -> Result<COORD> {
        match (i16::try_from(x), i16::try_from(y)) {
            (Ok(x), Ok(y)) => Ok(COORD { X: x, Y: y }),
            _ => Err(Error::buffer_read(format!("({}, {}) is not a console coordinate", x, y))),
        }
    }

    impl ScreenReader for ConsoleReader {
        fn read_region(&mut self, region: Region) -> Result<Grid<char>> {
            let width = region.width as usize;
            check_read_len(width)?;

            let info = self.buffer_info()?;
            let left = i32::from(info.srWindow.Left) + i32::from(region.x);
            let top = i32::from(info.srWindow.Top) + i32::from(region.y);
            if left + i32::from(region.width) > i32::from(info.dwSize.X)
                || top + i32::from(region.height) > i32::from(info.dwSize.Y)
            {
                return Err(Error::buffer_read(format!(
                    "region {}x{} at ({}, {}) exceeds the {}x{} console buffer",
                    region.width, region.height, left, top, info.dwSize.X, info.dwSize.Y
                )));
            }

            let mut cells = Vec::with_capacity(region.size().area());
            let mut row = vec![0u16; width];
            for dy in 0..i32::from(region.height) {
                let at = coord(left, top + dy)?;
                let mut read = 0u32;
                // SAFETY: `row` holds `width` units and outlives the call.
                let ok = unsafe {
                    ReadConsoleOutputCharacterW(self.handle, row.as_mut_ptr(), width as u32, at, &mut read)
                };
                if ok == 0 {
                    return Err(Error::buffer_read_os(&io::Error::last_os_error()));
                }
                cells.extend(decode_row(&row[..(read as usize).min(width)], width)?);
            }
            Grid::from_cells(region.size(), cells)
                .ok_or_else(|| Error::buffer_read("console snapshot does not match region"))
        }
    }
}
