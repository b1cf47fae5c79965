use std::path::PathBuf;

use crate::grid::Size;

/// Errors raised by the rendering core.
///
/// Every variant is fatal for the current run: a half-drawn frame would
/// corrupt the diff baseline of the next one, so nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading back the terminal's display memory failed.
    #[error("terminal buffer read failed{}: {message}", os_suffix(.code))]
    BufferRead { code: Option<i32>, message: String },

    /// A frame, snapshot or device does not match the size fixed at startup.
    #[error("{what} is {actual}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: Size,
        actual: Size,
    },

    /// The frame sequence is empty or has a hole in its numbering.
    #[error("frame source exhausted: {detail}")]
    FrameSourceExhausted { detail: String },

    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("cannot load font {path}: {message}")]
    Font { path: PathBuf, message: String },
}

impl Error {
    pub(crate) fn buffer_read(message: impl Into<String>) -> Self {
        Error::BufferRead {
            code: None,
            message: message.into(),
        }
    }

    pub(crate) fn buffer_read_os(err: &std::io::Error) -> Self {
        Error::BufferRead {
            code: err.raw_os_error(),
            message: err.to_string(),
        }
    }

    pub(crate) fn exhausted(detail: impl Into<String>) -> Self {
        Error::FrameSourceExhausted {
            detail: detail.into(),
        }
    }
}

fn os_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" (os error {})", c)).unwrap_or_default()
}

/// Result alias for the rendering core.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_read_message_includes_os_code() {
        let err = Error::buffer_read_os(&std::io::Error::from_raw_os_error(5));
        let text = err.to_string();
        assert!(text.contains("os error 5"), "{}", text);
    }

    #[test]
    fn dimension_mismatch_names_both_sizes() {
        let err = Error::DimensionMismatch {
            what: "snapshot",
            expected: Size::new(80, 24),
            actual: Size::new(80, 23),
        };
        assert_eq!(err.to_string(), "snapshot is 80x23, expected 80x24");
    }
}
