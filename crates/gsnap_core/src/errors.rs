use std::fmt;
use thiserror::Error;

/// Decoding stage an error was detected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Header,
    Block,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Header => f.write_str("header"),
            Stage::Block => f.write_str("block"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SnapError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Persist: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("{stage}: record size mismatch (leading {leading}, trailing {trailing})")]
    SizeMismatch { stage: Stage, leading: u32, trailing: u32 },

    #[error("{stage}: name wrapper declares {found} bytes, expected 8")]
    BadWrapper { stage: Stage, found: u32 },

    #[error("header: payload is {0} bytes, expected 256")]
    HeaderSize(u32),

    #[error("block {name:?}: payload of {len} bytes is not a whole number of floats")]
    Misaligned { name: String, len: usize },

    #[error("{0} not found in snapshot")]
    BlockNotFound(String),

    #[error("record payload of {0} bytes does not fit a 32-bit size marker")]
    TooLarge(usize),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("center of mass: no particles inside the initial radius {radius}")]
    EmptySelection { radius: f64 },
}

impl SnapError {
    /// True for errors caused by inconsistent file contents or a failed
    /// block lookup.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            SnapError::SizeMismatch { .. }
                | SnapError::BadWrapper { .. }
                | SnapError::HeaderSize(_)
                | SnapError::Misaligned { .. }
                | SnapError::BlockNotFound(_)
                | SnapError::TooLarge(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SnapError>;
