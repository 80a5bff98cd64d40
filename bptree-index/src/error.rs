//! Error types and externally-visible return codes for the index engine.

use std::fmt;
use std::path::PathBuf;

/// Externally-visible return codes.
///
/// `IX_EOF` and `INVALID_OPERATION` intentionally share the numeric value
/// `-1`; the richer [`IndexError`] still distinguishes them in-process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ReturnCode {
    Success = 0,
    RecordNotFound = 1,
    KeyExists = 2,
    InvalidOperation = -1,
    FileOpError = -2,
    FileNotFound = -3,
    AttributeNotFound = -4,
}

impl ReturnCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReturnCode::Success => "SUCCESS",
            ReturnCode::RecordNotFound => "RECORD_NOT_FOUND",
            ReturnCode::KeyExists => "KEY_EXISTS",
            ReturnCode::InvalidOperation => "INVALID_OPERATION",
            ReturnCode::FileOpError => "FILE_OP_ERROR",
            ReturnCode::FileNotFound => "FILE_NOT_FOUND",
            ReturnCode::AttributeNotFound => "ATTRIBUTE_NOT_FOUND",
        };
        write!(f, "{} ({})", name, self.as_i32())
    }
}

/// Errors produced by the index engine.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("key already exists")]
    KeyExists,

    #[error("record not found")]
    RecordNotFound,

    #[error("scan exhausted")]
    ScanExhausted,

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("index file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("index file already exists: {0}")]
    FileExists(PathBuf),

    #[error("attribute not found: {table}.{attribute}")]
    AttributeNotFound { table: String, attribute: String },

    #[error("corrupt page: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    /// Maps this error onto the externally-visible numeric contract.
    pub fn code(&self) -> ReturnCode {
        match self {
            IndexError::KeyExists => ReturnCode::KeyExists,
            IndexError::RecordNotFound => ReturnCode::RecordNotFound,
            IndexError::ScanExhausted => ReturnCode::InvalidOperation,
            IndexError::InvalidOperation(_) => ReturnCode::InvalidOperation,
            IndexError::FileNotFound(_) => ReturnCode::FileNotFound,
            IndexError::FileExists(_) => ReturnCode::FileOpError,
            IndexError::AttributeNotFound { .. } => ReturnCode::AttributeNotFound,
            IndexError::Corrupt(_) => ReturnCode::FileOpError,
            IndexError::Io(_) => ReturnCode::FileOpError,
        }
    }
}

pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ix_eof_shares_invalid_operation_numeric_value() {
        assert_eq!(
            IndexError::ScanExhausted.code().as_i32(),
            ReturnCode::InvalidOperation.as_i32()
        );
    }

    #[test]
    fn key_exists_maps_to_plus_two() {
        assert_eq!(IndexError::KeyExists.code().as_i32(), 2);
    }

    #[test]
    fn record_not_found_maps_to_plus_one() {
        assert_eq!(IndexError::RecordNotFound.code().as_i32(), 1);
    }
}
