use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки, возникающие при работе с фреймами протокола ZSP.
#[derive(Debug, Error)]
pub enum ZspError {
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Unknown ZSP type byte 0x{byte:02x} at {position}")]
    UnknownType { byte: u8, position: u64 },
    #[error("Line too long (max {max} bytes)")]
    LineTooLong { max: usize },
    #[error("Bulk string too long ({len} > {max})")]
    BulkTooLong { len: usize, max: usize },
    #[error("Array too long ({len} > {max} elements)")]
    ArrayTooLong { len: usize, max: usize },
    #[error("Max array depth exceeded ({max})")]
    DepthExceeded { max: usize },
    #[error("Invalid UTF-8 at byte {position}")]
    InvalidUtf8 { position: u64 },
    #[error("Invalid integer at byte {position}")]
    InvalidInteger { position: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ErrorExt for ZspError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidData(_) | Self::UnknownType { .. } => StatusCode::InvalidFrame,
            Self::LineTooLong { .. } | Self::BulkTooLong { .. } | Self::ArrayTooLong { .. } => {
                StatusCode::SizeLimit
            }
            Self::DepthExceeded { .. } => StatusCode::DepthLimit,
            Self::InvalidUtf8 { .. } => StatusCode::InvalidUtf8,
            Self::InvalidInteger { .. } => StatusCode::InvalidInteger,
            Self::Io(_) => StatusCode::Io,
        }
    }
}

/// Ошибки разбора команды из уже декодированного фрейма.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Expected array frame")]
    ExpectedArray,
    #[error("Empty command")]
    EmptyCommand,
    #[error("Command name must be a string")]
    CommandMustBeString,
    #[error("Invalid UTF-8 in argument")]
    InvalidUtf8,
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
    #[error("Wrong number of arguments for '{0}': expected {1}")]
    WrongArgCount(&'static str, usize),
    #[error("Subject must not be empty")]
    EmptySubject,
}

impl ErrorExt for ParseError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::WrongArgCount(..) | Self::EmptySubject => StatusCode::InvalidArgs,
            Self::InvalidUtf8 => StatusCode::InvalidUtf8,
            _ => StatusCode::InvalidCommand,
        }
    }
}
