use std::io;

use crate::{ErrorExt, StatusCode, ZspError};

/// Ошибки клиента.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Ошибка подключения к серверу
    ConnectionFailed { address: String, reason: String },
    /// Таймаут подключения
    ConnectionTimeout,
    /// Соединение закрыто сервером
    ConnectionClosed,
    /// Сервер недоступен (шина закрыта или идёт shutdown)
    Unavailable { message: String },
    /// Ошибка от сервера
    ServerError { message: String },
    /// Неожиданный ответ от сервера
    UnexpectedResponse,
    /// Ошибка ввода-вывода
    Io { kind: io::ErrorKind, message: String },
    /// Ошибка протокола ZSP
    Protocol { reason: String },
    /// Таймаут чтения
    ReadTimeout,
    /// Таймаут записи
    WriteTimeout,
}

impl ClientError {
    /// Разбирает тело error-фрейма сервера (`"UNAVAILABLE bus is closed"`).
    pub fn from_server_message(body: &str) -> Self {
        match body.split_once(' ') {
            Some(("UNAVAILABLE", rest)) => Self::Unavailable {
                message: rest.to_string(),
            },
            Some((_, rest)) => Self::ServerError {
                message: rest.to_string(),
            },
            None => Self::ServerError {
                message: body.to_string(),
            },
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::ConnectionFailed { address, reason } => {
                write!(f, "Failed to connect to {address}: {reason}")
            }
            Self::ConnectionTimeout => write!(f, "Connection timeout"),
            Self::ConnectionClosed => write!(f, "Connection closed by server"),
            Self::Unavailable { message } => write!(f, "Service unavailable: {message}"),
            Self::ServerError { message } => write!(f, "Server error: {message}"),
            Self::UnexpectedResponse => write!(f, "Unexpected response from server"),
            Self::Io { kind, message } => write!(f, "I/O error ({kind:?}): {message}"),
            Self::Protocol { reason } => write!(f, "Protocol error: {reason}"),
            Self::ReadTimeout => write!(f, "Read timeout"),
            Self::WriteTimeout => write!(f, "Write timeout"),
        }
    }
}

impl std::error::Error for ClientError {}

impl ErrorExt for ClientError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ConnectionFailed { .. } => StatusCode::ConnectionFailed,
            Self::ConnectionTimeout => StatusCode::Timeout,
            Self::ConnectionClosed => StatusCode::ConnectionClosed,
            Self::Unavailable { .. } => StatusCode::ServiceUnavailable,
            Self::ServerError { .. } => StatusCode::Internal,
            Self::UnexpectedResponse => StatusCode::Unexpected,
            Self::Io { .. } => StatusCode::Io,
            Self::Protocol { .. } => StatusCode::DecodingError,
            Self::ReadTimeout => StatusCode::ReadTimeout,
            Self::WriteTimeout => StatusCode::WriteTimeout,
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe => Self::ConnectionClosed,
            kind => Self::Io {
                kind,
                message: err.to_string(),
            },
        }
    }
}

impl From<ZspError> for ClientError {
    fn from(err: ZspError) -> Self {
        match err {
            ZspError::Io(io) => io.into(),
            other => Self::Protocol {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_server_message() {
        assert_eq!(
            ClientError::from_server_message("UNAVAILABLE bus is closed"),
            ClientError::Unavailable {
                message: "bus is closed".into()
            }
        );
        assert_eq!(
            ClientError::from_server_message("ERR Unknown command 'FOO'"),
            ClientError::ServerError {
                message: "Unknown command 'FOO'".into()
            }
        );
        assert_eq!(
            ClientError::from_server_message("oops"),
            ClientError::ServerError {
                message: "oops".into()
            }
        );
    }

    #[test]
    fn test_io_conversion() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(ClientError::from(eof), ClientError::ConnectionClosed);

        let other = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(
            ClientError::from(other),
            ClientError::Io {
                kind: io::ErrorKind::PermissionDenied,
                ..
            }
        ));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ClientError::Unavailable {
                message: String::new()
            }
            .status_code(),
            StatusCode::ServiceUnavailable
        );
        assert_eq!(ClientError::ReadTimeout.status_code(), StatusCode::ReadTimeout);
    }
}
