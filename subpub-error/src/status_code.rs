use std::fmt;

use num_enum::TryFromPrimitive;

/// Коды статуса для категоризации ошибок.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 4xxx: Доступность сервиса (шина закрыта, дедлайн)
/// - 6xxx: Сеть / IO
/// - 8xxx: Протокольные ошибки
///
/// `num_enum::TryFromPrimitive` даёт нативную реализацию `TryFrom<u32>`
/// (полезно для wire-протокола).
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Unsupported = 1001,
    Unexpected = 1002,
    Internal = 1003,
    InvalidArgs = 1004,

    // === 4xxx: Доступность ===
    ServiceUnavailable = 4000,
    DeadlineExceeded = 4001,
    TooManyConnections = 4002,

    // === 6xxx: Сеть/IO ===
    Io = 6000,
    ConnectionClosed = 6001,
    Timeout = 6002,
    ConnectionFailed = 6004,
    ReadTimeout = 6005,
    WriteTimeout = 6006,
    UnexpectedEof = 6007,

    // === 8xxx: Протокол ===
    InvalidFrame = 8000,
    InvalidCommand = 8001,
    InvalidUtf8 = 8004,
    InvalidInteger = 8005,
    SizeLimit = 8007,
    DepthLimit = 8008,
    ParseError = 8009,
    EncodingError = 8010,
    DecodingError = 8011,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Пытается получить вариант `StatusCode` из `u32`.
    ///
    /// Возвращает `None`, если значение не соответствует ни одному варианту.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Возвращает `true`, если операцию с этим кодом имеет смысл повторить.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout
                | Self::ReadTimeout
                | Self::WriteTimeout
                | Self::TooManyConnections
                | Self::ConnectionFailed
        )
    }

    /// Является ли код ошибкой со стороны клиента (проблема в запросе).
    ///
    /// `InvalidArgs` (1004) семантически относится к клиентским ошибкам и
    /// учитывается явно, как и протокольный диапазон 8xxx.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidArgs) || self.is_protocol_error()
    }

    /// Является ли код ошибкой сервера. Диапазоны `1xxx`, `4xxx` и `6xxx`.
    pub fn is_server_error(&self) -> bool {
        if matches!(self, Self::InvalidArgs) {
            return false;
        }
        let c = self.code();
        matches!(c, 1000..=1999 | 4000..=4999 | 6000..=6999)
    }

    /// Ошибка протокола или парсинга (диапазон 8xxx).
    pub fn is_protocol_error(&self) -> bool {
        (8000..=8999).contains(&self.code())
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::ConnectionClosed | Self::UnexpectedEof => LogLevel::Debug,
            Self::InvalidArgs
            | Self::InvalidCommand
            | Self::InvalidFrame
            | Self::InvalidUtf8
            | Self::InvalidInteger
            | Self::ParseError => LogLevel::Info,
            Self::ServiceUnavailable
            | Self::DeadlineExceeded
            | Self::Timeout
            | Self::TooManyConnections => LogLevel::Warn,
            Self::Internal | Self::Unexpected => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }

    /// Префикс error-фрейма на проводе (`-UNAVAILABLE ...`, `-ERR ...`).
    ///
    /// Закрытая шина всегда отдаётся как `UNAVAILABLE`, а не как внутренняя
    /// ошибка.
    pub fn wire_prefix(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable | Self::DeadlineExceeded => "UNAVAILABLE",
            Self::TooManyConnections => "BUSY",
            Self::Unknown | Self::Internal | Self::Unexpected => "INTERNAL",
            _ => "ERR",
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
