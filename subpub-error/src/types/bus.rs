use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки шины сообщений.
///
/// Переполнение очереди отдельного подписчика и публикация в тему без
/// подписчиков ошибками не являются и сюда не попадают.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// `subscribe` или `publish` после `close`.
    #[error("bus is closed")]
    Closed,

    /// Дедлайн `close` истёк раньше, чем все диспетчеры завершились.
    #[error("bus close deadline exceeded with {pending} dispatcher(s) still draining")]
    DeadlineExceeded { pending: usize },
}

impl BusError {
    /// `true` для [`BusError::Closed`].
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl ErrorExt for BusError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Closed => StatusCode::ServiceUnavailable,
            Self::DeadlineExceeded { .. } => StatusCode::DeadlineExceeded,
        }
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "bus".to_string()),
            ("status_code", self.status_code().to_string()),
        ];
        if let Self::DeadlineExceeded { pending } = self {
            tags.push(("pending_dispatchers", pending.to_string()));
        }
        tags
    }
}
