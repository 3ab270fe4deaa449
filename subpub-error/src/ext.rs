use std::error::Error;

use crate::StatusCode;

/// Расширение для ошибок библиотеки (object-safe).
///
/// Предоставляет вспомогательные методы для работы с ошибками:
/// - извлечение статус-кода,
/// - безопасное сообщение для клиента,
/// - детализированное сообщение для логов,
/// - формирование тегов для систем наблюдаемости.
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Протокольный статус (для клиента или сетевого уровня).
    ///
    /// По умолчанию возвращает [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Безопасное сообщение для клиента.
    ///
    /// Для внутренних ошибок возвращает строку `"Internal server error"`.
    fn client_message(&self) -> String {
        match self.status_code() {
            StatusCode::Unknown | StatusCode::Internal | StatusCode::Unexpected => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Детализированное сообщение для логов.
    fn log_message(&self) -> String {
        format!("{self:?}")
    }

    /// Набор тегов для систем наблюдаемости.
    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", self.type_name()),
            ("status_code", self.status_code().to_string()),
        ]
    }

    /// Имя типа ошибки (для метрик или логирования).
    fn type_name(&self) -> String {
        std::any::type_name::<Self>()
            .split("::")
            .last()
            .unwrap_or("Unknown")
            .to_string()
    }

    /// Готовая строка error-фрейма без `-` и CRLF: `"<PREFIX> <message>"`.
    fn wire_message(&self) -> String {
        let message = self.client_message().replace(['\r', '\n'], " ");
        format!("{} {}", self.status_code().wire_prefix(), message)
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error, fmt};

    use super::*;

    // Вспомогательный тип ошибки без переопределения status_code (использует
    // default = Internal).
    #[derive(Debug)]
    struct DefaultError(pub &'static str);

    impl fmt::Display for DefaultError {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            write!(f, "DefaultError: {}", self.0)
        }
    }

    impl Error for DefaultError {}

    impl ErrorExt for DefaultError {}

    #[derive(Debug)]
    struct UnavailableError;

    impl fmt::Display for UnavailableError {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            write!(f, "bus is closed")
        }
    }

    impl Error for UnavailableError {}

    impl ErrorExt for UnavailableError {
        fn status_code(&self) -> StatusCode {
            StatusCode::ServiceUnavailable
        }
    }

    /// Тест проверяет, что по умолчанию статус ошибки `Internal`.
    #[test]
    fn test_default_status_code_is_internal() {
        let e = DefaultError("oops");
        assert_eq!(e.status_code(), StatusCode::Internal);
    }

    /// Тест проверяет, что для внутренних ошибок `client_message` не раскрывает
    /// детали.
    #[test]
    fn test_client_message_internal() {
        let e = DefaultError("sensitive");
        assert_eq!(e.client_message(), "Internal server error");
        assert_eq!(e.wire_message(), "INTERNAL Internal server error");
    }

    #[test]
    fn test_wire_message_unavailable() {
        let e = UnavailableError;
        assert_eq!(e.wire_message(), "UNAVAILABLE bus is closed");
    }

    #[test]
    fn test_metrics_tags_and_type_name() {
        let e = UnavailableError;
        let tags = e.metrics_tags();
        assert!(tags
            .iter()
            .any(|(k, v)| *k == "status_code" && v == &StatusCode::ServiceUnavailable.to_string()));
        assert!(e.type_name().ends_with("UnavailableError"));
        assert_eq!(e.log_message(), format!("{e:?}"));
    }
}
