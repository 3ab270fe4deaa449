use std::{path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{logging::LoggingConfig, pubsub::BusConfig};

/// Настройки сервиса.
///
/// Источники по возрастанию приоритета: значения по умолчанию, файл
/// `config.{toml,yaml,json}` в рабочем каталоге (если есть), переменные
/// окружения `SUBPUB_*`. Вложенные ключи разделяются `__`:
/// `SUBPUB_LOGGING__LEVEL=debug`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Ёмкость очереди каждого подписчика.
    pub queue_capacity: usize,
    pub max_connections: usize,
    /// Общий бюджет на остановку сервиса.
    pub shutdown_timeout_ms: u64,
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            queue_capacity: crate::pubsub::DEFAULT_QUEUE_CAPACITY,
            max_connections: 1024,
            shutdown_timeout_ms: 10_000,
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(File::with_name("config").required(false))
    }

    /// Загружает настройки из явно указанного файла (он обязан существовать).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::build(File::from(path).required(true))
    }

    fn build<S>(file: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let defaults = Self::default();
        let cfg = Config::builder()
            // Добавляем значения по умолчанию
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("queue_capacity", defaults.queue_capacity as u64)?
            .set_default("max_connections", defaults.max_connections as u64)?
            .set_default("shutdown_timeout_ms", defaults.shutdown_timeout_ms)?
            .add_source(file)
            // Добавляем переменные окружения с префиксом SUBPUB_
            .add_source(
                Environment::with_prefix("SUBPUB")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Message("port must be non-zero".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Message(
                "queue_capacity must be at least 1".into(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Message(
                "max_connections must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn bus_config(&self) -> BusConfig {
        BusConfig {
            queue_capacity: self.queue_capacity,
        }
    }
}
