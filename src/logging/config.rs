use std::{env, fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Формат вывода событий.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(LoggingError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Unknown log format '{0}' (expected json, pretty or compact)")]
    UnknownFormat(String),
    #[error("Invalid log filter directive '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },
    #[error("Log file name must not be empty")]
    EmptyFilename,
    #[error("Failed to create log directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: LogFormat,
    /// ANSI-цвета; включаются только если stdout является терминалом.
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: LogFormat::Compact,
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    pub enabled: bool,
    /// Префикс имени файла; к нему добавляется дата ротации.
    pub filename: String,
    pub format: LogFormat,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filename: "subpub.log".to_string(),
            format: LogFormat::Json,
        }
    }
}

/// Конфигурация логирования (секция `logging` в [`Settings`]).
///
/// [`Settings`]: crate::config::Settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Уровень или полная директива `EnvFilter` (`"info"`, `"subpub=debug"`).
    pub level: String,
    pub log_dir: PathBuf,
    pub console_enabled: bool,
    pub console: ConsoleConfig,
    pub file_enabled: bool,
    pub file: FileConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            console_enabled: true,
            console: ConsoleConfig::default(),
            file_enabled: false,
            file: FileConfig::default(),
        }
    }
}

impl LoggingConfig {
    /// Переменные `SUBPUB_LOG_LEVEL`, `SUBPUB_LOG_FORMAT`, `SUBPUB_LOG_DIR`
    /// перекрывают значения из конфигурации.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("SUBPUB_LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.level = level.trim().to_string();
            }
        }
        if let Ok(format) = env::var("SUBPUB_LOG_FORMAT") {
            match format.parse() {
                Ok(f) => self.console.format = f,
                Err(e) => eprintln!("Ignoring SUBPUB_LOG_FORMAT: {e}"),
            }
        }
        if let Ok(dir) = env::var("SUBPUB_LOG_DIR") {
            if !dir.trim().is_empty() {
                self.log_dir = PathBuf::from(dir);
                self.file_enabled = true;
            }
        }
    }

    pub fn validate(&self) -> Result<(), LoggingError> {
        let directive = self.build_filter_directive();
        tracing_subscriber::EnvFilter::try_new(&directive).map_err(|e| {
            LoggingError::InvalidDirective {
                directive: directive.clone(),
                reason: e.to_string(),
            }
        })?;
        if self.file_sink_enabled() && self.file.filename.trim().is_empty() {
            return Err(LoggingError::EmptyFilename);
        }
        Ok(())
    }

    /// Создаёт каталог логов, если включён файловый вывод.
    pub fn ensure_log_dir(&self) -> Result<(), LoggingError> {
        if !self.file_sink_enabled() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.log_dir).map_err(|source| LoggingError::LogDir {
            path: self.log_dir.clone(),
            source,
        })
    }

    /// Директива для `EnvFilter`. Голый уровень применяется ко всему.
    pub fn build_filter_directive(&self) -> String {
        self.level.trim().to_ascii_lowercase()
    }

    pub fn console_sink_enabled(&self) -> bool {
        self.console_enabled && self.console.enabled
    }

    pub fn file_sink_enabled(&self) -> bool {
        self.file_enabled && self.file.enabled
    }
}
