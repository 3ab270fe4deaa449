//! Логирование на базе `tracing`: фильтр `EnvFilter`, консольный и файловый
//! слои, handle для корректного завершения.

pub mod config;
mod filters;
mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{ConsoleConfig, FileConfig, LogFormat, LoggingConfig, LoggingError};
pub use handle::LoggingHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Устанавливает глобальный subscriber по конфигурации.
///
/// `RUST_LOG` имеет приоритет над `config.level`. Повторный вызов в одном
/// процессе возвращает ошибку.
pub fn init_logging(
    mut config: LoggingConfig
) -> Result<LoggingHandle, Box<dyn std::error::Error + Send + Sync>> {
    config.apply_env_overrides();
    config.validate()?;
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter_from_config(&config);
    let mut layers = Vec::new();

    if config.console_sink_enabled() {
        layers.push(sinks::console::layer_with_config(&config));
    }

    let file_guard = if config.file_sink_enabled() {
        let (file_layer, guard) = sinks::file::layer_with_config(&config);
        layers.push(file_layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        log_dir = %config.log_dir.display(),
        console_enabled = config.console_sink_enabled(),
        file_enabled = config.file_sink_enabled(),
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
