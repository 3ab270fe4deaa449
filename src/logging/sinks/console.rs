use std::io::{self, Stdout};

use tracing_subscriber::{layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::{
    config::LoggingConfig,
    formatter::{self, FormatOptions},
};

/// Консольный слой на stdout по настройкам `config.console`.
///
/// Цвета отключаются, если stdout не терминал.
pub fn layer_with_config<S>(config: &LoggingConfig) -> Box<dyn LayerTrait<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let with_ansi = config.console.with_ansi && atty::is(atty::Stream::Stdout);
    let options = FormatOptions::from_console(&config.console, with_ansi);
    let writer: fn() -> Stdout = io::stdout;
    formatter::build_layer(config.console.format, options, writer)
}
