use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::Layer as LayerTrait,
    registry::LookupSpan,
};

use crate::logging::config::{ConsoleConfig, LogFormat};

/// Общие флаги fmt-слоя для консоли и файла.
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
}

impl FormatOptions {
    pub fn from_console(
        console: &ConsoleConfig,
        with_ansi: bool,
    ) -> Self {
        Self {
            with_ansi,
            with_target: console.with_target,
            with_thread_ids: console.with_thread_ids,
            with_line_numbers: console.with_line_numbers,
        }
    }

    /// Файлы пишутся без цвета и всегда с target.
    pub fn for_file() -> Self {
        Self {
            with_ansi: false,
            with_target: true,
            with_thread_ids: true,
            with_line_numbers: false,
        }
    }
}

/// Собирает fmt-слой выбранного формата поверх `writer`.
///
/// Тип формата стирается в boxed trait-объект.
pub fn build_layer<S, W>(
    format: LogFormat,
    options: FormatOptions,
    writer: W,
) -> Box<dyn LayerTrait<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = fmt::layer()
        .with_writer(writer)
        .with_ansi(options.with_ansi)
        .with_target(options.with_target)
        .with_thread_ids(options.with_thread_ids)
        .with_line_number(options.with_line_numbers);

    match format {
        LogFormat::Json => Box::new(
            base.event_format(fmt::format().json().with_current_span(true))
                .fmt_fields(fmt::format::JsonFields::new()),
        ),
        LogFormat::Pretty => Box::new(
            base.event_format(fmt::format().pretty())
                .with_span_events(FmtSpan::CLOSE),
        ),
        LogFormat::Compact => Box::new(base.event_format(fmt::format().compact())),
    }
}
