use std::env;

use atty::Stream;
use chrono::{DateTime, Local};
use owo_colors::OwoColorize;
use sysinfo::System;

/// Полный баннер с информацией о сервере.
pub const ASCII_FULL: &str = r#"
    subpub {version}
    ----------------------------------------------
    Mode:             {mode}
    Listening:        {listen}
    Queue capacity:   {capacity}
    Max connections:  {max_conn}
    PID:              {pid}
    Host:             {host}
    OS/Arch:          {os}/{arch}
    CPU(s):           {cpus}
    Memory:           {mem_value} {mem_unit}
    Build:            {git} ({build_time})
"#;

/// Компактный баннер для вывода.
pub const ASCII_COMPACT: &str = "subpub {version} | {mode} | {listen} | PID {pid}";

/// Параметры запуска, показываемые в баннере.
#[derive(Debug, Clone)]
pub struct BannerInfo<'a> {
    pub listen: &'a str,
    pub queue_capacity: usize,
    pub max_connections: usize,
}

/// Вывод баннера сервера с информацией о конфигурации.
///
/// `SUBPUB_BANNER=full|compact` переопределяет режим; по умолчанию полный
/// баннер в debug-сборке и компактный в release.
pub fn print_banner(info: &BannerInfo<'_>) {
    let full = match env::var("SUBPUB_BANNER").ok().as_deref() {
        Some("full") => true,
        Some("compact") => false,
        _ => cfg!(debug_assertions),
    };
    let text = render(info, full);

    if !atty::is(Stream::Stdout) {
        println!("{text}\n");
        return;
    }
    if full {
        for (i, line) in text.lines().enumerate() {
            if i == 1 {
                println!("{}", line.bold().bright_blue());
            } else if line.trim_start().starts_with("Build:") {
                println!("{}", line.dimmed());
            } else {
                println!("{line}");
            }
        }
    } else {
        println!("{}", text.bold().green());
    }
    println!();
}

/// Подставляет значения в шаблон баннера.
pub fn render(
    info: &BannerInfo<'_>,
    full: bool,
) -> String {
    let bits = std::mem::size_of::<usize>() * 8;
    let version = format!("{} ({bits}-bit)", env!("CARGO_PKG_VERSION"));
    let mode = if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    };
    let pid = std::process::id().to_string();

    if !full {
        return ASCII_COMPACT
            .replace("{version}", &version)
            .replace("{mode}", mode)
            .replace("{listen}", info.listen)
            .replace("{pid}", &pid);
    }

    let mut sys = System::new();
    sys.refresh_memory();
    let mem_total_mb = sys.total_memory() as f64 / (1024.0 * 1024.0);
    let (mem_value, mem_unit) = if mem_total_mb >= 1024.0 {
        (mem_total_mb / 1024.0, "GB")
    } else {
        (mem_total_mb, "MB")
    };

    let git = option_env!("GIT_COMMIT").unwrap_or("unknown");
    let build_time_raw = option_env!("BUILD_TIME").unwrap_or("unknown");
    let build_time = DateTime::parse_from_rfc3339(build_time_raw)
        .map(|dt| {
            dt.with_timezone(&Local)
                .format("%d.%m.%Y %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|_| build_time_raw.to_string());

    ASCII_FULL
        .replace("{version}", &version)
        .replace("{mode}", mode)
        .replace("{listen}", info.listen)
        .replace("{capacity}", &info.queue_capacity.to_string())
        .replace("{max_conn}", &info.max_connections.to_string())
        .replace("{pid}", &pid)
        .replace(
            "{host}",
            &System::host_name().unwrap_or_else(|| "unknown".into()),
        )
        .replace("{os}", env::consts::OS)
        .replace("{arch}", env::consts::ARCH)
        .replace("{cpus}", &num_cpus::get().to_string())
        .replace("{mem_value}", &format!("{mem_value:.1}"))
        .replace("{mem_unit}", mem_unit)
        .replace("{git}", git)
        .replace("{build_time}", &build_time)
}

/// Лог запуска сервера с точностью до миллисекунд
pub fn print_startup_log() {
    let pid = std::process::id();
    let ts = Local::now().format("%d %b %Y %H:%M:%S%.3f");

    if atty::is(Stream::Stdout) {
        println!(
            "[{}] {} {}",
            pid.to_string().red(),
            ts.to_string().white(),
            "* Ready to accept connections".green()
        );
    } else {
        println!("[{pid}] {ts} * Ready to accept connections");
    }
}
