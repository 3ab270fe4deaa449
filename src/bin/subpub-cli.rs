//! CLI клиент subpub
//!
//! Клиент командной строки: проверка соединения, публикация, подписка и
//! счётчики шины.

use std::{net::SocketAddr, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use subpub::client::{ClientConfig, SubPubClient};
use tracing::debug;

/// Аргументы командной строки
#[derive(Parser)]
#[command(name = "subpub-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "subpub CLI - command line client for the subpub server", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Хост сервера (IP или доменное имя)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "SUBPUB_HOST")]
    host: String,
    /// Порт сервера
    #[arg(short, long, default_value = "5000", env = "SUBPUB_PORT")]
    port: u16,
    /// Таймаут соединения в секундах
    #[arg(long, default_value = "5")]
    timeout: u64,
    /// Таймаут ожидания ответа сервера в секундах
    #[arg(long, default_value = "30")]
    read_timeout: u64,
    /// Включить подробный вывод (debug)
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Проверка соединения с сервером
    Ping {
        /// Количество пингов
        #[arg(short = 'c', long, default_value = "1")]
        count: u32,
        /// Интервал между пингами (мс)
        #[arg(short, long, default_value = "1000")]
        interval: u64,
    },
    /// Опубликовать сообщение
    #[command(alias = "pub")]
    Publish { subject: String, payload: String },
    /// Подписаться и печатать сообщения
    #[command(alias = "sub")]
    Subscribe {
        subject: String,
        /// Выйти после N сообщений
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },
    /// Счётчики шины
    Stats {
        /// Вывод в формате JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .context("Неверный формат адреса сервера")?;
    let config = ClientConfig {
        connect_timeout: Duration::from_secs(cli.timeout),
        read_timeout: Duration::from_secs(cli.read_timeout),
        ..ClientConfig::default()
    };
    debug!(%addr, ?config, "CLI configuration");

    if let Err(e) = run(&cli.command, addr, config).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    command: &Commands,
    addr: SocketAddr,
    config: ClientConfig,
) -> Result<()> {
    let mut client = SubPubClient::connect(addr, config)
        .await
        .context("Не удалось подключиться к серверу")?;

    match command {
        Commands::Ping { count, interval } => {
            for i in 1..=*count {
                let start = std::time::Instant::now();
                client.ping().await?;
                println!("#{i}: PONG time={:.2}ms", start.elapsed().as_secs_f64() * 1000.0);
                if i < *count {
                    tokio::time::sleep(Duration::from_millis(*interval)).await;
                }
            }
            client.close().await?;
        }
        Commands::Publish { subject, payload } => {
            client.publish(subject, payload.clone().into_bytes()).await?;
            println!("OK");
            client.close().await?;
        }
        Commands::Subscribe { subject, count } => {
            let mut subscription = client.subscribe(subject).await?;
            eprintln!("Subscribed to '{subject}', Ctrl-C to exit");
            let mut received = 0u64;
            while count.map_or(true, |limit| received < limit) {
                let next = tokio::select! {
                    msg = subscription.next_message() => msg?,
                    _ = tokio::signal::ctrl_c() => break,
                };
                let Some(msg) = next else {
                    eprintln!("Connection closed by server");
                    break;
                };
                received += 1;
                println!("{}: {}", msg.subject, String::from_utf8_lossy(&msg.payload));
            }
        }
        Commands::Stats { json } => {
            let stats = client.stats().await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                for (name, value) in stats.fields() {
                    println!("{name:<10} {value}");
                }
            }
            client.close().await?;
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    // По умолчанию только ошибки, чтобы не мешать выводу результата.
    let filter = EnvFilter::new(if verbose { "debug" } else { "error" });
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Ошибка инициализации логирования: {e}"))?;
    Ok(())
}
