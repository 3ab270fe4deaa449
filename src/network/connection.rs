use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use bytes::{Bytes, BytesMut};
use subpub_error::{ErrorExt, LogLevel, StatusCode};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    select,
    sync::{mpsc, Notify, OwnedSemaphorePermit, Semaphore},
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::{
    protocol::{parse_command, Command, Response},
    zsp::{ZSPDecoder, ZSPEncoder, ZSPFrame},
};
use crate::pubsub::{Bus, ShutdownSignal, StreamForwarder, Subscription};

/// Конфигурация для обработки соединений
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Максимальное кол-во одновременных соединений
    pub max_connections: usize,
    /// Таймаут записи ответа
    pub write_timeout: Duration,
    /// Размер буфера для чтения
    pub read_buffer_size: usize,
    /// Ёмкость исходящей очереди push-сообщений подписки
    pub outbound_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_connections: 1024,
            write_timeout: Duration::from_secs(5),
            read_buffer_size: 4096,
            outbound_capacity: 64,
        }
    }
}

/// Менеджер соединений: лимит одновременных клиентов и graceful shutdown.
#[derive(Debug)]
pub struct ConnectionManager {
    config: ConnectionConfig,
    connection_semaphore: Arc<Semaphore>,
    /// Общий счётчик активных соединений
    active_connections: AtomicUsize,
    /// Будит `wait_for_shutdown`, когда закрывается последнее соединение
    drained: Notify,
    shutdown_signal: ShutdownSignal,
    /// Счётчик для генерации ID соединений
    connection_counter: AtomicU64,
}

impl ConnectionManager {
    pub fn new(
        config: ConnectionConfig,
        shutdown_signal: ShutdownSignal,
    ) -> Self {
        Self {
            connection_semaphore: Arc::new(Semaphore::new(config.max_connections.max(1))),
            config,
            active_connections: AtomicUsize::new(0),
            drained: Notify::new(),
            shutdown_signal,
            connection_counter: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown_signal
    }

    /// Получение текущее кол-во активных соединений
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Acquire)
    }

    /// Резервирует слот под новое соединение; `None`, если лимит исчерпан.
    pub fn try_reserve(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.connection_semaphore)
            .try_acquire_owned()
            .ok()
    }

    /// Ждать завершения всех активных соединений
    pub async fn wait_for_shutdown(
        &self,
        timeout_duration: Duration,
    ) -> Result<()> {
        let drained = async {
            loop {
                let notified = self.drained.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.active_connections() == 0 {
                    return;
                }
                notified.await;
            }
        };

        match timeout(timeout_duration, drained).await {
            Ok(()) => {
                info!("All connections closed gracefully");
                Ok(())
            }
            Err(_) => {
                let active = self.active_connections();
                warn!(active, "Shutdown timeout reached with active connections");
                Err(anyhow!(
                    "Shutdown timeout exceeded with {active} active connection(s)"
                ))
            }
        }
    }

    /// Обслуживает соединение до его закрытия. `permit` освобождается в конце.
    pub async fn handle_connection(
        &self,
        socket: TcpStream,
        addr: SocketAddr,
        bus: Bus<Bytes>,
        permit: OwnedSemaphorePermit,
    ) -> Result<()> {
        let connection_count = self.active_connections.fetch_add(1, Ordering::AcqRel) + 1;
        let connection_id = self.connection_counter.fetch_add(1, Ordering::Relaxed) + 1;

        info!(
            connection = connection_id,
            %addr,
            active = connection_count,
            "Connection established"
        );

        let handler = ConnectionHandler::new(
            connection_id,
            socket,
            addr,
            bus,
            self.config.clone(),
            self.shutdown_signal.clone(),
        );
        let result = handler.run().await;

        drop(permit);
        let remaining = self.active_connections.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 {
            self.drained.notify_waiters();
        }

        match &result {
            Ok(()) => debug!(connection = connection_id, %addr, remaining, "Connection closed"),
            Err(e) => warn!(
                connection = connection_id,
                %addr,
                remaining,
                error = %e,
                "Connection closed with error"
            ),
        }
        result
    }
}

/// Обработчик отдельного соединения
struct ConnectionHandler {
    connection_id: u64,
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    addr: SocketAddr,
    bus: Bus<Bytes>,
    config: ConnectionConfig,
    shutdown_signal: ShutdownSignal,
    subscription: Option<ActiveSubscription>,
}

/// Подписка соединения вместе с концом её исходящей очереди.
struct ActiveSubscription {
    handle: Subscription<Bytes>,
    outbound: mpsc::Receiver<Bytes>,
    context: CancellationToken,
}

impl ActiveSubscription {
    fn stop(self) {
        self.context.cancel();
        self.handle.unsubscribe();
    }
}

enum Flow {
    Continue,
    Close,
}

/// Следующее push-сообщение подписки; без подписки никогда не завершается.
async fn next_push(subscription: &mut Option<ActiveSubscription>) -> Option<Bytes> {
    match subscription {
        Some(active) => active.outbound.recv().await,
        None => std::future::pending().await,
    }
}

impl ConnectionHandler {
    fn new(
        connection_id: u64,
        socket: TcpStream,
        addr: SocketAddr,
        bus: Bus<Bytes>,
        config: ConnectionConfig,
        shutdown_signal: ShutdownSignal,
    ) -> Self {
        let (reader, writer) = socket.into_split();
        Self {
            connection_id,
            reader,
            writer,
            addr,
            bus,
            config,
            shutdown_signal,
            subscription: None,
        }
    }

    /// Основной цикл обработки соединения.
    async fn run(mut self) -> Result<()> {
        let result = self.serve().await;
        // Подписка снимается при любом исходе.
        if let Some(active) = self.subscription.take() {
            active.stop();
        }
        let _ = self.writer.shutdown().await;
        result
    }

    async fn serve(&mut self) -> Result<()> {
        let mut decoder = ZSPDecoder::new();
        let mut read_buf = BytesMut::with_capacity(self.config.read_buffer_size);
        let shutdown = self.shutdown_signal.clone();

        loop {
            select! {
                biased;

                _ = shutdown.wait() => {
                    info!(connection = self.connection_id, addr = %self.addr, "Received shutdown signal");
                    let _ = self.write_frame(&ZSPFrame::error("ERR server shutting down")).await;
                    return Ok(());
                }

                push = next_push(&mut self.subscription) => match push {
                    Some(payload) => {
                        let subject = self
                            .subscription
                            .as_ref()
                            .map(|a| a.handle.subject().to_string())
                            .unwrap_or_default();
                        let frame = Response::Message { subject, payload }.into_frame();
                        self.write_frame(&frame).await?;
                    }
                    None => {
                        // Диспетчер завершился (шина закрыта): выходим из режима подписки.
                        debug!(connection = self.connection_id, "Subscription stream ended");
                        if let Some(active) = self.subscription.take() {
                            active.stop();
                        }
                    }
                },

                read = self.reader.read_buf(&mut read_buf) => {
                    let n = read.context("Failed to read from socket")?;
                    if n == 0 {
                        debug!(connection = self.connection_id, addr = %self.addr, "Client closed connection");
                        return Ok(());
                    }
                    if let Flow::Close = self.process_buffer(&mut decoder, &mut read_buf).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Обрабатывает все целые фреймы, накопленные в буфере.
    async fn process_buffer(
        &mut self,
        decoder: &mut ZSPDecoder,
        read_buf: &mut BytesMut,
    ) -> Result<Flow> {
        loop {
            let frame = match decoder.decode(read_buf) {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(Flow::Continue),
                Err(e) => {
                    // После ошибки фрейминга границы следующих фреймов неизвестны.
                    log_request_error(self.connection_id, &e, "Protocol error, closing");
                    self.write_frame(&ZSPFrame::error(e.wire_message())).await?;
                    return Ok(Flow::Close);
                }
            };
            trace!(connection = self.connection_id, ?frame, "Received frame");

            let (response, flow) = match parse_command(frame) {
                Ok(command) => self.execute(command),
                Err(e) => {
                    log_request_error(self.connection_id, &e, "Invalid command");
                    (Response::Error(e.wire_message()), Flow::Continue)
                }
            };
            self.write_frame(&response.into_frame()).await?;
            if let Flow::Close = flow {
                return Ok(Flow::Close);
            }
        }
    }

    fn execute(
        &mut self,
        command: Command,
    ) -> (Response, Flow) {
        let response = match command {
            Command::Ping => Response::Pong,
            Command::Publish { subject, payload } => match self.bus.publish(&subject, payload) {
                Ok(()) => Response::Ok,
                Err(e) => {
                    log_request_error(self.connection_id, &e, "Publish rejected");
                    Response::Error(e.wire_message())
                }
            },
            Command::Subscribe { subject } => self.subscribe(&subject),
            Command::Unsubscribe => {
                if let Some(active) = self.subscription.take() {
                    active.stop();
                }
                Response::Ok
            }
            Command::Stats => Response::Stats(self.bus.stats()),
            Command::Quit => return (Response::Ok, Flow::Close),
        };
        (response, Flow::Continue)
    }

    /// Соединение держит не больше одной подписки: новая заменяет старую.
    fn subscribe(
        &mut self,
        subject: &str,
    ) -> Response {
        if let Some(previous) = self.subscription.take() {
            previous.stop();
        }

        let (tx, outbound) = mpsc::channel(self.config.outbound_capacity.max(1));
        let context = CancellationToken::new();
        let forwarder = StreamForwarder::new(tx, self.shutdown_signal.clone(), context.clone());

        match self.bus.subscribe(subject, forwarder) {
            Ok(handle) => {
                debug!(
                    connection = self.connection_id,
                    subscription = %handle.id(),
                    subject,
                    "Client subscribed"
                );
                self.subscription = Some(ActiveSubscription {
                    handle,
                    outbound,
                    context,
                });
                Response::Ok
            }
            Err(e) => {
                log_request_error(self.connection_id, &e, "Subscribe rejected");
                Response::Error(e.wire_message())
            }
        }
    }

    async fn write_frame(
        &mut self,
        frame: &ZSPFrame,
    ) -> Result<()> {
        let bytes = ZSPEncoder::encode(frame).context("Failed to encode frame")?;
        timeout(self.config.write_timeout, self.writer.write_all(&bytes))
            .await
            .map_err(|_| anyhow!("{}: write timed out", StatusCode::WriteTimeout))?
            .context("Failed to write to socket")
    }
}

/// Пишет ошибку запроса на уровне, который задаёт её статус-код.
fn log_request_error(
    connection: u64,
    err: &dyn ErrorExt,
    what: &'static str,
) {
    let code = err.status_code();
    let detail = err.log_message();
    match code.log_level() {
        LogLevel::Trace => trace!(connection, %code, %detail, "{what}"),
        LogLevel::Debug => debug!(connection, %code, %detail, "{what}"),
        LogLevel::Info => info!(connection, %code, %detail, "{what}"),
        LogLevel::Warn => warn!(connection, %code, %detail, "{what}"),
        LogLevel::Error => error!(connection, %code, %detail, "{what}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use subpub_error::{BusError, ParseError, ZspError};
    use tracing_subscriber::{fmt, prelude::*, registry::Registry};

    use super::*;

    #[derive(Clone)]
    struct VecMakeWriter(Arc<Mutex<Vec<u8>>>);

    impl<'a> fmt::MakeWriter<'a> for VecMakeWriter {
        type Writer = VecWriterGuard;

        fn make_writer(&'a self) -> Self::Writer {
            VecWriterGuard(self.0.clone())
        }
    }

    struct VecWriterGuard(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for VecWriterGuard {
        fn write(
            &mut self,
            buf: &[u8],
        ) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let layer = fmt::layer()
            .with_ansi(false)
            .with_writer(VecMakeWriter(buffer.clone()));
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, f);
        let out = buffer.lock().unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Уровень записи берётся из статус-кода, детали из `log_message`.
    #[test]
    fn test_request_errors_logged_at_status_level() {
        let out = capture(|| {
            log_request_error(7, &ParseError::UnknownCommand("NOPE".into()), "Invalid command")
        });
        assert!(out.contains("INFO"), "got {out}");
        assert!(out.contains("UnknownCommand"), "got {out}");
        assert!(out.contains("connection=7"), "got {out}");

        let out = capture(|| log_request_error(1, &BusError::Closed, "Publish rejected"));
        assert!(out.contains("WARN"), "got {out}");
        assert!(out.contains("Publish rejected"), "got {out}");

        let out = capture(|| {
            log_request_error(
                2,
                &ZspError::BulkTooLong { len: 10, max: 5 },
                "Protocol error, closing",
            )
        });
        assert!(out.contains("WARN") && out.contains("BulkTooLong"), "got {out}");
    }
}
