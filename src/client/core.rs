use std::{net::SocketAddr, time::Duration};

use bytes::Bytes;
use subpub_error::{ClientError, ClientResult};
use tracing::{debug, info};

use crate::{
    client::ClientConnection,
    network::{protocol::Command, zsp::ZSPFrame},
    pubsub::StatsSnapshot,
};

/// Конфигурация клиента.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Таймаут подключения
    pub connect_timeout: Duration,
    /// Таймаут чтения ответа на команду
    pub read_timeout: Duration,
    /// Таймаут записи
    pub write_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(10),
        }
    }
}

/// Сообщение, полученное подпиской.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub payload: Bytes,
}

/// Клиент subpub
///
/// Высокоуровневый интерфейс для взаимодействия с сервером.
pub struct SubPubClient {
    connection: ClientConnection,
}

impl SubPubClient {
    pub async fn connect(
        addr: SocketAddr,
        config: ClientConfig,
    ) -> ClientResult<Self> {
        info!("Connecting to subpub server: {addr}");
        let connection = ClientConnection::connect(
            addr,
            config.connect_timeout,
            config.read_timeout,
            config.write_timeout,
        )
        .await?;
        Ok(Self { connection })
    }

    /// Проверка соединения (PING).
    pub async fn ping(&mut self) -> ClientResult<()> {
        debug!("PING");
        match self.connection.request(&Command::Ping.to_frame()).await? {
            ZSPFrame::SimpleString(s) if s == "PONG" => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn publish(
        &mut self,
        subject: &str,
        payload: impl Into<Bytes>,
    ) -> ClientResult<()> {
        debug!("PUBLISH {subject}");
        let command = Command::Publish {
            subject: subject.to_string(),
            payload: payload.into(),
        };
        expect_ok(self.connection.request(&command.to_frame()).await?)
    }

    pub async fn stats(&mut self) -> ClientResult<StatsSnapshot> {
        let frame = self.connection.request(&Command::Stats.to_frame()).await?;
        let ZSPFrame::Array(Some(items)) = frame else {
            return Err(unexpected(frame));
        };

        let mut snapshot = StatsSnapshot::default();
        for pair in items.chunks(2) {
            let [name, ZSPFrame::Integer(value)] = pair else {
                return Err(ClientError::UnexpectedResponse);
            };
            let value = u64::try_from(*value).map_err(|_| ClientError::UnexpectedResponse)?;
            match name.as_bytes() {
                Some(b"published") => snapshot.published = value,
                Some(b"enqueued") => snapshot.enqueued = value,
                Some(b"dropped") => snapshot.dropped = value,
                Some(b"delivered") => snapshot.delivered = value,
                // Неизвестные счётчики от более новых серверов пропускаем.
                _ => {}
            }
        }
        Ok(snapshot)
    }

    /// Переводит соединение в режим подписки на `subject`.
    pub async fn subscribe(
        mut self,
        subject: &str,
    ) -> ClientResult<ClientSubscription> {
        debug!("SUBSCRIBE {subject}");
        let command = Command::Subscribe {
            subject: subject.to_string(),
        };
        expect_ok(self.connection.request(&command.to_frame()).await?)?;
        Ok(ClientSubscription {
            client: self,
            subject: subject.to_string(),
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.connection.server_addr()
    }

    pub async fn close(mut self) -> ClientResult<()> {
        info!("Closing connection to server");
        // Ответ на QUIT не обязателен: сервер закрывает сокет сразу после него.
        self.connection.send_frame(&Command::Quit.to_frame()).await?;
        let _ = self.connection.read_frame().await;
        self.connection.close().await
    }
}

/// Соединение в режиме подписки.
pub struct ClientSubscription {
    client: SubPubClient,
    subject: String,
}

impl ClientSubscription {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Ждёт следующее сообщение без ограничения по времени.
    ///
    /// `Ok(None)`: сервер закрыл соединение.
    pub async fn next_message(&mut self) -> ClientResult<Option<Message>> {
        self.next_message_within(None).await
    }

    pub async fn next_message_within(
        &mut self,
        limit: Option<Duration>,
    ) -> ClientResult<Option<Message>> {
        match self.client.connection.read_frame_within(limit).await? {
            Some(frame) => parse_message(frame).map(Some),
            None => Ok(None),
        }
    }

    /// Выходит из режима подписки и возвращает обычный клиент.
    ///
    /// Сообщения, пришедшие до подтверждения, отбрасываются.
    pub async fn unsubscribe(mut self) -> ClientResult<SubPubClient> {
        let connection = &mut self.client.connection;
        connection
            .send_frame(&Command::Unsubscribe.to_frame())
            .await?;
        loop {
            let frame = connection
                .read_frame()
                .await?
                .ok_or(ClientError::ConnectionClosed)?;
            if is_message(&frame) {
                continue;
            }
            expect_ok(frame)?;
            return Ok(self.client);
        }
    }
}

fn is_message(frame: &ZSPFrame) -> bool {
    matches!(frame, ZSPFrame::Array(Some(items)) if items.first().is_some_and(is_push_tag))
}

fn parse_message(frame: ZSPFrame) -> ClientResult<Message> {
    match frame {
        ZSPFrame::Array(Some(items)) if items.len() == 3 && is_push_tag(&items[0]) => {
            let mut it = items.into_iter().skip(1);
            let subject = it
                .next()
                .and_then(|f| f.as_bytes().map(|b| String::from_utf8_lossy(b).into_owned()))
                .ok_or(ClientError::UnexpectedResponse)?;
            let payload = match it.next() {
                Some(ZSPFrame::BulkString(Some(b))) => Bytes::from(b),
                _ => return Err(ClientError::UnexpectedResponse),
            };
            Ok(Message { subject, payload })
        }
        other => Err(unexpected(other)),
    }
}

fn is_push_tag(frame: &ZSPFrame) -> bool {
    frame.as_bytes() == Some(&b"message"[..])
}

fn expect_ok(frame: ZSPFrame) -> ClientResult<()> {
    match frame {
        ZSPFrame::SimpleString(s) if s == "OK" => Ok(()),
        other => Err(unexpected(other)),
    }
}

/// Error-фрейм превращается в ошибку сервера, всё остальное в
/// `UnexpectedResponse`.
fn unexpected(frame: ZSPFrame) -> ClientError {
    match frame {
        ZSPFrame::Error(body) => ClientError::from_server_message(&body),
        _ => ClientError::UnexpectedResponse,
    }
}
