use std::{net::SocketAddr, time::Duration};

use bytes::BytesMut;
use subpub_error::{ClientError, ClientResult};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, BufWriter},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    time::timeout,
};
use tracing::{debug, trace};

use crate::network::zsp::{ZSPDecoder, ZSPEncoder, ZSPFrame};

/// Клиентское соединение с сервером subpub
///
/// Управляет TCP соединением и обменом ZSP фреймами.
pub struct ClientConnection {
    /// Адрес сервера
    addr: SocketAddr,
    reader: OwnedReadHalf,
    /// Пишущая часть соединения с буферизацией
    writer: BufWriter<OwnedWriteHalf>,
    /// Байты, прочитанные, но ещё не декодированные
    read_buf: BytesMut,
    decoder: ZSPDecoder,
    read_timeout: Duration,
    write_timeout: Duration,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ClientConnection {
    /// Создаёт новое соединение с сервером.
    pub async fn connect(
        addr: SocketAddr,
        connect_timeout: Duration,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> ClientResult<Self> {
        debug!("Connecting to {addr}");

        let stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::ConnectionTimeout)?
            .map_err(|e| ClientError::ConnectionFailed {
                address: addr.to_string(),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true)?;
        debug!("Connection established with {addr}");

        let (reader, writer) = stream.into_split();
        Ok(Self {
            addr,
            reader,
            writer: BufWriter::new(writer),
            read_buf: BytesMut::with_capacity(8192),
            decoder: ZSPDecoder::new(),
            read_timeout,
            write_timeout,
        })
    }

    /// Кодирует и отправляет фрейм.
    pub async fn send_frame(
        &mut self,
        frame: &ZSPFrame,
    ) -> ClientResult<()> {
        trace!("Sending frame: {frame:?}");
        let encoded = ZSPEncoder::encode(frame)?;

        timeout(self.write_timeout, async {
            self.writer.write_all(&encoded).await?;
            self.writer.flush().await
        })
        .await
        .map_err(|_| ClientError::WriteTimeout)??;
        Ok(())
    }

    /// Читает следующий фрейм с таймаутом чтения из конфигурации.
    pub async fn read_frame(&mut self) -> ClientResult<Option<ZSPFrame>> {
        let limit = self.read_timeout;
        self.read_frame_within(Some(limit)).await
    }

    /// Читает следующий фрейм; `None` в `limit` означает ждать без ограничения.
    ///
    /// `Ok(None)`: сервер закрыл соединение на границе фрейма.
    pub async fn read_frame_within(
        &mut self,
        limit: Option<Duration>,
    ) -> ClientResult<Option<ZSPFrame>> {
        loop {
            if let Some(frame) = self.decoder.decode(&mut self.read_buf)? {
                trace!("Frame received: {frame:?}");
                return Ok(Some(frame));
            }

            let read = self.reader.read_buf(&mut self.read_buf);
            let n = match limit {
                Some(limit) => timeout(limit, read)
                    .await
                    .map_err(|_| ClientError::ReadTimeout)??,
                None => read.await?,
            };

            if n == 0 {
                return if self.read_buf.is_empty() {
                    Ok(None)
                } else {
                    Err(ClientError::ConnectionClosed)
                };
            }
        }
    }

    /// Отправляет фрейм и ждёт ответа. Закрытое соединение считается ошибкой.
    pub async fn request(
        &mut self,
        frame: &ZSPFrame,
    ) -> ClientResult<ZSPFrame> {
        self.send_frame(frame).await?;
        self.read_frame().await?.ok_or(ClientError::ConnectionClosed)
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn close(mut self) -> ClientResult<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
