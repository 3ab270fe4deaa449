use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use bytes::Bytes;
use subpub_error::StatusCode;
use tokio::{
    io::AsyncWriteExt,
    net::{TcpListener, TcpStream},
    select,
};
use tracing::{debug, error, info, warn};

use super::{connection::ConnectionManager, zsp::ZSPEncoder, zsp::ZSPFrame};
use crate::pubsub::Bus;

/// TCP-сервер ZSP поверх шины.
pub struct Server {
    listener: TcpListener,
    bus: Bus<Bytes>,
    manager: Arc<ConnectionManager>,
}

impl Server {
    pub async fn bind(
        addr: &str,
        bus: Bus<Bytes>,
        manager: Arc<ConnectionManager>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        Ok(Self::from_listener(listener, bus, manager))
    }

    pub fn from_listener(
        listener: TcpListener,
        bus: Bus<Bytes>,
        manager: Arc<ConnectionManager>,
    ) -> Self {
        Self {
            listener,
            bus,
            manager,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read listener address")
    }

    /// Принимает соединения, пока не сработает сигнал остановки.
    ///
    /// Уже принятые соединения продолжают работу; дождаться их можно через
    /// [`ConnectionManager::wait_for_shutdown`].
    pub async fn run(self) -> Result<()> {
        let shutdown = self.manager.shutdown_signal().clone();
        info!(addr = %self.local_addr()?, "Server accepting connections");

        loop {
            let (socket, addr) = select! {
                biased;
                _ = shutdown.wait() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        // Ошибки accept (EMFILE и т.п.) не должны ронять сервер.
                        warn!(error = %e, "Failed to accept connection");
                        continue;
                    }
                },
            };

            let Some(permit) = self.manager.try_reserve() else {
                warn!(%addr, "Connection limit reached, rejecting client");
                tokio::spawn(reject(socket));
                continue;
            };

            let manager = Arc::clone(&self.manager);
            let bus = self.bus.clone();
            tokio::spawn(async move {
                if let Err(e) = manager.handle_connection(socket, addr, bus, permit).await {
                    error!(%addr, error = %e, "Connection handler failed");
                }
            });
        }

        info!("Server stopped accepting connections");
        Ok(())
    }
}

async fn reject(mut socket: TcpStream) {
    let frame = ZSPFrame::error(format!(
        "{} too many connections",
        StatusCode::TooManyConnections.wire_prefix()
    ));
    if let Ok(bytes) = ZSPEncoder::encode(&frame) {
        if let Err(e) = socket.write_all(&bytes).await {
            debug!(error = %e, "Failed to notify rejected client");
        }
    }
    let _ = socket.shutdown().await;
}
