use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Result;
use bytes::Bytes;
use tokio::{net::TcpListener, time::Instant};
use tracing::{info, warn};

use crate::{
    config::Settings,
    network::{ConnectionConfig, ConnectionManager, Server},
    pubsub::{Bus, ShutdownSignal},
};

/// Сервис целиком: шина, сигнал остановки и сетевой фронтенд.
pub struct App {
    settings: Settings,
    bus: Bus<Bytes>,
    shutdown: ShutdownSignal,
    manager: Arc<ConnectionManager>,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        let shutdown = ShutdownSignal::new();
        let connection_config = ConnectionConfig {
            max_connections: settings.max_connections,
            ..ConnectionConfig::default()
        };
        Self {
            bus: Bus::from_config(&settings.bus_config()),
            manager: Arc::new(ConnectionManager::new(connection_config, shutdown.clone())),
            shutdown,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn bus(&self) -> &Bus<Bytes> {
        &self.bus
    }

    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Открывает сокет на `settings.listen_addr()`.
    pub async fn bind(&self) -> Result<Server> {
        Server::bind(
            &self.settings.listen_addr(),
            self.bus.clone(),
            Arc::clone(&self.manager),
        )
        .await
    }

    /// Обслуживает уже открытый `listener` до сигнала остановки.
    pub async fn serve(
        &self,
        listener: TcpListener,
    ) -> Result<()> {
        Server::from_listener(listener, self.bus.clone(), Arc::clone(&self.manager))
            .run()
            .await
    }

    /// `bind` + приём соединений до сигнала остановки.
    pub async fn run(&self) -> Result<()> {
        let server = self.bind().await?;
        let addr: SocketAddr = server.local_addr()?;
        info!(%addr, queue_capacity = self.bus.capacity(), "subpub started");
        server.run().await
    }

    /// Останавливает сервис в пределах `deadline`.
    ///
    /// Порядок: сигнал остановки (обработчики прекращают пересылку, сервер
    /// перестаёт принимать клиентов), закрытие шины с дренажом, ожидание
    /// соединений в оставшемся бюджете. Возвращает первую ошибку.
    pub async fn stop(
        &self,
        deadline: Duration,
    ) -> Result<()> {
        let started = Instant::now();
        if self.shutdown.trigger() {
            info!(timeout_ms = deadline.as_millis() as u64, "Shutting down");
        }

        let bus_result = self.bus.close(deadline).await;
        if let Err(e) = &bus_result {
            warn!(error = %e, "Bus did not drain in time");
        }

        let remaining = deadline.saturating_sub(started.elapsed());
        let conn_result = self.manager.wait_for_shutdown(remaining).await;

        bus_result?;
        conn_result?;
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Shutdown complete");
        Ok(())
    }
}
