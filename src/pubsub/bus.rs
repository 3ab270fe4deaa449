use std::{
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::RwLock;
use serde::Deserialize;
use subpub_error::{BusError, BusResult};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::{
    dispatcher,
    registry::{Entry, Registry},
    subscription::SubscriptionState,
    BusStats, Handler, StatsSnapshot, Subscription, SubscriptionId,
};

/// Ёмкость очереди подписчика по умолчанию.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Параметры шины.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Ёмкость очереди каждого подписчика (минимум 1).
    pub queue_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Внутрипроцессная шина publish/subscribe.
///
/// Каждая подписка получает собственную ограниченную очередь и собственную
/// задачу-диспетчер. `publish` никогда не блокируется: при переполнении
/// сообщение теряется только для переполненного подписчика.
///
/// Клонирование дешёвое, все клоны работают с одной шиной.
pub struct Bus<T> {
    inner: Arc<BusInner<T>>,
}

pub(crate) struct BusInner<T> {
    registry: RwLock<Registry<T>>,
    tracker: TaskTracker,
    stats: Arc<BusStats>,
    capacity: usize,
    next_id: AtomicU64,
}

impl<T> Clone for Bus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> Default for Bus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + 'static> Bus<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Шина с заданной ёмкостью очереди; `0` приводится к `1`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BusInner {
                registry: RwLock::new(Registry::new()),
                tracker: TaskTracker::new(),
                stats: Arc::new(BusStats::default()),
                capacity: capacity.max(1),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn from_config(config: &BusConfig) -> Self {
        Self::with_capacity(config.queue_capacity)
    }

    /// Регистрирует `handler` на `subject` и запускает его диспетчер.
    ///
    /// Шина не проверяет `subject`: пустая строка является обычным ключом.
    /// Пустые субъекты отклоняет сетевой протокол (`ParseError::EmptySubject`).
    ///
    /// Должна вызываться внутри Tokio runtime.
    ///
    /// # Errors
    /// [`BusError::Closed`], если шина уже закрыта.
    pub fn subscribe<H>(
        &self,
        subject: &str,
        handler: H,
    ) -> BusResult<Subscription<T>>
    where
        H: Handler<T>,
    {
        let inner = &self.inner;
        let (tx, rx) = mpsc::channel(inner.capacity);
        let state = Arc::new(SubscriptionState::new());

        // Проверка closed, вставка и запуск диспетчера под одной
        // эксклюзивной блокировкой: close не может проскочить между ними.
        let (id, key) = {
            let mut registry = inner.registry.write();
            if registry.is_closed() {
                return Err(BusError::Closed);
            }
            let id = SubscriptionId(inner.next_id.fetch_add(1, Ordering::Relaxed));
            let key = registry.intern(subject);
            registry.insert(
                Arc::clone(&key),
                Entry {
                    id,
                    sender: tx,
                    state: Arc::clone(&state),
                },
            );
            inner.tracker.spawn(dispatcher::run(
                id,
                Arc::clone(&key),
                rx,
                handler,
                Arc::clone(&state),
                Arc::clone(&inner.stats),
            ));
            (id, key)
        };

        debug!(subscription = %id, subject = %key, "subscribed");
        Ok(Subscription::new(id, key, state, Arc::downgrade(inner)))
    }

    /// Рассылает `payload` всем подписчикам `subject` в порядке регистрации.
    ///
    /// Публикация в субъект без подписчиков успешна и ничего не делает.
    /// Переполненная очередь теряет сообщение только для своего подписчика.
    ///
    /// # Errors
    /// [`BusError::Closed`], если шина закрыта.
    pub fn publish(
        &self,
        subject: &str,
        payload: T,
    ) -> BusResult<()> {
        let registry = self.inner.registry.read();
        if registry.is_closed() {
            return Err(BusError::Closed);
        }
        let stats = &self.inner.stats;
        stats.record_publish();

        for entry in registry.subscribers(subject) {
            match entry.sender.try_send(payload.clone()) {
                Ok(()) => stats.record_enqueued(),
                Err(TrySendError::Full(_)) => {
                    entry.state.record_dropped();
                    stats.record_dropped();
                    warn!(
                        subscription = %entry.id,
                        subject,
                        capacity = self.inner.capacity,
                        "subscriber queue full, message dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    // Диспетчер уже завершился (паника обработчика).
                    entry.state.record_dropped();
                    stats.record_dropped();
                    debug!(subscription = %entry.id, subject, "subscriber queue closed");
                }
            }
        }
        Ok(())
    }

    /// Закрывает шину и ждёт завершения диспетчеров не дольше `timeout`.
    pub async fn close(
        &self,
        timeout: Duration,
    ) -> BusResult<()> {
        self.close_with(tokio::time::sleep(timeout)).await
    }

    /// Закрывает шину; `deadline` завершившийся раньше диспетчеров означает
    /// превышение срока.
    ///
    /// Повторный вызов сразу возвращает `Ok(())`. Уже поставленные в очереди
    /// сообщения доставляются. При [`BusError::DeadlineExceeded`] оставшиеся
    /// диспетчеры продолжают работу в фоне.
    pub async fn close_with<F>(
        &self,
        deadline: F,
    ) -> BusResult<()>
    where
        F: Future<Output = ()>,
    {
        let subscriptions = {
            let mut registry = self.inner.registry.write();
            if registry.is_closed() {
                return Ok(());
            }
            registry.mark_closed();
            let entries = registry.drain_all();
            for entry in &entries {
                entry.state.terminate();
            }
            entries.len()
            // entries и их отправители освобождаются здесь: очереди закрыты.
        };

        let tracker = &self.inner.tracker;
        tracker.close();
        info!(subscriptions, "bus closing, draining dispatchers");

        tokio::select! {
            biased;
            _ = tracker.wait() => {
                info!("bus closed");
                Ok(())
            }
            _ = deadline => {
                let pending = tracker.len();
                warn!(pending, "bus close deadline exceeded");
                Err(BusError::DeadlineExceeded { pending })
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.registry.read().is_closed()
    }

    /// Ёмкость очереди каждого подписчика.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn subscriber_count(
        &self,
        subject: &str,
    ) -> usize {
        self.inner.registry.read().subscribers(subject).len()
    }

    /// Количество субъектов, у которых есть хотя бы один подписчик.
    pub fn subject_count(&self) -> usize {
        self.inner.registry.read().subject_count()
    }

    /// Число ещё работающих диспетчеров.
    pub fn active_dispatchers(&self) -> usize {
        self.inner.tracker.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }
}

impl<T: Clone + Send + 'static> BusInner<T> {
    pub(crate) fn unsubscribe(
        &self,
        subject: &str,
        id: SubscriptionId,
        state: &SubscriptionState,
    ) {
        let removed = {
            let mut registry = self.registry.write();
            // Запись удаляет только первый терминатор; если им был `close`,
            // реестр уже разобран.
            let first = state.terminate();
            if first {
                // Удалённая запись уносит единственный Sender: очередь закрывается.
                registry.remove(subject, id);
            }
            // Отмена на каждом пути: после `close` диспетчер ещё дренирует очередь.
            state.cancel();
            first
        };
        if removed {
            debug!(subscription = %id, subject, "unsubscribed");
        }
    }
}
