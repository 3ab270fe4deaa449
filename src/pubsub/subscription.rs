use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Weak,
    },
};

use tokio_util::sync::CancellationToken;

use super::bus::BusInner;

/// Идентификатор подписки, уникальный в пределах одной шины.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Общее состояние подписки: его видят шина, диспетчер и handle.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionState {
    terminated: AtomicBool,
    cancel: CancellationToken,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl SubscriptionState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Одноразовый переход в терминальное состояние.
    ///
    /// `true` получает ровно один вызывающий; остальные видят `false`.
    pub(crate) fn terminate(&self) -> bool {
        !self.terminated.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Handle активной подписки.
///
/// Удаление handle подписку НЕ отменяет: диспетчер продолжает работать до
/// явного [`Subscription::unsubscribe`] или закрытия шины. Клоны ссылаются на
/// одну и ту же подписку.
pub struct Subscription<T> {
    id: SubscriptionId,
    subject: Arc<str>,
    state: Arc<SubscriptionState>,
    bus: Weak<BusInner<T>>,
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            subject: Arc::clone(&self.subject),
            state: Arc::clone(&self.state),
            bus: Weak::clone(&self.bus),
        }
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("subject", &self.subject)
            .field("active", &self.is_active())
            .finish()
    }
}

impl<T> Subscription<T> {
    pub(crate) fn new(
        id: SubscriptionId,
        subject: Arc<str>,
        state: Arc<SubscriptionState>,
        bus: Weak<BusInner<T>>,
    ) -> Self {
        Self {
            id,
            subject,
            state,
            bus,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// `false` после `unsubscribe` или закрытия шины.
    pub fn is_active(&self) -> bool {
        !self.state.is_terminated()
    }

    /// Сколько раз обработчик завершил доставку.
    pub fn delivered_count(&self) -> u64 {
        self.state.delivered()
    }

    /// Сколько сообщений потеряно из-за переполнения очереди.
    pub fn dropped_count(&self) -> u64 {
        self.state.dropped()
    }
}

impl<T: Clone + Send + 'static> Subscription<T> {
    /// Отменяет подписку.
    ///
    /// Идемпотентна и безопасна при гонке с другим `unsubscribe` или
    /// `Bus::close`. После возврата новые вызовы обработчика не начинаются;
    /// уже извлечённое сообщение может доставиться. Если шина уже уничтожена,
    /// только останавливает диспетчер.
    pub fn unsubscribe(&self) {
        match self.bus.upgrade() {
            Some(bus) => bus.unsubscribe(&self.subject, self.id, &self.state),
            None => {
                self.state.terminate();
                self.state.cancel();
            }
        }
    }
}
