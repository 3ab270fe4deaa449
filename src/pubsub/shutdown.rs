use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::Notify;

/// Процессный сигнал остановки.
///
/// Устанавливается один раз и больше не сбрасывается; будит всех ожидающих.
/// Клон разделяет состояние с оригиналом.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    triggered: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Взводит сигнал. Возвращает `true` только для первого вызова.
    pub fn trigger(&self) -> bool {
        let first = !self.inner.triggered.swap(true, Ordering::AcqRel);
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Acquire)
    }

    /// Ожидает срабатывания сигнала. Немедленно завершается, если сигнал уже
    /// взведён.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Регистрируемся до проверки флага, иначе можно пропустить
            // notify_waiters между load и await.
            notified.as_mut().enable();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}
