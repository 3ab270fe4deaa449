use std::{future::Future, marker::PhantomData, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

use super::ShutdownSignal;

/// Способ доставки сообщения подписчику.
///
/// Диспетчер подписки вызывает `deliver` строго последовательно: следующее
/// сообщение не извлекается из очереди, пока не завершился предыдущий вызов.
/// Медленный обработчик задерживает только свою подписку.
#[async_trait]
pub trait Handler<T: Send + 'static>: Send + Sync + 'static {
    async fn deliver(
        &self,
        payload: T,
    );
}

#[async_trait]
impl<T, H> Handler<T> for Arc<H>
where
    T: Send + 'static,
    H: Handler<T> + ?Sized,
{
    async fn deliver(
        &self,
        payload: T,
    ) {
        (**self).deliver(payload).await
    }
}

////////////////////////////////////////////////////////////////////////////////
// StreamForwarder
////////////////////////////////////////////////////////////////////////////////

/// Пересылает сообщения в исходящий поток соединения.
///
/// Прекращает пересылку, как только отменён контекст соединения или сработал
/// процессный [`ShutdownSignal`]. Ожидание места в потоке также прерывается
/// любым из этих событий.
pub struct StreamForwarder<T> {
    tx: mpsc::Sender<T>,
    shutdown: ShutdownSignal,
    cancel: CancellationToken,
}

impl<T> StreamForwarder<T> {
    pub fn new(
        tx: mpsc::Sender<T>,
        shutdown: ShutdownSignal,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            tx,
            shutdown,
            cancel,
        }
    }

    /// Токен контекста, которым управляет владелец потока.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.shutdown.is_triggered()
    }
}

#[async_trait]
impl<T: Send + 'static> Handler<T> for StreamForwarder<T> {
    async fn deliver(
        &self,
        payload: T,
    ) {
        if self.is_stopped() {
            return;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            _ = self.shutdown.wait() => {}
            res = self.tx.send(payload) => {
                // Получатель ушёл: поток больше некому читать.
                if res.is_err() {
                    self.cancel.cancel();
                }
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Recorder
////////////////////////////////////////////////////////////////////////////////

/// Запоминает все доставленные сообщения. Клоны разделяют один журнал.
///
/// Используется в тестах и для диагностики. Необязательная задержка перед
/// записью имитирует медленного подписчика.
pub struct Recorder<T> {
    inner: Arc<RecorderInner<T>>,
}

struct RecorderInner<T> {
    items: Mutex<Vec<T>>,
    notify: Notify,
    delay: Option<Duration>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Recorder<T> {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Рекордер, который «спит» `delay` перед каждой записью.
    pub fn with_delay(delay: Duration) -> Self {
        Self::build(Some(delay))
    }

    fn build(delay: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(RecorderInner {
                items: Mutex::new(Vec::new()),
                notify: Notify::new(),
                delay,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ждёт, пока не будет записано хотя бы `n` сообщений.
    ///
    /// Возвращает `false`, если за `timeout` нужное число не набралось.
    pub async fn wait_for(
        &self,
        n: usize,
        timeout: Duration,
    ) -> bool {
        let wait = async {
            loop {
                let notified = self.inner.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.len() >= n {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

impl<T: Clone> Recorder<T> {
    /// Копия журнала в порядке доставки.
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.items.lock().clone()
    }
}

#[async_trait]
impl<T: Send + 'static> Handler<T> for Recorder<T> {
    async fn deliver(
        &self,
        payload: T,
    ) {
        if let Some(delay) = self.inner.delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.items.lock().push(payload);
        self.inner.notify.notify_waiters();
    }
}

////////////////////////////////////////////////////////////////////////////////
// Noop / FnHandler
////////////////////////////////////////////////////////////////////////////////

/// Принимает и игнорирует сообщения.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

#[async_trait]
impl<T: Send + 'static> Handler<T> for Noop {
    async fn deliver(
        &self,
        _payload: T,
    ) {
    }
}

/// Адаптер произвольной async-функции к [`Handler`].
pub struct FnHandler<F, T> {
    f: F,
    _payload: PhantomData<fn(T)>,
}

/// Оборачивает `f` в обработчик: `handler_fn(|msg| async move { ... })`.
pub fn handler_fn<F, Fut, T>(f: F) -> FnHandler<F, T>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    FnHandler {
        f,
        _payload: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, T> Handler<T> for FnHandler<F, T>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn deliver(
        &self,
        payload: T,
    ) {
        (self.f)(payload).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_recorder_keeps_order() {
        let rec = Recorder::new();
        rec.deliver(1).await;
        rec.deliver(2).await;
        rec.clone().deliver(3).await;
        assert_eq!(rec.snapshot(), vec![1, 2, 3]);
        assert!(rec.wait_for(3, Duration::from_millis(10)).await);
        assert!(!rec.wait_for(4, Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_forwarder_sends_until_cancelled() {
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let fwd = StreamForwarder::new(tx, ShutdownSignal::new(), cancel.clone());

        fwd.deliver("a").await;
        assert_eq!(rx.recv().await, Some("a"));

        cancel.cancel();
        fwd.deliver("b").await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_forwarder_stops_on_shutdown() {
        let (tx, mut rx) = mpsc::channel(1);
        let shutdown = ShutdownSignal::new();
        let fwd = StreamForwarder::new(tx, shutdown.clone(), CancellationToken::new());

        fwd.deliver(1).await;
        // Поток заполнен: deliver ждёт места, пока не сработает сигнал.
        let blocked = tokio::spawn(async move { fwd.deliver(2).await });
        tokio::task::yield_now().await;
        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), blocked)
            .await
            .expect("forwarder must unblock on shutdown")
            .unwrap();
        assert_eq!(rx.recv().await, Some(1));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_forwarder_cancels_when_receiver_gone() {
        let (tx, rx) = mpsc::channel::<u8>(1);
        drop(rx);
        let fwd = StreamForwarder::new(tx, ShutdownSignal::new(), CancellationToken::new());
        fwd.deliver(7).await;
        assert!(fwd.cancellation().is_cancelled());
    }

    #[tokio::test]
    async fn test_handler_fn_and_noop() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let h = handler_fn(move |n: usize| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(n, Ordering::SeqCst);
            }
        });
        h.deliver(2).await;
        h.deliver(3).await;
        assert_eq!(hits.load(Ordering::SeqCst), 5);

        Handler::<usize>::deliver(&Noop, 1).await;
    }
}
