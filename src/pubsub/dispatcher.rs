use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use super::{subscription::SubscriptionState, BusStats, Handler, SubscriptionId};

/// Рабочий цикл подписки: извлекает сообщения из её очереди и по одному
/// передаёт обработчику.
///
/// Завершается по отмене (unsubscribe) или когда очередь закрыта и пуста
/// (закрытие шины). Паника обработчика завершает только эту задачу.
pub(crate) async fn run<T, H>(
    id: SubscriptionId,
    subject: Arc<str>,
    mut rx: mpsc::Receiver<T>,
    handler: H,
    state: Arc<SubscriptionState>,
    stats: Arc<BusStats>,
) where
    T: Send + 'static,
    H: Handler<T>,
{
    let cancel = state.cancellation().clone();
    loop {
        let payload = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = rx.recv() => match item {
                Some(payload) => payload,
                None => break,
            },
        };
        handler.deliver(payload).await;
        state.record_delivered();
        stats.record_delivered();
    }
    debug!(subscription = %id, subject = %subject, "dispatcher stopped");
}
