use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Счётчики шины. Обновляются без блокировок, читаются снимком.
#[derive(Debug, Default)]
pub struct BusStats {
    published: AtomicU64,
    enqueued: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
}

/// Снимок [`BusStats`] на момент вызова.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Успешные вызовы `publish`.
    pub published: u64,
    /// Сообщения, поставленные в очереди подписчиков.
    pub enqueued: u64,
    /// Сообщения, отброшенные из-за переполнения или закрытой очереди.
    pub dropped: u64,
    /// Завершённые вызовы обработчиков.
    pub delivered: u64,
}

impl BusStats {
    pub fn record_publish(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Пары имя/значение в стабильном порядке (для ответа `STATS`).
    pub fn fields(&self) -> [(&'static str, u64); 4] {
        [
            ("published", self.published),
            ("enqueued", self.enqueued),
            ("dropped", self.dropped),
            ("delivered", self.delivered),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = BusStats::default();
        stats.record_publish();
        stats.record_enqueued();
        stats.record_enqueued();
        stats.record_dropped();
        stats.record_delivered();

        let snap = stats.snapshot();
        assert_eq!(
            snap,
            StatsSnapshot {
                published: 1,
                enqueued: 2,
                dropped: 1,
                delivered: 1,
            }
        );
        assert_eq!(snap.fields()[1], ("enqueued", 2));
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_string(&StatsSnapshot::default()).unwrap();
        assert_eq!(
            json,
            r#"{"published":0,"enqueued":0,"dropped":0,"delivered":0}"#
        );
    }
}
