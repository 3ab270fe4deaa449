use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use bytes::Bytes;
use subpub::{
    handler_fn,
    pubsub::{Noop, Recorder},
    Bus, BusError, ShutdownSignal, StreamForwarder,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(2);

/// Тест проверяет базовый сценарий: два подписчика на один субъект, первый
/// отписывается, второе сообщение получает только второй.
#[tokio::test]
async fn test_two_subscribers_then_unsubscribe_first() {
    let bus: Bus<&'static str> = Bus::new();
    let s1 = Recorder::new();
    let s2 = Recorder::new();

    let sub1 = bus.subscribe("x", s1.clone()).unwrap();
    let _sub2 = bus.subscribe("x", s2.clone()).unwrap();

    bus.publish("x", "hello").unwrap();
    assert!(s1.wait_for(1, WAIT).await);
    assert!(s2.wait_for(1, WAIT).await);

    sub1.unsubscribe();
    assert!(!sub1.is_active());
    bus.publish("x", "world").unwrap();
    assert!(s2.wait_for(2, WAIT).await);

    bus.close(WAIT).await.unwrap();
    assert_eq!(s1.snapshot(), vec!["hello"]);
    assert_eq!(s2.snapshot(), vec!["hello", "world"]);
}

/// Медленный подписчик теряет сообщения, быстрый на том же субъекте получает
/// все 105 по порядку.
#[tokio::test(flavor = "current_thread")]
async fn test_slow_subscriber_does_not_affect_fast_one() {
    let bus: Bus<u32> = Bus::with_capacity(100);
    let slow = Recorder::with_delay(Duration::from_secs(60));
    let fast = Recorder::new();

    let slow_sub = bus.subscribe("ticks", slow.clone()).unwrap();
    let fast_sub = bus.subscribe("ticks", fast.clone()).unwrap();

    for i in 0..105 {
        bus.publish("ticks", i).unwrap();
        // Даём диспетчерам поработать между публикациями.
        tokio::task::yield_now().await;
    }

    assert!(fast.wait_for(105, WAIT).await);
    assert_eq!(fast.snapshot(), (0..105).collect::<Vec<_>>());
    assert_eq!(fast_sub.dropped_count(), 0);

    assert!(slow.len() < 105);
    assert!(slow_sub.dropped_count() >= 1);
    assert_eq!(bus.stats().dropped, slow_sub.dropped_count());
}

/// Публикации из нескольких задач: каждое сообщение доставлено ровно один раз.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_publishers() {
    let bus: Bus<usize> = Bus::with_capacity(1000);
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let _sub = bus
        .subscribe(
            "events",
            handler_fn(move |_n: usize| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            }),
        )
        .unwrap();

    let mut tasks = Vec::new();
    for t in 0..4 {
        let bus = bus.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..100 {
                bus.publish("events", t * 100 + i).unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    bus.close(WAIT).await.unwrap();
    assert_eq!(seen.load(Ordering::Relaxed), 400);
    let stats = bus.stats();
    assert_eq!(stats.published, 400);
    assert_eq!(stats.enqueued, 400);
    assert_eq!(stats.delivered, 400);
}

/// Подписка через `StreamForwarder`: сообщения появляются в канале, а сигнал
/// остановки прекращает пересылку.
#[tokio::test]
async fn test_stream_forwarder_stops_on_shutdown() {
    let bus: Bus<Bytes> = Bus::new();
    let shutdown = ShutdownSignal::new();
    let (tx, mut rx) = mpsc::channel(8);
    let forwarder = StreamForwarder::new(tx, shutdown.clone(), CancellationToken::new());
    let _sub = bus.subscribe("x", forwarder).unwrap();

    bus.publish("x", Bytes::from_static(b"one")).unwrap();
    let got = tokio::time::timeout(WAIT, rx.recv()).await.unwrap();
    assert_eq!(got, Some(Bytes::from_static(b"one")));

    shutdown.trigger();
    bus.publish("x", Bytes::from_static(b"two")).unwrap();
    bus.close(WAIT).await.unwrap();

    // После закрытия шины диспетчер завершился, и канал закрыт без "two".
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn test_close_rejects_and_reports_deadline() {
    let bus: Bus<u8> = Bus::new();
    let _stuck = bus
        .subscribe("x", handler_fn(|_: u8| std::future::pending::<()>()))
        .unwrap();
    let _idle = bus.subscribe("y", Noop).unwrap();
    bus.publish("x", 1).unwrap();

    let err = bus.close(Duration::from_millis(50)).await.unwrap_err();
    assert_eq!(err, BusError::DeadlineExceeded { pending: 1 });
    assert!(bus.is_closed());

    assert_eq!(bus.publish("x", 2), Err(BusError::Closed));
    assert!(matches!(bus.subscribe("x", Noop), Err(BusError::Closed)));
    // Повторный close сразу успешен.
    bus.close(Duration::from_millis(1)).await.unwrap();
}
