//! Integration tests for the EventBus.
//!
//! Verifies routing by discriminator with live handlers on a multi-thread
//! runtime, and that bus handlers share the isolation and cancellation
//! guarantees of plain signals.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use beacon_signal::{BusEvent, EventBus, Scope};
use tokio::time::{sleep, timeout};

// ============================================================================
// Test Event Types
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum AppEvent {
    Clicked { x: i32, y: i32 },
    KeyPressed(char),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AppEventKind {
    Clicked,
    KeyPressed,
    Closed,
}

impl BusEvent for AppEvent {
    type Kind = AppEventKind;

    fn kind(&self) -> AppEventKind {
        match self {
            AppEvent::Clicked { .. } => AppEventKind::Clicked,
            AppEvent::KeyPressed(_) => AppEventKind::KeyPressed,
            AppEvent::Closed => AppEventKind::Closed,
        }
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

type Recorded = Arc<Mutex<Vec<AppEvent>>>;

fn recorder(recorded: &Recorded) -> impl FnMut(AppEvent) -> std::future::Ready<()> + Send + 'static {
    let recorded = Arc::clone(recorded);
    move |event| {
        recorded.lock().unwrap().push(event);
        std::future::ready(())
    }
}

async fn wait_for_len(recorded: &Recorded, expected: usize) {
    timeout(Duration::from_secs(2), async {
        while recorded.lock().unwrap().len() < expected {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("expected {expected} events"));
}

// ============================================================================
// Routing Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_handlers_only_see_their_kind() {
    let bus = EventBus::<AppEvent>::new();
    let clicks: Recorded = Arc::default();
    let keys: Recorded = Arc::default();

    let _clicks = bus.on(AppEventKind::Clicked, recorder(&clicks)).unwrap();
    let _keys = bus.on(AppEventKind::KeyPressed, recorder(&keys)).unwrap();

    bus.publish(AppEvent::Clicked { x: 1, y: 2 }).await;
    bus.publish(AppEvent::KeyPressed('q')).await;
    bus.publish(AppEvent::Clicked { x: 3, y: 4 }).await;
    // No handler for Closed; silently discarded
    assert_eq!(bus.publish(AppEvent::Closed).await, 0);

    wait_for_len(&clicks, 2).await;
    wait_for_len(&keys, 1).await;
    sleep(Duration::from_millis(50)).await;

    assert_eq!(
        *clicks.lock().unwrap(),
        vec![
            AppEvent::Clicked { x: 1, y: 2 },
            AppEvent::Clicked { x: 3, y: 4 }
        ]
    );
    assert_eq!(*keys.lock().unwrap(), vec![AppEvent::KeyPressed('q')]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_on_any_receives_all_kinds_in_order() {
    let bus = EventBus::<AppEvent>::new();
    let all: Recorded = Arc::default();
    let _all = bus.on_any(recorder(&all)).unwrap();

    let events = vec![
        AppEvent::KeyPressed('a'),
        AppEvent::Clicked { x: 0, y: 0 },
        AppEvent::Closed,
    ];
    for event in events.clone() {
        assert_eq!(bus.publish(event).await, 1);
    }

    wait_for_len(&all, 3).await;
    assert_eq!(*all.lock().unwrap(), events);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_handler_is_removed() {
    let bus = EventBus::<AppEvent>::new();
    let closed: Recorded = Arc::default();

    let connection = bus.on(AppEventKind::Closed, recorder(&closed)).unwrap();
    assert_eq!(bus.handler_count(AppEventKind::Closed), 1);

    connection.cancel();
    timeout(Duration::from_secs(2), async {
        while bus.handler_count(AppEventKind::Closed) > 0 {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("cancelled handler should detach");

    assert_eq!(bus.publish(AppEvent::Closed).await, 0);
    assert!(closed.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scoped_handlers_share_lifetime() {
    let bus = EventBus::<AppEvent>::new();
    let scope = Scope::current().unwrap();
    let keys: Recorded = Arc::default();

    let first = bus.on_in(&scope, AppEventKind::KeyPressed, recorder(&keys));
    let second = bus.on_in(&scope, AppEventKind::KeyPressed, recorder(&keys));
    assert_eq!(bus.handler_count(AppEventKind::KeyPressed), 2);

    assert_eq!(bus.publish(AppEvent::KeyPressed('x')).await, 2);
    wait_for_len(&keys, 2).await;

    scope.cancel();
    assert!(!first.is_active());
    assert!(!second.is_active());
    assert!(first.join().await.is_ok());
    assert!(second.join().await.is_ok());
    assert_eq!(bus.handler_count(AppEventKind::KeyPressed), 0);
}
