//! Enum-keyed event bus built on [`Signal`].
//!
//! Events declare their own discriminator through [`BusEvent::kind`]; the bus
//! keeps one signal per kind (created on first use) plus a catch-all signal.
//! There is no global instance: construct an `EventBus` and pass clones to
//! whoever needs it.
//!
//! ```ignore
//! #[derive(Clone)]
//! enum UiEvent { Click { x: i32 }, Key(char) }
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
//! enum UiKind { Click, Key }
//!
//! impl BusEvent for UiEvent {
//!     type Kind = UiKind;
//!     fn kind(&self) -> UiKind {
//!         match self {
//!             UiEvent::Click { .. } => UiKind::Click,
//!             UiEvent::Key(_) => UiKind::Key,
//!         }
//!     }
//! }
//!
//! let bus = EventBus::<UiEvent>::new();
//! let _clicks = bus.on(UiKind::Click, |event| async move { /* ... */ })?;
//! bus.publish(UiEvent::Click { x: 1 }).await;
//! ```

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

use beacon_core::SignalConfig;

use crate::action::ActionOutcome;
use crate::connection::Connection;
use crate::error::SignalResult;
use crate::scope::{Scope, Subscription};
use crate::signal::Signal;

/// An event that can be routed by its discriminator.
pub trait BusEvent: Clone + Send + Sync + 'static {
    /// The enumerated discriminator events are routed by.
    type Kind: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

struct BusInner<E: BusEvent> {
    config: SignalConfig,
    routes: RwLock<HashMap<E::Kind, Signal<E>>>,
    any: Signal<E>,
}

/// Routes events to handlers registered for their kind.
///
/// Cheap to clone; clones share routes and handlers.
pub struct EventBus<E: BusEvent> {
    inner: Arc<BusInner<E>>,
}

impl<E: BusEvent> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes = self
            .inner
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("EventBus")
            .field("routes", &routes)
            .field("catch_all", &self.inner.any.subscriber_count())
            .finish()
    }
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        Self::with_config(SignalConfig::default())
    }

    /// Creates a bus whose per-kind signals all use `config`.
    pub fn with_config(config: SignalConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                config,
                routes: RwLock::new(HashMap::new()),
                any: Signal::with_config(config),
            }),
        }
    }

    /// The signal carrying events of `kind`, created on first use.
    pub fn signal(&self, kind: E::Kind) -> Signal<E> {
        if let Some(signal) = self.route(kind) {
            return signal;
        }

        self.inner
            .routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_insert_with(|| Signal::with_config(self.inner.config))
            .clone()
    }

    /// The catch-all signal that sees every published event.
    pub fn any(&self) -> Signal<E> {
        self.inner.any.clone()
    }

    fn route(&self, kind: E::Kind) -> Option<Signal<E>> {
        self.inner
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
    }

    /// Delivers `event` to handlers of its kind and to catch-all handlers.
    ///
    /// Returns the total number of handlers that accepted it.
    pub async fn publish(&self, event: E) -> usize {
        let kind = event.kind();
        let mut delivered = 0;

        if let Some(signal) = self.route(kind) {
            delivered += signal.emit(event.clone()).await;
        }
        delivered += self.inner.any.emit(event).await;

        trace!(?kind, delivered, "Published event");
        delivered
    }

    /// Runs `action` for every event of `kind`, in a self-managed scope.
    ///
    /// # Errors
    ///
    /// - `SignalError::NoRuntime` if called outside a tokio runtime
    pub fn on<A, Fut>(&self, kind: E::Kind, action: A) -> SignalResult<Connection>
    where
        A: FnMut(E) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: ActionOutcome,
    {
        self.signal(kind).connect(action)
    }

    /// Runs `action` for every event of `kind` on the caller's `scope`.
    pub fn on_in<A, Fut>(&self, scope: &Scope, kind: E::Kind, action: A) -> Subscription
    where
        A: FnMut(E) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: ActionOutcome,
    {
        self.signal(kind).connect_in(scope, action)
    }

    /// Runs `action` for every published event, whatever its kind.
    ///
    /// # Errors
    ///
    /// - `SignalError::NoRuntime` if called outside a tokio runtime
    pub fn on_any<A, Fut>(&self, action: A) -> SignalResult<Connection>
    where
        A: FnMut(E) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: ActionOutcome,
    {
        self.inner.any.connect(action)
    }

    /// Number of handlers currently attached for `kind`.
    pub fn handler_count(&self, kind: E::Kind) -> usize {
        self.route(kind)
            .map(|signal| signal.subscriber_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Ping(u32),
        Log(String),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        Ping,
        Log,
    }

    impl BusEvent for Event {
        type Kind = Kind;

        fn kind(&self) -> Kind {
            match self {
                Event::Ping(_) => Kind::Ping,
                Event::Log(_) => Kind::Log,
            }
        }
    }

    #[tokio::test]
    async fn test_publish_without_handlers() {
        let bus = EventBus::<Event>::new();
        assert_eq!(bus.publish(Event::Ping(1)).await, 0);
        assert_eq!(bus.handler_count(Kind::Ping), 0);
    }

    #[tokio::test]
    async fn test_routes_by_kind() {
        let bus = EventBus::<Event>::new();
        let mut pings = bus.signal(Kind::Ping).subscribe();
        let mut logs = bus.signal(Kind::Log).subscribe();

        assert_eq!(bus.publish(Event::Ping(7)).await, 1);

        assert_eq!(pings.recv().await, Some(Event::Ping(7)));
        assert_eq!(logs.try_recv(), None);
    }

    #[tokio::test]
    async fn test_catch_all_sees_everything() {
        let bus = EventBus::<Event>::new();
        let mut all = bus.any().subscribe();
        let mut pings = bus.signal(Kind::Ping).subscribe();

        assert_eq!(bus.publish(Event::Ping(1)).await, 2);
        assert_eq!(bus.publish(Event::Log("hi".into())).await, 1);

        assert_eq!(all.recv().await, Some(Event::Ping(1)));
        assert_eq!(all.recv().await, Some(Event::Log("hi".into())));
        assert_eq!(pings.recv().await, Some(Event::Ping(1)));
    }

    #[tokio::test]
    async fn test_signal_is_shared_per_kind() {
        let bus = EventBus::<Event>::new();
        assert_eq!(bus.signal(Kind::Log).id(), bus.signal(Kind::Log).id());
        assert_ne!(bus.signal(Kind::Log).id(), bus.signal(Kind::Ping).id());
    }

    #[tokio::test]
    async fn test_clones_share_routes() {
        let bus = EventBus::<Event>::new();
        let publisher = bus.clone();
        let _rx = bus.signal(Kind::Ping).subscribe();

        assert_eq!(publisher.handler_count(Kind::Ping), 1);
        assert_eq!(publisher.publish(Event::Ping(3)).await, 1);
    }

    #[tokio::test]
    async fn test_handlers_run_owning_futures() {
        let bus = EventBus::<Event>::new();
        let scope = Scope::current().unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let forward = |tag: &'static str| {
            let tx = tx.clone();
            move |event: Event| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send((tag, event));
                }
            }
        };
        let _pings = bus.on(Kind::Ping, forward("ping")).unwrap();
        let logs = bus.on_in(&scope, Kind::Log, forward("log"));
        let _all = bus.on_any(forward("any")).unwrap();

        assert_eq!(bus.publish(Event::Ping(2)).await, 2);
        assert_eq!(bus.publish(Event::Log("up".into())).await, 2);

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(rx.recv().await.unwrap());
        }
        seen.sort_by_key(|(tag, _)| *tag);
        assert_eq!(
            seen,
            vec![
                ("any", Event::Ping(2)),
                ("any", Event::Log("up".into())),
                ("log", Event::Log("up".into())),
                ("ping", Event::Ping(2)),
            ]
        );

        logs.cancel();
        assert!(logs.join().await.is_ok());
    }
}
