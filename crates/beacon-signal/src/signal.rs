//! The broadcast primitive.
//!
//! A [`Signal`] owns one subscriber set. Each subscriber gets its own bounded
//! mpsc buffer, so every attached subscriber sees every value, in order, with
//! no lag-and-drop.
//!
//! ```text
//! ┌──────────┐  emit(v)   ┌─────────────────────────┐
//! │ Producer │──────────▶│ Signal (subscriber set) │
//! └──────────┘            └───────────┬─────────────┘
//!                                     │ snapshot + send
//!                   ┌─────────────────┼─────────────────┐
//!                   ▼                 ▼                 ▼
//!            ┌────────────┐   ┌────────────┐    ┌────────────┐
//!            │ mpsc buffer│   │ mpsc buffer│    │ mpsc buffer│
//!            └─────┬──────┘   └─────┬──────┘    └─────┬──────┘
//!                  ▼                ▼                 ▼
//!             receive loop     receive loop      SignalReceiver
//!             (Connection)     (Subscription)    (manual recv)
//! ```
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Lock poisoning is recovered; the subscriber map is never left half-updated
//! - Failing subscribers end their own loop and never reach the producer

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use beacon_core::{Params, SignalConfig, SignalData};

use crate::action::ActionOutcome;
use crate::connection::Connection;
use crate::error::SignalResult;
use crate::scope::{Scope, Subscription};

/// Source of process-unique signal ids.
static NEXT_SIGNAL_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one signal instance (shared by its clones).
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SignalId(u64);

impl SignalId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signal#{}", self.0)
    }
}

/// Identifies one subscriber within its signal.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber#{}", self.0)
    }
}

/// Type alias for the shared subscriber map
type SubscriberMap<T> = RwLock<HashMap<SubscriberId, mpsc::Sender<T>>>;

struct Inner<T> {
    id: SignalId,
    config: SignalConfig,
    subscribers: SubscriberMap<T>,
    next_subscriber: AtomicU64,
}

impl<T> Inner<T> {
    fn attach(&self) -> (SubscriberId, mpsc::Receiver<T>) {
        let id = SubscriberId::new(self.next_subscriber.fetch_add(1, Ordering::Relaxed));
        // tokio panics on a zero-sized buffer
        let (tx, rx) = mpsc::channel(self.config.capacity.max(1));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        debug!(signal = %self.id, subscriber = %id, "Subscriber attached");
        (id, rx)
    }

    fn detach(&self, id: SubscriberId) {
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            debug!(signal = %self.id, subscriber = %id, "Subscriber detached");
        }
    }

    /// Clones the current senders so no lock is held while sending.
    fn snapshot(&self) -> Vec<(SubscriberId, mpsc::Sender<T>)> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A typed broadcast channel.
///
/// Cloning a `Signal` yields another handle to the same subscriber set;
/// separately constructed signals are fully independent.
///
/// # Usage
///
/// ```ignore
/// let signal = Signal::<i32>::new();
///
/// let connection = signal.connect(|value| async move {
///     println!("got {value}");
/// })?;
///
/// signal.emit(42).await;
/// connection.cancel();
/// ```
pub struct Signal<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("subscribers", &self.inner.len())
            .finish()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Signal<T> {
    /// Creates a signal with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SignalConfig::default())
    }

    /// Creates a signal with the given configuration.
    ///
    /// A zero capacity is treated as 1.
    pub fn with_config(config: SignalConfig) -> Self {
        let id = SignalId::new(NEXT_SIGNAL_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            inner: Arc::new(Inner {
                id,
                config,
                subscribers: RwLock::new(HashMap::new()),
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    pub fn id(&self) -> SignalId {
        self.inner.id
    }

    pub fn config(&self) -> &SignalConfig {
        &self.inner.config
    }

    /// Number of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.len()
    }

    /// Attaches a new subscriber and returns its receiving end.
    ///
    /// The subscriber is attached before this returns, so it sees every value
    /// emitted afterwards and nothing emitted before. Dropping the receiver
    /// detaches it.
    pub fn subscribe(&self) -> SignalReceiver<T> {
        let (id, rx) = self.inner.attach();
        SignalReceiver {
            id,
            signal: self.inner.id,
            rx,
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl<T> Signal<T>
where
    T: Clone + Send + 'static,
{
    /// Delivers `value` to every subscriber attached when dispatch starts.
    ///
    /// Suspends until each of those subscribers' buffers accepted the value.
    /// Returns how many subscribers accepted it; zero subscribers means the
    /// value is silently discarded. Subscribers whose receive loop has ended
    /// are pruned.
    pub async fn emit(&self, value: T) -> usize {
        let targets = self.inner.snapshot();
        let mut delivered = 0;
        let mut closed = Vec::new();

        // Clone for every subscriber except the last one
        if let Some(((last_id, last), rest)) = targets.split_last() {
            for (id, tx) in rest {
                match tx.send(value.clone()).await {
                    Ok(()) => delivered += 1,
                    Err(_) => closed.push(*id),
                }
            }
            match last.send(value).await {
                Ok(()) => delivered += 1,
                Err(_) => closed.push(*last_id),
            }
        }

        for id in closed {
            self.inner.detach(id);
        }

        trace!(signal = %self.inner.id, delivered, "Emitted value");
        delivered
    }

    /// Runs `action` once per emitted value on the caller's `scope`.
    ///
    /// The subscriber is attached before this returns. The returned
    /// [`Subscription`] is the loop's cancellable unit; cancelling it stops
    /// only this subscriber, cancelling `scope` stops every subscriber on it.
    pub fn connect_in<A, Fut>(&self, scope: &Scope, action: A) -> Subscription
    where
        A: FnMut(T) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: ActionOutcome,
    {
        let receiver = self.subscribe();
        let subscriber = receiver.id();
        scope.spawn_loop(self.inner.id, subscriber, move |token| {
            receive_loop(receiver, token, action)
        })
    }

    /// Runs `action` once per emitted value in a fresh, self-managed scope.
    ///
    /// The scope lives on the current tokio runtime; a failing or panicking
    /// action ends only this connection. The returned [`Connection`] cancels
    /// both the receive loop and its scope.
    ///
    /// # Errors
    ///
    /// - `SignalError::NoRuntime` if called outside a tokio runtime
    pub fn connect<A, Fut>(&self, action: A) -> SignalResult<Connection>
    where
        A: FnMut(T) -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: ActionOutcome,
    {
        let scope = Scope::current()?;
        let subscription = self.connect_in(&scope, action);
        Ok(Connection::new(subscription, scope))
    }
}

impl<T> Signal<SignalData<T>>
where
    T: Clone + Send + Sync + 'static,
{
    /// Emits `value` wrapped in an envelope carrying `params`.
    ///
    /// An existing envelope is re-wrapped with its params merged (the new
    /// `params` win on key collision); a bare value is wrapped with exactly
    /// `params`. Envelopes never nest.
    pub async fn emit_with_params(
        &self,
        value: impl Into<SignalData<T>>,
        params: Params,
    ) -> usize {
        self.emit(Self::with_params(value, params)).await
    }

    /// Builds the envelope `emit_with_params` would emit, without emitting.
    pub fn with_params(value: impl Into<SignalData<T>>, params: Params) -> SignalData<T> {
        value.into().merge_params(params)
    }
}

/// The receiving end of one subscriber.
///
/// Dropping it detaches the subscriber from its signal.
pub struct SignalReceiver<T> {
    id: SubscriberId,
    signal: SignalId,
    rx: mpsc::Receiver<T>,
    inner: Weak<Inner<T>>,
}

impl<T> SignalReceiver<T> {
    /// Waits for the next value.
    ///
    /// Returns `None` once the signal (and all its clones) has been dropped
    /// and the buffer is drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Takes a buffered value without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn signal_id(&self) -> SignalId {
        self.signal
    }
}

impl<T> fmt::Debug for SignalReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalReceiver")
            .field("id", &self.id)
            .field("signal", &self.signal)
            .finish()
    }
}

impl<T> Drop for SignalReceiver<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.detach(self.id);
        }
    }
}

/// Consumes values until cancelled, until the action fails, or until the
/// signal goes away.
///
/// Cancellation is checked first at every suspension point and again before
/// each delivery, so nothing reaches `action` once `token` is cancelled.
async fn receive_loop<T, A, Fut>(
    mut receiver: SignalReceiver<T>,
    token: CancellationToken,
    mut action: A,
) where
    A: FnMut(T) -> Fut,
    Fut: Future,
    Fut::Output: ActionOutcome,
{
    let signal = receiver.signal_id();
    let subscriber = receiver.id();

    loop {
        let value = tokio::select! {
            biased;

            _ = token.cancelled() => {
                debug!(%signal, %subscriber, "Receive loop cancelled");
                break;
            }

            value = receiver.recv() => match value {
                Some(value) => value,
                None => {
                    debug!(%signal, %subscriber, "Signal dropped, receive loop ending");
                    break;
                }
            },
        };

        if token.is_cancelled() {
            break;
        }

        let outcome = tokio::select! {
            biased;

            _ = token.cancelled() => {
                debug!(%signal, %subscriber, "Receive loop cancelled during delivery");
                break;
            }

            outcome = action(value) => outcome,
        };

        if let Err(reason) = outcome.into_result() {
            warn!(%signal, %subscriber, error = %reason, "Subscriber action failed, ending receive loop");
            break;
        }
    }
}
