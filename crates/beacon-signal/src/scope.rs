//! Execution contexts that host subscriber receive loops.
//!
//! A [`Scope`] pairs a tokio runtime handle with a `CancellationToken`. Every
//! receive loop spawned on a scope gets a child token, so:
//! - cancelling one [`Subscription`] stops only that loop
//! - cancelling the scope stops every loop it hosts
//!
//! Callers that want to own subscriber lifetimes create a scope and pass it to
//! `Signal::connect_in`. The self-managed `Signal::connect` creates a fresh
//! scope per connection.

use std::future::Future;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{SignalError, SignalResult};
use crate::signal::{SignalId, SubscriberId};

/// A cancellable execution context on a tokio runtime.
///
/// Cheap to clone; clones share the same cancellation token.
#[derive(Debug, Clone)]
pub struct Scope {
    handle: Handle,
    token: CancellationToken,
}

impl Scope {
    /// Creates a scope on `handle` with a fresh cancellation token.
    pub fn new(handle: Handle) -> Self {
        Self::with_token(handle, CancellationToken::new())
    }

    /// Creates a scope on `handle` tied to an existing token.
    ///
    /// Cancelling `token` (for example an application-wide shutdown token)
    /// stops every subscription hosted on this scope.
    pub fn with_token(handle: Handle, token: CancellationToken) -> Self {
        Self { handle, token }
    }

    /// Creates a scope on the runtime the caller is running in.
    ///
    /// # Errors
    ///
    /// - `SignalError::NoRuntime` if called outside a tokio runtime
    pub fn current() -> SignalResult<Self> {
        let handle = Handle::try_current().map_err(|_| SignalError::NoRuntime)?;
        Ok(Self::new(handle))
    }

    /// Creates a nested scope on the same runtime.
    ///
    /// Cancelling the parent cancels the child, not the other way around.
    pub fn child(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            token: self.token.child_token(),
        }
    }

    /// Cancels this scope and everything spawned on it. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The scope's cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The runtime this scope spawns onto.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawns a receive loop with its own child token.
    pub(crate) fn spawn_loop<F, Fut>(
        &self,
        signal: SignalId,
        subscriber: SubscriberId,
        task: F,
    ) -> Subscription
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.child_token();
        let handle = self.handle.spawn(task(token.clone()));
        debug!(%signal, %subscriber, "Spawned receive loop");

        Subscription {
            signal,
            subscriber,
            token,
            handle,
        }
    }
}

/// The cancellable unit of work behind one subscriber.
///
/// Returned by `Signal::connect_in`. Dropping a `Subscription` does not stop
/// the loop; its lifetime belongs to the hosting [`Scope`] unless cancelled
/// explicitly.
#[derive(Debug)]
pub struct Subscription {
    signal: SignalId,
    subscriber: SubscriberId,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Stops the receive loop at its next suspension point. Idempotent.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!(signal = %self.signal, subscriber = %self.subscriber, "Cancelling subscription");
        }
        self.token.cancel();
    }

    /// `true` while the loop is neither cancelled nor finished on its own.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && !self.handle.is_finished()
    }

    /// `true` once the loop task has exited, for any reason.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscriber
    }

    pub fn signal_id(&self) -> SignalId {
        self.signal
    }

    /// Waits for the receive loop to exit.
    ///
    /// A loop that stopped because it was cancelled, because its action
    /// returned an error, or because the signal was dropped joins with
    /// `Ok(())`.
    ///
    /// # Errors
    ///
    /// - `SignalError::SubscriberPanicked` if the action panicked
    /// - `SignalError::SubscriberAborted` if the runtime aborted the task
    pub async fn join(self) -> SignalResult<()> {
        let subscriber = self.subscriber;
        match self.handle.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_panic() => Err(SignalError::SubscriberPanicked { subscriber }),
            Err(_) => Err(SignalError::SubscriberAborted { subscriber }),
        }
    }
}
