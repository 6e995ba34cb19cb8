//! Lifecycle handle for self-managed subscriptions.

use tracing::debug;

use crate::scope::{Scope, Subscription};
use crate::signal::{SignalId, SubscriberId};

/// Handle to one subscription created by `Signal::connect`.
///
/// Bundles the receive loop's [`Subscription`] with the [`Scope`] that was
/// created to host it, so a single [`cancel`](Connection::cancel) tears both
/// down. Dropping a `Connection` cancels it.
#[must_use = "dropping a Connection cancels the subscription"]
#[derive(Debug)]
pub struct Connection {
    subscription: Subscription,
    scope: Scope,
}

impl Connection {
    pub(crate) fn new(subscription: Subscription, scope: Scope) -> Self {
        Self {
            subscription,
            scope,
        }
    }

    /// Stops delivery to this subscriber and releases its scope.
    ///
    /// Idempotent: calling it on an already cancelled or finished connection
    /// does nothing.
    pub fn cancel(&self) {
        self.subscription.cancel();
        self.scope.cancel();
    }

    /// `true` while the receive loop is neither cancelled nor finished.
    ///
    /// A loop ends on its own when its action fails or panics, or when the
    /// signal is dropped.
    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscription.subscriber_id()
    }

    pub fn signal_id(&self) -> SignalId {
        self.subscription.signal_id()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.is_active() {
            debug!(
                signal = %self.signal_id(),
                subscriber = %self.subscriber_id(),
                "Connection dropped while active, cancelling"
            );
        }
        self.cancel();
    }
}
