//! Errors surfaced by signal operations.
//!
//! Delivery itself never fails: emitting with no subscribers is not an error,
//! and a failing subscriber only ends its own receive loop. These errors cover
//! hosting subscribers and observing how their loops ended.

use thiserror::Error;

use crate::signal::SubscriberId;

/// Errors that can occur in signal operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// A self-managed connection was requested outside a tokio runtime
    #[error("No tokio runtime available to host the subscriber")]
    NoRuntime,

    /// The subscriber's action panicked, ending its receive loop
    #[error("Subscriber {subscriber} panicked")]
    SubscriberPanicked { subscriber: SubscriberId },

    /// The subscriber's task was aborted by the runtime (e.g. runtime shutdown)
    #[error("Subscriber {subscriber} was aborted")]
    SubscriberAborted { subscriber: SubscriberId },
}

/// Result type for signal operations.
pub type SignalResult<T> = Result<T, SignalError>;
