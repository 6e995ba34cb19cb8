//! Beacon Signal - Typed broadcast signals on tokio
//!
//! This crate provides the broadcast machinery:
//! - `signal` - `Signal<T>`, the broadcast primitive, and `SignalReceiver`
//! - `connection` - `Connection`, the handle for self-managed subscriptions
//! - `scope` - `Scope` execution contexts and their `Subscription` units
//! - `bus` - `EventBus`, routing enum events by discriminator
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Signal<T>                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  emit(v) ──▶ snapshot of subscribers ──▶ per-subscriber     │
//! │                                          bounded buffers    │
//! │                                                 │           │
//! │           ┌─────────────────────────────────────┤           │
//! │           ▼                                     ▼           │
//! │  ┌─────────────────┐               ┌─────────────────────┐  │
//! │  │   Connection    │               │    Subscription     │  │
//! │  │ (own Scope)     │               │ (caller's Scope)    │  │
//! │  └─────────────────┘               └─────────────────────┘  │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use beacon_signal::Signal;
//!
//! #[tokio::main]
//! async fn main() {
//!     let signal = Signal::<i32>::new();
//!     let connection = signal
//!         .connect(|value| async move { println!("received {value}") })
//!         .expect("inside a tokio runtime");
//!
//!     signal.emit(42).await;
//!     connection.cancel();
//! }
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - A panicking subscriber action only ends its own task
//! - Channel operations handle closure gracefully

pub mod action;
pub mod bus;
pub mod connection;
pub mod error;
pub mod scope;
pub mod signal;

pub use action::ActionOutcome;
pub use bus::{BusEvent, EventBus};
pub use connection::Connection;
pub use error::{SignalError, SignalResult};
pub use scope::{Scope, Subscription};
pub use signal::{Signal, SignalId, SignalReceiver, SubscriberId};

// Envelope and config types travel with every signal
pub use beacon_core::{params, ParamValue, Params, SignalConfig, SignalData};
