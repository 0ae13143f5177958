//! Event bus for engine lifecycle events.
//!
//! Provides an `EventBus` that distributes `ProcessEvent` messages to all
//! subscribers via a `tokio::sync::broadcast` channel.

pub mod bus;

pub use bus::EventBus;
