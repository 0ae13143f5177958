//! Shared domain types for procflow.
//!
//! This crate contains the plain data the engine operates on: the typed
//! process graph ([`node`], [`tree`]), the persisted [`process`] aggregate,
//! definition documents, engine events, configuration and error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod definition;
pub mod error;
pub mod event;
pub mod node;
pub mod process;
pub mod tree;
