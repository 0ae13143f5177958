//! Process execution engine and repository trait definitions for procflow.
//!
//! This crate defines the node state machines, the executor that drives them
//! and the "ports" (repository traits) that the infrastructure layer
//! implements. It depends only on `procflow-types` -- never on
//! `procflow-infra` or any database/IO crate.

pub mod definition;
pub mod event;
pub mod executor;
pub mod gateway;
pub mod node;
pub mod observer;
pub mod registry;
pub mod report;
pub mod repository;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;
