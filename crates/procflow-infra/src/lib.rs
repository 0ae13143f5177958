//! Infrastructure layer for procflow.
//!
//! Contains the implementations of the repository traits defined in
//! `procflow-core` (SQLite storage) plus the configuration and data
//! directory helpers used by the CLI.

pub mod config;
pub mod filesystem;
pub mod sqlite;
