//! Observability setup for procflow: structured logging plus optional
//! OpenTelemetry span export.

pub mod tracing_setup;
