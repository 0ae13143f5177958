//! Business logic services (use cases).
//!
//! Services orchestrate repository calls and trigger calls. They depend on
//! traits (ports) -- never on concrete infrastructure implementations.

pub mod lock;
pub mod process;

pub use lock::{ProcessGuard, ProcessLocks};
pub use process::{ProcessService, ServiceError};
