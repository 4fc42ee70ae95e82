//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Logging → Open store (probe, schema, mode) → Collector → Listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → collector stops, server drains → flush API writes → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: the store is ready before the listener binds
//! - Shutdown flush is bounded by the store write timeout

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
pub use startup::open_store;
