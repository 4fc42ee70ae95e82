//! HTTP handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, TraceLayer)
//!     → instrument.rs (start clock, resolve client address via client_ip.rs)
//!     → TimeoutLayer → application / admin / health routes
//!     → instrument.rs (stop clock, queue ApiMetricSample)
//!     → Send to client
//! ```

pub mod client_ip;
pub mod instrument;
pub mod server;

pub use instrument::{record_api_metrics, Instrumentation};
pub use server::HttpServer;
