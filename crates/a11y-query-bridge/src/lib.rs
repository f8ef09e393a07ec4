//! Accessibility query bridge - request correlation for cross-process element queries.
//!
//! A client asks a remote UI process about accessibility elements: search by id
//! or text, locate focus, move focus, perform an action. The result comes back
//! asynchronously, possibly split into chunks, on a thread that has nothing to
//! do with the caller. This crate matches each result to the query that asked
//! for it and hands it to the caller waiting on it.
//!
//! # Architecture
//!
//! ```text
//!  caller task
//!      │
//!      ▼
//! ┌──────────────────┐  next()   ┌────────────────────┐
//! │ QueryDispatcher  │──────────▶│ RequestIdAllocator │
//! │                  │           └────────────────────┘
//! │  register(key)   │           ┌────────────────────┐
//! │  wait(timeout) ◀─┼───────────│ PendingRequestTable│◀──┐
//! └────────┬─────────┘  signal   │  + ResultChunker   │   │ take / accumulate
//!          │ send_query          └────────────────────┘   │
//!          ▼                                              │
//!   QueryTransport ──── remote UI process ──── ResultReceiver ──▶ CallbackRouter
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use a11y_query_bridge::{BridgeConfig, QueryBridge};
//!
//! let mut bridge = QueryBridge::new(channel_id, BridgeConfig::default(), transport, registry)?;
//! bridge.start(receiver);
//! let records = bridge
//!     .dispatcher()
//!     .search_element_infos_by_accessibility_id(window_id, element_id, SearchMode::NONE)
//!     .await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod ipc;
pub mod ports;
pub mod service;
pub mod telemetry;

// Re-exports for public API
pub use domain::config::{BridgeConfig, ConfigError, LogConfig};
pub use domain::error::{AllocError, QueryError, QueryResult};
pub use domain::pending::{PendingRequestTable, PendingStats};
pub use ipc::{
    create_loopback, CallbackRouter, InMemoryEndpointRegistry, QueryDispatcher, ResultSplitter,
    RouteOutcome,
};
pub use ports::{EndpointHandle, EndpointRegistry, QueryTransport, ResultReceiver, TransportError};
pub use service::QueryBridge;
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
