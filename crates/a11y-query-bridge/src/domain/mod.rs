//! Domain types for the query bridge.
//!
//! Key allocation, the pending request table with its chunk reassembly, the
//! waiter primitive, configuration and errors.

pub mod chunker;
pub mod config;
pub mod correlation;
pub mod error;
pub mod pending;
pub mod waiter;

// Re-exports for convenience
pub use chunker::{ChunkProgress, ResultChunker};
pub use config::{BridgeConfig, ConfigError, LogConfig};
pub use correlation::RequestIdAllocator;
pub use error::{AllocError, QueryError, QueryResult};
pub use pending::{
    cleanup_task, ChunkRouting, PendingRequest, PendingRequestTable, PendingStats, QueryReply,
    Take,
};
pub use waiter::{result_waiter, ResultWaiter, WaitOutcome, WaiterHandle};
