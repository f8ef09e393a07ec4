//! Error types for element queries.
//!
//! Every failure of a query operation is returned to its direct caller; none is
//! retried or swallowed inside the bridge.

use shared_types::{CorrelationKey, QueryKind, WindowId};

/// Failure of a single query operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// Window id outside `0 < id < 0x7FFF`. Caller bug, not retryable.
    #[error("invalid window id {window_id}")]
    InvalidWindow { window_id: WindowId },

    /// No live connection to the window's endpoint. Retryable after reconnect.
    #[error("channel unavailable for window {window_id}")]
    ChannelUnavailable { window_id: WindowId },

    /// The transport rejected the outbound query.
    #[error("failed to send {kind} query {correlation_key}: {reason}")]
    SendFailed {
        correlation_key: CorrelationKey,
        kind: QueryKind,
        reason: String,
    },

    /// A request with the same key is still pending.
    #[error("duplicate pending request {correlation_key}")]
    DuplicateRequest { correlation_key: CorrelationKey },

    /// The peer did not answer in time.
    #[error("{kind} query {correlation_key} timed out after {elapsed_ms}ms")]
    Timeout {
        correlation_key: CorrelationKey,
        kind: QueryKind,
        elapsed_ms: u64,
    },

    /// The peer answered with a sentinel or otherwise unusable payload.
    #[error("invalid result for {kind} query {correlation_key}: {reason}")]
    InvalidRemoteResult {
        correlation_key: CorrelationKey,
        kind: QueryKind,
        reason: String,
    },
}

impl QueryError {
    /// True for failures a caller may sensibly retry with a fresh query.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ChannelUnavailable { .. } | Self::SendFailed { .. } | Self::Timeout { .. }
        )
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors from the request id allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("window id {0} is outside 1..{ceiling}", ceiling = WindowId::CEILING)]
    InvalidWindow(WindowId),
}

impl From<AllocError> for QueryError {
    fn from(e: AllocError) -> Self {
        match e {
            AllocError::InvalidWindow(window_id) => QueryError::InvalidWindow { window_id },
        }
    }
}
