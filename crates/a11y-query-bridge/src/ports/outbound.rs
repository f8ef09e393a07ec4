//! Outbound ports: the transport and endpoint registry the bridge depends on.

use async_trait::async_trait;
use shared_types::{OutboundQuery, ResultEvent, WindowId};

/// Handle to a live connection with a window's element operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointHandle {
    /// Window served by this endpoint
    pub window_id: WindowId,
    /// Registry-assigned connection id; changes on reconnect
    pub connection_id: u64,
}

/// Transport error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("channel closed")]
    ChannelClosed,
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Sends queries across the process boundary.
///
/// Fire-and-forget: the answer arrives later through a [`ResultReceiver`].
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn send_query(
        &self,
        endpoint: &EndpointHandle,
        query: OutboundQuery,
    ) -> Result<(), TransportError>;
}

/// Yields inbound result events in arrival order.
#[async_trait]
pub trait ResultReceiver: Send + Sync {
    /// Receive next event (waits until one is available)
    async fn receive(&self) -> Result<ResultEvent, TransportError>;
}

/// Resolves windows to live endpoints.
pub trait EndpointRegistry: Send + Sync {
    /// Endpoint currently registered for `window_id`, if any.
    fn resolve(&self, window_id: WindowId) -> Option<EndpointHandle>;

    /// Whether `endpoint` is still connected.
    fn is_connected(&self, endpoint: &EndpointHandle) -> bool;
}
