//! In-memory transport and endpoint registry.
//!
//! Used for in-process wiring and tests: queries go out on an mpsc channel to
//! whoever plays the peer, results come back on another.

use crate::ports::{EndpointHandle, EndpointRegistry, QueryTransport, ResultReceiver, TransportError};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{OutboundQuery, ResultEvent, WindowId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// A query together with the endpoint it was addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedQuery {
    pub endpoint: EndpointHandle,
    pub query: OutboundQuery,
}

/// mpsc-backed [`QueryTransport`].
pub struct ChannelSender(pub mpsc::Sender<RoutedQuery>);

#[async_trait]
impl QueryTransport for ChannelSender {
    async fn send_query(
        &self,
        endpoint: &EndpointHandle,
        query: OutboundQuery,
    ) -> Result<(), TransportError> {
        self.0
            .send(RoutedQuery {
                endpoint: *endpoint,
                query,
            })
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

/// mpsc-backed [`ResultReceiver`].
pub struct ChannelReceiver(tokio::sync::Mutex<mpsc::Receiver<ResultEvent>>);

impl ChannelReceiver {
    pub fn new(rx: mpsc::Receiver<ResultEvent>) -> Self {
        Self(tokio::sync::Mutex::new(rx))
    }
}

#[async_trait]
impl ResultReceiver for ChannelReceiver {
    async fn receive(&self) -> Result<ResultEvent, TransportError> {
        let mut guard = self.0.lock().await;
        guard.recv().await.ok_or(TransportError::ChannelClosed)
    }
}

/// Both ends of an in-memory query/result channel pair.
pub struct Loopback {
    /// Transport for the querying side
    pub sender: ChannelSender,
    /// Queries as seen by the peer
    pub queries: mpsc::Receiver<RoutedQuery>,
    /// Where the peer sends its results
    pub results: mpsc::Sender<ResultEvent>,
    /// Receiver for the querying side's router
    pub receiver: ChannelReceiver,
}

/// Create a connected in-memory channel pair
pub fn create_loopback(buffer: usize) -> Loopback {
    let (query_tx, query_rx) = mpsc::channel(buffer);
    let (result_tx, result_rx) = mpsc::channel(buffer);
    Loopback {
        sender: ChannelSender(query_tx),
        queries: query_rx,
        results: result_tx,
        receiver: ChannelReceiver::new(result_rx),
    }
}

struct WindowEntry {
    endpoint: EndpointHandle,
    connected: bool,
}

/// Endpoint registry whose windows are connected and disconnected at runtime.
#[derive(Default)]
pub struct InMemoryEndpointRegistry {
    windows: RwLock<HashMap<WindowId, WindowEntry>>,
    next_connection: AtomicU64,
}

impl InMemoryEndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh connection for `window_id`, replacing any previous one.
    pub fn connect(&self, window_id: WindowId) -> EndpointHandle {
        let endpoint = EndpointHandle {
            window_id,
            connection_id: self.next_connection.fetch_add(1, Ordering::Relaxed) + 1,
        };
        self.windows.write().insert(
            window_id,
            WindowEntry {
                endpoint,
                connected: true,
            },
        );
        debug!(window_id = %window_id, connection_id = endpoint.connection_id, "Window connected");
        endpoint
    }

    /// Mark the window's connection as dead but keep it resolvable.
    pub fn disconnect(&self, window_id: WindowId) -> bool {
        match self.windows.write().get_mut(&window_id) {
            Some(entry) => {
                entry.connected = false;
                debug!(window_id = %window_id, "Window disconnected");
                true
            }
            None => false,
        }
    }

    /// Forget the window entirely.
    pub fn remove(&self, window_id: WindowId) -> bool {
        self.windows.write().remove(&window_id).is_some()
    }
}

impl EndpointRegistry for InMemoryEndpointRegistry {
    fn resolve(&self, window_id: WindowId) -> Option<EndpointHandle> {
        self.windows.read().get(&window_id).map(|e| e.endpoint)
    }

    fn is_connected(&self, endpoint: &EndpointHandle) -> bool {
        self.windows
            .read()
            .get(&endpoint.window_id)
            .is_some_and(|e| e.connected && e.endpoint == *endpoint)
    }
}
