//! # Scripted Peer
//!
//! Plays the remote UI process: reads queries off the loopback, asks a
//! script what to answer, and pushes the result events back. Every query
//! seen is recorded for assertions.

use a11y_query_bridge::ipc::{create_loopback, InMemoryEndpointRegistry, Loopback, RoutedQuery};
use a11y_query_bridge::{BridgeConfig, QueryBridge, ResultSplitter};
use parking_lot::Mutex;
use shared_types::{ElementQueryResult, ElementRecord, OutboundQuery, ResultEvent, WindowId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What the peer does with one query.
#[derive(Debug, Clone)]
pub enum Script {
    /// Send these events in order, immediately.
    Answer(Vec<ElementQueryResult>),
    /// Wait, then send these events.
    AnswerAfter(Duration, Vec<ElementQueryResult>),
    /// Never answer.
    Silent,
}

type Responder = dyn Fn(&OutboundQuery) -> Script + Send + Sync;

/// A scripted remote element operator.
pub struct MockPeer {
    seen: Arc<Mutex<Vec<OutboundQuery>>>,
    task: JoinHandle<()>,
}

impl MockPeer {
    pub fn spawn(
        mut queries: mpsc::Receiver<RoutedQuery>,
        results: mpsc::Sender<ResultEvent>,
        responder: Arc<Responder>,
    ) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);

        let task = tokio::spawn(async move {
            while let Some(routed) = queries.recv().await {
                let query = routed.query;
                log.lock().push(query.clone());

                let (delay, events) = match responder(&query) {
                    Script::Answer(events) => (None, events),
                    Script::AnswerAfter(delay, events) => (Some(delay), events),
                    Script::Silent => continue,
                };

                // Answer off the receive loop so queries keep being accepted
                let results = results.clone();
                let key = query.correlation_key;
                tokio::spawn(async move {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    for result in events {
                        if results.send(ResultEvent::new(key, result)).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        Self { seen, task }
    }

    /// Queries received so far, in arrival order.
    pub fn seen(&self) -> Vec<OutboundQuery> {
        self.seen.lock().clone()
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for MockPeer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A started bridge wired to a scripted peer over the in-memory loopback.
pub struct TestChannel {
    pub bridge: QueryBridge,
    pub registry: Arc<InMemoryEndpointRegistry>,
    pub peer: MockPeer,
    /// Extra sender for injecting events the peer would not send.
    pub inject: mpsc::Sender<ResultEvent>,
}

impl TestChannel {
    /// Build a channel whose peer answers every query with `responder`.
    /// Windows in `connected` are registered as live.
    pub fn start<F>(config: BridgeConfig, connected: &[i32], responder: F) -> Self
    where
        F: Fn(&OutboundQuery) -> Script + Send + Sync + 'static,
    {
        let Loopback {
            sender,
            queries,
            results,
            receiver,
        } = create_loopback(config.event_buffer);

        let registry = Arc::new(InMemoryEndpointRegistry::new());
        for &window in connected {
            registry.connect(WindowId::new(window));
        }

        let mut bridge = QueryBridge::new(1, config, Arc::new(sender), registry.clone())
            .expect("test config should be valid");
        bridge.start(Arc::new(receiver));

        let inject = results.clone();
        let peer = MockPeer::spawn(queries, results, Arc::new(responder));

        Self {
            bridge,
            registry,
            peer,
            inject,
        }
    }
}

// =============================================================================
// RECORD FIXTURES
// =============================================================================

/// `count` valid records with consecutive ids starting at `first`.
pub fn records(window: i32, first: i64, count: usize) -> Vec<ElementRecord> {
    (first..first + count as i64)
        .map(|id| ElementRecord::new(id, WindowId::new(window)).with_component_type("Text"))
        .collect()
}

/// Search-by-id events for `records` as the real peer would split them.
pub fn split_search(records: Vec<ElementRecord>) -> Vec<ElementQueryResult> {
    ResultSplitter::default()
        .split(records)
        .into_iter()
        .map(|(records, chunk_index)| ElementQueryResult::SearchById {
            records,
            chunk_index,
        })
        .collect()
}
