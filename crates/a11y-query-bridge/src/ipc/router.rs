//! Callback router: demultiplexes inbound result events to pending requests.

use crate::domain::pending::{ChunkRouting, PendingRequestTable, QueryReply, Take};
use crate::ports::{ResultReceiver, TransportError};
use shared_types::{CorrelationKey, ElementQueryResult, ElementRecord, QueryKind, ResultEvent};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Why an inbound event was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// No pending request for the key (late, duplicate or spurious).
    UnknownKey,
    /// The pending request was issued for another kind of query.
    KindMismatch {
        expected: QueryKind,
        received: QueryKind,
    },
    /// The request was found but its caller had already stopped waiting.
    WaiterGone,
}

/// What routing one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The caller was released.
    Delivered,
    /// A non-terminal chunk was buffered.
    Partial { accumulated: usize },
    /// The event was dropped.
    Discarded(DiscardReason),
}

/// Routes result events to the pending request table of one channel.
pub struct CallbackRouter {
    pending: Arc<PendingRequestTable>,
}

impl CallbackRouter {
    pub fn new(pending: Arc<PendingRequestTable>) -> Self {
        Self { pending }
    }

    /// Route a single event. Safe to call from any transport thread.
    pub fn route(&self, event: ResultEvent) -> RouteOutcome {
        let key = event.correlation_key;
        let received = event.result.kind();

        let reply = match event.result {
            ElementQueryResult::SearchById {
                records,
                chunk_index,
            } => return self.route_chunk(key, records, chunk_index),
            ElementQueryResult::SearchByText { records } => QueryReply::Records(records),
            ElementQueryResult::FindFocused { record } | ElementQueryResult::FocusMove { record } => {
                QueryReply::Record(record)
            }
            ElementQueryResult::ExecuteAction { succeeded } => QueryReply::ActionOutcome(succeeded),
        };

        match self.pending.take_matching(&key, received) {
            Take::Taken(request) => self.finish(key, self.pending.deliver(key, request, reply)),
            Take::Unknown => self.discard_unknown(key, received),
            Take::KindMismatch { expected } => self.discard_mismatch(key, expected, received),
        }
    }

    fn route_chunk(
        &self,
        key: CorrelationKey,
        records: Vec<ElementRecord>,
        chunk_index: i32,
    ) -> RouteOutcome {
        match self.pending.accumulate_chunk(&key, records, chunk_index) {
            ChunkRouting::Complete(request, all) => {
                debug!(
                    correlation_key = %key,
                    records = all.len(),
                    "Search result reassembled"
                );
                self.finish(key, self.pending.deliver(key, request, QueryReply::Records(all)))
            }
            ChunkRouting::Partial { accumulated } => {
                debug!(
                    correlation_key = %key,
                    chunk_index,
                    accumulated,
                    "Buffered partial search result"
                );
                RouteOutcome::Partial { accumulated }
            }
            ChunkRouting::Unknown => self.discard_unknown(key, QueryKind::SearchById),
            ChunkRouting::KindMismatch { expected } => {
                self.discard_mismatch(key, expected, QueryKind::SearchById)
            }
        }
    }

    /// Pull events from `receiver` and route them until the channel closes.
    pub async fn run(&self, receiver: Arc<dyn ResultReceiver>) {
        info!("[CallbackRouter] Started routing result events");

        loop {
            match receiver.receive().await {
                Ok(event) => {
                    self.route(event);
                }
                Err(TransportError::ChannelClosed) => {
                    warn!("Result channel closed, stopping router");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Error receiving result event");
                }
            }
        }
    }

    fn finish(&self, key: CorrelationKey, delivered: bool) -> RouteOutcome {
        if delivered {
            RouteOutcome::Delivered
        } else {
            debug!(correlation_key = %key, "Result arrived after caller stopped waiting");
            RouteOutcome::Discarded(DiscardReason::WaiterGone)
        }
    }

    fn discard_unknown(&self, key: CorrelationKey, received: QueryKind) -> RouteOutcome {
        debug!(
            correlation_key = %key,
            kind = %received,
            "Result for unknown or expired correlation key"
        );
        RouteOutcome::Discarded(DiscardReason::UnknownKey)
    }

    fn discard_mismatch(
        &self,
        key: CorrelationKey,
        expected: QueryKind,
        received: QueryKind,
    ) -> RouteOutcome {
        warn!(
            correlation_key = %key,
            expected = %expected,
            received = %received,
            "Result kind does not match pending request"
        );
        RouteOutcome::Discarded(DiscardReason::KindMismatch { expected, received })
    }
}
