//! Query dispatcher: issues element queries and waits for their results.
//!
//! Each operation allocates a correlation key, registers a waiter, sends the
//! query and blocks the calling task on the waiter until the callback router
//! delivers a result or the request timeout elapses.

use crate::domain::config::BridgeConfig;
use crate::domain::correlation::RequestIdAllocator;
use crate::domain::error::{QueryError, QueryResult};
use crate::domain::pending::{PendingRequestTable, QueryReply};
use crate::domain::waiter::WaitOutcome;
use crate::ports::{EndpointRegistry, QueryTransport};
use shared_types::{
    ActionType, CorrelationKey, ElementId, ElementRecord, FocusMoveDirection, FocusType,
    OutboundQuery, QueryArgs, QueryKind, SearchMode, WindowId,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Issues queries for one channel.
pub struct QueryDispatcher {
    channel_id: i32,
    allocator: RequestIdAllocator,
    pending: Arc<PendingRequestTable>,
    transport: Arc<dyn QueryTransport>,
    registry: Arc<dyn EndpointRegistry>,
    request_timeout: Duration,
}

impl QueryDispatcher {
    pub fn new(
        channel_id: i32,
        pending: Arc<PendingRequestTable>,
        transport: Arc<dyn QueryTransport>,
        registry: Arc<dyn EndpointRegistry>,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            channel_id,
            allocator: RequestIdAllocator::new(),
            pending,
            transport,
            registry,
            request_timeout: config.request_timeout,
        }
    }

    /// Identity of the channel this dispatcher serves.
    pub fn channel_id(&self) -> i32 {
        self.channel_id
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Number of queries currently awaiting a result.
    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }

    /// Search for an element and, depending on `mode`, its relatives.
    ///
    /// Results larger than one peer batch arrive in chunks and are returned
    /// reassembled in delivery order.
    pub async fn search_element_infos_by_accessibility_id(
        &self,
        window_id: WindowId,
        element_id: ElementId,
        mode: SearchMode,
    ) -> QueryResult<Vec<ElementRecord>> {
        let args = QueryArgs::SearchById { element_id, mode };
        let (key, reply) = self.dispatch(window_id, args).await?;
        expect_records(key, QueryKind::SearchById, reply)
    }

    /// Search the subtree under `element_id` for elements showing `text`.
    pub async fn search_element_infos_by_text(
        &self,
        window_id: WindowId,
        element_id: ElementId,
        text: impl Into<String>,
    ) -> QueryResult<Vec<ElementRecord>> {
        let args = QueryArgs::SearchByText {
            element_id,
            text: text.into(),
        };
        let (key, reply) = self.dispatch(window_id, args).await?;
        expect_records(key, QueryKind::SearchByText, reply)
    }

    /// Find the element holding focus of `focus_type`.
    pub async fn find_focused_element_info(
        &self,
        window_id: WindowId,
        element_id: ElementId,
        focus_type: FocusType,
    ) -> QueryResult<ElementRecord> {
        let args = QueryArgs::FindFocused {
            element_id,
            focus_type,
        };
        let (key, reply) = self.dispatch(window_id, args).await?;
        expect_record(key, QueryKind::FindFocused, reply)
    }

    /// Find the element focus would move to from `element_id` in `direction`.
    pub async fn focus_move_search(
        &self,
        window_id: WindowId,
        element_id: ElementId,
        direction: FocusMoveDirection,
    ) -> QueryResult<ElementRecord> {
        let args = QueryArgs::FocusMove {
            element_id,
            direction,
        };
        let (key, reply) = self.dispatch(window_id, args).await?;
        expect_record(key, QueryKind::FocusMove, reply)
    }

    /// Perform `action` on an element. `Ok(false)` means the peer ran the
    /// action and reported failure.
    pub async fn execute_action(
        &self,
        window_id: WindowId,
        element_id: ElementId,
        action: ActionType,
        arguments: BTreeMap<String, String>,
    ) -> QueryResult<bool> {
        let args = QueryArgs::ExecuteAction {
            element_id,
            action,
            arguments,
        };
        let (key, reply) = self.dispatch(window_id, args).await?;
        match reply {
            QueryReply::ActionOutcome(succeeded) => Ok(succeeded),
            other => Err(unexpected_reply(key, QueryKind::ExecuteAction, &other)),
        }
    }

    async fn dispatch(
        &self,
        window_id: WindowId,
        args: QueryArgs,
    ) -> QueryResult<(CorrelationKey, QueryReply)> {
        let kind = args.kind();

        let endpoint = self
            .registry
            .resolve(window_id)
            .filter(|endpoint| self.registry.is_connected(endpoint))
            .ok_or_else(|| {
                debug!(window_id = %window_id, kind = %kind, "No live endpoint for window");
                QueryError::ChannelUnavailable { window_id }
            })?;

        let key = self.allocator.next(window_id)?;

        let Some(waiter) = self.pending.register(key, kind, self.request_timeout) else {
            error!(
                correlation_key = %key,
                kind = %kind,
                pending = self.pending.pending_count(),
                "Correlation key already pending"
            );
            return Err(QueryError::DuplicateRequest {
                correlation_key: key,
            });
        };

        let query = OutboundQuery {
            correlation_key: key,
            window_id,
            args,
        };
        let started = Instant::now();
        if let Err(e) = self.transport.send_query(&endpoint, query).await {
            self.pending.cancel(&key);
            warn!(correlation_key = %key, kind = %kind, error = %e, "Failed to send query");
            return Err(QueryError::SendFailed {
                correlation_key: key,
                kind,
                reason: e.to_string(),
            });
        }

        // The wait bound starts once the query is on the wire
        let deadline = self
            .pending
            .arm(&key)
            .unwrap_or_else(|| Instant::now() + self.request_timeout);

        let reply = match waiter.wait_until(deadline).await {
            WaitOutcome::Ready(reply) => reply,
            outcome => {
                if matches!(outcome, WaitOutcome::Cancelled) {
                    // Entry dropped without a result (table cleared); the caller
                    // still observes its own bound
                    debug!(
                        correlation_key = %key,
                        kind = %kind,
                        "Pending entry dropped before result"
                    );
                    tokio::time::sleep_until(deadline).await;
                }
                // The router normally removes the entry; a late result is then a table miss
                self.pending.expire(&key);
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(correlation_key = %key, kind = %kind, elapsed_ms, "Query timed out");
                return Err(QueryError::Timeout {
                    correlation_key: key,
                    kind,
                    elapsed_ms,
                });
            }
        };

        debug!(
            correlation_key = %key,
            kind = %kind,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query answered"
        );
        Ok((key, reply))
    }
}

fn expect_records(
    key: CorrelationKey,
    kind: QueryKind,
    reply: QueryReply,
) -> QueryResult<Vec<ElementRecord>> {
    match reply {
        QueryReply::Records(records) => {
            if let Some(position) = records.iter().position(|r| !r.is_valid()) {
                return Err(invalid(
                    key,
                    kind,
                    format!("record {} of {} has an undefined id", position, records.len()),
                ));
            }
            Ok(records)
        }
        other => Err(unexpected_reply(key, kind, &other)),
    }
}

fn expect_record(
    key: CorrelationKey,
    kind: QueryKind,
    reply: QueryReply,
) -> QueryResult<ElementRecord> {
    match reply {
        QueryReply::Record(record) if record.is_valid() => Ok(record),
        QueryReply::Record(_) => Err(invalid(key, kind, "element not found".into())),
        other => Err(unexpected_reply(key, kind, &other)),
    }
}

fn unexpected_reply(key: CorrelationKey, kind: QueryKind, reply: &QueryReply) -> QueryError {
    let shape = match reply {
        QueryReply::Records(_) => "record list",
        QueryReply::Record(_) => "single record",
        QueryReply::ActionOutcome(_) => "action outcome",
    };
    invalid(key, kind, format!("unexpected {} reply", shape))
}

fn invalid(key: CorrelationKey, kind: QueryKind, reason: String) -> QueryError {
    warn!(correlation_key = %key, kind = %kind, reason = %reason, "Invalid remote result");
    QueryError::InvalidRemoteResult {
        correlation_key: key,
        kind,
        reason,
    }
}
