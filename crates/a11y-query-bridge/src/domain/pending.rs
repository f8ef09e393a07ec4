//! Pending Request Table - correlation of outbound queries with their results.
//!
//! Maps correlation keys to the waiter of the caller that issued the query.
//! Entries and chunk accumulations share a single mutex; it is held only for
//! the map mutation and never while a waiter is signalled.

use crate::domain::chunker::{ChunkProgress, ResultChunker};
use crate::domain::waiter::{result_waiter, ResultWaiter, WaiterHandle};
use parking_lot::Mutex;
use shared_types::{CorrelationKey, ElementRecord, QueryKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Payload handed to a waiting caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryReply {
    /// Search results (by id, after reassembly, or by text)
    Records(Vec<ElementRecord>),
    /// Focus lookups
    Record(ElementRecord),
    /// Action outcome
    ActionOutcome(bool),
}

/// A query waiting for its result
#[derive(Debug)]
pub struct PendingRequest {
    /// Handle used to release the caller
    waiter: WaiterHandle<QueryReply>,
    /// Kind of query, checked against the result kind
    kind: QueryKind,
    /// When the request was registered
    created_at: Instant,
    /// Wait bound for this request
    timeout: Duration,
    /// Set once the query is on the wire and the caller starts waiting
    deadline: Option<Instant>,
}

impl PendingRequest {
    pub fn new(waiter: WaiterHandle<QueryReply>, kind: QueryKind, timeout: Duration) -> Self {
        Self {
            waiter,
            kind,
            created_at: Instant::now(),
            timeout,
            deadline: None,
        }
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Eligible for the sweep: the caller is gone, or its armed deadline passed.
    ///
    /// An unarmed request is still being sent and is never expired.
    fn is_expired(&self, now: Instant) -> bool {
        self.waiter.is_abandoned() || self.deadline.is_some_and(|deadline| now > deadline)
    }
}

/// Result of looking up a key for a single-delivery result.
#[derive(Debug)]
pub enum Take {
    /// Entry removed and handed over.
    Taken(PendingRequest),
    /// No entry for the key.
    Unknown,
    /// Entry exists but was issued for a different kind; left in place.
    KindMismatch { expected: QueryKind },
}

/// Result of feeding a search-by-id chunk through the table.
#[derive(Debug)]
pub enum ChunkRouting {
    /// Terminal chunk seen; entry removed, all records assembled.
    Complete(PendingRequest, Vec<ElementRecord>),
    /// More chunks follow; entry stays registered.
    Partial { accumulated: usize },
    /// No entry for the key; any accumulation for it was dropped.
    Unknown,
    /// Entry exists but was issued for a different kind; left in place.
    KindMismatch { expected: QueryKind },
}

/// Statistics for the pending request table
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total requests registered
    pub total_registered: AtomicU64,
    /// Total requests completed
    pub total_completed: AtomicU64,
    /// Total requests timed out
    pub total_timeouts: AtomicU64,
    /// Total inbound results discarded (late, unknown or mismatched)
    pub total_discarded: AtomicU64,
    /// Total requests cancelled (send failure, clear, waiter dropped)
    pub total_cancelled: AtomicU64,
}

#[derive(Debug, Default)]
struct TableState {
    entries: HashMap<CorrelationKey, PendingRequest>,
    chunker: ResultChunker,
}

/// Registry of pending requests for one channel.
///
/// Flow:
/// 1. Dispatcher allocates a key and calls `register()` to get a waiter
/// 2. Dispatcher sends the query carrying the key
/// 3. Router receives result event(s) and calls `take_matching()` or
///    `accumulate_chunk()`, then `deliver()`
/// 4. Dispatcher's waiter is released, or times out and calls `expire()`
#[derive(Debug, Default)]
pub struct PendingRequestTable {
    state: Mutex<TableState>,
    stats: PendingStats,
}

impl PendingRequestTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `request` under `key` if the key is absent.
    ///
    /// Never overwrites; returns whether the request was inserted.
    pub fn insert(&self, key: CorrelationKey, request: PendingRequest) -> bool {
        let inserted = {
            let mut state = self.state.lock();
            if state.entries.contains_key(&key) {
                false
            } else {
                state.entries.insert(key, request);
                true
            }
        };
        if inserted {
            self.stats.total_registered.fetch_add(1, Ordering::Relaxed);
        }
        inserted
    }

    /// Create a waiter for `key` and register it.
    ///
    /// Returns `None` if the key is already pending.
    pub fn register(
        &self,
        key: CorrelationKey,
        kind: QueryKind,
        timeout: Duration,
    ) -> Option<ResultWaiter<QueryReply>> {
        let (handle, waiter) = result_waiter();
        if !self.insert(key, PendingRequest::new(handle, kind, timeout)) {
            return None;
        }

        debug!(
            correlation_key = %key,
            kind = %kind,
            "Registered pending request"
        );
        Some(waiter)
    }

    /// Start the wait bound of `key` now that its query has been sent.
    ///
    /// Returns the deadline, or `None` if the entry is already gone (answered
    /// or cleared before the send returned).
    pub fn arm(&self, key: &CorrelationKey) -> Option<Instant> {
        let mut state = self.state.lock();
        let request = state.entries.get_mut(key)?;
        let deadline = Instant::now() + request.timeout;
        request.deadline = Some(deadline);
        Some(deadline)
    }

    /// Atomically look up and remove `key`, dropping any chunk accumulation.
    pub fn take_and_remove(&self, key: &CorrelationKey) -> Option<PendingRequest> {
        let mut state = self.state.lock();
        state.chunker.discard(key);
        state.entries.remove(key)
    }

    /// Remove `key` only if it was issued for `kind`.
    pub fn take_matching(&self, key: &CorrelationKey, kind: QueryKind) -> Take {
        let take = {
            let mut state = self.state.lock();
            match state.entries.get(key).map(PendingRequest::kind) {
                None => Take::Unknown,
                Some(expected) if expected != kind => Take::KindMismatch { expected },
                Some(_) => match state.entries.remove(key) {
                    Some(request) => Take::Taken(request),
                    None => Take::Unknown,
                },
            }
        };
        if !matches!(take, Take::Taken(_)) {
            self.stats.total_discarded.fetch_add(1, Ordering::Relaxed);
        }
        take
    }

    /// Feed a search-by-id chunk for `key`.
    ///
    /// The entry stays registered until the terminal chunk, which removes it in
    /// the same critical section that completes the accumulation, so only one
    /// chunk can ever complete a request.
    pub fn accumulate_chunk(
        &self,
        key: &CorrelationKey,
        records: Vec<ElementRecord>,
        chunk_index: i32,
    ) -> ChunkRouting {
        let routing = {
            let mut state = self.state.lock();
            match state.entries.get(key).map(PendingRequest::kind) {
                None => {
                    state.chunker.discard(key);
                    ChunkRouting::Unknown
                }
                Some(expected) if expected != QueryKind::SearchById => {
                    ChunkRouting::KindMismatch { expected }
                }
                Some(_) => match state.chunker.accumulate(*key, records, chunk_index) {
                    ChunkProgress::Partial { accumulated } => ChunkRouting::Partial { accumulated },
                    ChunkProgress::Complete(all) => match state.entries.remove(key) {
                        Some(request) => ChunkRouting::Complete(request, all),
                        None => ChunkRouting::Unknown,
                    },
                },
            }
        };
        if matches!(
            routing,
            ChunkRouting::Unknown | ChunkRouting::KindMismatch { .. }
        ) {
            self.stats.total_discarded.fetch_add(1, Ordering::Relaxed);
        }
        routing
    }

    /// Release the caller of a removed request with `reply`.
    ///
    /// Returns false if the caller already stopped waiting.
    pub fn deliver(&self, key: CorrelationKey, request: PendingRequest, reply: QueryReply) -> bool {
        let kind = request.kind;
        let response_time = request.age();

        match request.waiter.signal(reply) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_key = %key,
                    kind = %kind,
                    response_time_ms = response_time.as_millis() as u64,
                    "Completed pending request"
                );
                true
            }
            Err(_) => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_key = %key,
                    kind = %kind,
                    "Pending request waiter dropped"
                );
                false
            }
        }
    }

    /// Remove `key` after its caller timed out.
    ///
    /// Returns true if the entry was still present.
    pub fn expire(&self, key: &CorrelationKey) -> bool {
        self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
        self.take_and_remove(key).is_some()
    }

    /// Remove `key` without delivering, e.g. after a failed send.
    pub fn cancel(&self, key: &CorrelationKey) -> bool {
        if self.take_and_remove(key).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Drop every entry and accumulation.
    ///
    /// No result is delivered to outstanding waiters; their callers still run
    /// to their own deadline. Returns the number of entries dropped.
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut state = self.state.lock();
            state.chunker.clear();
            std::mem::take(&mut state.entries)
        };
        let count = dropped.len();
        // Waiter handles are dropped here, outside the lock
        drop(dropped);
        self.stats
            .total_cancelled
            .fetch_add(count as u64, Ordering::Relaxed);
        count
    }

    /// Remove requests whose caller is gone or whose armed deadline passed.
    ///
    /// Requests still being sent are left alone, so the sweep never races a
    /// caller that has yet to start waiting. Returns the number removed.
    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<(CorrelationKey, PendingRequest)> = {
            let mut state = self.state.lock();
            let keys: Vec<CorrelationKey> = state
                .entries
                .iter()
                .filter(|(_, request)| request.is_expired(now))
                .map(|(key, _)| *key)
                .collect();
            keys.into_iter()
                .filter_map(|key| {
                    state.chunker.discard(&key);
                    state.entries.remove(&key).map(|request| (key, request))
                })
                .collect()
        };

        let mut abandoned = 0u64;
        for (key, request) in &expired {
            if request.waiter.is_abandoned() {
                abandoned += 1;
                debug!(
                    correlation_key = %key,
                    kind = %request.kind,
                    "Removing abandoned pending request"
                );
            } else {
                warn!(
                    correlation_key = %key,
                    kind = %request.kind,
                    elapsed_ms = request.age().as_millis() as u64,
                    timeout_ms = request.timeout.as_millis() as u64,
                    "Removing expired pending request"
                );
            }
        }
        self.stats
            .total_cancelled
            .fetch_add(abandoned, Ordering::Relaxed);
        self.stats
            .total_timeouts
            .fetch_add(expired.len() as u64 - abandoned, Ordering::Relaxed);
        expired.len()
    }

    /// Get number of currently pending requests
    pub fn pending_count(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Check if a key is pending
    pub fn is_pending(&self, key: &CorrelationKey) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    /// Number of keys with a partial chunk accumulation
    pub fn accumulations_in_progress(&self) -> usize {
        self.state.lock().chunker.in_progress()
    }

    /// Get statistics
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

/// Background task to clean up expired requests
pub async fn cleanup_task(table: Arc<PendingRequestTable>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        let removed = table.remove_expired();
        if removed > 0 {
            debug!(removed = removed, "Cleaned up expired pending requests");
        }
    }
}
