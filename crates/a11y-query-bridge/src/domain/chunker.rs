//! Reassembly of chunked search-by-id results.
//!
//! Accumulation state is kept per correlation key and evicted on completion or
//! when the owning pending request goes away. The chunker itself is not
//! synchronized; it lives inside the pending request table's lock.

use shared_types::{
    is_terminal_chunk, CorrelationKey, ElementRecord, SINGLE_TRANSMIT_INDEX, TERMINAL_CHUNK_INDEX,
};
use std::collections::HashMap;
use tracing::warn;

/// Result of feeding one chunk into the chunker.
#[derive(Debug, PartialEq, Eq)]
pub enum ChunkProgress {
    /// More chunks follow; `accumulated` records are buffered so far.
    Partial { accumulated: usize },
    /// Terminal chunk seen; all records in arrival order.
    Complete(Vec<ElementRecord>),
}

/// Per-key accumulation buffers.
#[derive(Debug, Default)]
pub struct ResultChunker {
    buffers: HashMap<CorrelationKey, Vec<ElementRecord>>,
}

impl ResultChunker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` to the accumulation for `key`.
    ///
    /// Index 0 and the single-transmit sentinel start a fresh accumulation;
    /// any negative index completes it.
    pub fn accumulate(
        &mut self,
        key: CorrelationKey,
        chunk: Vec<ElementRecord>,
        chunk_index: i32,
    ) -> ChunkProgress {
        let starts_fresh = chunk_index == 0 || chunk_index == SINGLE_TRANSMIT_INDEX;
        if starts_fresh {
            if let Some(stale) = self.buffers.remove(&key) {
                if !stale.is_empty() {
                    warn!(
                        correlation_key = %key,
                        stale_records = stale.len(),
                        chunk_index,
                        "Discarding stale chunk accumulation"
                    );
                }
            }
        }

        if is_terminal_chunk(chunk_index) {
            if chunk_index != TERMINAL_CHUNK_INDEX && chunk_index != SINGLE_TRANSMIT_INDEX {
                warn!(
                    correlation_key = %key,
                    chunk_index,
                    "Unexpected negative chunk index, treating as terminal"
                );
            }
            let records = match self.buffers.remove(&key) {
                Some(mut buffered) => {
                    buffered.extend(chunk);
                    buffered
                }
                None => chunk,
            };
            return ChunkProgress::Complete(records);
        }

        let buffer = self.buffers.entry(key).or_default();
        buffer.extend(chunk);
        ChunkProgress::Partial {
            accumulated: buffer.len(),
        }
    }

    /// Drop the accumulation for `key`, returning how many records it held.
    pub fn discard(&mut self, key: &CorrelationKey) -> Option<usize> {
        self.buffers.remove(key).map(|b| b.len())
    }

    /// Drop all accumulations.
    pub fn clear(&mut self) {
        self.buffers.clear();
    }

    /// Number of keys with a partial accumulation.
    pub fn in_progress(&self) -> usize {
        self.buffers.len()
    }

    /// Records buffered for `key`.
    pub fn buffered(&self, key: &CorrelationKey) -> usize {
        self.buffers.get(key).map_or(0, Vec::len)
    }
}
