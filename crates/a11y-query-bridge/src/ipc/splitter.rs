//! Peer-side splitting of search-by-id results into bounded chunks.
//!
//! The UI side never sends more than `max_chunk_records` records in one result
//! event. A result that fits in one event carries the single-transmit
//! sentinel. Otherwise chunks are indexed from 0 and the final chunk carries
//! the terminal sentinel.

use crate::domain::config::DEFAULT_MAX_CHUNK_RECORDS;
use shared_types::{
    CorrelationKey, ElementQueryResult, ElementRecord, ResultEvent, SINGLE_TRANSMIT_INDEX,
    TERMINAL_CHUNK_INDEX,
};

/// Splits a full record list into `(records, chunk_index)` deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultSplitter {
    max_chunk_records: usize,
}

impl Default for ResultSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_RECORDS)
    }
}

impl ResultSplitter {
    /// A batch size of 0 is treated as 1.
    pub fn new(max_chunk_records: usize) -> Self {
        Self {
            max_chunk_records: max_chunk_records.max(1),
        }
    }

    pub fn max_chunk_records(&self) -> usize {
        self.max_chunk_records
    }

    /// Split `records` into deliveries, preserving order.
    ///
    /// A list that fits in one batch (including an empty one) becomes a
    /// single-transmit delivery.
    pub fn split(&self, records: Vec<ElementRecord>) -> Vec<(Vec<ElementRecord>, i32)> {
        if records.len() <= self.max_chunk_records {
            return vec![(records, SINGLE_TRANSMIT_INDEX)];
        }

        let mut chunks = Vec::with_capacity(records.len().div_ceil(self.max_chunk_records));
        let mut rest = records.into_iter().peekable();
        let mut index = 0i32;
        while rest.peek().is_some() {
            let chunk: Vec<ElementRecord> = rest.by_ref().take(self.max_chunk_records).collect();
            let chunk_index = if rest.peek().is_some() {
                let current = index;
                index += 1;
                current
            } else {
                TERMINAL_CHUNK_INDEX
            };
            chunks.push((chunk, chunk_index));
        }
        chunks
    }

    /// Split `records` into result events for `key`.
    pub fn to_events(&self, key: CorrelationKey, records: Vec<ElementRecord>) -> Vec<ResultEvent> {
        self.split(records)
            .into_iter()
            .map(|(records, chunk_index)| {
                ResultEvent::new(
                    key,
                    ElementQueryResult::SearchById {
                        records,
                        chunk_index,
                    },
                )
            })
            .collect()
    }
}
