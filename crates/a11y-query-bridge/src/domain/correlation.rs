//! Request id allocation.
//!
//! Keys are a wrapping 16-bit sequence composed with the target window id, so
//! callers querying different windows can never collide, and a single window
//! only collides after 2^16 allocations.

use crate::domain::error::AllocError;
use shared_types::{CorrelationKey, WindowId};
use std::sync::atomic::{AtomicU32, Ordering};

/// Allocates correlation keys for outgoing queries.
///
/// Safe to share between threads; allocation is a single atomic increment.
#[derive(Debug, Default)]
pub struct RequestIdAllocator {
    counter: AtomicU32,
}

impl RequestIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the sequence at `sequence` instead of 0.
    pub fn starting_at(sequence: u16) -> Self {
        Self {
            counter: AtomicU32::new(u32::from(sequence)),
        }
    }

    /// Allocate the next key for `window_id`.
    ///
    /// Fails without consuming a sequence number if the window id is not in
    /// `1..WindowId::CEILING`.
    pub fn next(&self, window_id: WindowId) -> Result<CorrelationKey, AllocError> {
        if !window_id.is_composable() {
            return Err(AllocError::InvalidWindow(window_id));
        }

        // u32 wraps at a multiple of 2^16, so masking keeps the sequence contiguous
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed) & CorrelationKey::SEQUENCE_MASK;
        Ok(CorrelationKey::compose(window_id, sequence as u16))
    }
}
