//! # IPC Message Payloads
//!
//! Outbound queries and inbound result events.
//!
//! ## Design Rules
//!
//! - Every query carries the `CorrelationKey` allocated for it; the peer echoes
//!   that key on every result event it sends back.
//! - Search-by-id results may be split into chunks. The chunk index is
//!   authoritative: a negative index is terminal, never the chunk size.

use crate::entities::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Chunk index marking the last chunk of a multi-chunk transmission.
pub const TERMINAL_CHUNK_INDEX: i32 = -1;

/// Chunk index marking a result delivered in a single chunk.
pub const SINGLE_TRANSMIT_INDEX: i32 = -2;

/// True if no further chunks follow one carrying `chunk_index`.
pub const fn is_terminal_chunk(chunk_index: i32) -> bool {
    chunk_index < 0
}

// =============================================================================
// CORRELATION KEY
// =============================================================================

/// Identifier tying an outbound query to its inbound result(s).
///
/// Layout: window id in bits 16..31, sequence number in bits 0..15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(u32);

impl CorrelationKey {
    pub const SEQUENCE_BITS: u32 = 16;
    pub const SEQUENCE_MASK: u32 = 0x0000_FFFF;

    /// Compose a key. The window id is taken as-is; callers validate it first.
    pub const fn compose(window_id: WindowId, sequence: u16) -> Self {
        Self(((window_id.get() as u32) << Self::SEQUENCE_BITS) | sequence as u32)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn window_id(self) -> WindowId {
        WindowId::new((self.0 >> Self::SEQUENCE_BITS) as i32)
    }

    pub const fn sequence(self) -> u16 {
        (self.0 & Self::SEQUENCE_MASK) as u16
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

// =============================================================================
// QUERIES
// =============================================================================

/// The five kinds of element query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryKind {
    SearchById,
    SearchByText,
    FindFocused,
    FocusMove,
    ExecuteAction,
}

impl QueryKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SearchById => "search_by_accessibility_id",
            Self::SearchByText => "search_by_text",
            Self::FindFocused => "find_focused",
            Self::FocusMove => "focus_move",
            Self::ExecuteAction => "execute_action",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments of a query, one variant per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum QueryArgs {
    SearchById {
        element_id: ElementId,
        mode: SearchMode,
    },
    SearchByText {
        element_id: ElementId,
        text: String,
    },
    FindFocused {
        element_id: ElementId,
        focus_type: FocusType,
    },
    FocusMove {
        element_id: ElementId,
        direction: FocusMoveDirection,
    },
    ExecuteAction {
        element_id: ElementId,
        action: ActionType,
        arguments: BTreeMap<String, String>,
    },
}

impl QueryArgs {
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::SearchById { .. } => QueryKind::SearchById,
            Self::SearchByText { .. } => QueryKind::SearchByText,
            Self::FindFocused { .. } => QueryKind::FindFocused,
            Self::FocusMove { .. } => QueryKind::FocusMove,
            Self::ExecuteAction { .. } => QueryKind::ExecuteAction,
        }
    }

    pub fn element_id(&self) -> ElementId {
        match self {
            Self::SearchById { element_id, .. }
            | Self::SearchByText { element_id, .. }
            | Self::FindFocused { element_id, .. }
            | Self::FocusMove { element_id, .. }
            | Self::ExecuteAction { element_id, .. } => *element_id,
        }
    }
}

/// A query as handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundQuery {
    /// Key the peer must echo on its result(s).
    pub correlation_key: CorrelationKey,
    /// Window whose tree is queried.
    pub window_id: WindowId,
    /// Query arguments.
    pub args: QueryArgs,
}

impl OutboundQuery {
    pub fn kind(&self) -> QueryKind {
        self.args.kind()
    }
}

// =============================================================================
// RESULTS
// =============================================================================

/// Result payload sent back by the peer, one variant per query kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ElementQueryResult {
    /// One chunk of a search-by-id result.
    SearchById {
        records: Vec<ElementRecord>,
        chunk_index: i32,
    },
    SearchByText {
        records: Vec<ElementRecord>,
    },
    FindFocused {
        record: ElementRecord,
    },
    FocusMove {
        record: ElementRecord,
    },
    ExecuteAction {
        succeeded: bool,
    },
}

impl ElementQueryResult {
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::SearchById { .. } => QueryKind::SearchById,
            Self::SearchByText { .. } => QueryKind::SearchByText,
            Self::FindFocused { .. } => QueryKind::FindFocused,
            Self::FocusMove { .. } => QueryKind::FocusMove,
            Self::ExecuteAction { .. } => QueryKind::ExecuteAction,
        }
    }
}

/// An inbound result event as yielded by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEvent {
    /// Key of the query this answers.
    pub correlation_key: CorrelationKey,
    /// Result payload.
    pub result: ElementQueryResult,
}

impl ResultEvent {
    pub fn new(correlation_key: CorrelationKey, result: ElementQueryResult) -> Self {
        Self {
            correlation_key,
            result,
        }
    }
}
