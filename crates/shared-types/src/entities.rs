//! # Core Domain Entities
//!
//! Windows, elements and the typed arguments used to query them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an element inside a window's accessibility tree.
pub type ElementId = i64;

/// Accessibility id reported by the peer when it could not resolve an element.
pub const UNDEFINED_ACCESSIBILITY_ID: ElementId = -1;

// =============================================================================
// WINDOWS
// =============================================================================

/// Identifier of a logical remote endpoint (an accessibility window).
///
/// Construction is unchecked; whether an id may be used for a query is decided
/// by the request id allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(i32);

impl WindowId {
    /// Exclusive upper bound for window ids that can be composed into a key.
    pub const CEILING: i32 = 0x7FFF;

    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i32 {
        self.0
    }

    /// True if `0 < id < CEILING`.
    pub const fn is_composable(self) -> bool {
        self.0 > 0 && self.0 < Self::CEILING
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for WindowId {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

// =============================================================================
// ELEMENTS
// =============================================================================

/// One node of a remote accessibility tree.
///
/// Only `accessibility_id` has meaning to the query layer; the remaining fields
/// are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRecord {
    /// Element id, or [`UNDEFINED_ACCESSIBILITY_ID`] if unresolved.
    pub accessibility_id: ElementId,
    /// Window the element belongs to.
    pub window_id: WindowId,
    /// Parent element id.
    pub parent_id: ElementId,
    /// Component type name (e.g. "Button").
    pub component_type: String,
    /// Visible text content.
    pub text: String,
    /// Direct children.
    pub child_ids: Vec<ElementId>,
}

impl ElementRecord {
    pub fn new(accessibility_id: ElementId, window_id: WindowId) -> Self {
        Self {
            accessibility_id,
            window_id,
            parent_id: UNDEFINED_ACCESSIBILITY_ID,
            component_type: String::new(),
            text: String::new(),
            child_ids: Vec::new(),
        }
    }

    /// A record the peer sends when the element could not be resolved.
    pub fn undefined() -> Self {
        Self::new(UNDEFINED_ACCESSIBILITY_ID, WindowId::new(0))
    }

    pub fn with_component_type(mut self, component_type: impl Into<String>) -> Self {
        self.component_type = component_type.into();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_parent(mut self, parent_id: ElementId) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_children(mut self, child_ids: Vec<ElementId>) -> Self {
        self.child_ids = child_ids;
        self
    }

    /// False if the record carries the undefined-id sentinel.
    pub fn is_valid(&self) -> bool {
        self.accessibility_id != UNDEFINED_ACCESSIBILITY_ID
    }
}

impl Default for ElementRecord {
    fn default() -> Self {
        Self::undefined()
    }
}

// =============================================================================
// QUERY ARGUMENTS
// =============================================================================

/// Prefetch flags for search-by-id. Combine with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchMode(i32);

impl SearchMode {
    /// Only the requested element.
    pub const NONE: Self = Self(0);
    pub const PREDECESSORS: Self = Self(0x1);
    pub const SIBLINGS: Self = Self(0x2);
    pub const CHILDREN: Self = Self(0x4);
    pub const RECURSIVE_CHILDREN: Self = Self(0x8);

    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> i32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for SearchMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Which kind of focus to look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum FocusType {
    /// Input (keyboard) focus.
    Input = 1,
    /// Accessibility focus.
    Accessibility = 2,
}

/// Direction for a focus-move search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum FocusMoveDirection {
    Up = 0x01,
    Down = 0x02,
    Left = 0x04,
    Right = 0x08,
    Forward = 0x10,
    Backward = 0x20,
}

/// Action to perform on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    Focus,
    ClearFocus,
    Select,
    ClearSelection,
    Click,
    LongClick,
    AccessibilityFocus,
    ClearAccessibilityFocus,
    ScrollForward,
    ScrollBackward,
    Copy,
    Paste,
    Cut,
    SetSelection,
    SetText,
    SetCursorPosition,
    NextText,
    PreviousText,
    Unfold,
    Fold,
    NextHtmlItem,
    PreviousHtmlItem,
    Delete,
    Common,
}

impl ActionType {
    /// Wire action code (a single bit).
    pub const fn code(self) -> u32 {
        match self {
            Self::Focus => 0x0000_0001,
            Self::ClearFocus => 0x0000_0002,
            Self::Select => 0x0000_0004,
            Self::ClearSelection => 0x0000_0008,
            Self::Click => 0x0000_0010,
            Self::LongClick => 0x0000_0020,
            Self::AccessibilityFocus => 0x0000_0040,
            Self::ClearAccessibilityFocus => 0x0000_0080,
            Self::ScrollForward => 0x0000_0100,
            Self::ScrollBackward => 0x0000_0200,
            Self::Copy => 0x0000_0400,
            Self::Paste => 0x0000_0800,
            Self::Cut => 0x0000_1000,
            Self::SetSelection => 0x0000_2000,
            Self::SetText => 0x0000_4000,
            Self::SetCursorPosition => 0x0000_8000,
            Self::NextText => 0x0020_0000,
            Self::PreviousText => 0x0040_0000,
            Self::Unfold => 0x0080_0000,
            Self::Fold => 0x0100_0000,
            Self::NextHtmlItem => 0x0200_0000,
            Self::PreviousHtmlItem => 0x0400_0000,
            Self::Delete => 0x0800_0000,
            Self::Common => 0x1000_0000,
        }
    }
}
