//! # Shared Types Crate
//!
//! Element records, window identifiers and the query/result messages exchanged
//! between an assistive-technology client and the UI-owning application.
//!
//! ## Design Principles
//!
//! - **Opaque records**: the client only inspects an element's accessibility id
//!   (to detect the "undefined id" sentinel); all other attributes travel as-is.
//! - **Key on every message**: each outbound query and each inbound result
//!   carries the `CorrelationKey` that ties them together.
//! - **Sentinels are explicit**: chunk and element sentinels are named constants,
//!   never magic numbers at the call site.

pub mod entities;
pub mod ipc;

pub use entities::*;
pub use ipc::*;
