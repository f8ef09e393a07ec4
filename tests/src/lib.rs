//! # Access-Bridge Test Suite
//!
//! End-to-end scenarios that drive the query bridge against a scripted peer.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── mock_peer.rs     # Scripted remote element operator
//!     └── e2e_queries.rs   # Query scenarios through dispatcher and router
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p a11y-tests
//! cargo test -p a11y-tests integration::e2e_queries::
//! ```

pub mod integration;
