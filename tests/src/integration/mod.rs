//! Cross-crate integration scenarios.

pub mod e2e_queries;
pub mod mock_peer;
