//! Query/result plumbing between callers and the remote element operator.
//!
//! The dispatcher sends queries and blocks callers; the router feeds inbound
//! result events back through the pending request table.

pub mod channel;
pub mod dispatcher;
pub mod router;
pub mod splitter;

pub use channel::{
    create_loopback, ChannelReceiver, ChannelSender, InMemoryEndpointRegistry, Loopback,
    RoutedQuery,
};
pub use dispatcher::QueryDispatcher;
pub use router::{CallbackRouter, DiscardReason, RouteOutcome};
pub use splitter::ResultSplitter;
