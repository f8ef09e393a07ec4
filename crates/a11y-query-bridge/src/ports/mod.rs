//! Ports to the external collaborators of the bridge.

pub mod outbound;

pub use outbound::{EndpointHandle, EndpointRegistry, QueryTransport, ResultReceiver, TransportError};
