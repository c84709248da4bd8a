pub mod config;
pub mod controller;
pub mod dispatch_queue;
pub mod error;
pub mod negotiator;
pub mod peer_connection;
pub mod rtc_peer_connection;
pub mod session;
pub mod signaling;
pub mod transport;
pub mod whep_endpoint;

pub use config::WhepConfig;
pub use controller::WhepSignaler;
pub use error::{ConfigurationError, ProtocolError, SignalingError, TransportError};
pub use signaling::{RemoteAnswer, SdpType, SignalingMessage};
