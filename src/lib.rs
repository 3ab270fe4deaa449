/// Service lifecycle: bus, shutdown signal and network frontend together.
pub mod app;
/// Async TCP client for the subpub server.
pub mod client;
/// Server configuration loading.
pub mod config;
/// Flexible logging (formatting, filters, sinks).
pub mod logging;
/// Network stack: ZSP protocol and Tokio-based server.
pub mod network;
/// Pub/Sub: Bus, Subscription, Handler.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

pub use app::App;
/// Client API.
pub use client::{ClientConfig, ClientSubscription, Message, SubPubClient};
/// config
pub use config::Settings;
/// Logging setup.
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
/// Network server and protocol.
pub use network::{server, zsp};
/// Pub/Sub API.
pub use pubsub::{
    handler_fn, Bus, BusConfig, BusStats, Handler, ShutdownSignal, StatsSnapshot, StreamForwarder,
    Subscription, SubscriptionId,
};
/// Error types.
pub use subpub_error::{BusError, BusResult, ClientError, ClientResult, ErrorExt, StatusCode};
