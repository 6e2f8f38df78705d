//! Domain layer for touchlink-client: configuration, errors and UI events.
//! No I/O.

pub mod config;
pub mod error;
pub mod event;

pub use config::ClientConfig;
pub use error::ClientError;
pub use event::ClientEvent;
