//! Domain layer for touchlink-server.
//!
//! Pure types shared by the application and infrastructure layers:
//!
//! - [`config::ServerConfig`] – every runtime setting, loadable from TOML.
//! - [`session::Peer`] and [`session::SessionSnapshot`] – who holds the slot
//!   and what the host knows about them.

pub mod config;
pub mod session;

pub use config::{ConfigError, ServerConfig};
pub use session::{Peer, SessionId, SessionSnapshot, SlotState};
