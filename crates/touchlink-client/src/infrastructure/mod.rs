//! Infrastructure layer for touchlink-client: the two transport bindings.

pub mod udp_transport;
pub mod ws_transport;

use std::future::Future;

use touchlink_core::TransportKind;

pub use udp_transport::UdpTransport;
pub use ws_transport::WsTransport;

use crate::application::transport::Transport;
use crate::domain::{ClientConfig, ClientError};

/// Opens the transport `config` asks for.
///
/// # Errors
///
/// Returns [`ClientError::Connect`] if the transport cannot be opened.
pub async fn connect(config: &ClientConfig) -> Result<Box<dyn Transport>, ClientError> {
    match config.transport {
        TransportKind::Datagram => Ok(Box::new(UdpTransport::connect(config.server_addr).await?)),
        TransportKind::Message => Ok(Box::new(WsTransport::connect(&config.ws_url()).await?)),
    }
}

/// An owned future for [`ClientHandle::spawn`](crate::application::ClientHandle::spawn).
pub fn connector(
    config: ClientConfig,
) -> impl Future<Output = Result<Box<dyn Transport>, ClientError>> + Send + 'static {
    async move { connect(&config).await }
}
