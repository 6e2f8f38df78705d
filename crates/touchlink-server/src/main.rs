//! touchlink host service: entry point.
//!
//! Listens for handheld devices on UDP and WebSocket, asks the operator to
//! approve each new device, and moves the host pointer for the one device
//! that holds the session slot.
//!
//! # Usage
//!
//! ```text
//! touchlink-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>              TOML config file [default: touchlink-server.toml]
//!   --bind <IP>                  Address both listeners bind to
//!   --ws-port <PORT>             WebSocket port [default from config: 9001]
//!   --udp-port <PORT>            UDP port [default from config: 9002]
//!   --auto-approve               Skip the operator prompt
//!   --session-timeout-ms <MS>    Inactivity eviction timeout
//!   --host-width <PX>            Screen width reported to devices
//!   --host-height <PX>           Screen height reported to devices
//!   --log-level <LEVEL>          Fallback when RUST_LOG is not set
//! ```
//!
//! Precedence, highest first: CLI flag, environment variable, config file,
//! built-in default.
//!
//! # Environment variable overrides
//!
//! | Variable                       | Flag                   |
//! |--------------------------------|------------------------|
//! | `TOUCHLINK_CONFIG`             | `--config`             |
//! | `TOUCHLINK_BIND`               | `--bind`               |
//! | `TOUCHLINK_WS_PORT`            | `--ws-port`            |
//! | `TOUCHLINK_UDP_PORT`           | `--udp-port`           |
//! | `TOUCHLINK_AUTO_APPROVE`       | `--auto-approve`       |
//! | `TOUCHLINK_SESSION_TIMEOUT_MS` | `--session-timeout-ms` |
//! | `TOUCHLINK_HOST_WIDTH`         | `--host-width`         |
//! | `TOUCHLINK_HOST_HEIGHT`        | `--host-height`        |
//! | `TOUCHLINK_LOG_LEVEL`          | `--log-level`          |

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use touchlink_core::MonotonicClock;
use touchlink_server::application::{approval_worker, ApprovalBroker, PointerDispatcher, SessionService};
use touchlink_server::domain::ServerConfig;
use touchlink_server::infrastructure::{run_sweeper, LoggingPointerSink, StdinPrompt, UdpServer, WsServer};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// touchlink host service.
///
/// Every flag is optional; unset flags keep the value from the config file.
#[derive(Debug, Parser)]
#[command(
    name = "touchlink-server",
    about = "Turns touch gestures from a handheld device into host pointer motion",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.  A missing file means defaults.
    #[arg(long, default_value = "touchlink-server.toml", env = "TOUCHLINK_CONFIG")]
    config: PathBuf,

    /// IP address both listeners bind to (`0.0.0.0` for all interfaces).
    #[arg(long, env = "TOUCHLINK_BIND")]
    bind: Option<String>,

    /// TCP port of the WebSocket listener.
    #[arg(long, env = "TOUCHLINK_WS_PORT")]
    ws_port: Option<u16>,

    /// UDP port of the datagram listener.
    #[arg(long, env = "TOUCHLINK_UDP_PORT")]
    udp_port: Option<u16>,

    /// Approve every device without asking.
    #[arg(long, env = "TOUCHLINK_AUTO_APPROVE")]
    auto_approve: bool,

    /// Evict a connected device after this many silent milliseconds.
    #[arg(long, env = "TOUCHLINK_SESSION_TIMEOUT_MS")]
    session_timeout_ms: Option<u64>,

    /// Host screen width reported to devices.
    #[arg(long, env = "TOUCHLINK_HOST_WIDTH")]
    host_width: Option<u16>,

    /// Host screen height reported to devices.
    #[arg(long, env = "TOUCHLINK_HOST_HEIGHT")]
    host_height: Option<u16>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "TOUCHLINK_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Applies the flags that were given on top of `config`.
    fn apply_to(self, mut config: ServerConfig) -> ServerConfig {
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(port) = self.ws_port {
            config.ws_port = port;
        }
        if let Some(port) = self.udp_port {
            config.udp_port = port;
        }
        if self.auto_approve {
            config.auto_approve = true;
        }
        if let Some(ms) = self.session_timeout_ms {
            config.session_timeout_ms = ms;
        }
        if let Some(width) = self.host_width {
            config.host_width = width;
        }
        if let Some(height) = self.host_height {
            config.host_height = height;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        config
    }

    /// Loads the config file and applies the flags.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let config = ServerConfig::load_or_default(&self.config)
            .with_context(|| format!("failed to load config from {}", self.config.display()))?;
        let config = self.apply_to(config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

// ── Startup banner ────────────────────────────────────────────────────────────

/// The address devices on the LAN should use; loopback if none is found.
fn lan_address() -> IpAddr {
    local_ip_address::local_ip().unwrap_or_else(|e| {
        debug!("no LAN address found ({e}); advertising loopback");
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    })
}

/// URLs a device can connect to, one per transport.
fn device_urls(ip: IpAddr, config: &ServerConfig) -> [String; 2] {
    [
        format!("ws://{ip}:{}/ws", config.ws_port),
        format!("udp://{ip}:{}", config.udp_port),
    ]
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_server_config()?;

    // `RUST_LOG` wins; otherwise use the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .init();

    info!(
        "touchlink server starting: ws={}, udp={}, auto_approve={}",
        config.ws_port, config.udp_port, config.auto_approve
    );

    // ── Collaborators ─────────────────────────────────────────────────────────
    let pointer = PointerDispatcher::spawn(Arc::new(LoggingPointerSink::new(config.host_screen())))
        .context("failed to start pointer dispatcher")?;

    let (broker, approvals) = ApprovalBroker::new(config.auto_approve);
    tokio::spawn(approval_worker(approvals, StdinPrompt::stdio()));

    let service = Arc::new(SessionService::new(
        broker,
        pointer,
        Arc::new(MonotonicClock::new()),
        config.session_timeout(),
    ));

    // ── Listeners ─────────────────────────────────────────────────────────────
    let udp = UdpServer::bind(config.udp_addr()?)
        .await
        .context("failed to start UDP server")?;
    let ws = WsServer::bind(config.ws_addr()?)
        .await
        .context("failed to start WebSocket server")?;

    let [ws_url, udp_url] = device_urls(lan_address(), &config);
    info!("devices can connect at:\n  WebSocket: {ws_url}\n  UDP: {udp_url}");
    info!("press Ctrl+C to stop");

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    let sweeper = tokio::spawn(run_sweeper(
        Arc::clone(&service),
        config.sweep_interval(),
        Arc::clone(&running),
    ));
    let udp_task = tokio::spawn(udp.run(Arc::clone(&service), Arc::clone(&running)));
    ws.run(Arc::clone(&service), Arc::clone(&running)).await;

    udp_task.await.context("UDP task panicked")?;
    sweeper.await.context("sweeper task panicked")?;

    if let Some(session) = service.current() {
        info!(peer = %session.peer, "dropping active session on shutdown");
    }
    info!("touchlink server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
