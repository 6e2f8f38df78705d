//! touchlink device probe: entry point.
//!
//! A headless stand-in for the phone UI.  It connects to a host, waits for
//! the operator to approve it, then drags a synthetic finger in a circle so
//! the host pointer visibly moves.  Useful for checking a host install
//! without a phone at hand.
//!
//! # Usage
//!
//! ```text
//! touchlink-client [OPTIONS]
//!
//! Options:
//!   --host <IP>             Host address [default: 127.0.0.1]
//!   --port <PORT>           Host port [default: 9002 for udp, 9001 for ws]
//!   --transport <udp|ws>    Transport [default: udp]
//!   --width <PX>            Viewport width announced to the host [default: 390]
//!   --height <PX>           Viewport height announced to the host [default: 844]
//!   --scale <PCT>           Pad size, percent of the shorter side [default: 100]
//!   --mode <MODE>           absolute | relative [default: absolute]
//!   --frame-rate <HZ>       Most MOVEs per second [default: 60]
//!   --duration-secs <S>     Stop after this long (0 = until Ctrl+C) [default: 0]
//!   --log-level <LEVEL>     Fallback when RUST_LOG is not set [default: info]
//! ```
//!
//! Each flag also reads `TOUCHLINK_<FLAG>` from the environment, e.g.
//! `TOUCHLINK_TRANSPORT=ws`.

use std::f64::consts::TAU;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use touchlink_client::application::ClientHandle;
use touchlink_client::domain::{ClientConfig, ClientEvent};
use touchlink_client::infrastructure::connector;
use touchlink_core::{InputMode, MonotonicClock, SessionState, TouchSample, TransportKind, Viewport};

/// Time between synthetic touch samples (about 60 Hz).
const SAMPLE_PERIOD: Duration = Duration::from_millis(16);

/// Samples per full circle of the probe gesture.
const SAMPLES_PER_TURN: u64 = 120;

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TransportArg {
    Udp,
    Ws,
}

impl TransportArg {
    fn kind(self) -> TransportKind {
        match self {
            TransportArg::Udp => TransportKind::Datagram,
            TransportArg::Ws => TransportKind::Message,
        }
    }

    fn default_port(self) -> u16 {
        match self {
            TransportArg::Udp => 9002,
            TransportArg::Ws => 9001,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Absolute,
    Relative,
}

impl From<ModeArg> for InputMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Absolute => InputMode::Absolute,
            ModeArg::Relative => InputMode::Relative,
        }
    }
}

/// touchlink device probe.
#[derive(Debug, Parser)]
#[command(
    name = "touchlink-client",
    about = "Connects to a touchlink host and drives its pointer with a synthetic gesture",
    version
)]
struct Cli {
    /// Host IP address.
    #[arg(long, default_value = "127.0.0.1", env = "TOUCHLINK_HOST")]
    host: IpAddr,

    /// Host port; defaults to the standard port of the chosen transport.
    #[arg(long, env = "TOUCHLINK_PORT")]
    port: Option<u16>,

    #[arg(long, value_enum, default_value_t = TransportArg::Udp, env = "TOUCHLINK_TRANSPORT")]
    transport: TransportArg,

    /// Viewport width announced in HELLO.
    #[arg(long, default_value_t = 390, env = "TOUCHLINK_WIDTH")]
    width: u16,

    /// Viewport height announced in HELLO.
    #[arg(long, default_value_t = 844, env = "TOUCHLINK_HEIGHT")]
    height: u16,

    /// Pad size as a percentage of the shorter side of the touch surface.
    #[arg(long, default_value_t = 100.0, env = "TOUCHLINK_SCALE")]
    scale: f64,

    #[arg(long, value_enum, default_value_t = ModeArg::Absolute, env = "TOUCHLINK_MODE")]
    mode: ModeArg,

    /// Upper bound on MOVE packets per second.
    #[arg(long, default_value_t = 60, env = "TOUCHLINK_FRAME_RATE")]
    frame_rate: u32,

    /// Stop after this many seconds; 0 runs until Ctrl+C.
    #[arg(long, default_value_t = 0, env = "TOUCHLINK_DURATION_SECS")]
    duration_secs: u64,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info", env = "TOUCHLINK_LOG_LEVEL")]
    log_level: String,
}

impl Cli {
    fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let viewport = Viewport::new(self.width, self.height)
            .context("viewport width and height must be non-zero")?;
        let port = self.port.unwrap_or_else(|| self.transport.default_port());
        let config = ClientConfig {
            server_addr: SocketAddr::new(self.host, port),
            transport: self.transport.kind(),
            viewport,
            pad_scale_percent: self.scale,
            mode: self.mode.into(),
            frame_rate: self.frame_rate,
            ..ClientConfig::default()
        };
        config.validate().context("invalid client configuration")?;
        Ok(config)
    }

    fn duration(&self) -> Option<Duration> {
        (self.duration_secs > 0).then(|| Duration::from_secs(self.duration_secs))
    }
}

// ── Probe gesture ─────────────────────────────────────────────────────────────

/// The `step`-th sample of a circle around the centre of the touch surface.
fn probe_sample(viewport: Viewport, step: u64) -> TouchSample {
    let (w, h) = (f64::from(viewport.width), f64::from(viewport.height));
    let radius = 0.3 * w.min(h);
    let angle = TAU * (step % SAMPLES_PER_TURN) as f64 / SAMPLES_PER_TURN as f64;
    TouchSample::active(
        w / 2.0 + radius * angle.cos(),
        h / 2.0 + radius * angle.sin(),
        step * SAMPLE_PERIOD.as_millis() as u64,
    )
}

/// Resolves on Ctrl+C or once `limit` has passed.
async fn shutdown_signal(limit: Option<Duration>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C signal: {e}");
            std::future::pending::<()>().await;
        }
    };
    let timer = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C"),
        () = timer => info!("probe duration elapsed"),
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = cli.client_config()?;
    info!(
        "touchlink probe connecting to {} over {}",
        config.server_addr, config.transport
    );

    let viewport = config.viewport;
    let (handle, mut events) = ClientHandle::spawn(
        config.clone(),
        Arc::new(MonotonicClock::new()),
        connector(config),
    )?;

    let shutdown = shutdown_signal(cli.duration());
    tokio::pin!(shutdown);

    let mut samples = interval(SAMPLE_PERIOD);
    samples.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut connected = false;
    let mut step = 0u64;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ClientEvent::StateChanged(state)) => {
                    info!(%state, "session");
                    connected = state == SessionState::Connected;
                    if state.is_terminal() {
                        break;
                    }
                }
                Some(ClientEvent::HostScreen(size)) => {
                    info!("host screen is {}x{}", size.width, size.height);
                }
                Some(ClientEvent::RoundTrip { rtt_ms, .. }) => debug!(rtt_ms, "round trip"),
                Some(ClientEvent::SendRate(rate)) => debug!(rate, "moves per second"),
                None => break,
            },
            _ = samples.tick(), if connected => {
                handle.submit(probe_sample(viewport, step));
                step += 1;
            }
            () = &mut shutdown => break,
        }
    }

    let state = handle.disconnect().await;
    info!(moves_offered = step, "probe stopped ({state})");
    if state.is_terminal() {
        anyhow::bail!("session ended: {state}");
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
