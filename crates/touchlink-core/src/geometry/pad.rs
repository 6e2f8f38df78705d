//! Pad sizing, touch localization, and absolute mapping.
//!
//! # Coordinate spaces (for beginners)
//!
//! Three rectangles are involved in turning a finger position into a pointer
//! position:
//!
//! ```text
//! ┌──────────── container (touch surface) ────────────┐
//! │          ┌──────── pad ────────┐                   │
//! │          │   ● touch           │                   │
//! │          └─────────────────────┘                   │
//! └────────────────────────────────────────────────────┘
//!
//!   container px  ──map_to_pad_coordinates──►  pad-local px
//!   pad-local px  ──absolute_to_screen─────►  viewport px (sent on the wire)
//! ```
//!
//! The pad is centered in the container and shaped like the host screen so
//! that moving a finger across the whole pad sweeps the whole host screen.
//! The server then scales viewport pixels to its own screen.

use serde::{Deserialize, Serialize};

use crate::protocol::packet::{ScreenSize, Viewport};

/// Smallest allowed pad scale, in percent of the container's shorter side.
pub const MIN_SCALE_PERCENT: f64 = 10.0;

/// Largest allowed pad scale, in percent of the container's shorter side.
pub const MAX_SCALE_PERCENT: f64 = 100.0;

const MIN_ASPECT: f64 = 1e-6;
const MAX_ASPECT: f64 = 1e6;

/// Gap kept below the pad's far edge so pad-local coordinates stay strictly
/// inside `[0, pad)`.
pub const PAD_EDGE_EPSILON: f64 = 1e-3;

/// A rectangle size in fractional (CSS or device) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Computed pad size in whole pixels.  Both dimensions are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadSize {
    pub width: u32,
    pub height: u32,
}

/// Computes the pad size for a container, matching the host's aspect ratio.
///
/// 1. `pct` is clamped to `[10, 100]`.
/// 2. The longer pad side is `round(max(1, min(container_w, container_h)) * pct / 100)`,
///    floored at 1.
/// 3. The aspect is `host_w / host_h` when both are positive, else 1:1,
///    clamped to `[1e-6, 1e6]`.
/// 4. The shorter side is derived from the aspect and rounded, floored at 1.
///
/// # Examples
///
/// ```rust
/// use touchlink_core::geometry::{compute_pad_size, PadSize};
///
/// let pad = compute_pad_size(1000.0, 800.0, 1920.0, 1080.0, 50.0);
/// assert_eq!(pad, PadSize { width: 400, height: 225 });
/// ```
pub fn compute_pad_size(
    container_w: f64,
    container_h: f64,
    host_w: f64,
    host_h: f64,
    pct: f64,
) -> PadSize {
    let pct = if pct.is_nan() {
        MAX_SCALE_PERCENT
    } else {
        pct.clamp(MIN_SCALE_PERCENT, MAX_SCALE_PERCENT)
    };
    let base = container_w.min(container_h).max(1.0);
    let max_side = (base * pct / 100.0).round().max(1.0);

    let aspect = if host_w > 0.0 && host_h > 0.0 {
        (host_w / host_h).clamp(MIN_ASPECT, MAX_ASPECT)
    } else {
        1.0
    };

    let (w, h) = if aspect >= 1.0 {
        (max_side, (max_side / aspect).round())
    } else {
        ((max_side * aspect).round(), max_side)
    };

    PadSize {
        width: w.max(1.0) as u32,
        height: h.max(1.0) as u32,
    }
}

/// Converts a touch point in container coordinates to pad-local coordinates.
///
/// The pad is centered in the container; the result is clamped to
/// `[0, pad - ε]` on each axis so that it is always strictly inside the pad.
pub fn map_to_pad_coordinates(
    touch_x: f64,
    touch_y: f64,
    container_w: f64,
    container_h: f64,
    pad_w: f64,
    pad_h: f64,
) -> (f64, f64) {
    (
        localize_axis(touch_x, container_w, pad_w),
        localize_axis(touch_y, container_h, pad_h),
    )
}

fn localize_axis(touch: f64, container: f64, pad: f64) -> f64 {
    let offset = ((container - pad) / 2.0).max(0.0);
    let upper = (pad - PAD_EDGE_EPSILON).max(0.0);
    let local = touch - offset;
    if local.is_nan() {
        return 0.0;
    }
    local.clamp(0.0, upper)
}

/// Maps a pad-local point to viewport pixels, ratio for ratio.
///
/// Each axis becomes `round(clamp(local / max(1, pad), 0, 1) * client)`,
/// clamped to `[0, client - 1]`.  The server interprets the result as a
/// fraction of the viewport and applies it to its own screen.
pub fn absolute_to_screen(
    local_x: f64,
    local_y: f64,
    pad_w: f64,
    pad_h: f64,
    client_w: u16,
    client_h: u16,
) -> (u16, u16) {
    (
        scale_axis(local_x, pad_w, client_w),
        scale_axis(local_y, pad_h, client_h),
    )
}

fn scale_axis(local: f64, pad: f64, client: u16) -> u16 {
    let ratio = local / pad.max(1.0);
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
    let max_px = f64::from(client.saturating_sub(1));
    (ratio * f64::from(client)).round().clamp(0.0, max_px) as u16
}

// ── PadGeometry ───────────────────────────────────────────────────────────────

/// The pad derived for one container, host screen, and scale.
///
/// Not stored anywhere persistent: rebuild it whenever the container is
/// resized, the host size arrives, or the user changes the scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PadGeometry {
    pub container: Extent,
    pub scale_percent: f64,
    pub pad: PadSize,
}

impl PadGeometry {
    /// Builds the geometry; `host` is `None` until the server reports it.
    pub fn new(container: Extent, host: Option<ScreenSize>, scale_percent: f64) -> Self {
        let (host_w, host_h) = host
            .map(|s| (f64::from(s.width), f64::from(s.height)))
            .unwrap_or((0.0, 0.0));
        let pad = compute_pad_size(
            container.width,
            container.height,
            host_w,
            host_h,
            scale_percent,
        );
        Self {
            container,
            scale_percent,
            pad,
        }
    }

    pub fn pad_width(&self) -> f64 {
        f64::from(self.pad.width)
    }

    pub fn pad_height(&self) -> f64 {
        f64::from(self.pad.height)
    }

    /// Container point → pad-local point.
    pub fn localize(&self, touch_x: f64, touch_y: f64) -> (f64, f64) {
        map_to_pad_coordinates(
            touch_x,
            touch_y,
            self.container.width,
            self.container.height,
            self.pad_width(),
            self.pad_height(),
        )
    }

    /// Pad-local point → viewport pixels.
    pub fn to_screen(&self, local: (f64, f64), viewport: Viewport) -> (u16, u16) {
        absolute_to_screen(
            local.0,
            local.1,
            self.pad_width(),
            self.pad_height(),
            viewport.width,
            viewport.height,
        )
    }
}
