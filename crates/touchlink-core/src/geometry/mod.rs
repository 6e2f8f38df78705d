//! Coordinate mapping engine.
//!
//! Pure functions and one small stateful tracker that turn a finger position
//! on the touch surface into the pointer position sent on the wire.
//!
//! # Absolute vs. relative (for beginners)
//!
//! - **Absolute** mode behaves like a graphics tablet: each point of the pad
//!   corresponds to exactly one point of the host screen.  See
//!   [`pad::absolute_to_screen`].
//! - **Relative** mode behaves like a laptop trackpad: lifting the finger and
//!   putting it down elsewhere does not move the pointer; only dragging does.
//!   See [`relative::RelativeTracker`].
//!
//! Both modes produce coordinates in the device's *viewport* pixel space; the
//! server scales them to the host screen.

pub mod pad;
pub mod relative;

use serde::{Deserialize, Serialize};

pub use pad::{
    absolute_to_screen, compute_pad_size, map_to_pad_coordinates, Extent, PadGeometry, PadSize,
};
pub use relative::{RelativeTracker, RELATIVE_SENSITIVITY};

/// One raw touch observation in container pixels.
///
/// `active == false` marks the end of a gesture (finger lifted or touch
/// cancelled); its coordinates are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchSample {
    pub x: f64,
    pub y: f64,
    /// Monotonic capture time in milliseconds.
    pub timestamp_ms: u64,
    pub active: bool,
}

impl TouchSample {
    /// A finger-down or finger-move sample.
    pub fn active(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            timestamp_ms,
            active: true,
        }
    }

    /// A finger-up sample ending the current gesture.
    pub fn released(timestamp_ms: u64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            timestamp_ms,
            active: false,
        }
    }
}
