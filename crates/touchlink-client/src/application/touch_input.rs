//! TouchController: from raw touch samples to viewport coordinates.
//!
//! Combines the pad geometry, the input mode and the relative tracker:
//!
//! ```text
//! TouchSample (container px)
//!     │  PadGeometry::localize
//!     ▼
//! pad-local point
//!     │  Absolute: PadGeometry::to_screen
//!     │  Relative: RelativeTracker::update
//!     ▼
//! (x, y) in the device viewport  →  SendPacer  →  MOVE
//! ```
//!
//! # Mode switching
//!
//! - Absolute → relative: the relative mirror is seeded with the last
//!   absolute position, so the pointer does not jump when the user starts
//!   dragging.
//! - Relative → absolute: the mirror is kept, ready for the next switch.
//!
//! Either way the current gesture ends; the next touch starts a new one.

use touchlink_core::{Extent, InputMode, PadGeometry, RelativeTracker, ScreenSize, TouchSample, Viewport};

#[derive(Debug, Clone)]
pub struct TouchController {
    geometry: PadGeometry,
    container: Extent,
    host: Option<ScreenSize>,
    scale_percent: f64,
    viewport: Viewport,
    mode: InputMode,
    tracker: RelativeTracker,
    last_absolute: Option<(u16, u16)>,
}

impl TouchController {
    /// `container` is the touch surface, `viewport` the coordinate space
    /// announced to the host.
    pub fn new(container: Extent, viewport: Viewport, scale_percent: f64, mode: InputMode) -> Self {
        Self {
            geometry: PadGeometry::new(container, None, scale_percent),
            container,
            host: None,
            scale_percent,
            viewport,
            mode,
            tracker: RelativeTracker::new(),
            last_absolute: None,
        }
    }

    pub fn geometry(&self) -> &PadGeometry {
        &self.geometry
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Rebuilds the pad with the host's aspect ratio.
    pub fn set_host_screen(&mut self, host: ScreenSize) {
        self.host = Some(host);
        self.rebuild();
    }

    /// Rebuilds the pad after the touch surface changed size.
    pub fn resize(&mut self, container: Extent) {
        self.container = container;
        self.rebuild();
    }

    pub fn set_scale(&mut self, scale_percent: f64) {
        self.scale_percent = scale_percent;
        self.rebuild();
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        if mode == self.mode {
            return;
        }
        if mode == InputMode::Relative {
            if let Some((x, y)) = self.last_absolute {
                self.tracker.set_position(x, y);
            }
        }
        self.tracker.reset();
        self.mode = mode;
    }

    /// Maps one sample.  Returns the position to send, or `None` when the
    /// sample produces no motion (finger lifted, or the first touch of a
    /// relative gesture).
    pub fn process(&mut self, sample: &TouchSample) -> Option<(u16, u16)> {
        if !sample.active {
            self.tracker.reset();
            return None;
        }

        let local = self.geometry.localize(sample.x, sample.y);
        match self.mode {
            InputMode::Absolute => {
                let position = self.geometry.to_screen(local, self.viewport);
                self.last_absolute = Some(position);
                Some(position)
            }
            InputMode::Relative => {
                let continuing = self.tracker.in_gesture();
                let position = self.tracker.update(
                    local.0,
                    local.1,
                    self.geometry.pad_width(),
                    self.geometry.pad_height(),
                    self.viewport.width,
                    self.viewport.height,
                );
                continuing.then_some(position)
            }
        }
    }

    fn rebuild(&mut self) {
        self.geometry = PadGeometry::new(self.container, self.host, self.scale_percent);
    }
}
