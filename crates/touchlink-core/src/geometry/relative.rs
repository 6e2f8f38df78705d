//! Relative (trackpad-style) mapping with sub-pixel carry.
//!
//! In relative mode the pointer moves by the finger's *displacement*, not to
//! the finger's position.  Two details keep the motion smooth:
//!
//! - **No jump on touch-down.**  The first sample of a gesture only records
//!   where the finger is; motion starts with the second sample.
//! - **No drift.**  Scaled deltas are fractional, but the wire carries whole
//!   pixels.  The fractional remainder ("carry") is kept and added to the
//!   next delta, so a slow drag of 0.3 px per sample still moves the pointer
//!   one pixel every few samples instead of never moving at all.

/// Multiplier applied to raw finger displacement before density scaling.
pub const RELATIVE_SENSITIVITY: f64 = 1.5;

/// Per-gesture state for relative mapping.
///
/// Owned by the caller for the lifetime of the touch stream.  The position
/// mirror survives [`reset`](Self::reset) so a new gesture continues from
/// where the last one left the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct RelativeTracker {
    last: Option<(f64, f64)>,
    carry_x: f64,
    carry_y: f64,
    cur_x: i32,
    cur_y: i32,
    sensitivity: f64,
}

impl Default for RelativeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RelativeTracker {
    /// Creates a tracker with the mirror at the origin.
    pub fn new() -> Self {
        Self::with_sensitivity(RELATIVE_SENSITIVITY)
    }

    /// Creates a tracker with a custom sensitivity multiplier.
    pub fn with_sensitivity(sensitivity: f64) -> Self {
        Self {
            last: None,
            carry_x: 0.0,
            carry_y: 0.0,
            cur_x: 0,
            cur_y: 0,
            sensitivity,
        }
    }

    /// Feeds one pad-local sample and returns the updated pointer position in
    /// viewport pixels.
    ///
    /// The first sample after construction or [`reset`](Self::reset) returns
    /// the mirror unchanged.
    pub fn update(
        &mut self,
        local_x: f64,
        local_y: f64,
        pad_w: f64,
        pad_h: f64,
        client_w: u16,
        client_h: u16,
    ) -> (u16, u16) {
        let Some((prev_x, prev_y)) = self.last.replace((local_x, local_y)) else {
            return self.position();
        };

        let dx = (local_x - prev_x) * self.sensitivity * f64::from(client_w) / pad_w.max(1.0);
        let dy = (local_y - prev_y) * self.sensitivity * f64::from(client_h) / pad_h.max(1.0);

        let step_x = take_whole(&mut self.carry_x, dx);
        let step_y = take_whole(&mut self.carry_y, dy);

        self.cur_x = clamp_to_client(self.cur_x.saturating_add(step_x), client_w);
        self.cur_y = clamp_to_client(self.cur_y.saturating_add(step_y), client_h);
        self.position()
    }

    /// Ends the current gesture: forgets the previous point and zeroes the
    /// carry.  The position mirror is kept.
    pub fn reset(&mut self) {
        self.last = None;
        self.carry_x = 0.0;
        self.carry_y = 0.0;
    }

    /// Force-sets the position mirror, e.g. when switching from absolute to
    /// relative mode.
    pub fn set_position(&mut self, x: u16, y: u16) {
        self.cur_x = i32::from(x);
        self.cur_y = i32::from(y);
    }

    /// Current position mirror.
    pub fn position(&self) -> (u16, u16) {
        (to_u16(self.cur_x), to_u16(self.cur_y))
    }

    /// Fractional carry `(x, y)`; each component lies in `(-1, 1)`.
    pub fn carry(&self) -> (f64, f64) {
        (self.carry_x, self.carry_y)
    }

    /// `true` while a gesture is in progress.
    pub fn in_gesture(&self) -> bool {
        self.last.is_some()
    }
}

/// Adds `delta` to `carry`, removes and returns the whole-pixel part
/// (truncated toward zero).
fn take_whole(carry: &mut f64, delta: f64) -> i32 {
    if !delta.is_finite() {
        return 0;
    }
    *carry += delta;
    let whole = carry.trunc();
    *carry -= whole;
    whole.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

fn clamp_to_client(value: i32, client: u16) -> i32 {
    value.clamp(0, (i32::from(client) - 1).max(0))
}

fn to_u16(value: i32) -> u16 {
    value.clamp(0, i32::from(u16::MAX)) as u16
}
