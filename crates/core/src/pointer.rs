//! Pointer tracking: last known position plus a decaying influence scalar.
//!
//! The host never mutates [`PointerState`] directly. It pushes
//! [`SurfaceEvent`]s into the driver's queue, and the driver applies them in
//! arrival order once per frame, so the latest position always wins.

use glam::DVec2;

/// Influence below this snaps to exactly zero, so the geometric decay
/// reaches a true rest state in a bounded number of frames.
pub const INFLUENCE_EPSILON: f64 = 1e-3;

/// An input signal delivered by the host environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    /// Pointer moved to `(x, y)` in surface-local pixels.
    PointerMove { x: f64, y: f64 },
    /// Pointer left the surface.
    PointerLeave,
    /// Viewport resized.
    Resize { width: usize, height: usize },
}

/// Last pointer position and how recently it moved.
///
/// `influence` is always in [0, 1]: it jumps to 1 on every move and is
/// multiplied by the decay factor once per frame. Until the first move the
/// position is `None` and no force is ever derived from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointerState {
    position: Option<DVec2>,
    influence: f64,
}

impl PointerState {
    /// A pointer that has never moved, with zero influence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a move. Non-finite coordinates are dropped.
    pub fn on_move(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        self.position = Some(DVec2::new(x, y));
        self.influence = 1.0;
    }

    /// Records that the pointer left. Nothing changes: the position is kept
    /// for rendering and influence keeps decaying from its current value.
    pub fn on_leave(&mut self) {}

    /// Applies one frame of geometric decay.
    pub fn decay(&mut self, factor: f64) {
        let factor = if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) };
        self.influence *= factor;
        if self.influence < INFLUENCE_EPSILON {
            self.influence = 0.0;
        }
    }

    /// Last known position, if the pointer has ever moved.
    pub fn position(&self) -> Option<DVec2> {
        self.position
    }

    /// Current influence in [0, 1].
    pub fn influence(&self) -> f64 {
        self.influence
    }

    /// Position and influence, only when a force should be applied.
    pub fn active(&self) -> Option<(DVec2, f64)> {
        match self.position {
            Some(p) if self.influence > 0.0 => Some((p, self.influence)),
            _ => None,
        }
    }
}
