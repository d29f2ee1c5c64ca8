//! Reproducible record of a headless run.
//!
//! A [`Seed`] captures everything needed to replay a background offline:
//! effect name, surface dimensions, parameter overrides, PRNG seed, frame
//! count and delta, and the pointer path fed in along the way.

use crate::error::EngineError;
use crate::pointer::SurfaceEvent;
use crate::surface::pixel_count;
use serde::{Deserialize, Serialize};

/// A pointer position delivered before a given frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PointerSample {
    /// Frame index (0-based) the move is delivered before.
    pub frame: usize,
    pub x: f64,
    pub y: f64,
}

/// Reproducible specification for a headless run.
///
/// Two identical `Seed` values fed to the same binary produce bit-identical
/// frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Seed {
    pub effect: String,
    pub width: usize,
    pub height: usize,
    pub params: serde_json::Value,
    pub seed: u64,
    pub frames: usize,
    /// Fixed delta between frames.
    #[serde(default = "default_frame_ms")]
    pub frame_ms: f64,
    #[serde(default)]
    pub pointer_path: Vec<PointerSample>,
}

fn default_frame_ms() -> f64 {
    crate::config::NOMINAL_FRAME_MS
}

impl Seed {
    /// Creates a Seed with empty params, zero frames, the nominal delta and
    /// no pointer input.
    pub fn new(effect: &str, width: usize, height: usize, seed: u64) -> Self {
        Self {
            effect: effect.to_string(),
            width,
            height,
            params: serde_json::Value::Object(serde_json::Map::new()),
            seed,
            frames: 0,
            frame_ms: default_frame_ms(),
            pointer_path: Vec::new(),
        }
    }

    /// Checks dimensions, the frame delta and the pointer path.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::InvalidDimensions);
        }
        pixel_count(self.width, self.height)?;
        if !(self.frame_ms.is_finite() && self.frame_ms >= 0.0) {
            return Err(EngineError::invalid_param("frame_ms", "must be finite and non-negative"));
        }
        if let Some(bad) = self.pointer_path.iter().find(|s| !(s.x.is_finite() && s.y.is_finite())) {
            return Err(EngineError::invalid_param(
                "pointer_path",
                format!("non-finite position at frame {}", bad.frame),
            ));
        }
        Ok(())
    }

    /// Pointer moves to deliver before `frame`, in recorded order.
    pub fn events_before(&self, frame: usize) -> impl Iterator<Item = SurfaceEvent> + '_ {
        self.pointer_path
            .iter()
            .filter(move |s| s.frame == frame)
            .map(|s| SurfaceEvent::PointerMove { x: s.x, y: s.y })
    }

    /// Host timestamp for `frame`.
    pub fn timestamp(&self, frame: usize) -> f64 {
        frame as f64 * self.frame_ms
    }
}
