#![deny(unsafe_code)]
//! Glowing drops joined by proximity lines.
//!
//! Each frame clears the surface, lays down a radial background glow that
//! follows the pointer, fills every particle as a radial-gradient circle with
//! a soft halo, and strokes a line between every pair of particles closer
//! than the connection radius. Line opacity falls off linearly with
//! distance.
//!
//! Pair enumeration is O(n²) per frame, which is why the preset keeps the
//! particle count near 80. On a full viewport the background glow costs
//! more than the drops, so degradation samples it more coarsely and then
//! turns it off before any particle is shed.

use fluid_canvas_core::color::{ColorStop, Gradient, Rgba};
use fluid_canvas_core::config::SimConfig;
use fluid_canvas_core::effect::{Backdrop, Renderer};
use fluid_canvas_core::error::EngineError;
use fluid_canvas_core::params::{integer_schema, param_bool, param_f64, param_usize};
use fluid_canvas_core::pointer::PointerState;
use fluid_canvas_core::prng::Xorshift64;
use fluid_canvas_core::stepper::Simulation;
use fluid_canvas_core::surface::Surface;
use glam::DVec2;
use serde_json::{json, Value};
use tracing::debug;

/// Registered effect name.
pub const NAME: &str = "drops";

/// Pairs closer than this are joined by a line.
const DEFAULT_CONNECTION_RADIUS: f64 = 120.0;
/// Width of the halo drawn outside each drop.
const DEFAULT_GLOW_RADIUS: f64 = 25.0;
/// Peak halo alpha relative to the drop's opacity.
const HALO_STRENGTH: f64 = 0.5;
/// Connector stroke width in pixels, as a canvas `lineWidth`.
const LINE_WIDTH: f64 = 2.0;
/// Line alpha at zero distance.
const LINE_ALPHA: f64 = 0.3;
/// Coarsest background sampling step, in pixels.
const MAX_BACKGROUND_STRIDE: usize = 8;

/// A drops background.
pub type Drops = Backdrop<GlowRenderer>;

/// Builds the drops effect from a JSON params object.
///
/// Shared simulation keys overlay [`SimConfig::drops`]; `connection_radius`,
/// `glow_radius`, `background_glow` and `background_stride` configure the
/// renderer. Returns
/// `EngineError::InvalidParam` for out-of-range values.
pub fn from_json(width: usize, height: usize, seed: u64, params: &Value) -> Result<Drops, EngineError> {
    let config = SimConfig::from_json(SimConfig::drops(), params);
    let renderer = GlowRenderer::from_json(params)?;
    let mut rng = Xorshift64::new(seed);
    let sim = Simulation::new(config, width, height, &mut rng)?.with_size_inflation(true);
    Ok(Backdrop::new(NAME, sim, renderer, rng))
}

/// Glow-circle and connector renderer.
#[derive(Debug, Clone)]
pub struct GlowRenderer {
    connection_radius: f64,
    glow_radius: f64,
    background_glow: bool,
    background_stride: usize,
    fill: Gradient,
    background: Gradient,
    halo: Rgba,
    line: Rgba,
}

impl GlowRenderer {
    /// Creates a renderer with explicit knobs. The background glow is
    /// sampled every `background_stride` pixels.
    pub fn new(
        connection_radius: f64,
        glow_radius: f64,
        background_glow: bool,
        background_stride: usize,
    ) -> Result<Self, EngineError> {
        if !(connection_radius.is_finite() && connection_radius >= 0.0) {
            return Err(EngineError::invalid_param("connection_radius", "must be non-negative"));
        }
        if !(glow_radius.is_finite() && glow_radius >= 0.0) {
            return Err(EngineError::invalid_param("glow_radius", "must be non-negative"));
        }
        if !(1..=MAX_BACKGROUND_STRIDE).contains(&background_stride) {
            return Err(EngineError::invalid_param(
                "background_stride",
                format!("must lie in [1, {MAX_BACKGROUND_STRIDE}]"),
            ));
        }
        let fill = Gradient::new(vec![
            ColorStop { offset: 0.0, color: Rgba::rgba8(100, 200, 255, 0.9) },
            ColorStop { offset: 0.7, color: Rgba::rgba8(50, 150, 255, 0.6) },
            ColorStop { offset: 1.0, color: Rgba::rgba8(0, 100, 200, 0.2) },
        ])?;
        // Inner and middle alphas are replaced every frame.
        let background = Gradient::new(vec![
            ColorStop { offset: 0.0, color: Rgba::TRANSPARENT },
            ColorStop { offset: 0.5, color: Rgba::TRANSPARENT },
            ColorStop { offset: 1.0, color: Rgba::rgba8(0, 50, 100, 0.02) },
        ])?;
        Ok(Self {
            connection_radius,
            glow_radius,
            background_glow,
            background_stride,
            fill,
            background,
            halo: Rgba::rgba8(100, 200, 255, 0.8),
            line: Rgba::rgba8(100, 200, 255, 0.6),
        })
    }

    /// Reads `connection_radius`, `glow_radius`, `background_glow` and
    /// `background_stride`.
    pub fn from_json(params: &Value) -> Result<Self, EngineError> {
        Self::new(
            param_f64(params, "connection_radius", DEFAULT_CONNECTION_RADIUS),
            param_f64(params, "glow_radius", DEFAULT_GLOW_RADIUS),
            param_bool(params, "background_glow", true),
            param_usize(params, "background_stride", 1),
        )
    }

    fn draw_background(&self, sim: &Simulation, pointer: &PointerState, surface: &mut Surface) {
        let (w, h) = (surface.width() as f64, surface.height() as f64);
        let center = pointer.position().unwrap_or(DVec2::new(w / 2.0, h / 2.0));
        let radius = w / 3.0;
        let t = sim.time();

        let mut gradient = self.background.clone();
        gradient.recolor(0, Rgba::rgba8(30, 144, 255, 0.15 + t.sin() * 0.1));
        gradient.recolor(1, Rgba::rgba8(0, 100, 200, 0.08 + (t * 0.7).sin() * 0.05));

        let (width, height, s) = (surface.width(), surface.height(), self.background_stride);
        let half = s as f64 / 2.0;
        for sy in (0..height).step_by(s) {
            for sx in (0..width).step_by(s) {
                let d = DVec2::new(sx as f64 + half, sy as f64 + half).distance(center);
                let offset = if radius > 0.0 { d / radius } else { 1.0 };
                let color = gradient.sample(offset);
                for y in sy..(sy + s).min(height) {
                    for x in sx..(sx + s).min(width) {
                        surface.blend(x, y, color);
                    }
                }
            }
        }
    }

    fn draw_drops(&self, sim: &Simulation, surface: &mut Surface) {
        for p in sim.particles() {
            let reach = p.size + self.glow_radius;
            let Some((x0, y0, x1, y1)) = surface.clip_box(p.position.x, p.position.y, reach) else {
                continue;
            };
            for y in y0..y1 {
                for x in x0..x1 {
                    let d = pixel_center(x, y).distance(p.position);
                    let color = if d < p.size {
                        self.fill.sample(d / p.size).scale(p.opacity)
                    } else if d < reach && self.glow_radius > 0.0 {
                        let t = 1.0 - (d - p.size) / self.glow_radius;
                        self.halo.scale(p.opacity * HALO_STRENGTH * t * t)
                    } else {
                        continue;
                    };
                    surface.blend(x, y, color);
                }
            }
        }
    }

    fn draw_connectors(&self, sim: &Simulation, surface: &mut Surface) {
        let r = self.connection_radius;
        if r <= 0.0 {
            return;
        }
        let particles = sim.particles().as_slice();
        for (i, j, d) in sim.particles().pairs_within(r) {
            let (a, b) = (particles[i].position, particles[j].position);
            let alpha = (r - d) / r * LINE_ALPHA;
            let mid = (a + b) * 0.5;
            let half = (b - a).abs().max_element() * 0.5 + LINE_WIDTH / 2.0 + 1.0;
            let Some((x0, y0, x1, y1)) = surface.clip_box(mid.x, mid.y, half) else {
                continue;
            };
            for y in y0..y1 {
                for x in x0..x1 {
                    // Overlap of a unit pixel with the stroke: full within
                    // half a pixel of the core, zero a pixel further out.
                    let dist = distance_to_segment(pixel_center(x, y), a, b);
                    let coverage = (LINE_WIDTH / 2.0 + 0.5 - dist).clamp(0.0, 1.0);
                    if coverage > 0.0 {
                        surface.blend(x, y, self.line.scale(alpha * coverage));
                    }
                }
            }
        }
    }
}

impl Renderer for GlowRenderer {
    fn render(&self, sim: &Simulation, pointer: &PointerState, surface: &mut Surface) {
        surface.clear();
        if self.background_glow {
            self.draw_background(sim, pointer, surface);
        }
        self.draw_drops(sim, surface);
        self.draw_connectors(sim, surface);
    }

    fn degrade(&mut self) -> bool {
        if !self.background_glow {
            return false;
        }
        if self.background_stride < MAX_BACKGROUND_STRIDE {
            let next = (self.background_stride * 2).min(MAX_BACKGROUND_STRIDE);
            debug!(from = self.background_stride, to = next, "coarsened background glow");
            self.background_stride = next;
        } else {
            debug!("background glow disabled");
            self.background_glow = false;
        }
        true
    }

    fn params(&self) -> Value {
        json!({
            "connection_radius": self.connection_radius,
            "glow_radius": self.glow_radius,
            "background_glow": self.background_glow,
            "background_stride": self.background_stride,
        })
    }

    fn param_schema(&self) -> Value {
        json!({
            "connection_radius": {
                "type": "number",
                "default": DEFAULT_CONNECTION_RADIUS,
                "min": 0.0,
                "max": 500.0,
                "description": "Pairs closer than this are joined by a line"
            },
            "glow_radius": {
                "type": "number",
                "default": DEFAULT_GLOW_RADIUS,
                "min": 0.0,
                "max": 100.0,
                "description": "Halo width outside each drop in pixels"
            },
            "background_glow": {
                "type": "boolean",
                "default": true,
                "description": "Draw the radial glow that follows the pointer"
            },
            "background_stride": integer_schema(1, 1, MAX_BACKGROUND_STRIDE, "Background glow sampling step in pixels")
        })
    }
}

fn pixel_center(x: usize, y: usize) -> DVec2 {
    DVec2::new(x as f64 + 0.5, y as f64 + 0.5)
}

/// Distance from `p` to the closed segment `a..b`.
fn distance_to_segment(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    let ab = b - a;
    let len2 = ab.length_squared();
    let t = if len2 > 0.0 {
        ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    p.distance(a + ab * t)
}
