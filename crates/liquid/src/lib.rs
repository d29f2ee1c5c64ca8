#![deny(unsafe_code)]
//! Thresholded density-field background.
//!
//! Every particle contributes `opacity · size² / max(d², 1)` to a scalar
//! field over the surface. The field is sampled every `sample_stride`
//! pixels; where it exceeds `density_threshold` the whole
//! `stride × stride` block is painted a light grey whose brightness and
//! alpha grow with how far the density overshoots the threshold. Pixels
//! below the threshold stay transparent, so the result reads as a soft
//! liquid silhouette over the page.
//!
//! Cost is O(samples × particles) per frame, the dominant cost of the
//! whole system. Degradation first coarsens the stride, doubling it up to
//! `max_sample_stride`, before the shared backdrop sheds particles.

use fluid_canvas_core::color::Rgba;
use fluid_canvas_core::config::SimConfig;
use fluid_canvas_core::effect::{Backdrop, Renderer};
use fluid_canvas_core::error::EngineError;
use fluid_canvas_core::params::{integer_schema, number_schema, param_f64, param_usize};
use fluid_canvas_core::particle::Particle;
use fluid_canvas_core::pointer::PointerState;
use fluid_canvas_core::prng::Xorshift64;
use fluid_canvas_core::stepper::Simulation;
use fluid_canvas_core::surface::Surface;
use serde_json::{json, Value};
use tracing::debug;

/// Registered effect name.
pub const NAME: &str = "liquid";

const DEFAULT_DENSITY_THRESHOLD: f64 = 0.5;
const DEFAULT_SAMPLE_STRIDE: usize = 2;
const DEFAULT_MAX_SAMPLE_STRIDE: usize = 8;
/// Largest stride accepted for either stride key.
const STRIDE_LIMIT: usize = 64;

/// Grey level at zero intensity; full intensity adds `GREY_SPAN`.
const GREY_BASE: f64 = 190.0;
const GREY_SPAN: f64 = 65.0;
/// Alpha at zero intensity; full intensity adds `ALPHA_SPAN`.
const ALPHA_BASE: f64 = 0.55;
const ALPHA_SPAN: f64 = 0.45;

/// A liquid background.
pub type Liquid = Backdrop<DensityRenderer>;

/// Builds the liquid effect from a JSON params object.
///
/// Shared simulation keys overlay [`SimConfig::liquid`];
/// `density_threshold`, `sample_stride` and `max_sample_stride` configure
/// the renderer.
pub fn from_json(width: usize, height: usize, seed: u64, params: &Value) -> Result<Liquid, EngineError> {
    let config = SimConfig::from_json(SimConfig::liquid(), params);
    let renderer = DensityRenderer::from_json(params)?;
    let mut rng = Xorshift64::new(seed);
    let sim = Simulation::new(config, width, height, &mut rng)?;
    Ok(Backdrop::new(NAME, sim, renderer, rng))
}

/// Summed inverse-square contribution of every particle at `(x, y)`.
pub fn density_at(particles: &[Particle], x: f64, y: f64) -> f64 {
    particles
        .iter()
        .map(|p| {
            let dx = x - p.position.x;
            let dy = y - p.position.y;
            p.opacity * p.size * p.size / (dx * dx + dy * dy).max(1.0)
        })
        .sum()
}

/// Maps a density to a pixel color, or `None` at or below `threshold`.
pub fn shade(density: f64, threshold: f64) -> Option<Rgba> {
    if density.is_nan() || density <= threshold {
        return None;
    }
    let intensity = ((density - threshold) / threshold).clamp(0.0, 1.0);
    let grey = (GREY_BASE + GREY_SPAN * intensity).round() as u8;
    Some(Rgba::rgba8(grey, grey, grey, ALPHA_BASE + ALPHA_SPAN * intensity))
}

/// Density-field renderer.
#[derive(Debug, Clone)]
pub struct DensityRenderer {
    threshold: f64,
    stride: usize,
    max_stride: usize,
}

impl DensityRenderer {
    pub fn new(threshold: f64, stride: usize, max_stride: usize) -> Result<Self, EngineError> {
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(EngineError::invalid_param("density_threshold", "must be positive"));
        }
        if !(1..=STRIDE_LIMIT).contains(&stride) {
            return Err(EngineError::invalid_param(
                "sample_stride",
                format!("must lie in [1, {STRIDE_LIMIT}]"),
            ));
        }
        if !(stride..=STRIDE_LIMIT).contains(&max_stride) {
            return Err(EngineError::invalid_param(
                "max_sample_stride",
                format!("must lie in [sample_stride, {STRIDE_LIMIT}]"),
            ));
        }
        Ok(Self {
            threshold,
            stride,
            max_stride,
        })
    }

    /// Reads `density_threshold`, `sample_stride` and `max_sample_stride`.
    pub fn from_json(params: &Value) -> Result<Self, EngineError> {
        Self::new(
            param_f64(params, "density_threshold", DEFAULT_DENSITY_THRESHOLD),
            param_usize(params, "sample_stride", DEFAULT_SAMPLE_STRIDE),
            param_usize(params, "max_sample_stride", DEFAULT_MAX_SAMPLE_STRIDE),
        )
    }

    /// Current sampling stride in pixels.
    pub fn stride(&self) -> usize {
        self.stride
    }
}

impl Renderer for DensityRenderer {
    fn render(&self, sim: &Simulation, _pointer: &PointerState, surface: &mut Surface) {
        surface.clear();
        let particles = sim.particles().as_slice();
        if particles.is_empty() {
            return;
        }
        let (w, h, s) = (surface.width(), surface.height(), self.stride);
        for sy in (0..h).step_by(s) {
            for sx in (0..w).step_by(s) {
                let density = density_at(particles, sx as f64 + 0.5, sy as f64 + 0.5);
                let Some(color) = shade(density, self.threshold) else {
                    continue;
                };
                for y in sy..(sy + s).min(h) {
                    for x in sx..(sx + s).min(w) {
                        surface.put(x, y, color);
                    }
                }
            }
        }
    }

    fn degrade(&mut self) -> bool {
        let next = self.stride * 2;
        if next > self.max_stride {
            return false;
        }
        debug!(from = self.stride, to = next, "coarsened density sampling");
        self.stride = next;
        true
    }

    fn params(&self) -> Value {
        json!({
            "density_threshold": self.threshold,
            "sample_stride": self.stride,
            "max_sample_stride": self.max_stride,
        })
    }

    fn param_schema(&self) -> Value {
        json!({
            "density_threshold": number_schema(DEFAULT_DENSITY_THRESHOLD, 0.01, 100.0, "Density above which a sample is painted"),
            "sample_stride": integer_schema(DEFAULT_SAMPLE_STRIDE, 1, STRIDE_LIMIT, "Field sampling step in pixels"),
            "max_sample_stride": integer_schema(DEFAULT_MAX_SAMPLE_STRIDE, 1, STRIDE_LIMIT, "Coarsest stride degradation may reach"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluid_canvas_core::config::BoundaryPolicy;
    use fluid_canvas_core::effect::Effect;
    use glam::DVec2;

    fn still(extra: Value) -> Value {
        let mut params = json!({"drift_amplitude": 0.0, "speed": 0.0});
        if let (Some(dst), Value::Object(src)) = (params.as_object_mut(), extra) {
            dst.extend(src);
        }
        params
    }

    fn place(effect: &mut Liquid, positions: &[(f64, f64)], size: f64) {
        for (p, &(x, y)) in effect.simulation_mut().particles_mut().iter_mut().zip(positions) {
            p.position = DVec2::new(x, y);
            p.rest = p.position;
            p.size = size;
            p.base_size = size;
            p.opacity = 1.0;
        }
    }

    fn render(effect: &Liquid) -> Surface {
        let b = effect.simulation().bounds();
        let mut surface = Surface::new(b.width as usize, b.height as usize).unwrap();
        effect.render(&PointerState::new(), &mut surface).unwrap();
        surface
    }

    #[test]
    fn defaults_match_preset() {
        let effect = from_json(640, 360, 42, &json!({})).unwrap();
        assert_eq!(effect.name(), "liquid");
        assert_eq!(effect.simulation().particles().len(), 180);
        assert_eq!(effect.simulation().config().boundary_policy, BoundaryPolicy::ClampReflect);
        assert!(effect.simulation().config().spring_strength > 0.0);
        assert_eq!(effect.renderer().stride(), 2);
        assert_eq!(effect.params()["density_threshold"], 0.5);
    }

    #[test]
    fn rejects_bad_renderer_params() {
        for (params, key) in [
            (json!({"density_threshold": 0.0}), "density_threshold"),
            (json!({"sample_stride": 0}), "sample_stride"),
            (json!({"sample_stride": 4, "max_sample_stride": 2}), "max_sample_stride"),
        ] {
            assert!(
                matches!(from_json(10, 10, 1, &params), Err(EngineError::InvalidParam { ref name, .. }) if name == key),
                "{key} should be rejected"
            );
        }
    }

    #[test]
    fn shade_maps_intensity_to_grey_and_alpha() {
        assert_eq!(shade(0.5, 0.5), None);
        assert_eq!(shade(f64::NAN, 0.5), None);
        assert_eq!(shade(10.0, 0.5).unwrap().to_rgba8(), [255, 255, 255, 255]);
        let low = shade(0.5 + 1e-9, 0.5).unwrap().to_rgba8();
        assert_eq!(low[0], 190);
        assert_eq!(low[3], (0.55f64 * 255.0).round() as u8);
    }

    #[test]
    fn density_uses_unit_floor_on_distance() {
        let mut effect = from_json(50, 50, 1, &still(json!({"particle_count": 1}))).unwrap();
        place(&mut effect, &[(10.0, 10.0)], 4.0);
        let particles = effect.simulation().particles().as_slice();
        assert_eq!(density_at(particles, 10.0, 10.0), 16.0);
        assert_eq!(density_at(particles, 14.0, 10.0), 1.0);
    }

    #[test]
    fn untouched_pixels_stay_transparent() {
        let mut effect = from_json(100, 100, 1, &still(json!({"particle_count": 1}))).unwrap();
        place(&mut effect, &[(50.0, 50.0)], 6.0);
        let surface = render(&effect);
        assert!(surface.pixel(50, 50).unwrap().a > 0.5);
        assert_eq!(surface.pixel(5, 5).unwrap(), Rgba::TRANSPARENT);
        assert_eq!(surface.pixel(95, 50).unwrap(), Rgba::TRANSPARENT);
    }

    #[test]
    fn no_particles_render_transparent() {
        let effect = from_json(32, 32, 1, &json!({"particle_count": 0})).unwrap();
        assert!(render(&effect).pixels().iter().all(|p| *p == Rgba::TRANSPARENT));
    }

    #[test]
    fn blocks_fill_stride_square_and_clip_at_edges() {
        let params = still(json!({"particle_count": 1, "sample_stride": 4}));
        let mut effect = from_json(6, 6, 1, &params).unwrap();
        place(&mut effect, &[(3.0, 3.0)], 20.0);
        let surface = render(&effect);
        let first = surface.pixel(0, 0).unwrap();
        assert!(first.a > 0.0);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(surface.pixel(x, y).unwrap(), first);
            }
        }
        assert!(surface.pixel(5, 5).unwrap().a > 0.0);
    }

    #[test]
    fn degrade_coarsens_stride_then_sheds() {
        let mut effect = from_json(64, 64, 9, &json!({"max_sample_stride": 8})).unwrap();
        assert!(effect.degrade());
        assert_eq!(effect.renderer().stride(), 4);
        assert!(effect.degrade());
        assert_eq!(effect.renderer().stride(), 8);
        assert_eq!(effect.simulation().particles().len(), 180);
        assert!(effect.degrade());
        assert_eq!(effect.renderer().stride(), 8);
        assert_eq!(effect.simulation().particles().len(), 135);
    }

    #[test]
    fn degrade_stops_at_particle_floor() {
        let mut effect = from_json(64, 64, 9, &json!({"max_sample_stride": 2})).unwrap();
        while effect.degrade() {}
        assert_eq!(effect.simulation().particles().len(), 60);
    }

    #[test]
    fn schema_covers_renderer_keys() {
        let effect = from_json(10, 10, 1, &json!({})).unwrap();
        let schema = effect.param_schema();
        for key in ["density_threshold", "sample_stride", "max_sample_stride", "spring_strength"] {
            assert!(schema.get(key).is_some(), "schema missing {key}");
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn only_threshold_crossing_samples_are_painted(
                seed in any::<u64>(),
                stride in 1usize..5,
                threshold in 0.1f64..5.0,
            ) {
                let params = json!({
                    "particle_count": 12,
                    "sample_stride": stride,
                    "max_sample_stride": stride,
                    "density_threshold": threshold,
                });
                let effect = from_json(40, 30, seed, &params).unwrap();
                let surface = render(&effect);
                let particles = effect.simulation().particles().as_slice();
                for sy in (0..30).step_by(stride) {
                    for sx in (0..40).step_by(stride) {
                        let d = density_at(particles, sx as f64 + 0.5, sy as f64 + 0.5);
                        let px = surface.pixel(sx, sy).unwrap();
                        prop_assert_eq!(px.a > 0.0, d > threshold);
                    }
                }
            }
        }
    }
}
