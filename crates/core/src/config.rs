//! Simulation configuration shared by every effect variant.
//!
//! [`SimConfig`] bundles the knobs the stepper reads. Each variant starts
//! from its own preset (see `SimConfig::drops` / `SimConfig::liquid`) and
//! overlays a JSON params object on top with [`SimConfig::from_json`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::EngineError;
use crate::params::{choice_schema, integer_schema, number_schema, param_enum, param_f64, param_usize};

/// Upper bound accepted for `particle_count`.
pub const MAX_PARTICLES: usize = 10_000;

/// Duration of one nominal animation frame at 60 Hz.
pub const NOMINAL_FRAME_MS: f64 = 1000.0 / 60.0;

/// What happens when a particle reaches a surface edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Re-enter from the opposite edge with velocity unchanged.
    #[default]
    Wrap,
    /// Clamp to the edge, flip the normal velocity component and scale it by
    /// the restitution factor.
    ClampReflect,
}

impl BoundaryPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            BoundaryPolicy::Wrap => "wrap",
            BoundaryPolicy::ClampReflect => "clamp_reflect",
        }
    }
}

/// How a particle set is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStrategy {
    /// Glowing circles joined by proximity lines.
    GlowCircles,
    /// Thresholded inverse-square density field.
    DensityField,
}

impl RenderStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderStrategy::GlowCircles => "glow_circles",
            RenderStrategy::DensityField => "density_field",
        }
    }
}

/// Shared simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub particle_count: usize,
    /// Pointer attraction radius `R` in pixels.
    pub attraction_radius: f64,
    /// Attraction gain `k`.
    pub attraction_strength: f64,
    /// Per-frame velocity multiplier, in (0, 1).
    pub damping_factor: f64,
    /// Per-frame pointer influence multiplier, in (0, 1).
    pub pointer_decay: f64,
    pub boundary_policy: BoundaryPolicy,
    /// Fraction of the normal velocity kept on a reflect, in [0, 1].
    pub restitution: f64,
    /// Pull toward the rest anchor per nominal frame; 0 disables it.
    pub spring_strength: f64,
    /// Amplitude of the sinusoidal drift, in pixels per nominal frame.
    pub drift_amplitude: f64,
    /// Phase step between consecutive particles.
    pub phase_offset: f64,
    /// Time accumulator increment per nominal frame.
    pub time_step: f64,
    pub size_min: f64,
    pub size_max: f64,
    pub opacity_min: f64,
    pub opacity_max: f64,
    /// Half-range of the initial velocity components.
    pub speed: f64,
    /// Larger frame deltas are clamped to this.
    pub max_frame_ms: f64,
    /// Frame work above this counts as over budget.
    pub frame_budget_ms: f64,
    /// Degradation never sheds below this many particles.
    pub min_particle_count: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::drops()
    }
}

impl SimConfig {
    /// Preset for the glow-circle variant.
    pub fn drops() -> Self {
        Self {
            particle_count: 80,
            attraction_radius: 150.0,
            attraction_strength: 0.3,
            damping_factor: 0.98,
            pointer_decay: 0.95,
            boundary_policy: BoundaryPolicy::Wrap,
            restitution: 0.8,
            spring_strength: 0.0,
            drift_amplitude: 0.8,
            phase_offset: 0.1,
            time_step: 0.01,
            size_min: 3.0,
            size_max: 11.0,
            opacity_min: 0.2,
            opacity_max: 0.8,
            speed: 1.0,
            max_frame_ms: 50.0,
            frame_budget_ms: 16.0,
            min_particle_count: 20,
        }
    }

    /// Preset for the density-field variant.
    pub fn liquid() -> Self {
        Self {
            particle_count: 180,
            attraction_radius: 200.0,
            attraction_strength: 0.5,
            damping_factor: 0.99,
            boundary_policy: BoundaryPolicy::ClampReflect,
            spring_strength: 0.01,
            drift_amplitude: 0.4,
            size_min: 6.0,
            size_max: 14.0,
            opacity_min: 0.6,
            opacity_max: 1.0,
            speed: 0.5,
            min_particle_count: 60,
            ..Self::drops()
        }
    }

    /// Overlays `params` on `base`. Unknown keys are ignored and wrongly
    /// typed values keep the base value; call [`validate`](Self::validate)
    /// afterwards.
    pub fn from_json(base: SimConfig, params: &Value) -> Self {
        Self {
            particle_count: param_usize(params, "particle_count", base.particle_count),
            attraction_radius: param_f64(params, "attraction_radius", base.attraction_radius),
            attraction_strength: param_f64(params, "attraction_strength", base.attraction_strength),
            damping_factor: param_f64(params, "damping_factor", base.damping_factor),
            pointer_decay: param_f64(params, "pointer_decay", base.pointer_decay),
            boundary_policy: param_enum(params, "boundary_policy", base.boundary_policy),
            restitution: param_f64(params, "restitution", base.restitution),
            spring_strength: param_f64(params, "spring_strength", base.spring_strength),
            drift_amplitude: param_f64(params, "drift_amplitude", base.drift_amplitude),
            phase_offset: param_f64(params, "phase_offset", base.phase_offset),
            time_step: param_f64(params, "time_step", base.time_step),
            size_min: param_f64(params, "size_min", base.size_min),
            size_max: param_f64(params, "size_max", base.size_max),
            opacity_min: param_f64(params, "opacity_min", base.opacity_min),
            opacity_max: param_f64(params, "opacity_max", base.opacity_max),
            speed: param_f64(params, "speed", base.speed),
            max_frame_ms: param_f64(params, "max_frame_ms", base.max_frame_ms),
            frame_budget_ms: param_f64(params, "frame_budget_ms", base.frame_budget_ms),
            min_particle_count: param_usize(params, "min_particle_count", base.min_particle_count),
        }
    }

    /// Checks every value against its accepted range.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.particle_count > MAX_PARTICLES {
            return Err(EngineError::invalid_param(
                "particle_count",
                format!("must be at most {MAX_PARTICLES}"),
            ));
        }
        open_unit("damping_factor", self.damping_factor)?;
        open_unit("pointer_decay", self.pointer_decay)?;
        closed_unit("restitution", self.restitution)?;
        closed_unit("opacity_min", self.opacity_min)?;
        closed_unit("opacity_max", self.opacity_max)?;
        positive("attraction_radius", self.attraction_radius)?;
        positive("max_frame_ms", self.max_frame_ms)?;
        positive("frame_budget_ms", self.frame_budget_ms)?;
        non_negative("attraction_strength", self.attraction_strength)?;
        non_negative("spring_strength", self.spring_strength)?;
        non_negative("drift_amplitude", self.drift_amplitude)?;
        non_negative("time_step", self.time_step)?;
        non_negative("size_min", self.size_min)?;
        non_negative("speed", self.speed)?;
        finite("phase_offset", self.phase_offset)?;
        if !(self.size_max.is_finite() && self.size_max >= self.size_min) {
            return Err(EngineError::invalid_param("size_max", "must be >= size_min"));
        }
        if self.opacity_max < self.opacity_min {
            return Err(EngineError::invalid_param("opacity_max", "must be >= opacity_min"));
        }
        if self.spring_strength > 1.0 {
            return Err(EngineError::invalid_param("spring_strength", "must be at most 1"));
        }
        Ok(())
    }

    /// Current values as a JSON object.
    pub fn to_params(&self) -> Value {
        json!({
            "particle_count": self.particle_count,
            "attraction_radius": self.attraction_radius,
            "attraction_strength": self.attraction_strength,
            "damping_factor": self.damping_factor,
            "pointer_decay": self.pointer_decay,
            "boundary_policy": self.boundary_policy.as_str(),
            "restitution": self.restitution,
            "spring_strength": self.spring_strength,
            "drift_amplitude": self.drift_amplitude,
            "phase_offset": self.phase_offset,
            "time_step": self.time_step,
            "size_min": self.size_min,
            "size_max": self.size_max,
            "opacity_min": self.opacity_min,
            "opacity_max": self.opacity_max,
            "speed": self.speed,
            "max_frame_ms": self.max_frame_ms,
            "frame_budget_ms": self.frame_budget_ms,
            "min_particle_count": self.min_particle_count,
        })
    }

    /// Schema for the shared keys, with this config's values as defaults.
    pub fn schema(&self) -> Value {
        json!({
            "particle_count": integer_schema(self.particle_count, 0, MAX_PARTICLES, "Number of particles seeded at mount"),
            "attraction_radius": number_schema(self.attraction_radius, 1.0, 1000.0, "Pointer attraction radius in pixels"),
            "attraction_strength": number_schema(self.attraction_strength, 0.0, 5.0, "Pointer attraction gain"),
            "damping_factor": number_schema(self.damping_factor, 0.0, 1.0, "Velocity multiplier per frame, exclusive bounds"),
            "pointer_decay": number_schema(self.pointer_decay, 0.0, 1.0, "Pointer influence multiplier per frame, exclusive bounds"),
            "boundary_policy": choice_schema(self.boundary_policy.as_str(), &["wrap", "clamp_reflect"], "Edge behavior"),
            "restitution": number_schema(self.restitution, 0.0, 1.0, "Velocity kept on reflect"),
            "spring_strength": number_schema(self.spring_strength, 0.0, 1.0, "Pull toward rest anchor per frame"),
            "drift_amplitude": number_schema(self.drift_amplitude, 0.0, 10.0, "Sinusoidal drift in pixels per frame"),
            "phase_offset": number_schema(self.phase_offset, -10.0, 10.0, "Drift phase step between particles"),
            "time_step": number_schema(self.time_step, 0.0, 1.0, "Time accumulator increment per frame"),
            "size_min": number_schema(self.size_min, 0.0, 100.0, "Smallest base size in pixels"),
            "size_max": number_schema(self.size_max, 0.0, 100.0, "Largest base size in pixels"),
            "opacity_min": number_schema(self.opacity_min, 0.0, 1.0, "Lowest opacity / density weight"),
            "opacity_max": number_schema(self.opacity_max, 0.0, 1.0, "Highest opacity / density weight"),
            "speed": number_schema(self.speed, 0.0, 10.0, "Initial velocity half-range in pixels per frame"),
            "max_frame_ms": number_schema(self.max_frame_ms, 1.0, 1000.0, "Frame delta clamp"),
            "frame_budget_ms": number_schema(self.frame_budget_ms, 1.0, 1000.0, "Per-frame work budget before degrading"),
            "min_particle_count": integer_schema(self.min_particle_count, 0, MAX_PARTICLES, "Degradation floor"),
        })
    }
}

fn finite(name: &str, v: f64) -> Result<(), EngineError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(EngineError::invalid_param(name, "must be finite"))
    }
}

fn open_unit(name: &str, v: f64) -> Result<(), EngineError> {
    if v > 0.0 && v < 1.0 {
        Ok(())
    } else {
        Err(EngineError::invalid_param(name, "must lie in (0, 1)"))
    }
}

fn closed_unit(name: &str, v: f64) -> Result<(), EngineError> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(EngineError::invalid_param(name, "must lie in [0, 1]"))
    }
}

fn positive(name: &str, v: f64) -> Result<(), EngineError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(EngineError::invalid_param(name, "must be positive"))
    }
}

fn non_negative(name: &str, v: f64) -> Result<(), EngineError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::invalid_param(name, "must be non-negative"))
    }
}
