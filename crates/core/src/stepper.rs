//! The per-frame particle update.
//!
//! [`Simulation`] owns a [`ParticleSet`], its bounds, and the shared time
//! accumulator. [`Simulation::advance`] applies, per particle and in order:
//! pointer attraction, spring-back toward the rest anchor, damping,
//! integration (velocity plus sinusoidal drift), and the boundary policy.
//!
//! A frame delta is expressed as a multiple of the nominal 60 Hz frame
//! (`scale = dt_ms / NOMINAL_FRAME_MS`), so the tuning constants read as
//! "per frame" regardless of display rate. The scale is clamped by
//! `max_frame_ms` so a resumed background tab cannot teleport particles.
//!
//! Without pointer input the only velocity changes are damping and the
//! reflect restitution, both of which shrink `|v|`. Drift and spring-back
//! move positions directly, so total kinetic energy is non-increasing
//! frame over frame.

use glam::DVec2;
use tracing::debug;

use crate::config::{BoundaryPolicy, SimConfig, NOMINAL_FRAME_MS};
use crate::error::EngineError;
use crate::particle::{Bounds, Particle, ParticleSet};
use crate::pointer::PointerState;
use crate::prng::RandomSource;

/// Distances below this are treated as this, bounding every inverse-distance
/// term.
pub const MIN_DISTANCE: f64 = 1.0;

/// How much the glow variant inflates a particle at full attraction.
const SIZE_INFLATION: f64 = 0.5;

/// Attraction toward the pointer for one particle.
///
/// Returns the velocity impulse and the normalized force magnitude
/// `(R - d) / R * influence`. Outside the radius both are zero. The
/// direction divides by `max(d, MIN_DISTANCE)`, so a particle sitting
/// exactly on the pointer gets a zero, finite impulse.
pub fn pointer_force(
    position: DVec2,
    pointer: DVec2,
    influence: f64,
    radius: f64,
    strength: f64,
) -> (DVec2, f64) {
    let delta = pointer - position;
    let distance = delta.length();
    if !(distance < radius) || influence <= 0.0 {
        return (DVec2::ZERO, 0.0);
    }
    let force = (radius - distance) / radius * influence;
    let direction = delta / distance.max(MIN_DISTANCE);
    (direction * force * strength, force)
}

/// A particle set advancing under a [`SimConfig`].
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    particles: ParticleSet,
    bounds: Bounds,
    time: f64,
    frame: u64,
    inflate: bool,
    seeded: bool,
}

impl Simulation {
    /// Validates `config` and seeds the particle set.
    ///
    /// A zero-area surface is accepted: the set stays empty until
    /// [`resize`](Self::resize) supplies a usable area together with a
    /// random source.
    pub fn new(
        config: SimConfig,
        width: usize,
        height: usize,
        rng: &mut impl RandomSource,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let bounds = Bounds::new(width, height);
        let seeded = !bounds.is_empty();
        let particles = if seeded {
            ParticleSet::initialize(&config, bounds, rng)?
        } else {
            ParticleSet::default()
        };
        Ok(Self {
            config,
            particles,
            bounds,
            time: 0.0,
            frame: 0,
            inflate: false,
            seeded,
        })
    }

    /// Enables pointer-proximity size inflation (glow variant).
    pub fn with_size_inflation(mut self, enabled: bool) -> Self {
        self.inflate = enabled;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut ParticleSet {
        &mut self.particles
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Time accumulator; grows by `time_step` per nominal frame.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of `advance` calls that stepped particles.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Whether particles still need seeding (mounted at zero area).
    pub fn needs_seed(&self) -> bool {
        !self.seeded
    }

    /// Converts a frame delta into a step scale, clamping to
    /// `[0, max_frame_ms]`. Non-finite deltas count as one nominal frame.
    pub fn frame_scale(&self, dt_ms: f64) -> f64 {
        let dt = if dt_ms.is_finite() { dt_ms } else { NOMINAL_FRAME_MS };
        dt.clamp(0.0, self.config.max_frame_ms) / NOMINAL_FRAME_MS
    }

    /// Advances one frame of `dt_ms` milliseconds.
    ///
    /// Reads `pointer` but never mutates it; influence decay is the
    /// driver's job, once per frame. A zero-area surface leaves the set
    /// untouched.
    pub fn advance(&mut self, pointer: &PointerState, dt_ms: f64) {
        if self.bounds.is_empty() {
            return;
        }
        let scale = self.frame_scale(dt_ms);
        self.time += self.config.time_step * scale;
        self.frame += 1;

        let cfg = &self.config;
        let bounds = self.bounds;
        let active = pointer.active();
        let damping = cfg.damping_factor.powf(scale);
        let time = self.time;

        for (index, p) in self.particles.iter_mut().enumerate() {
            let mut force = 0.0;
            if let Some((target, influence)) = active {
                let (impulse, f) = pointer_force(
                    p.position,
                    target,
                    influence,
                    cfg.attraction_radius,
                    cfg.attraction_strength,
                );
                p.velocity += impulse * scale;
                force = f;
            }
            p.size = if self.inflate {
                p.base_size * (1.0 + force * SIZE_INFLATION)
            } else {
                p.base_size
            };

            if cfg.spring_strength > 0.0 {
                let pull = (cfg.spring_strength * scale).min(1.0);
                p.position += (p.rest - p.position) * pull;
            }

            p.velocity *= damping;

            let phase = time + index as f64 * cfg.phase_offset;
            let drift = DVec2::new(phase.sin(), phase.cos()) * cfg.drift_amplitude;
            p.position += (p.velocity + drift) * scale;

            apply_boundary(p, bounds, cfg.boundary_policy, cfg.restitution);
        }
    }

    /// Adopts new surface dimensions, clamping every particle inside them
    /// immediately. Seeds the set from `rng` if it was never populated.
    pub fn resize(
        &mut self,
        width: usize,
        height: usize,
        rng: &mut impl RandomSource,
    ) -> Result<(), EngineError> {
        let old = self.bounds;
        let new = Bounds::new(width, height);
        self.bounds = new;
        if new.is_empty() {
            return Ok(());
        }
        if self.needs_seed() {
            self.particles = ParticleSet::initialize(&self.config, new, rng)?;
            self.seeded = true;
            debug!(width, height, count = self.particles.len(), "seeded particles on first resize");
        } else {
            self.particles.fit_to(old, new);
        }
        Ok(())
    }

    /// Sheds particles down to `count`, never below the configured floor.
    /// Returns whether anything was removed.
    pub fn shed_to(&mut self, count: usize) -> bool {
        let target = count.max(self.config.min_particle_count);
        if target >= self.particles.len() {
            return false;
        }
        self.particles.shed_to(target);
        true
    }
}

/// Applies the edge rule so the position ends inside `[0, w) × [0, h)`.
pub fn apply_boundary(p: &mut Particle, bounds: Bounds, policy: BoundaryPolicy, restitution: f64) {
    match policy {
        BoundaryPolicy::Wrap => {
            p.position.x = wrap_axis(p.position.x, bounds.width);
            p.position.y = wrap_axis(p.position.y, bounds.height);
        }
        BoundaryPolicy::ClampReflect => {
            let max = bounds.max_inside();
            reflect_axis(&mut p.position.x, &mut p.velocity.x, max.x, restitution);
            reflect_axis(&mut p.position.y, &mut p.velocity.y, max.y, restitution);
        }
    }
}

fn wrap_axis(v: f64, extent: f64) -> f64 {
    if !v.is_finite() {
        return 0.0;
    }
    let w = v.rem_euclid(extent);
    // rem_euclid can round up to `extent` for tiny negative inputs.
    if w >= extent {
        0.0
    } else {
        w
    }
}

fn reflect_axis(pos: &mut f64, vel: &mut f64, max: f64, restitution: f64) {
    if pos.is_nan() {
        *pos = 0.0;
    }
    if *pos < 0.0 {
        *pos = 0.0;
        *vel = vel.abs() * restitution;
    } else if *pos > max {
        *pos = max;
        *vel = -vel.abs() * restitution;
    }
}
