//! The owned particle collection.
//!
//! A [`ParticleSet`] is created once per mount with randomized attributes and
//! keeps creation order for its whole life, so pairwise passes (connector
//! lines) visit each unordered pair exactly once as `(i, j)` with `i < j`.

use glam::DVec2;

use crate::config::SimConfig;
use crate::error::EngineError;
use crate::prng::RandomSource;

/// Surface dimensions in pixels, as seen by the stepper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width: width as f64,
            height: height as f64,
        }
    }

    /// True when either side is zero, i.e. no position can satisfy
    /// `[0, width) × [0, height)`.
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Largest representable coordinate strictly below each extent.
    pub fn max_inside(&self) -> DVec2 {
        DVec2::new(below(self.width), below(self.height))
    }

    /// Whether `p` lies in `[0, width) × [0, height)`.
    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x < self.width && p.y < self.height
    }

    /// Clamps `p` into the half-open bounds. NaN components map to 0.
    pub fn clamp(&self, p: DVec2) -> DVec2 {
        let max = self.max_inside();
        DVec2::new(clamp_axis(p.x, max.x), clamp_axis(p.y, max.y))
    }
}

fn below(extent: f64) -> f64 {
    if extent <= 0.0 {
        0.0
    } else {
        extent * (1.0 - f64::EPSILON)
    }
}

fn clamp_axis(v: f64, max: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, max)
    }
}

/// One simulated point.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: DVec2,
    pub velocity: DVec2,
    /// Size drawn at rest.
    pub base_size: f64,
    /// Size drawn this frame; inflated near the pointer by the glow variant.
    pub size: f64,
    /// Opacity (glow) or density weight (field), in [0, 1].
    pub opacity: f64,
    /// Spring anchor. Fixed while stepping; remapped only on resize.
    pub rest: DVec2,
}

impl Particle {
    /// `vx² + vy²`.
    pub fn kinetic_energy(&self) -> f64 {
        self.velocity.length_squared()
    }
}

/// Particles in creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleSet {
    particles: Vec<Particle>,
}

impl ParticleSet {
    /// Seeds `config.particle_count` particles uniformly inside `bounds`.
    ///
    /// Velocities are uniform in `[-speed, speed)`, base sizes in
    /// `[size_min, size_max)`, opacities in `[opacity_min, opacity_max)`.
    /// Each particle's rest anchor equals its initial position.
    ///
    /// Returns `EngineError::InvalidDimensions` for zero-area bounds, since
    /// no position could satisfy the bounds invariant.
    pub fn initialize(
        config: &SimConfig,
        bounds: Bounds,
        rng: &mut impl RandomSource,
    ) -> Result<Self, EngineError> {
        if bounds.is_empty() {
            return Err(EngineError::InvalidDimensions);
        }
        let max = bounds.max_inside();
        let particles = (0..config.particle_count)
            .map(|_| {
                let position = DVec2::new(
                    rng.next_range(0.0, bounds.width).min(max.x),
                    rng.next_range(0.0, bounds.height).min(max.y),
                );
                let velocity = DVec2::new(
                    rng.next_symmetric(config.speed),
                    rng.next_symmetric(config.speed),
                );
                let base_size = rng.next_range(config.size_min, config.size_max).max(0.0);
                let opacity = rng
                    .next_range(config.opacity_min, config.opacity_max)
                    .clamp(0.0, 1.0);
                Particle {
                    position,
                    velocity,
                    base_size,
                    size: base_size,
                    opacity,
                    rest: position,
                }
            })
            .collect();
        Ok(Self { particles })
    }

    /// Wraps an explicit list, mainly for tests and replays.
    pub fn from_particles(particles: Vec<Particle>) -> Self {
        Self { particles }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Creation-order iteration.
    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Particle> {
        self.particles.iter_mut()
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    /// Sum of `vx² + vy²` over all particles.
    pub fn kinetic_energy(&self) -> f64 {
        self.particles.iter().map(Particle::kinetic_energy).sum()
    }

    /// Every unordered pair closer than `radius`, as `(i, j, distance)` with
    /// `i < j`, in lexicographic order.
    pub fn pairs_within(&self, radius: f64) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let r2 = radius * radius;
        self.particles.iter().enumerate().flat_map(move |(i, a)| {
            self.particles[i + 1..]
                .iter()
                .enumerate()
                .filter_map(move |(k, b)| {
                    let d2 = a.position.distance_squared(b.position);
                    (d2 < r2).then(|| (i, i + 1 + k, d2.sqrt()))
                })
        })
    }

    /// Drops the newest particles until at most `count` remain. Used only by
    /// frame-budget degradation.
    pub fn shed_to(&mut self, count: usize) {
        self.particles.truncate(count);
    }

    /// Clamps every position into `bounds` and scales rest anchors by the
    /// ratio between the new and old extents.
    pub fn fit_to(&mut self, old: Bounds, new: Bounds) {
        if new.is_empty() {
            return;
        }
        let sx = if old.width > 0.0 { new.width / old.width } else { 1.0 };
        let sy = if old.height > 0.0 { new.height / old.height } else { 1.0 };
        for p in &mut self.particles {
            p.position = new.clamp(p.position);
            p.rest = new.clamp(DVec2::new(p.rest.x * sx, p.rest.y * sy));
        }
    }
}

impl<'a> IntoIterator for &'a ParticleSet {
    type Item = &'a Particle;
    type IntoIter = std::slice::Iter<'a, Particle>;

    fn into_iter(self) -> Self::IntoIter {
        self.particles.iter()
    }
}
