//! The capability interfaces every background effect implements.
//!
//! [`Effect`] is the `{advance, render}` pair the animation driver calls
//! once per frame. It is object-safe, so hosts can hold a `Box<dyn Effect>`
//! and switch variants at runtime.
//!
//! Variants differ only in how they draw, so the shared [`Backdrop`] couples
//! one [`Simulation`] with a variant-specific [`Renderer`] instead of each
//! variant carrying its own copy of the stepping code.

use serde_json::Value;

use crate::error::EngineError;
use crate::pointer::PointerState;
use crate::prng::Xorshift64;
use crate::stepper::Simulation;
use crate::surface::Surface;

/// Draws a simulation's current state.
pub trait Renderer {
    /// Writes one frame. Pixels the strategy does not touch must stay
    /// transparent, so implementations start by clearing `surface`.
    fn render(&self, sim: &Simulation, pointer: &PointerState, surface: &mut Surface);

    /// Lowers the per-frame cost by one notch (e.g. a coarser sampling
    /// stride). Returns `false` once nothing is left to give up.
    fn degrade(&mut self) -> bool {
        false
    }

    /// Renderer-specific parameter values.
    fn params(&self) -> Value;

    /// Renderer-specific parameter schema.
    fn param_schema(&self) -> Value;
}

/// A pointer-reactive background: one step and one draw per frame.
pub trait Effect {
    /// Registered name of this effect.
    fn name(&self) -> &'static str;

    /// Advances the simulation by `dt_ms`.
    fn advance(&mut self, pointer: &PointerState, dt_ms: f64);

    /// Draws the current state into `surface`.
    ///
    /// Returns `EngineError::InvalidDimensions` when the surface size
    /// disagrees with the simulation bounds.
    fn render(&self, pointer: &PointerState, surface: &mut Surface) -> Result<(), EngineError>;

    /// Adopts new surface dimensions.
    fn resize(&mut self, width: usize, height: usize) -> Result<(), EngineError>;

    /// Read access to the particle state.
    fn simulation(&self) -> &Simulation;

    /// Reduces per-frame cost; `false` when already at the floor.
    fn degrade(&mut self) -> bool;

    /// Current parameter values as a flat JSON object.
    fn params(&self) -> Value;

    /// Schema for every parameter `params()` reports.
    fn param_schema(&self) -> Value;
}

/// Fraction of particles kept each time degradation sheds.
const SHED_NUMERATOR: usize = 3;
const SHED_DENOMINATOR: usize = 4;

/// A [`Simulation`] drawn by renderer `R`.
#[derive(Debug, Clone)]
pub struct Backdrop<R> {
    name: &'static str,
    sim: Simulation,
    renderer: R,
    rng: Xorshift64,
}

impl<R: Renderer> Backdrop<R> {
    /// Couples a simulation with a renderer. `rng` is kept for seeding
    /// after a zero-area mount.
    pub fn new(name: &'static str, sim: Simulation, renderer: R, rng: Xorshift64) -> Self {
        Self {
            name,
            sim,
            renderer,
            rng,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }
}

impl<R: Renderer> Effect for Backdrop<R> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn advance(&mut self, pointer: &PointerState, dt_ms: f64) {
        self.sim.advance(pointer, dt_ms);
    }

    fn render(&self, pointer: &PointerState, surface: &mut Surface) -> Result<(), EngineError> {
        let b = self.sim.bounds();
        if surface.width() as f64 != b.width || surface.height() as f64 != b.height {
            return Err(EngineError::InvalidDimensions);
        }
        self.renderer.render(&self.sim, pointer, surface);
        Ok(())
    }

    fn resize(&mut self, width: usize, height: usize) -> Result<(), EngineError> {
        self.sim.resize(width, height, &mut self.rng)
    }

    fn simulation(&self) -> &Simulation {
        &self.sim
    }

    fn degrade(&mut self) -> bool {
        if self.renderer.degrade() {
            return true;
        }
        let keep = self.sim.particles().len() * SHED_NUMERATOR / SHED_DENOMINATOR;
        self.sim.shed_to(keep)
    }

    fn params(&self) -> Value {
        let mut params = self.sim.config().to_params();
        merge(&mut params, self.renderer.params());
        params
    }

    fn param_schema(&self) -> Value {
        let mut schema = self.sim.config().schema();
        merge(&mut schema, self.renderer.param_schema());
        schema
    }
}

fn merge(into: &mut Value, from: Value) {
    if let (Some(dst), Value::Object(src)) = (into.as_object_mut(), from) {
        dst.extend(src);
    }
}
