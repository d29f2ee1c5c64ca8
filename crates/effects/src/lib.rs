#![deny(unsafe_code)]
//! Effect registry: maps effect names to implementations and provides
//! headless replay and CPU-side snapshot rendering.
//!
//! This crate sits between `fluid-canvas-core` (which defines the `Effect`
//! trait) and the individual variant crates (`fluid-canvas-drops`,
//! `fluid-canvas-liquid`). Both the CLI and the WASM host depend on this
//! crate to avoid duplicating dispatch logic.

pub mod headless;
pub mod pixel;

#[cfg(feature = "png")]
pub mod snapshot;

use fluid_canvas_core::config::RenderStrategy;
use fluid_canvas_core::error::EngineError;
use fluid_canvas_core::params::choice_schema;
use fluid_canvas_core::pointer::PointerState;
use fluid_canvas_core::stepper::Simulation;
use fluid_canvas_core::surface::Surface;
use fluid_canvas_core::Effect;
use serde_json::Value;

/// All available effect names.
const EFFECT_NAMES: &[&str] = &[fluid_canvas_drops::NAME, fluid_canvas_liquid::NAME];

/// Params key that selects an effect by how it draws.
pub const RENDER_STRATEGY_KEY: &str = "render_strategy";

/// Enumeration of all available background effects.
///
/// Wraps each variant and delegates `Effect` trait methods. Use
/// [`EffectKind::from_config`] when the caller may name the effect, pick it
/// through `render_strategy`, or both (CLI, WASM).
pub enum EffectKind {
    /// Glowing drops joined by proximity lines.
    Drops(fluid_canvas_drops::Drops),
    /// Thresholded density field.
    Liquid(fluid_canvas_liquid::Liquid),
}

impl EffectKind {
    /// Constructs an effect by name.
    ///
    /// Returns `EngineError::UnknownEffect` if the name is not recognized.
    pub fn from_name(
        name: &str,
        width: usize,
        height: usize,
        seed: u64,
        params: &Value,
    ) -> Result<Self, EngineError> {
        match name {
            fluid_canvas_drops::NAME => Ok(EffectKind::Drops(fluid_canvas_drops::from_json(
                width, height, seed, params,
            )?)),
            fluid_canvas_liquid::NAME => Ok(EffectKind::Liquid(fluid_canvas_liquid::from_json(
                width, height, seed, params,
            )?)),
            _ => Err(EngineError::UnknownEffect(name.to_string())),
        }
    }

    /// Constructs the effect chosen by [`resolve`](Self::resolve).
    pub fn from_config(
        name: Option<&str>,
        width: usize,
        height: usize,
        seed: u64,
        params: &Value,
    ) -> Result<Self, EngineError> {
        Self::from_name(Self::resolve(name, params)?, width, height, seed, params)
    }

    /// Picks an effect name from an explicit `name`, the params'
    /// `render_strategy`, or the drops default, in that order.
    ///
    /// Returns `EngineError::UnknownEffect` for an unrecognized name and
    /// `EngineError::InvalidParam` for an unreadable strategy or one that
    /// disagrees with `name`.
    pub fn resolve(name: Option<&str>, params: &Value) -> Result<&'static str, EngineError> {
        let strategy = params
            .get(RENDER_STRATEGY_KEY)
            .map(|v| {
                serde_json::from_value::<RenderStrategy>(v.clone()).map_err(|_| {
                    EngineError::invalid_param(RENDER_STRATEGY_KEY, "expected \"glow_circles\" or \"density_field\"")
                })
            })
            .transpose()?;
        let by_strategy = strategy.map(effect_for);
        let Some(name) = name else {
            return Ok(by_strategy.unwrap_or(fluid_canvas_drops::NAME));
        };
        let known = EFFECT_NAMES
            .iter()
            .copied()
            .find(|&n| n == name)
            .ok_or_else(|| EngineError::UnknownEffect(name.to_string()))?;
        match by_strategy {
            Some(other) if other != known => Err(EngineError::invalid_param(
                RENDER_STRATEGY_KEY,
                format!("selects '{other}' but the effect is '{known}'"),
            )),
            _ => Ok(known),
        }
    }

    /// Returns a slice of all recognized effect names.
    pub fn list_effects() -> &'static [&'static str] {
        EFFECT_NAMES
    }

    /// How this effect draws.
    pub fn strategy(&self) -> RenderStrategy {
        match self {
            EffectKind::Drops(_) => RenderStrategy::GlowCircles,
            EffectKind::Liquid(_) => RenderStrategy::DensityField,
        }
    }
}

fn effect_for(strategy: RenderStrategy) -> &'static str {
    match strategy {
        RenderStrategy::GlowCircles => fluid_canvas_drops::NAME,
        RenderStrategy::DensityField => fluid_canvas_liquid::NAME,
    }
}

impl Effect for EffectKind {
    fn name(&self) -> &'static str {
        match self {
            EffectKind::Drops(e) => e.name(),
            EffectKind::Liquid(e) => e.name(),
        }
    }

    fn advance(&mut self, pointer: &PointerState, dt_ms: f64) {
        match self {
            EffectKind::Drops(e) => e.advance(pointer, dt_ms),
            EffectKind::Liquid(e) => e.advance(pointer, dt_ms),
        }
    }

    fn render(&self, pointer: &PointerState, surface: &mut Surface) -> Result<(), EngineError> {
        match self {
            EffectKind::Drops(e) => e.render(pointer, surface),
            EffectKind::Liquid(e) => e.render(pointer, surface),
        }
    }

    fn resize(&mut self, width: usize, height: usize) -> Result<(), EngineError> {
        match self {
            EffectKind::Drops(e) => e.resize(width, height),
            EffectKind::Liquid(e) => e.resize(width, height),
        }
    }

    fn simulation(&self) -> &Simulation {
        match self {
            EffectKind::Drops(e) => e.simulation(),
            EffectKind::Liquid(e) => e.simulation(),
        }
    }

    fn degrade(&mut self) -> bool {
        match self {
            EffectKind::Drops(e) => e.degrade(),
            EffectKind::Liquid(e) => e.degrade(),
        }
    }

    fn params(&self) -> Value {
        let mut params = match self {
            EffectKind::Drops(e) => e.params(),
            EffectKind::Liquid(e) => e.params(),
        };
        if let Some(map) = params.as_object_mut() {
            map.insert(RENDER_STRATEGY_KEY.to_string(), self.strategy().as_str().into());
        }
        params
    }

    fn param_schema(&self) -> Value {
        let mut schema = match self {
            EffectKind::Drops(e) => e.param_schema(),
            EffectKind::Liquid(e) => e.param_schema(),
        };
        if let Some(map) = schema.as_object_mut() {
            map.insert(
                RENDER_STRATEGY_KEY.to_string(),
                choice_schema(
                    self.strategy().as_str(),
                    &[RenderStrategy::GlowCircles.as_str(), RenderStrategy::DensityField.as_str()],
                    "How particles are drawn; selects the effect",
                ),
            );
        }
        schema
    }
}
