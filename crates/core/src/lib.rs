#![deny(unsafe_code)]
//! Core types and traits for the fluid-canvas pointer-reactive backgrounds.
//!
//! Provides the `Effect` and `Renderer` traits, the particle `Simulation`
//! stepper, `PointerState`, the premultiplied `Surface` and `Rgba`/`Gradient`
//! color types, the `AnimationDriver` frame loop with its `Host` lifecycle,
//! the `Xorshift64` PRNG, `Seed` replay records, and parameter helpers.

pub mod color;
pub mod config;
pub mod driver;
pub mod effect;
pub mod error;
pub mod params;
pub mod particle;
pub mod pointer;
pub mod prng;
pub mod seed;
pub mod stepper;
pub mod surface;

pub use color::{ColorStop, Gradient, Rgba};
pub use config::{BoundaryPolicy, RenderStrategy, SimConfig};
pub use driver::{AnimationDriver, Clock, FixedClock, FrameOutcome, Host, Mounted};
pub use effect::{Backdrop, Effect, Renderer};
pub use error::EngineError;
pub use particle::{Bounds, Particle, ParticleSet};
pub use pointer::{PointerState, SurfaceEvent};
pub use prng::{RandomSource, Xorshift64};
pub use seed::{PointerSample, Seed};
pub use stepper::Simulation;
pub use surface::Surface;
