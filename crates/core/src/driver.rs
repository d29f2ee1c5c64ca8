//! The frame loop: event draining, stepping, rendering, and lifecycle.
//!
//! [`AnimationDriver`] is host-agnostic. A host (browser, headless CLI,
//! test) calls [`AnimationDriver::tick`] once per display frame with the
//! frame timestamp, and pushes [`SurfaceEvent`]s whenever its listeners fire.
//!
//! [`Mounted`] ties a driver to a [`Host`] as one scoped acquisition:
//! listeners and the first scheduled frame are taken together in
//! [`Mounted::mount`] and released together by [`Mounted::teardown`] or on
//! drop, on every exit path including a mount that fails half-way.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::config::NOMINAL_FRAME_MS;
use crate::effect::Effect;
use crate::error::EngineError;
use crate::pointer::{PointerState, SurfaceEvent};
use crate::surface::Surface;

/// Consecutive over-budget frames before the driver asks the effect to
/// degrade.
pub const OVER_BUDGET_STREAK: u32 = 30;

/// Monotonic milliseconds, used to measure frame cost.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// A [`Clock`] that never advances. Every frame costs zero, which keeps
/// headless replays independent of machine speed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedClock;

impl Clock for FixedClock {
    fn now_ms(&self) -> f64 {
        0.0
    }
}

/// Tracks consecutive frames whose work exceeded the budget.
#[derive(Debug, Clone)]
pub struct FrameBudget {
    budget_ms: f64,
    over: u32,
    exhausted: bool,
}

impl FrameBudget {
    pub fn new(budget_ms: f64) -> Self {
        Self {
            budget_ms,
            over: 0,
            exhausted: false,
        }
    }

    /// Records one frame's cost. Returns `true` when a degradation step is
    /// due; the streak restarts afterwards.
    pub fn record(&mut self, cost_ms: f64) -> bool {
        if self.exhausted {
            return false;
        }
        if cost_ms > self.budget_ms {
            self.over += 1;
        } else {
            self.over = 0;
        }
        if self.over >= OVER_BUDGET_STREAK {
            self.over = 0;
            return true;
        }
        false
    }

    /// Stops further degradation requests.
    pub fn exhaust(&mut self) {
        self.exhausted = true;
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// Stepped and drew a frame covering `dt_ms` (after clamping).
    Rendered { dt_ms: f64 },
    /// Zero-area surface; nothing stepped or drawn.
    Paused,
    /// Torn down; nothing ran.
    Stopped,
}

/// Owns the effect, the surface, the pointer state and the event queue.
pub struct AnimationDriver<E> {
    effect: E,
    surface: Surface,
    pointer: PointerState,
    queue: VecDeque<SurfaceEvent>,
    last_timestamp: Option<f64>,
    budget: FrameBudget,
    clock: Box<dyn Clock>,
    frames: u64,
}

impl<E: Effect> AnimationDriver<E> {
    /// Wraps `effect`, allocating a surface matching its bounds.
    pub fn new(effect: E, clock: Box<dyn Clock>) -> Result<Self, EngineError> {
        let bounds = effect.simulation().bounds();
        let surface = Surface::new(bounds.width as usize, bounds.height as usize)?;
        let budget = FrameBudget::new(effect.simulation().config().frame_budget_ms);
        Ok(Self {
            effect,
            surface,
            pointer: PointerState::new(),
            queue: VecDeque::new(),
            last_timestamp: None,
            budget,
            clock,
            frames: 0,
        })
    }

    /// Queues a host event for the next tick.
    pub fn push_event(&mut self, event: SurfaceEvent) {
        self.queue.push_back(event);
    }

    /// Events waiting for the next tick.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn effect(&self) -> &E {
        &self.effect
    }

    pub fn effect_mut(&mut self) -> &mut E {
        &mut self.effect
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs one frame at host timestamp `timestamp_ms`.
    ///
    /// Drains queued events in arrival order, clamps the frame delta,
    /// steps, decays pointer influence once, renders, and checks the frame
    /// budget.
    pub fn tick(&mut self, timestamp_ms: f64) -> Result<FrameOutcome, EngineError> {
        self.drain_events()?;

        let max_frame_ms = self.effect.simulation().config().max_frame_ms;
        let raw_dt = match self.last_timestamp {
            Some(prev) => timestamp_ms - prev,
            None => NOMINAL_FRAME_MS,
        };
        self.last_timestamp = Some(timestamp_ms);
        let dt_ms = if raw_dt.is_finite() {
            raw_dt.clamp(0.0, max_frame_ms)
        } else {
            NOMINAL_FRAME_MS
        };
        if raw_dt > max_frame_ms {
            warn!(raw_dt, clamped = dt_ms, "frame delta clamped");
        }

        let decay = self.effect.simulation().config().pointer_decay;
        if self.surface.is_empty() {
            self.pointer.decay(decay);
            trace!("zero-area surface, frame skipped");
            return Ok(FrameOutcome::Paused);
        }

        let started = self.clock.now_ms();
        self.effect.advance(&self.pointer, dt_ms);
        self.pointer.decay(decay);
        self.effect.render(&self.pointer, &mut self.surface)?;
        let cost = self.clock.now_ms() - started;
        self.frames += 1;
        trace!(frame = self.frames, dt_ms, cost, "frame rendered");

        if self.budget.record(cost) {
            if self.effect.degrade() {
                warn!(
                    effect = self.effect.name(),
                    particles = self.effect.simulation().particles().len(),
                    "frame budget exceeded, degraded quality"
                );
            } else {
                warn!(effect = self.effect.name(), "frame budget exceeded at minimum quality");
                self.budget.exhaust();
            }
        }

        Ok(FrameOutcome::Rendered { dt_ms })
    }

    fn drain_events(&mut self) -> Result<(), EngineError> {
        while let Some(event) = self.queue.pop_front() {
            match event {
                SurfaceEvent::PointerMove { x, y } => self.pointer.on_move(x, y),
                SurfaceEvent::PointerLeave => self.pointer.on_leave(),
                SurfaceEvent::Resize { width, height } => {
                    if width == self.surface.width() && height == self.surface.height() {
                        continue;
                    }
                    debug!(width, height, "surface resized");
                    self.surface.resize(width, height)?;
                    self.effect.resize(width, height)?;
                }
            }
        }
        Ok(())
    }
}

/// The platform side of the frame loop.
///
/// Every method is called at most once per acquisition/release pair by
/// [`Mounted`]; implementations may assume `detach` follows a successful or
/// failed `attach`, and `cancel_frame` may be called with nothing pending.
pub trait Host {
    /// Registers pointer-move, pointer-leave and resize listeners.
    fn attach(&mut self) -> Result<(), EngineError>;
    /// Removes every listener `attach` registered.
    fn detach(&mut self);
    /// Requests the next display-synchronized frame callback.
    fn schedule_frame(&mut self) -> Result<(), EngineError>;
    /// Cancels a pending frame callback, if any.
    fn cancel_frame(&mut self);
    /// Shows a rendered surface.
    fn present(&mut self, surface: &Surface) -> Result<(), EngineError>;
}

/// A driver bound to a host for the lifetime of a mount.
pub struct Mounted<E: Effect, H: Host> {
    driver: AnimationDriver<E>,
    host: H,
    live: bool,
}

impl<E: Effect, H: Host> Mounted<E, H> {
    /// Attaches listeners and schedules the first frame. If either step
    /// fails, whatever was acquired is released before returning the error.
    pub fn mount(driver: AnimationDriver<E>, host: H) -> Result<Self, EngineError> {
        let mut mounted = Self {
            driver,
            host,
            live: true,
        };
        mounted.host.attach()?;
        mounted.host.schedule_frame()?;
        debug!(effect = mounted.driver.effect().name(), "mounted");
        Ok(mounted)
    }

    /// Forwards a host event to the driver. Ignored after teardown.
    pub fn push_event(&mut self, event: SurfaceEvent) {
        if self.live {
            self.driver.push_event(event);
        }
    }

    /// Runs the frame callback: tick, present, reschedule.
    ///
    /// Any error tears the mount down before it is returned, so a failing
    /// background stops instead of retrying every frame.
    pub fn on_frame(&mut self, timestamp_ms: f64) -> Result<FrameOutcome, EngineError> {
        if !self.live {
            return Ok(FrameOutcome::Stopped);
        }
        let result = self.run_frame(timestamp_ms);
        if result.is_err() {
            self.teardown();
        }
        result
    }

    fn run_frame(&mut self, timestamp_ms: f64) -> Result<FrameOutcome, EngineError> {
        let outcome = self.driver.tick(timestamp_ms)?;
        if matches!(outcome, FrameOutcome::Rendered { .. }) {
            self.host.present(self.driver.surface())?;
        }
        self.host.schedule_frame()?;
        Ok(outcome)
    }

    /// Cancels the pending frame and removes all listeners. Idempotent.
    pub fn teardown(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        self.host.cancel_frame();
        self.host.detach();
        debug!(effect = self.driver.effect().name(), "unmounted");
    }

    /// Consumes the mount, releasing everything.
    pub fn unmount(mut self) {
        self.teardown();
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn driver(&self) -> &AnimationDriver<E> {
        &self.driver
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<E: Effect, H: Host> Drop for Mounted<E, H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;
    use crate::config::SimConfig;
    use crate::effect::{Backdrop, Renderer};
    use crate::prng::Xorshift64;
    use crate::stepper::Simulation;
    use serde_json::{json, Value};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct FillRenderer;

    impl Renderer for FillRenderer {
        fn render(&self, sim: &Simulation, _pointer: &PointerState, surface: &mut Surface) {
            surface.clear();
            for p in sim.particles() {
                surface.blend(p.position.x as usize, p.position.y as usize, Rgba::rgba8(255, 255, 255, 0.5));
            }
        }

        fn params(&self) -> Value {
            json!({})
        }

        fn param_schema(&self) -> Value {
            json!({})
        }
    }

    /// Advances by `step` on every read, so each frame costs `step` ms.
    struct SteppingClock {
        now: Cell<f64>,
        step: f64,
    }

    impl Clock for SteppingClock {
        fn now_ms(&self) -> f64 {
            let t = self.now.get() + self.step;
            self.now.set(t);
            t
        }
    }

    fn clock(step: f64) -> Box<dyn Clock> {
        Box::new(SteppingClock {
            now: Cell::new(0.0),
            step,
        })
    }

    fn driver_with(config: SimConfig, w: usize, h: usize, step: f64) -> AnimationDriver<Backdrop<FillRenderer>> {
        let mut rng = Xorshift64::new(42);
        let sim = Simulation::new(config, w, h, &mut rng).unwrap();
        AnimationDriver::new(Backdrop::new("fill", sim, FillRenderer, rng), clock(step)).unwrap()
    }

    fn driver(w: usize, h: usize) -> AnimationDriver<Backdrop<FillRenderer>> {
        driver_with(SimConfig::drops(), w, h, 0.0)
    }

    #[derive(Default)]
    struct Log {
        calls: RefCell<Vec<&'static str>>,
    }

    struct RecordingHost {
        log: Rc<Log>,
        fail_attach: bool,
        fail_schedule_after: Option<usize>,
        scheduled: usize,
        presented: usize,
    }

    impl RecordingHost {
        fn new(log: Rc<Log>) -> Self {
            Self {
                log,
                fail_attach: false,
                fail_schedule_after: None,
                scheduled: 0,
                presented: 0,
            }
        }

        fn push(&self, call: &'static str) {
            self.log.calls.borrow_mut().push(call);
        }
    }

    impl Host for RecordingHost {
        fn attach(&mut self) -> Result<(), EngineError> {
            self.push("attach");
            if self.fail_attach {
                return Err(EngineError::Host("no listeners".into()));
            }
            Ok(())
        }

        fn detach(&mut self) {
            self.push("detach");
        }

        fn schedule_frame(&mut self) -> Result<(), EngineError> {
            self.push("schedule");
            if self.fail_schedule_after == Some(self.scheduled) {
                return Err(EngineError::Host("no frame callback".into()));
            }
            self.scheduled += 1;
            Ok(())
        }

        fn cancel_frame(&mut self) {
            self.push("cancel");
        }

        fn present(&mut self, _surface: &Surface) -> Result<(), EngineError> {
            self.push("present");
            self.presented += 1;
            Ok(())
        }
    }

    fn calls(log: &Rc<Log>) -> Vec<&'static str> {
        log.calls.borrow().clone()
    }

    #[test]
    fn first_tick_uses_nominal_delta() {
        let mut d = driver(100, 100);
        assert_eq!(d.tick(5000.0).unwrap(), FrameOutcome::Rendered { dt_ms: NOMINAL_FRAME_MS });
        assert_eq!(d.tick(5016.0).unwrap(), FrameOutcome::Rendered { dt_ms: 16.0 });
    }

    #[test]
    fn large_delta_is_clamped() {
        let mut d = driver(100, 100);
        d.tick(0.0).unwrap();
        assert_eq!(d.tick(60_000.0).unwrap(), FrameOutcome::Rendered { dt_ms: 50.0 });
        assert_eq!(d.tick(59_000.0).unwrap(), FrameOutcome::Rendered { dt_ms: 0.0 });
    }

    #[test]
    fn latest_pointer_move_wins() {
        let mut d = driver(200, 200);
        d.push_event(SurfaceEvent::PointerMove { x: 10.0, y: 10.0 });
        d.push_event(SurfaceEvent::PointerMove { x: 150.0, y: 20.0 });
        assert_eq!(d.pending_events(), 2);
        d.tick(0.0).unwrap();
        assert_eq!(d.pending_events(), 0);
        assert_eq!(d.pointer().position(), Some(glam::DVec2::new(150.0, 20.0)));
    }

    #[test]
    fn influence_decays_once_per_tick() {
        let mut d = driver(50, 50);
        d.push_event(SurfaceEvent::PointerMove { x: 1.0, y: 1.0 });
        d.tick(0.0).unwrap();
        assert!((d.pointer().influence() - 0.95).abs() < 1e-12);
        d.tick(16.0).unwrap();
        assert!((d.pointer().influence() - 0.95 * 0.95).abs() < 1e-12);
    }

    #[test]
    fn resize_mid_run_clamps_particles_and_surface() {
        let mut d = driver(800, 600);
        for i in 0..5 {
            d.tick(i as f64 * 16.0).unwrap();
        }
        d.push_event(SurfaceEvent::Resize { width: 400, height: 300 });
        d.tick(80.0).unwrap();
        assert_eq!((d.surface().width(), d.surface().height()), (400, 300));
        let b = d.effect().simulation().bounds();
        assert!(d.effect().simulation().particles().iter().all(|p| b.contains(p.position)));
    }

    #[test]
    fn zero_area_pauses_then_resumes() {
        let mut d = driver(0, 0);
        assert_eq!(d.tick(0.0).unwrap(), FrameOutcome::Paused);
        d.push_event(SurfaceEvent::Resize { width: 64, height: 48 });
        assert!(matches!(d.tick(16.0).unwrap(), FrameOutcome::Rendered { .. }));
        assert_eq!(d.effect().simulation().particles().len(), 80);
        assert_eq!(d.frames(), 1);
    }

    #[test]
    fn zero_particles_render_transparent() {
        let cfg = SimConfig { particle_count: 0, ..SimConfig::drops() };
        let mut d = driver_with(cfg, 20, 20, 0.0);
        d.tick(0.0).unwrap();
        assert!(d.surface().pixels().iter().all(|p| *p == Rgba::TRANSPARENT));
    }

    #[test]
    fn sustained_overrun_degrades_effect() {
        let cfg = SimConfig { frame_budget_ms: 1.0, ..SimConfig::drops() };
        let mut d = driver_with(cfg, 100, 100, 5.0);
        for i in 0..OVER_BUDGET_STREAK {
            d.tick(i as f64 * 16.0).unwrap();
        }
        assert_eq!(d.effect().simulation().particles().len(), 60);
    }

    #[test]
    fn budget_resets_streak_on_fast_frame() {
        let mut b = FrameBudget::new(10.0);
        for _ in 0..OVER_BUDGET_STREAK - 1 {
            assert!(!b.record(20.0));
        }
        assert!(!b.record(1.0));
        assert!(!b.record(20.0));
    }

    #[test]
    fn budget_exhaustion_stops_requests() {
        let mut b = FrameBudget::new(1.0);
        b.exhaust();
        for _ in 0..OVER_BUDGET_STREAK * 2 {
            assert!(!b.record(100.0));
        }
        assert!(b.is_exhausted());
    }

    #[test]
    fn mount_attaches_then_schedules() {
        let log = Rc::new(Log::default());
        let m = Mounted::mount(driver(10, 10), RecordingHost::new(log.clone())).unwrap();
        assert!(m.is_live());
        assert_eq!(calls(&log), vec!["attach", "schedule"]);
    }

    #[test]
    fn frame_presents_and_reschedules() {
        let log = Rc::new(Log::default());
        let mut m = Mounted::mount(driver(10, 10), RecordingHost::new(log.clone())).unwrap();
        m.on_frame(0.0).unwrap();
        assert_eq!(calls(&log), vec!["attach", "schedule", "present", "schedule"]);
        assert_eq!(m.host().presented, 1);
    }

    #[test]
    fn teardown_releases_everything_once() {
        let log = Rc::new(Log::default());
        let mut m = Mounted::mount(driver(10, 10), RecordingHost::new(log.clone())).unwrap();
        m.teardown();
        m.teardown();
        drop(m);
        assert_eq!(calls(&log), vec!["attach", "schedule", "cancel", "detach"]);
    }

    #[test]
    fn no_frame_runs_after_teardown() {
        let log = Rc::new(Log::default());
        let mut m = Mounted::mount(driver(10, 10), RecordingHost::new(log.clone())).unwrap();
        m.teardown();
        m.push_event(SurfaceEvent::PointerMove { x: 1.0, y: 1.0 });
        assert_eq!(m.on_frame(16.0).unwrap(), FrameOutcome::Stopped);
        assert_eq!(m.driver().frames(), 0);
        assert_eq!(m.driver().pending_events(), 0);
        assert_eq!(m.host().presented, 0);
    }

    #[test]
    fn drop_releases_listeners_and_frame() {
        let log = Rc::new(Log::default());
        {
            let _m = Mounted::mount(driver(10, 10), RecordingHost::new(log.clone())).unwrap();
        }
        assert_eq!(calls(&log), vec!["attach", "schedule", "cancel", "detach"]);
    }

    #[test]
    fn failed_attach_still_releases() {
        let log = Rc::new(Log::default());
        let mut host = RecordingHost::new(log.clone());
        host.fail_attach = true;
        assert!(Mounted::mount(driver(10, 10), host).is_err());
        assert_eq!(calls(&log), vec!["attach", "cancel", "detach"]);
    }

    #[test]
    fn failed_first_schedule_releases_listeners() {
        let log = Rc::new(Log::default());
        let mut host = RecordingHost::new(log.clone());
        host.fail_schedule_after = Some(0);
        assert!(Mounted::mount(driver(10, 10), host).is_err());
        assert_eq!(calls(&log), vec!["attach", "schedule", "cancel", "detach"]);
    }

    #[test]
    fn frame_error_tears_down() {
        let log = Rc::new(Log::default());
        let mut host = RecordingHost::new(log.clone());
        host.fail_schedule_after = Some(1);
        let mut m = Mounted::mount(driver(10, 10), host).unwrap();
        assert!(m.on_frame(0.0).is_err());
        assert!(!m.is_live());
        assert_eq!(m.on_frame(16.0).unwrap(), FrameOutcome::Stopped);
        let log = calls(&log);
        assert_eq!(&log[log.len() - 2..], &["cancel", "detach"]);
    }
}
