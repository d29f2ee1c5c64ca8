#![deny(unsafe_code)]
//! Browser host for the fluid-canvas backgrounds.
//!
//! [`FluidBackground`] sizes a `<canvas>` to the viewport, drives an effect
//! from `requestAnimationFrame`, feeds it window `pointermove`, document
//! `mouseleave` and window `resize` events, and blits each frame with
//! `putImageData`. Listeners and the pending frame are owned by one
//! [`Mounted`] guard, so `unmount()`, a failed mount, and dropping the
//! object all release every one of them.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use fluid_canvas_core::driver::{AnimationDriver, Clock, Host, Mounted};
use fluid_canvas_core::error::EngineError;
use fluid_canvas_core::pointer::SurfaceEvent;
use fluid_canvas_core::surface::Surface;
use fluid_canvas_core::Effect;
use fluid_canvas_effects::pixel::surface_to_rgba8;
use fluid_canvas_effects::EffectKind;
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{
    CanvasRenderingContext2d, Event, EventTarget, HtmlCanvasElement, ImageData, MouseEvent,
    Performance, Window,
};

type Slot = RefCell<Option<Mounted<EffectKind, BrowserHost>>>;

/// `performance.now()` as a [`Clock`].
struct PerformanceClock(Performance);

impl Clock for PerformanceClock {
    fn now_ms(&self) -> f64 {
        self.0.now()
    }
}

struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
    attached: bool,
}

/// [`Host`] backed by a window and a 2D canvas context.
struct BrowserHost {
    window: Window,
    context: CanvasRenderingContext2d,
    listeners: Vec<Listener>,
    frame: Closure<dyn FnMut(f64)>,
    pending: Option<i32>,
}

impl BrowserHost {
    fn new(window: Window, canvas: HtmlCanvasElement, slot: Weak<Slot>) -> Result<Self, EngineError> {
        let context = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
            .ok_or_else(|| EngineError::Host("2d context unavailable".into()))?;
        let document = window
            .document()
            .ok_or_else(|| EngineError::Host("no document".into()))?;

        let move_slot = slot.clone();
        let move_canvas = canvas.clone();
        let on_move = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let rect = move_canvas.get_bounding_client_rect();
            route(
                &move_slot,
                SurfaceEvent::PointerMove {
                    x: f64::from(mouse.client_x()) - rect.left(),
                    y: f64::from(mouse.client_y()) - rect.top(),
                },
            );
        });

        let leave_slot = slot.clone();
        let on_leave = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            route(&leave_slot, SurfaceEvent::PointerLeave);
        });

        let resize_slot = slot.clone();
        let resize_window = window.clone();
        let resize_canvas = canvas;
        let on_resize = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            let (width, height) = viewport_size(&resize_window);
            resize_canvas.set_width(width as u32);
            resize_canvas.set_height(height as u32);
            route(&resize_slot, SurfaceEvent::Resize { width, height });
        });

        let frame = Closure::<dyn FnMut(f64)>::new(move |timestamp: f64| {
            let Some(slot) = slot.upgrade() else {
                return;
            };
            let Ok(mut guard) = slot.try_borrow_mut() else {
                return;
            };
            if let Some(mounted) = guard.as_mut() {
                if let Err(e) = mounted.on_frame(timestamp) {
                    report_stopped(&e);
                }
            }
        });

        let window_target: EventTarget = window.clone().into();
        let document_target: EventTarget = document.into();
        let listeners = vec![
            Listener {
                target: window_target.clone(),
                kind: "pointermove",
                callback: on_move,
                attached: false,
            },
            Listener {
                target: document_target,
                kind: "mouseleave",
                callback: on_leave,
                attached: false,
            },
            Listener {
                target: window_target,
                kind: "resize",
                callback: on_resize,
                attached: false,
            },
        ];

        Ok(Self {
            window,
            context,
            listeners,
            frame,
            pending: None,
        })
    }
}

impl Host for BrowserHost {
    fn attach(&mut self) -> Result<(), EngineError> {
        for listener in &mut self.listeners {
            listener
                .target
                .add_event_listener_with_callback(listener.kind, listener.callback.as_ref().unchecked_ref())
                .map_err(|_| EngineError::Host(format!("cannot listen for {}", listener.kind)))?;
            listener.attached = true;
        }
        Ok(())
    }

    fn detach(&mut self) {
        for listener in self.listeners.iter_mut().filter(|l| l.attached) {
            // Removal only fails for a detached target, which has nothing left to release.
            let _ = listener
                .target
                .remove_event_listener_with_callback(listener.kind, listener.callback.as_ref().unchecked_ref());
            listener.attached = false;
        }
    }

    fn schedule_frame(&mut self) -> Result<(), EngineError> {
        let handle = self
            .window
            .request_animation_frame(self.frame.as_ref().unchecked_ref())
            .map_err(|_| EngineError::Host("requestAnimationFrame unavailable".into()))?;
        self.pending = Some(handle);
        Ok(())
    }

    fn cancel_frame(&mut self) {
        if let Some(handle) = self.pending.take() {
            let _ = self.window.cancel_animation_frame(handle);
        }
    }

    fn present(&mut self, surface: &Surface) -> Result<(), EngineError> {
        if surface.is_empty() {
            return Ok(());
        }
        let pixels = surface_to_rgba8(surface);
        let image = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(pixels.as_slice()),
            surface.width() as u32,
            surface.height() as u32,
        )
        .map_err(|_| EngineError::Host("cannot create ImageData".into()))?;
        self.context
            .put_image_data(&image, 0.0, 0.0)
            .map_err(|_| EngineError::Host("putImageData failed".into()))
    }
}

/// Logs a frame failure to the browser console, where it stays visible
/// without a tracing subscriber installed.
fn report_stopped(error: &EngineError) {
    warn!(%error, "background stopped");
    web_sys::console::error_1(&JsValue::from_str(&stopped_message(error)));
}

fn stopped_message(error: &EngineError) -> String {
    format!("fluid-canvas background stopped: {error}")
}

/// Forwards an event to the mounted driver, if any.
fn route(slot: &Weak<Slot>, event: SurfaceEvent) {
    let Some(slot) = slot.upgrade() else {
        return;
    };
    let Ok(mut guard) = slot.try_borrow_mut() else {
        return;
    };
    if let Some(mounted) = guard.as_mut() {
        mounted.push_event(event);
    }
}

fn viewport_size(window: &Window) -> (usize, usize) {
    let read = |v: Result<JsValue, JsValue>| {
        v.ok()
            .and_then(|v| v.as_f64())
            .filter(|v| v.is_finite() && *v > 0.0)
            .map_or(0, |v| v as usize)
    };
    (read(window.inner_width()), read(window.inner_height()))
}

fn to_js(e: EngineError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// A pointer-reactive canvas background.
#[wasm_bindgen]
pub struct FluidBackground {
    slot: Rc<Slot>,
}

#[wasm_bindgen]
impl FluidBackground {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            slot: Rc::new(RefCell::new(None)),
        }
    }

    /// Starts an effect on `canvas`, replacing any running effect.
    ///
    /// `params_json` is a JSON object of effect parameters. Without an
    /// `effect` name its `render_strategy` key picks the effect, else
    /// drops. `seed` defaults to the current time. On failure nothing
    /// stays attached and the canvas is left untouched.
    pub fn mount(
        &mut self,
        canvas: HtmlCanvasElement,
        effect: Option<String>,
        params_json: &str,
        seed: Option<u64>,
    ) -> Result<(), JsValue> {
        self.unmount();
        let window = web_sys::window().ok_or_else(|| to_js(EngineError::Host("no window".into())))?;
        let params: serde_json::Value = serde_json::from_str(params_json)
            .map_err(|e| JsValue::from_str(&format!("invalid params JSON: {e}")))?;

        let (width, height) = viewport_size(&window);
        let seed = seed.unwrap_or_else(|| js_sys::Date::now() as u64);
        let effect = EffectKind::from_config(effect.as_deref(), width, height, seed, &params).map_err(to_js)?;
        let performance = window
            .performance()
            .ok_or_else(|| to_js(EngineError::Host("no performance clock".into())))?;
        let driver = AnimationDriver::new(effect, Box::new(PerformanceClock(performance))).map_err(to_js)?;

        let host = BrowserHost::new(window, canvas.clone(), Rc::downgrade(&self.slot)).map_err(to_js)?;
        canvas.set_width(width as u32);
        canvas.set_height(height as u32);
        let mounted = Mounted::mount(driver, host).map_err(to_js)?;
        *self.slot.borrow_mut() = Some(mounted);
        Ok(())
    }

    /// Stops the animation and removes every listener. Safe to call twice.
    pub fn unmount(&mut self) {
        let previous = self.slot.borrow_mut().take();
        if let Some(mounted) = previous {
            mounted.unmount();
        }
    }

    /// Whether an effect is currently running.
    pub fn is_mounted(&self) -> bool {
        self.slot
            .try_borrow()
            .map(|guard| guard.as_ref().is_some_and(|m| m.is_live()))
            .unwrap_or(false)
    }

    /// Current parameter values as a JSON string, or `None` when unmounted.
    pub fn params(&self) -> Option<String> {
        let guard = self.slot.try_borrow().ok()?;
        let mounted = guard.as_ref()?;
        Some(mounted.driver().effect().params().to_string())
    }
}

impl Default for FluidBackground {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_message_carries_the_cause() {
        let msg = stopped_message(&EngineError::Host("putImageData failed".into()));
        assert!(msg.starts_with("fluid-canvas background stopped"));
        assert!(msg.contains("putImageData failed"));
    }
}
