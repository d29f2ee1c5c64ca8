//! Pure-computation pixel buffer conversion from a [`Surface`].
//!
//! This module is always available (no feature gate) so that both the `png`
//! snapshot path and the WASM `ImageData` path can share the same conversion.

use fluid_canvas_core::surface::Surface;

/// Converts the premultiplied surface into straight-alpha RGBA8.
///
/// The buffer length is `width * height * 4`; untouched pixels become
/// `[0, 0, 0, 0]`.
pub fn surface_to_rgba8(surface: &Surface) -> Vec<u8> {
    surface.pixels().iter().flat_map(|px| px.to_rgba8()).collect()
}
