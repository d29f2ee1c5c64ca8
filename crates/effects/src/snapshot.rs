//! CPU-side PNG rendering of a [`Surface`].
//!
//! This module is feature-gated behind `png` (default on) so that WASM builds
//! can depend on the `effects` crate without pulling in the `image` crate.
//! The pixel buffer conversion itself lives in [`crate::pixel`] (always available).

use fluid_canvas_core::error::EngineError;
use fluid_canvas_core::surface::Surface;
use std::path::Path;

use crate::pixel::surface_to_rgba8;

/// Writes a surface as a straight-alpha RGBA PNG.
///
/// Returns `EngineError::InvalidDimensions` for a zero-area surface or one
/// whose dimensions overflow `u32`, or `EngineError::Io` on write failure.
pub fn write_png(surface: &Surface, path: &Path) -> Result<(), EngineError> {
    if surface.is_empty() {
        return Err(EngineError::InvalidDimensions);
    }
    let w = u32::try_from(surface.width()).map_err(|_| EngineError::InvalidDimensions)?;
    let h = u32::try_from(surface.height()).map_err(|_| EngineError::InvalidDimensions)?;
    let img = image::RgbaImage::from_raw(w, h, surface_to_rgba8(surface))
        .ok_or_else(|| EngineError::Io("RGBA buffer size mismatch".into()))?;
    img.save(path).map_err(|e| EngineError::Io(e.to_string()))
}
