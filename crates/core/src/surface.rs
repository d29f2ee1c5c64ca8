//! The drawable region the renderers write into.
//!
//! A [`Surface`] stores `width * height` premultiplied [`Rgba`] pixels in
//! row-major order. It starts and clears to fully transparent so the canvas
//! composites as an overlay on whatever page content lies beneath it.
//!
//! Unlike most of the crate, a zero-area surface is legal here: a viewport
//! can genuinely collapse to zero during layout, and the driver treats that
//! as "pause" rather than as an error.

use crate::color::Rgba;
use crate::error::EngineError;

/// Largest accepted `width * height`. Covers a 7680x4320 viewport; a
/// surface this size holds 512 MiB of pixels.
pub const MAX_PIXELS: usize = 1 << 25;

/// Pixel count for `width x height`.
///
/// Returns `EngineError::InvalidDimensions` if the product overflows or
/// exceeds [`MAX_PIXELS`].
pub fn pixel_count(width: usize, height: usize) -> Result<usize, EngineError> {
    width
        .checked_mul(height)
        .filter(|&len| len <= MAX_PIXELS)
        .ok_or(EngineError::InvalidDimensions)
}

/// A 2D RGBA pixel buffer sized to the viewport.
#[derive(Debug, Clone)]
pub struct Surface {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl Surface {
    /// Allocates a transparent surface.
    ///
    /// Returns `EngineError::InvalidDimensions` if `width * height`
    /// overflows or exceeds [`MAX_PIXELS`].
    pub fn new(width: usize, height: usize) -> Result<Self, EngineError> {
        let len = pixel_count(width, height)?;
        Ok(Self {
            width,
            height,
            pixels: vec![Rgba::TRANSPARENT; len],
        })
    }

    /// Surface width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Surface height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Reallocates the buffer for new dimensions. Contents are discarded.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<(), EngineError> {
        let len = pixel_count(width, height)?;
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(len, Rgba::TRANSPARENT);
        Ok(())
    }

    /// Resets every pixel to transparent.
    pub fn clear(&mut self) {
        self.pixels.fill(Rgba::TRANSPARENT);
    }

    /// Row-major pixel slice.
    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// The pixel at `(x, y)`, or `None` outside the surface.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgba> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Overwrites the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn put(&mut self, x: usize, y: usize, color: Rgba) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Composites `color` over the pixel at `(x, y)`. Out-of-bounds writes
    /// are ignored.
    pub fn blend(&mut self, x: usize, y: usize, color: Rgba) {
        if color.a <= 0.0 {
            return;
        }
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color.over(self.pixels[i]);
        }
    }

    /// Inclusive-exclusive pixel ranges covering the axis-aligned box
    /// `[cx - r, cx + r]` clipped to the surface. Returns `None` when the
    /// box misses the surface entirely.
    pub fn clip_box(&self, cx: f64, cy: f64, r: f64) -> Option<(usize, usize, usize, usize)> {
        if self.is_empty() || !cx.is_finite() || !cy.is_finite() || !r.is_finite() {
            return None;
        }
        let x0 = (cx - r).floor().max(0.0);
        let y0 = (cy - r).floor().max(0.0);
        let x1 = (cx + r).ceil().min(self.width as f64 - 1.0);
        let y1 = (cy + r).ceil().min(self.height as f64 - 1.0);
        if x0 > x1 || y0 > y1 {
            return None;
        }
        Some((x0 as usize, y0 as usize, x1 as usize + 1, y1 as usize + 1))
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }
}
