//! Color values and gradients used by the software renderers.
//!
//! [`Rgba`] is stored premultiplied with `f32` components in [0, 1], which
//! makes source-over compositing a single multiply-add per channel.
//! [`Gradient`] mirrors a 2D canvas gradient: color stops at offsets in
//! [0, 1], sampled with linear interpolation and padded beyond the ends.

use crate::error::EngineError;

/// A premultiplied RGBA color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    /// Fully transparent black, the value of every untouched pixel.
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    /// Builds a premultiplied color from 8-bit channels and a straight alpha,
    /// like CSS `rgba(r, g, b, alpha)`. Alpha is clamped to [0, 1].
    pub fn rgba8(r: u8, g: u8, b: u8, alpha: f64) -> Self {
        let a = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) } as f32;
        Self {
            r: r as f32 / 255.0 * a,
            g: g as f32 / 255.0 * a,
            b: b as f32 / 255.0 * a,
            a,
        }
    }

    /// Multiplies every channel by `factor` (clamped to [0, 1]), i.e. scales
    /// opacity while keeping the color premultiplied.
    pub fn scale(self, factor: f64) -> Self {
        let f = if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) } as f32;
        Self {
            r: self.r * f,
            g: self.g * f,
            b: self.b * f,
            a: self.a * f,
        }
    }

    /// Composites `self` over `dst` (Porter-Duff source-over).
    pub fn over(self, dst: Rgba) -> Rgba {
        let k = 1.0 - self.a;
        Rgba {
            r: self.r + dst.r * k,
            g: self.g + dst.g * k,
            b: self.b + dst.b * k,
            a: self.a + dst.a * k,
        }
    }

    /// Linear interpolation between two premultiplied colors.
    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        Rgba {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// Converts to straight (non-premultiplied) RGBA8.
    pub fn to_rgba8(self) -> [u8; 4] {
        if self.a <= 0.0 {
            return [0, 0, 0, 0];
        }
        let a = self.a.min(1.0);
        let unmul = |c: f32| ((c / a).clamp(0.0, 1.0) * 255.0).round() as u8;
        [
            unmul(self.r),
            unmul(self.g),
            unmul(self.b),
            (a * 255.0).round() as u8,
        ]
    }
}

/// One gradient stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub offset: f64,
    pub color: Rgba,
}

/// A piecewise-linear color ramp over [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    stops: Vec<ColorStop>,
}

impl Gradient {
    /// Creates a gradient from stops; offsets are clamped to [0, 1] and the
    /// stops sorted by offset.
    pub fn new(stops: Vec<ColorStop>) -> Result<Self, EngineError> {
        if stops.is_empty() {
            return Err(EngineError::InvalidColor(
                "gradient requires at least 1 stop".to_string(),
            ));
        }
        let mut stops: Vec<ColorStop> = stops
            .into_iter()
            .map(|s| ColorStop {
                offset: if s.offset.is_nan() { 0.0 } else { s.offset.clamp(0.0, 1.0) },
                color: s.color,
            })
            .collect();
        stops.sort_by(|a, b| a.offset.total_cmp(&b.offset));
        Ok(Self { stops })
    }

    /// Number of stops.
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Always false for a constructed gradient.
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Replaces the color of the stop at `index` (in offset order). Out of
    /// range indices are ignored.
    pub fn recolor(&mut self, index: usize, color: Rgba) {
        if let Some(stop) = self.stops.get_mut(index) {
            stop.color = color;
        }
    }

    /// Samples the gradient at `t`. Values outside [0, 1] (and NaN, as 0)
    /// take the nearest end stop.
    pub fn sample(&self, t: f64) -> Rgba {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let first = self.stops[0];
        if t <= first.offset {
            return first.color;
        }
        for pair in self.stops.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if t <= hi.offset {
                let span = hi.offset - lo.offset;
                if span <= 0.0 {
                    return hi.color;
                }
                return lo.color.lerp(hi.color, ((t - lo.offset) / span) as f32);
            }
        }
        self.stops[self.stops.len() - 1].color
    }
}
