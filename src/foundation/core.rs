use crate::foundation::error::{FlipbookError, FlipbookResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Size, Vec2};

/// Pixel dimensions of a drawing canvas or bitmap.
///
/// Both sides are bounded by `u16::MAX` because the CPU rasterizer addresses pixmaps with `u16`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> FlipbookResult<Self> {
        let canvas = Self { width, height };
        canvas.validate()?;
        Ok(canvas)
    }

    pub fn validate(self) -> FlipbookResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FlipbookError::validation(format!(
                "canvas must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(FlipbookError::validation(format!(
                "canvas {}x{} exceeds the {} px rasterizer limit",
                self.width,
                self.height,
                u16::MAX
            )));
        }
        Ok(())
    }

    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    pub fn byte_len(self) -> usize {
        self.pixel_count().saturating_mul(4)
    }

    pub fn rect(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Largest canvas with this aspect ratio that fits inside `bounds` (never zero-sized).
    pub fn fit_within(self, bounds: Canvas) -> Canvas {
        let sx = f64::from(bounds.width) / f64::from(self.width.max(1));
        let sy = f64::from(bounds.height) / f64::from(self.height.max(1));
        let s = sx.min(sy);
        Canvas {
            width: ((f64::from(self.width) * s).round() as u32).clamp(1, bounds.width.max(1)),
            height: ((f64::from(self.height) * s).round() as u32).clamp(1, bounds.height.max(1)),
        }
    }

    pub(crate) fn dims_u16(self) -> FlipbookResult<(u16, u16)> {
        let w: u16 = self
            .width
            .try_into()
            .map_err(|_| FlipbookError::render("canvas width exceeds u16"))?;
        let h: u16 = self
            .height
            .try_into()
            .map_err(|_| FlipbookError::render("canvas height exceeds u16"))?;
        Ok((w, h))
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    pub num: u32,
    pub den: u32,
}

impl Fps {
    pub fn new(num: u32, den: u32) -> FlipbookResult<Self> {
        if den == 0 {
            return Err(FlipbookError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(FlipbookError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    pub fn whole(fps: u32) -> FlipbookResult<Self> {
        Self::new(fps, 1)
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    pub fn frame_duration(self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.frame_duration_secs())
    }

    /// Per-frame delay in hundredths of a second, the resolution animated GIFs store.
    pub fn frame_delay_centis(self) -> u16 {
        let cs = (self.frame_duration_secs() * 100.0).round();
        cs.clamp(1.0, f64::from(u16::MAX)) as u16
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 10, den: 1 }
    }
}

/// Straight-alpha RGBA8 color as picked by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    pub const WHITE: Self = Self::opaque(255, 255, 255);
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Scale alpha by `factor` in `[0, 1]`.
    pub fn fade(self, factor: f64) -> Self {
        let a = (f64::from(self.a) * factor.clamp(0.0, 1.0)).round() as u8;
        self.with_alpha(a)
    }

    pub fn to_premul(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            let c = u16::from(c);
            let a = u16::from(a);
            (((c * a) + 127) / 255) as u8
        }

        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }
}

impl Default for Rgba8 {
    fn default() -> Self {
        Self::BLACK
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
