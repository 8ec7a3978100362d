use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::core::Canvas;
use crate::foundation::error::{FlipbookError, FlipbookResult};

/// Immutable premultiplied RGBA8 raster, row-major and tightly packed.
///
/// Pixel storage is shared, so clones are cheap and every copy handed out by the surface
/// stays valid no matter what is drawn afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Arc<[u8]>,
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Bitmap {
    pub fn new_transparent(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            data: vec![0u8; canvas.byte_len()].into(),
        }
    }

    pub fn filled(canvas: Canvas, premul: [u8; 4]) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            data: premul.repeat(canvas.pixel_count()).into(),
        }
    }

    pub fn from_premul_rgba8(width: u32, height: u32, data: Vec<u8>) -> FlipbookResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| FlipbookError::validation("bitmap size overflow"))?;
        if data.len() != expected {
            return Err(FlipbookError::validation(format!(
                "bitmap {width}x{height} expects {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data: data.into(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// `true` when every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 0)
    }

    /// Whether both bitmaps share the same pixel storage.
    pub fn ptr_eq(&self, other: &Bitmap) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.to_vec();
        unpremultiply_in_place(&mut out);
        out
    }

    /// Encode as PNG. The premultiplied bytes are stored as-is so decoding is lossless.
    pub fn to_png_bytes(&self) -> FlipbookResult<Vec<u8>> {
        let img = image::RgbaImage::from_raw(self.width, self.height, self.data.to_vec())
            .ok_or_else(|| FlipbookError::encode("invalid rgba buffer size"))?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| FlipbookError::encode(format!("png encode failed: {e}")))?;
        Ok(buf)
    }

    pub fn from_png_bytes(bytes: &[u8]) -> FlipbookResult<Self> {
        let dyn_img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
            .context("decode png from memory")?;
        let rgba = dyn_img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_premul_rgba8(width, height, rgba.into_raw())
    }

    pub fn save_png(&self, path: &Path) -> FlipbookResult<()> {
        let bytes = self.to_png_bytes()?;
        std::fs::write(path, bytes)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }

    pub fn load_png(path: &Path) -> FlipbookResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read png '{}'", path.display()))?;
        Self::from_png_bytes(&bytes)
    }

    /// Downscale to fit inside `bounds`, keeping the aspect ratio.
    pub fn thumbnail(&self, bounds: Canvas) -> FlipbookResult<Bitmap> {
        let target = self.canvas().fit_within(bounds);
        if target == self.canvas() {
            return Ok(self.clone());
        }
        let img = image::RgbaImage::from_raw(self.width, self.height, self.data.to_vec())
            .ok_or_else(|| FlipbookError::render("invalid rgba buffer size"))?;
        let scaled = image::imageops::resize(
            &img,
            target.width,
            target.height,
            image::imageops::FilterType::Triangle,
        );
        Self::from_premul_rgba8(target.width, target.height, scaled.into_raw())
    }

    /// Copy out the pixels under `rect`, clipped to the bitmap bounds.
    pub fn crop(&self, rect: PixelRect) -> BitmapSlice {
        let rect = rect.clip_to(self.canvas());
        if rect.covers(self.canvas()) {
            return BitmapSlice {
                x: 0,
                y: 0,
                bitmap: self.clone(),
            };
        }

        let stride = self.width as usize * 4;
        let row_len = rect.width as usize * 4;
        let mut out = Vec::with_capacity(row_len * rect.height as usize);
        for row in rect.y..rect.y + rect.height {
            let start = row as usize * stride + rect.x as usize * 4;
            out.extend_from_slice(&self.data[start..start + row_len]);
        }
        BitmapSlice {
            x: rect.x,
            y: rect.y,
            bitmap: Bitmap {
                width: rect.width,
                height: rect.height,
                data: out.into(),
            },
        }
    }
}

/// Axis-aligned pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn full(canvas: Canvas) -> Self {
        Self {
            x: 0,
            y: 0,
            width: canvas.width,
            height: canvas.height,
        }
    }

    fn clip_to(self, canvas: Canvas) -> Self {
        let x = self.x.min(canvas.width);
        let y = self.y.min(canvas.height);
        Self {
            x,
            y,
            width: self.width.min(canvas.width - x),
            height: self.height.min(canvas.height - y),
        }
    }

    fn covers(self, canvas: Canvas) -> bool {
        self.x == 0 && self.y == 0 && self.width == canvas.width && self.height == canvas.height
    }
}

/// A rectangular piece of a bitmap together with where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitmapSlice {
    pub x: u32,
    pub y: u32,
    pub bitmap: Bitmap,
}

impl BitmapSlice {
    pub fn rect(&self) -> PixelRect {
        PixelRect {
            x: self.x,
            y: self.y,
            width: self.bitmap.width,
            height: self.bitmap.height,
        }
    }

    /// Write this slice back over `base`, returning the patched bitmap.
    pub fn restore_onto(&self, base: &Bitmap) -> FlipbookResult<Bitmap> {
        if self.rect().covers(base.canvas()) {
            return Ok(self.bitmap.clone());
        }
        if self.x + self.bitmap.width > base.width || self.y + self.bitmap.height > base.height {
            return Err(FlipbookError::validation(
                "bitmap slice does not fit inside the target bitmap",
            ));
        }

        let mut data = base.data.to_vec();
        let stride = base.width as usize * 4;
        let row_len = self.bitmap.width as usize * 4;
        for (i, src_row) in self.bitmap.data.chunks_exact(row_len.max(1)).enumerate() {
            let start = (self.y as usize + i) * stride + self.x as usize * 4;
            data[start..start + row_len].copy_from_slice(src_row);
        }
        Ok(Bitmap {
            width: base.width,
            height: base.height,
            data: data.into(),
        })
    }
}

pub(crate) fn unpremultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/bitmap.rs"]
mod tests;
