use crate::foundation::error::{FlipbookError, FlipbookResult};

/// Gaussian blur of a premultiplied RGBA8 buffer, used for the brush glow.
///
/// Edge pixels are clamped. `radius == 0` returns the input unchanged.
pub fn gaussian_blur_premul(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> FlipbookResult<Vec<u8>> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| FlipbookError::render("blur buffer size overflow"))?;
    if src.len() != expected {
        return Err(FlipbookError::render(
            "gaussian_blur_premul expects src matching width*height*4",
        ));
    }
    if radius == 0 || expected == 0 {
        return Ok(src.to_vec());
    }

    let kernel = kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected];
    let mut out = vec![0u8; expected];
    convolve(src, &mut tmp, width, height, &kernel, Axis::X);
    convolve(&tmp, &mut out, width, height, &kernel, Axis::Y);
    Ok(out)
}

/// Sigma that gives a visually soft glow for a blur of `radius` pixels.
pub fn sigma_for_radius(radius: u32) -> f32 {
    (radius as f32 / 2.0).max(0.5)
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

fn kernel_q16(radius: u32, sigma: f32) -> FlipbookResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(FlipbookError::validation("blur sigma must be > 0"));
    }
    let r = radius as i32;
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let weights: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return Err(FlipbookError::render("gaussian kernel sum is zero"));
    }

    let mut q: Vec<u32> = weights
        .iter()
        .map(|w| ((w / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    // Rounding drift goes to the center tap so the kernel sums to exactly 1.0 in q16.
    let total: i64 = q.iter().map(|&v| i64::from(v)).sum();
    let mid = q.len() / 2;
    q[mid] = (i64::from(q[mid]) + 65536 - total).clamp(0, 65536) as u32;
    Ok(q)
}

fn convolve(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32], axis: Axis) {
    let radius = (k.len() / 2) as i64;
    let (w, h) = (i64::from(width), i64::from(height));
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let d = ki as i64 - radius;
                let (sx, sy) = match axis {
                    Axis::X => ((x + d).clamp(0, w - 1), y),
                    Axis::Y => (x, (y + d).clamp(0, h - 1)),
                };
                let idx = ((sy * w + sx) as usize) * 4;
                for (c, a) in acc.iter_mut().enumerate() {
                    *a += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out = ((y * w + x) as usize) * 4;
            for (c, a) in acc.iter().enumerate() {
                dst[out + c] = ((a + 32768) >> 16).min(255) as u8;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/blur.rs"]
mod tests;
