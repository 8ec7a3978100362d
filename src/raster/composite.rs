use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::foundation::math::{add_sat_u8, mul_div255, mul_div255_u8};

pub type PremulRgba8 = [u8; 4];

/// Porter-Duff source-over for one premultiplied pixel, with `src` scaled by `opacity`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - sa.min(255);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Destination-out: removes `dst` wherever `mask` has coverage. Only the mask alpha is read.
pub fn dest_out(dst: PremulRgba8, mask: PremulRgba8) -> PremulRgba8 {
    if mask[3] == 0 {
        return dst;
    }
    let keep = 255u16 - u16::from(mask[3]);
    [
        mul_div255_u8(u16::from(dst[0]), keep),
        mul_div255_u8(u16::from(dst[1]), keep),
        mul_div255_u8(u16::from(dst[2]), keep),
        mul_div255_u8(u16::from(dst[3]), keep),
    ]
}

fn check_lengths(op: &str, dst: &[u8], src: &[u8]) -> FlipbookResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(FlipbookError::render(format!(
            "{op} expects equal-length rgba8 buffers"
        )));
    }
    Ok(())
}

pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> FlipbookResult<()> {
    check_lengths("over_in_place", dst, src)?;
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

pub fn dest_out_in_place(dst: &mut [u8], mask: &[u8]) -> FlipbookResult<()> {
    check_lengths("dest_out_in_place", dst, mask)?;
    for (d, m) in dst.chunks_exact_mut(4).zip(mask.chunks_exact(4)) {
        let out = dest_out([d[0], d[1], d[2], d[3]], [m[0], m[1], m[2], m[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/raster/composite.rs"]
mod tests;
