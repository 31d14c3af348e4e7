use crate::filter::BlendMode;
use crate::foundation::math::{mul_div255_u8, unit_to_u8};

pub(crate) type PremulRgba8 = [u8; 4];

/// Source-over in integer premultiplied space.
pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    if src[3] == 255 {
        return src;
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255_u8(u16::from(dst[i]), inv));
    }
    out
}

/// Combine a premultiplied fragment with the premultiplied destination.
///
/// Every mode is a fixed-function blend equation, so the GPU backend reproduces it with a
/// `wgpu::BlendState`.
pub(crate) fn blend(mode: BlendMode, dst: [f32; 4], src: [f32; 4]) -> [f32; 4] {
    let sa = src[3];
    let mut out = [0.0f32; 4];
    match mode {
        BlendMode::Normal => {
            for i in 0..4 {
                out[i] = src[i] + dst[i] * (1.0 - sa);
            }
        }
        BlendMode::Add => {
            for i in 0..4 {
                out[i] = (src[i] + dst[i]).min(1.0);
            }
        }
        BlendMode::Multiply => {
            for i in 0..4 {
                out[i] = src[i] * dst[i] + dst[i] * (1.0 - sa);
            }
        }
        BlendMode::Screen => {
            for i in 0..4 {
                out[i] = src[i] + dst[i] - src[i] * dst[i];
            }
        }
        BlendMode::Erase => {
            for i in 0..4 {
                out[i] = dst[i] * (1.0 - sa);
            }
        }
    }
    out
}

pub(crate) fn to_u8(px: [f32; 4]) -> PremulRgba8 {
    px.map(unit_to_u8)
}

pub(crate) fn to_f32(px: PremulRgba8) -> [f32; 4] {
    px.map(|c| f32::from(c) / 255.0)
}

#[cfg(test)]
#[path = "../../tests/unit/render/blend.rs"]
mod tests;
