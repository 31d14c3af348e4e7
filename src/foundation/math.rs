/// Largest power of two a `u32` holds.
pub(crate) const MAX_POW2: u32 = 1 << 31;

/// Round `v` up to the next power of two. Zero rounds to one; anything above [`MAX_POW2`]
/// clamps to it.
pub(crate) fn next_pow2(v: u32) -> u32 {
    v.max(1).checked_next_power_of_two().unwrap_or(MAX_POW2)
}

/// Smallest integer pixel count covering `points * resolution` logical units.
///
/// A small epsilon absorbs float noise so that e.g. `10.000001` does not bump to `11`.
pub(crate) fn ceil_px(points: f64, resolution: f64) -> u32 {
    let px = (points * resolution - 1e-6).ceil();
    if px.is_finite() && px > 0.0 {
        px as u32
    } else {
        0
    }
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

pub(crate) fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
