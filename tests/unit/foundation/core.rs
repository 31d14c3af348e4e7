use super::*;

#[test]
fn straight_to_premul_scales_color_by_alpha() {
    let c = Rgba8Premul::from_straight_rgba(255, 128, 0, 128);
    assert_eq!(c.a, 128);
    assert_eq!(c.r, 128);
    assert_eq!(c.g, 64);
    assert_eq!(c.b, 0);
}

#[test]
fn opaque_straight_is_unchanged() {
    let c = Rgba8Premul::from_straight_rgba(10, 20, 30, 255);
    assert_eq!(c.to_array(), [10, 20, 30, 255]);
}

#[test]
fn to_f32_normalizes() {
    let c = Rgba8Premul::from_array([0, 51, 255, 255]);
    assert_eq!(c.to_f32(), [0.0, 0.2, 1.0, 1.0]);
}
