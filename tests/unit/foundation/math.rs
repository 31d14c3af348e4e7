use super::*;

#[test]
fn next_pow2_rounds_up() {
    assert_eq!(next_pow2(0), 1);
    assert_eq!(next_pow2(1), 1);
    assert_eq!(next_pow2(60), 64);
    assert_eq!(next_pow2(64), 64);
    assert_eq!(next_pow2(65), 128);
}

#[test]
fn next_pow2_clamps_instead_of_overflowing() {
    assert_eq!(next_pow2(MAX_POW2), MAX_POW2);
    assert_eq!(next_pow2(MAX_POW2 + 1), MAX_POW2);
    assert_eq!(next_pow2(u32::MAX), MAX_POW2);
}

#[test]
fn ceil_px_absorbs_float_noise() {
    assert_eq!(ceil_px(10.000_000_1, 1.0), 10);
    assert_eq!(ceil_px(10.1, 1.0), 11);
    assert_eq!(ceil_px(10.0, 2.0), 20);
    assert_eq!(ceil_px(-3.0, 1.0), 0);
}

#[test]
fn mul_div255_rounds() {
    assert_eq!(mul_div255_u8(255, 255), 255);
    assert_eq!(mul_div255_u8(255, 128), 128);
    assert_eq!(mul_div255_u8(0, 200), 0);
}

#[test]
fn unit_to_u8_clamps() {
    assert_eq!(unit_to_u8(-1.0), 0);
    assert_eq!(unit_to_u8(2.0), 255);
    assert_eq!(unit_to_u8(0.5), 128);
}
