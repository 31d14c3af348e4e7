use super::*;

use crate::texture::pool::TexturePool;

#[test]
fn input_blocks_use_source_size_and_frame_clamp() {
    let mut pool = TexturePool::new();
    let t = pool.get_optimal_texture(40.0, 20.0, 1.0, false);
    let u = FilterUniforms::new(
        &t,
        Vec2::new(3.0, 4.0),
        Rect::new(0.0, 0.0, 100.0, 100.0),
        Size::new(100.0, 50.0),
        true,
    );

    assert_eq!(u.input_size, [64.0, 32.0, 1.0 / 64.0, 1.0 / 32.0]);
    assert_eq!(u.input_pixel, [64.0, 32.0, 1.0 / 64.0, 1.0 / 32.0]);
    assert!((u.input_clamp[0] - 0.5 / 64.0).abs() < 1e-7);
    assert!((u.input_clamp[2] - (40.0 / 64.0 - 0.5 / 64.0)).abs() < 1e-7);
    assert!((u.input_clamp[3] - (20.0 / 32.0 - 0.5 / 32.0)).abs() < 1e-7);
    assert_eq!(u.output_frame, [3.0, 4.0, 40.0, 20.0]);
    assert_eq!(u.output_texture, [100.0, 50.0, -1.0, 0.0]);
}

#[test]
fn resolution_splits_logical_and_pixel_sizes() {
    let mut pool = TexturePool::new();
    let t = pool.get_optimal_texture(10.0, 10.0, 2.0, false);
    let u = FilterUniforms::new(
        &t,
        Vec2::ZERO,
        Rect::ZERO,
        Size::new(10.0, 10.0),
        false,
    );
    assert_eq!(u.input_size[0], 16.0);
    assert_eq!(u.input_pixel[0], 32.0);
    assert_eq!(u.output_texture[2], 1.0);
}

#[test]
fn bytes_follow_declaration_order() {
    let u = FilterUniforms {
        output_texture: [7.0, 0.0, 0.0, 0.0],
        ..FilterUniforms::default()
    };
    let bytes = u.to_le_bytes();
    assert_eq!(bytes.len(), 96);
    assert_eq!(&bytes[80..84], &7.0f32.to_le_bytes());
    assert!(bytes[..80].iter().all(|b| *b == 0));
}
