use super::*;

#[test]
fn optimal_texture_has_po2_backing_and_exact_frame() {
    let mut pool = TexturePool::new();
    let t = pool.get_optimal_texture(70.0, 33.0, 1.0, false);
    assert_eq!(t.source.pixel_width, 128);
    assert_eq!(t.source.pixel_height, 64);
    assert_eq!(t.width(), 70.0);
    assert_eq!(t.height(), 33.0);
}

#[test]
fn resolution_scales_backing_not_frame() {
    let mut pool = TexturePool::new();
    let t = pool.get_optimal_texture(40.0, 40.0, 2.0, false);
    assert_eq!(t.source.pixel_width, 128);
    assert_eq!(t.source.width(), 64.0);
    assert_eq!(t.width(), 40.0);
    assert_eq!(t.frame_pixel_size(), (80, 80));
}

#[test]
fn return_then_get_reuses_allocation() {
    let mut pool = TexturePool::new();
    let a = pool.get_optimal_texture(50.0, 50.0, 1.0, false);
    let id = a.id();
    pool.return_texture(a);

    let b = pool.get_optimal_texture(60.0, 40.0, 1.0, false);
    assert_eq!(b.id(), id);
    assert_eq!(b.width(), 60.0);
    assert_eq!(pool.stats().allocated, 1);
}

#[test]
fn antialias_buckets_are_isolated() {
    let mut pool = TexturePool::new();
    let aa = pool.get_optimal_texture(32.0, 32.0, 1.0, true);
    let aa_id = aa.id();
    pool.return_texture(aa);

    let plain = pool.get_optimal_texture(32.0, 32.0, 1.0, false);
    assert_ne!(plain.id(), aa_id);
    assert_eq!(pool.stats().allocated, 2);
}

#[test]
fn same_size_texture_copies_frame_and_resolution() {
    let mut pool = TexturePool::new();
    let a = pool.get_optimal_texture(20.0, 10.0, 2.0, false);
    let b = pool.get_same_size_texture(&a, false);
    assert_eq!(b.size(), a.size());
    assert_eq!(b.resolution(), 2.0);
    assert_ne!(a.id(), b.id());
}

#[test]
fn stats_track_outstanding_textures() {
    let mut pool = TexturePool::new();
    let a = pool.get_optimal_texture(8.0, 8.0, 1.0, false);
    let b = pool.get_optimal_texture(8.0, 8.0, 1.0, false);
    assert_eq!(pool.stats().outstanding(), 2);
    assert!(pool.is_outstanding(&a));
    pool.return_texture(a);
    pool.return_texture(b);
    let st = pool.stats();
    assert_eq!(st.outstanding(), 0);
    assert_eq!(st.retained, 2);
}

#[test]
#[should_panic(expected = "double return")]
fn double_return_panics() {
    let mut pool = TexturePool::new();
    let a = pool.get_optimal_texture(8.0, 8.0, 1.0, false);
    pool.return_texture(a.clone());
    pool.return_texture(a);
}

#[test]
fn clear_drains_free_lists() {
    let mut pool = TexturePool::new();
    let a = pool.get_optimal_texture(8.0, 8.0, 1.0, false);
    let b = pool.get_optimal_texture(16.0, 8.0, 1.0, false);
    pool.return_texture(a);
    pool.return_texture(b);

    let destroyed = pool.clear(true);
    assert_eq!(destroyed.len(), 2);
    assert_eq!(pool.stats().retained, 0);

    let c = pool.get_optimal_texture(8.0, 8.0, 1.0, false);
    assert_eq!(pool.stats().allocated, 3);
    pool.return_texture(c);
    assert!(pool.clear(false).is_empty());
}
