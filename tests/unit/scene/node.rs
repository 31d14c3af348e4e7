use super::*;

#[test]
fn global_bounds_follow_world_transform() {
    let n = SceneNode::new(
        Rect::new(0.0, 0.0, 50.0, 50.0),
        Affine::translate((10.0, 20.0)),
    );
    assert_eq!(n.global_bounds(false), Rect::new(10.0, 20.0, 60.0, 70.0));
}

#[test]
fn layer_bounds_only_count_when_requested() {
    let n = SceneNode::new(Rect::new(0.0, 0.0, 10.0, 10.0), Affine::IDENTITY)
        .with_layer_bounds(Rect::new(40.0, 40.0, 50.0, 50.0));
    assert_eq!(n.global_bounds(false), Rect::new(0.0, 0.0, 10.0, 10.0));
    assert_eq!(n.global_bounds(true), Rect::new(0.0, 0.0, 50.0, 50.0));
}

#[test]
fn bounds_transform_corrects_for_cached_groups() {
    let world = Affine::translate((100.0, 100.0));
    let leaf = SceneNode::new(Rect::new(0.0, 0.0, 10.0, 10.0), world).with_cache_space(
        CacheSpace::CachedGroup {
            texture_offset_inverse: Affine::translate((-90.0, -90.0)),
        },
    );
    assert_eq!(leaf.bounds_transform(), Affine::translate((10.0, 10.0)));

    let nested = SceneNode::new(Rect::new(0.0, 0.0, 10.0, 10.0), world).with_cache_space(
        CacheSpace::NestedInCachedGroup {
            inverse_parent_texture: Affine::scale(0.5),
            group_transform: Affine::translate((4.0, 0.0)),
        },
    );
    assert_eq!(
        nested.bounds_transform(),
        Affine::scale(0.5) * Affine::translate((4.0, 0.0))
    );
}
