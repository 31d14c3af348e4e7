use super::*;

use crate::foundation::core::{Affine, Size};
use crate::scene::{CacheSpace, SceneNode};

fn leaf(node: SceneNode) -> Rc<dyn RenderableLeaf> {
    Rc::new(node)
}

#[test]
fn filter_area_is_transformed_by_world() {
    let node = SceneNode::new(
        Rect::new(0.0, 0.0, 500.0, 500.0),
        Affine::translate((10.0, 20.0)),
    );
    let mut b = Bounds::default();
    compute_area(&node, Some(Rect::new(0.0, 0.0, 30.0, 40.0)), None, &mut b);
    assert_eq!(b.rect(), Rect::new(10.0, 20.0, 40.0, 60.0));
}

#[test]
fn filter_area_wins_over_renderables() {
    let node = SceneNode::new(Rect::new(0.0, 0.0, 5.0, 5.0), Affine::IDENTITY);
    let leaves = vec![leaf(SceneNode::new(
        Rect::new(0.0, 0.0, 100.0, 100.0),
        Affine::IDENTITY,
    ))];
    let mut b = Bounds::default();
    compute_area(
        &node,
        Some(Rect::new(1.0, 1.0, 2.0, 2.0)),
        Some(leaves.as_slice()),
        &mut b,
    );
    assert_eq!(b.rect(), Rect::new(1.0, 1.0, 2.0, 2.0));
}

#[test]
fn renderables_accumulate_visible_leaves_only() {
    let node = SceneNode::default();
    let leaves = vec![
        leaf(SceneNode::new(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Affine::translate((5.0, 5.0)),
        )),
        leaf(SceneNode::new(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Affine::translate((30.0, 0.0)),
        )),
        leaf(
            SceneNode::new(Rect::new(0.0, 0.0, 10.0, 10.0), Affine::translate((900.0, 0.0)))
                .hidden(),
        ),
    ];
    let mut b = Bounds::default();
    compute_area(&node, None, Some(leaves.as_slice()), &mut b);
    assert_eq!(b.rect(), Rect::new(5.0, 0.0, 40.0, 15.0));
}

#[test]
fn cached_group_leaves_are_measured_in_cache_space() {
    let node = SceneNode::default();
    let world = Affine::translate((100.0, 100.0));
    let leaves = vec![leaf(
        SceneNode::new(Rect::new(0.0, 0.0, 10.0, 10.0), world).with_cache_space(
            CacheSpace::CachedGroup {
                texture_offset_inverse: Affine::translate((-90.0, -90.0)),
            },
        ),
    )];
    let mut b = Bounds::default();
    compute_area(&node, None, Some(leaves.as_slice()), &mut b);
    assert_eq!(b.rect(), Rect::new(10.0, 10.0, 20.0, 20.0));
}

#[test]
fn nested_cached_group_uses_group_transform() {
    let node = SceneNode::default();
    let leaves = vec![leaf(
        SceneNode::new(Rect::new(0.0, 0.0, 4.0, 4.0), Affine::translate((1000.0, 0.0)))
            .with_cache_space(CacheSpace::NestedInCachedGroup {
                inverse_parent_texture: Affine::scale(2.0),
                group_transform: Affine::translate((1.0, 1.0)),
            }),
    )];
    let mut b = Bounds::default();
    compute_area(&node, None, Some(leaves.as_slice()), &mut b);
    assert_eq!(b.rect(), Rect::new(2.0, 2.0, 10.0, 10.0));
}

#[test]
fn generic_path_uses_global_bounds_with_layers() {
    let node = SceneNode::new(Rect::new(0.0, 0.0, 10.0, 10.0), Affine::IDENTITY)
        .with_layer_bounds(Rect::new(20.0, 20.0, 30.0, 30.0));
    let mut b = Bounds::default();
    compute_area(&node, None, None, &mut b);
    assert_eq!(b.rect(), Rect::new(0.0, 0.0, 30.0, 30.0));
}

#[test]
fn cache_to_local_is_applied_last() {
    let node = SceneNode::sprite(Size::new(10.0, 10.0), Affine::translate((50.0, 50.0)))
        .with_cache_to_local(Affine::translate((-50.0, -40.0)));
    let mut b = Bounds::default();
    compute_area(&node, None, None, &mut b);
    assert_eq!(b.rect(), Rect::new(0.0, 10.0, 10.0, 20.0));
}

#[test]
fn empty_subtree_yields_empty_bounds() {
    let node = SceneNode::default();
    let mut b = Bounds::new(0.0, 0.0, 5.0, 5.0);
    compute_area(&node, None, None, &mut b);
    assert!(b.is_empty());
    assert!(!b.is_positive());
}
