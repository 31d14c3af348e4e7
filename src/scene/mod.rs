//! Scene-graph capabilities consumed by the filter pipeline.
//!
//! The scene graph itself lives outside this crate. Filters only need to ask a subtree for its
//! bounds and transforms, so the boundary is a handful of small traits plus [`SceneNode`], a plain
//! snapshot type that implements all of them.

use crate::foundation::bounds::Bounds;
use crate::foundation::core::{Affine, Rect, Size, Vec2};

/// How a leaf's bounds relate to an enclosing cache-as-texture group.
///
/// Leaves rendered into a group's offscreen cache must be measured in that cache's coordinate
/// space, not in true world space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum CacheSpace {
    /// Not inside any cached group: bounds use the world transform.
    #[default]
    World,
    /// The leaf's own group is cached as a texture.
    CachedGroup {
        /// Inverse of the cache texture's offset transform.
        texture_offset_inverse: Affine,
    },
    /// The leaf's group is nested inside a cached ancestor group.
    NestedInCachedGroup {
        /// Inverse of the ancestor's texture transform.
        inverse_parent_texture: Affine,
        /// The leaf's transform relative to its own group.
        group_transform: Affine,
    },
}

/// A subtree root that filters can be pushed for.
pub trait FilterTarget {
    /// Transform from the node's local space into the shared (root) space.
    fn world_transform(&self) -> Affine;

    /// Bounds of the whole subtree in the shared space.
    ///
    /// `include_layers` asks the node to also account for content it draws through render
    /// layers.
    fn global_bounds(&self, include_layers: bool) -> Rect;

    /// Set when the node sits inside a cache-as-texture ancestor: maps shared-space bounds into
    /// that ancestor's local texture space.
    fn cache_to_local_transform(&self) -> Option<Affine> {
        None
    }
}

/// One flattened renderable leaf, as enumerated by a batching pass.
pub trait RenderableLeaf {
    /// Bounds in the leaf's local space.
    fn local_bounds(&self) -> Rect;

    fn world_transform(&self) -> Affine;

    fn cache_space(&self) -> CacheSpace {
        CacheSpace::World
    }

    /// Invisible or culled leaves are ignored by bounds accumulation.
    fn is_visible(&self) -> bool {
        true
    }

    /// Transform that maps local bounds into the space filters measure in.
    fn bounds_transform(&self) -> Affine {
        match self.cache_space() {
            CacheSpace::World => self.world_transform(),
            CacheSpace::CachedGroup {
                texture_offset_inverse,
            } => texture_offset_inverse * self.world_transform(),
            CacheSpace::NestedInCachedGroup {
                inverse_parent_texture,
                group_transform,
            } => inverse_parent_texture * group_transform,
        }
    }
}

/// A textured node that displacement or mask style filters sample from.
pub trait SpriteLike: FilterTarget {
    /// Logical size of the sprite's texture frame.
    fn texture_size(&self) -> Size;

    /// Normalized anchor point within the texture frame.
    fn anchor(&self) -> Vec2 {
        Vec2::ZERO
    }
}

/// Plain snapshot of a scene node.
///
/// Useful for hosts that keep their own scene graph and only hand the pipeline a flattened view,
/// and for tests.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub world_transform: Affine,
    pub local_bounds: Rect,
    /// Extra shared-space bounds contributed by render layers.
    pub layer_bounds: Option<Rect>,
    pub cache_to_local: Option<Affine>,
    pub cache_space: CacheSpace,
    pub visible: bool,
    pub texture_size: Size,
    pub anchor: Vec2,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            world_transform: Affine::IDENTITY,
            local_bounds: Rect::ZERO,
            layer_bounds: None,
            cache_to_local: None,
            cache_space: CacheSpace::World,
            visible: true,
            texture_size: Size::ZERO,
            anchor: Vec2::ZERO,
        }
    }
}

impl SceneNode {
    /// A node covering `local_bounds`, placed by `world_transform`.
    pub fn new(local_bounds: Rect, world_transform: Affine) -> Self {
        Self {
            world_transform,
            local_bounds,
            ..Self::default()
        }
    }

    /// A sprite whose texture frame spans `size` and sits at the node origin.
    pub fn sprite(size: Size, world_transform: Affine) -> Self {
        Self {
            world_transform,
            local_bounds: Rect::from_origin_size((0.0, 0.0), size),
            texture_size: size,
            ..Self::default()
        }
    }

    pub fn with_layer_bounds(mut self, rect: Rect) -> Self {
        self.layer_bounds = Some(rect);
        self
    }

    pub fn with_cache_to_local(mut self, m: Affine) -> Self {
        self.cache_to_local = Some(m);
        self
    }

    pub fn with_cache_space(mut self, space: CacheSpace) -> Self {
        self.cache_space = space;
        self
    }

    pub fn with_anchor(mut self, anchor: Vec2) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

impl FilterTarget for SceneNode {
    fn world_transform(&self) -> Affine {
        self.world_transform
    }

    fn global_bounds(&self, include_layers: bool) -> Rect {
        let mut b = Bounds::default();
        b.matrix = self.world_transform;
        b.add_rect(self.local_bounds);
        if include_layers && let Some(layer) = self.layer_bounds {
            b.add_frame_with(layer.x0, layer.y0, layer.x1, layer.y1, Affine::IDENTITY);
        }
        b.rect()
    }

    fn cache_to_local_transform(&self) -> Option<Affine> {
        self.cache_to_local
    }
}

impl RenderableLeaf for SceneNode {
    fn local_bounds(&self) -> Rect {
        self.local_bounds
    }

    fn world_transform(&self) -> Affine {
        self.world_transform
    }

    fn cache_space(&self) -> CacheSpace {
        self.cache_space
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}

impl SpriteLike for SceneNode {
    fn texture_size(&self) -> Size {
        self.texture_size
    }

    fn anchor(&self) -> Vec2 {
        self.anchor
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/node.rs"]
mod tests;
