use std::rc::Rc;

use crate::foundation::bounds::Bounds;
use crate::foundation::core::Rect;
use crate::scene::{FilterTarget, RenderableLeaf};

/// Measure the area a filter frame has to capture, in the shared coordinate space.
///
/// Priority: explicit `filter_area` (local to `container`), then a pre-enumerated leaf list, then
/// the container's own global bounds. When the container lives inside a cached-as-texture
/// ancestor, the result is re-expressed in that ancestor's local space.
pub fn compute_area(
    container: &dyn FilterTarget,
    filter_area: Option<Rect>,
    renderables: Option<&[Rc<dyn RenderableLeaf>]>,
    bounds: &mut Bounds,
) {
    bounds.clear();

    if let Some(area) = filter_area {
        bounds.add_rect(area).apply_matrix(container.world_transform());
    } else if let Some(leaves) = renderables {
        measure_renderables(leaves, bounds);
    } else {
        let global = container.global_bounds(true);
        if global.width() > 0.0 || global.height() > 0.0 {
            bounds.add_rect(global);
        }
    }

    if let Some(cache_to_local) = container.cache_to_local_transform() {
        bounds.apply_matrix(cache_to_local);
    }
}

fn measure_renderables(leaves: &[Rc<dyn RenderableLeaf>], bounds: &mut Bounds) {
    for leaf in leaves.iter().filter(|l| l.is_visible()) {
        let local = leaf.local_bounds();
        bounds.add_frame_with(
            local.x0,
            local.y0,
            local.x1,
            local.y1,
            leaf.bounds_transform(),
        );
    }
}

#[cfg(test)]
#[path = "../../tests/unit/system/area.rs"]
mod tests;
