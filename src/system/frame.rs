use std::rc::Rc;

use crate::filter::Filter;
use crate::foundation::bounds::Bounds;
use crate::foundation::core::{Rect, Vec2};
use crate::render::backend::RenderSurface;
use crate::scene::FilterTarget;
use crate::texture::Texture;

/// State of one nesting level of the filter stack.
pub struct FilterFrame {
    /// Nothing to do for this level; no texture was acquired.
    pub skip: bool,
    pub input_texture: Option<Texture>,
    pub back_texture: Option<Texture>,
    /// Enabled filters, in application order.
    pub filters: Vec<Rc<dyn Filter>>,
    pub bounds: Bounds,
    pub container: Option<Rc<dyn FilterTarget>>,
    pub blend_required: bool,
    pub output_surface: Option<RenderSurface>,
    /// Root-relative frame in device pixels.
    pub global_frame: Rect,
    pub antialias: bool,
    pub resolution: f64,
    /// Total padding, in logical units.
    pub padding: f64,
    pub clip_to_viewport: bool,
    /// Bounds origin of the nearest enclosing non-skipped frame.
    pub offset: Vec2,
}

impl Default for FilterFrame {
    fn default() -> Self {
        Self {
            skip: false,
            input_texture: None,
            back_texture: None,
            filters: Vec::new(),
            bounds: Bounds::default(),
            container: None,
            blend_required: false,
            output_surface: None,
            global_frame: Rect::ZERO,
            antialias: false,
            resolution: 1.0,
            padding: 0.0,
            clip_to_viewport: true,
            offset: Vec2::ZERO,
        }
    }
}

impl FilterFrame {
    fn reset(&mut self) {
        // Keep the filter list allocation.
        let mut filters = std::mem::take(&mut self.filters);
        filters.clear();
        *self = Self {
            filters,
            ..Self::default()
        };
    }
}

/// Grow-only arena of frames indexed by stack depth.
#[derive(Default)]
pub struct FrameArena {
    frames: Vec<FilterFrame>,
}

impl FrameArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame slot for `depth`, allocated on first use and fully reset on reuse.
    pub fn acquire_frame(&mut self, depth: usize) -> &mut FilterFrame {
        while self.frames.len() <= depth {
            self.frames.push(FilterFrame::default());
        }
        let frame = &mut self.frames[depth];
        frame.reset();
        frame
    }

    pub fn frame_at(&self, depth: usize) -> Option<&FilterFrame> {
        self.frames.get(depth)
    }

    pub fn frame_at_mut(&mut self, depth: usize) -> Option<&mut FilterFrame> {
        self.frames.get_mut(depth)
    }

    /// Number of slots ever allocated.
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Bounds origin of the nearest non-skipped frame below `depth`, if any.
    pub fn previous_origin(&self, depth: usize) -> Option<Vec2> {
        self.frames[..depth.min(self.frames.len())]
            .iter()
            .rev()
            .find(|f| !f.skip)
            .map(|f| f.bounds.min().to_vec2())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/system/frame.rs"]
mod tests;
