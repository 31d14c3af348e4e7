//! The filter stack: captures a subtree into a pooled offscreen texture on `push`, runs the
//! filter chain back onto the previous target on `pop`.
//!
//! Frames are indexed by stack depth and reused across pushes. A frame that cannot contribute
//! anything (no enabled filters, incompatible backend, off-screen bounds) is marked `skip` and
//! acquires no textures; its matching `pop` is a no-op.
//!
//! Incompatibility is fail-closed for the whole chain: one filter the backend cannot run skips
//! every filter of that frame. The canvas fallback ([`crate::canvas`]) instead drops unsupported
//! filters one by one.

pub mod area;
pub mod frame;
pub mod uniforms;

use std::collections::HashSet;
use std::rc::Rc;

use crate::effects::internal;
use crate::filter::{Antialias, BlendMode, Filter, validate_settings};
use crate::foundation::bounds::Bounds;
use crate::foundation::core::{Affine, Rect, Size, Vec2};
use crate::foundation::error::{FxError, FxResult};
use crate::foundation::math::ceil_px;
use crate::render::backend::{FilterBackend, FilterPass, RenderSurface, RendererKind};
use crate::scene::{FilterTarget, RenderableLeaf, SpriteLike};
use crate::texture::Texture;
use crate::texture::pool::TexturePool;

use area::compute_area;
use frame::{FilterFrame, FrameArena};
use uniforms::FilterUniforms;

/// Everything `push` needs to know about one filtered subtree.
pub struct FilterInstruction {
    pub container: Rc<dyn FilterTarget>,
    pub filters: Vec<Rc<dyn Filter>>,
    /// Explicit capture rectangle in the container's local space.
    pub filter_area: Option<Rect>,
    /// Leaves already enumerated by a batching pass.
    pub renderables: Option<Vec<Rc<dyn RenderableLeaf>>>,
}

impl FilterInstruction {
    pub fn new(container: Rc<dyn FilterTarget>, filters: Vec<Rc<dyn Filter>>) -> Self {
        Self {
            container,
            filters,
            filter_area: None,
            renderables: None,
        }
    }

    pub fn with_filter_area(mut self, area: Rect) -> Self {
        self.filter_area = Some(area);
        self
    }

    pub fn with_renderables(mut self, renderables: Vec<Rc<dyn RenderableLeaf>>) -> Self {
        self.renderables = Some(renderables);
        self
    }
}

/// What a running filter can ask of the system it is applied by.
///
/// Composite filters use it to run sub-passes and to borrow scratch textures.
pub trait FilterPassContext {
    /// Draw `filter`'s program once from `input` into `output`.
    fn apply_filter(
        &mut self,
        filter: &dyn Filter,
        input: &Texture,
        output: &RenderSurface,
        clear: bool,
    ) -> FxResult<()>;

    fn texture_pool(&mut self) -> &mut TexturePool;

    fn renderer_kind(&self) -> RendererKind;

    /// Destination copy of the frame being applied, for blend-required filters.
    fn back_texture(&self) -> Option<&Texture>;

    /// Map the active input texture's normalized coordinates into `sprite`'s normalized texture
    /// space.
    fn calculate_sprite_matrix(&self, sprite: &dyn SpriteLike) -> FxResult<Affine>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterSystemStats {
    /// `push` calls.
    pub pushed: u64,
    /// Frames marked `skip`.
    pub skipped: u64,
    /// `apply_filter` calls.
    pub passes: u64,
}

struct Negotiated {
    resolution: f64,
    padding: f64,
    antialias: bool,
    blend_required: bool,
    clip_to_viewport: bool,
    filters: Vec<Rc<dyn Filter>>,
}

enum Negotiation {
    Ready(Negotiated),
    NothingEnabled,
    Incompatible { label: String },
    MissingBackBuffer { label: String },
}

fn negotiate(
    filters: &[Rc<dyn Filter>],
    root_resolution: f64,
    root_antialias: bool,
    kind: RendererKind,
    back_buffer: bool,
) -> FxResult<Negotiation> {
    let mut out = Negotiated {
        resolution: f64::INFINITY,
        padding: 0.0,
        antialias: true,
        blend_required: false,
        clip_to_viewport: true,
        filters: Vec::with_capacity(filters.len()),
    };

    for filter in filters {
        let s = filter.settings();
        if !s.enabled {
            continue;
        }
        validate_settings(&s)?;

        out.resolution = out.resolution.min(s.resolution.resolve(root_resolution));
        out.padding += s.padding;
        match s.antialias {
            Antialias::Off => out.antialias = false,
            Antialias::Inherit => out.antialias &= root_antialias,
            Antialias::On => {}
        }
        out.clip_to_viewport &= s.clip_to_viewport;

        if !filter.compatible_renderers().supports(kind) {
            return Ok(Negotiation::Incompatible {
                label: filter.label().to_owned(),
            });
        }
        if s.blend_required && !back_buffer {
            return Ok(Negotiation::MissingBackBuffer {
                label: filter.label().to_owned(),
            });
        }
        out.blend_required |= s.blend_required;
        out.filters.push(Rc::clone(filter));
    }

    if out.filters.is_empty() {
        return Ok(Negotiation::NothingEnabled);
    }
    out.padding = out.padding.trunc();
    Ok(Negotiation::Ready(out))
}

/// Stack-driven filter orchestrator over one render backend.
///
/// Owns the backend and the texture pool the frames draw from; one system per renderer.
pub struct FilterSystem<B: FilterBackend> {
    backend: B,
    pool: TexturePool,
    frames: FrameArena,
    depth: usize,
    active: Option<usize>,
    stats: FilterSystemStats,
    warned: HashSet<String>,
}

impl<B: FilterBackend> FilterSystem<B> {
    pub fn new(backend: B) -> Self {
        Self::with_pool(backend, TexturePool::new())
    }

    pub fn with_pool(backend: B, pool: TexturePool) -> Self {
        Self {
            backend,
            pool,
            frames: FrameArena::new(),
            depth: 0,
            active: None,
            stats: FilterSystemStats::default(),
            warned: HashSet::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn pool(&self) -> &TexturePool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut TexturePool {
        &mut self.pool
    }

    pub fn stats(&self) -> FilterSystemStats {
        self.stats
    }

    /// Current stack depth (number of unmatched pushes).
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn frame_at(&self, depth: usize) -> Option<&FilterFrame> {
        self.frames.frame_at(depth)
    }

    pub fn into_parts(self) -> (B, TexturePool) {
        (self.backend, self.pool)
    }

    fn warn_once(&mut self, key: String, message: &str) {
        if self.warned.insert(key.clone()) {
            tracing::warn!(filter = %key, "{message}");
        }
    }

    fn mark_skipped(&mut self, depth: usize, container: &Rc<dyn FilterTarget>) {
        let frame = self.frames.acquire_frame(depth);
        frame.skip = true;
        frame.container = Some(Rc::clone(container));
        self.stats.skipped += 1;
    }

    fn surface_resolution(&self, surface: &RenderSurface) -> f64 {
        surface
            .texture()
            .map_or_else(|| self.backend.root_resolution(), Texture::resolution)
    }

    fn surface_size(&self, surface: &RenderSurface) -> Size {
        surface
            .texture()
            .map_or_else(|| self.backend.root_size(), Texture::size)
    }

    /// Start capturing a subtree. Every call must be matched by [`FilterSystem::pop`].
    #[tracing::instrument(skip_all, fields(depth = self.depth, filters = instruction.filters.len()))]
    pub fn push(&mut self, instruction: &FilterInstruction) -> FxResult<()> {
        let depth = self.depth;
        self.depth += 1;
        self.stats.pushed += 1;

        if instruction.filters.is_empty() {
            tracing::trace!("empty filter list, skipping frame");
            self.mark_skipped(depth, &instruction.container);
            return Ok(());
        }

        let root_resolution = self.backend.root_resolution();
        let negotiated = match negotiate(
            &instruction.filters,
            root_resolution,
            self.backend.root_antialias(),
            self.backend.kind(),
            self.backend.supports_back_buffer(),
        ) {
            Ok(Negotiation::Ready(n)) => n,
            Ok(Negotiation::NothingEnabled) => {
                tracing::trace!("no enabled filters, skipping frame");
                self.mark_skipped(depth, &instruction.container);
                return Ok(());
            }
            Ok(Negotiation::Incompatible { label }) => {
                self.warn_once(
                    format!("incompatible:{label}"),
                    "filter cannot run on the active renderer; subtree rendered unfiltered",
                );
                self.mark_skipped(depth, &instruction.container);
                return Ok(());
            }
            Ok(Negotiation::MissingBackBuffer { label }) => {
                self.warn_once(
                    format!("back-buffer:{label}"),
                    "blend filter requires a back buffer; enable `use_back_buffer` on the backend",
                );
                self.mark_skipped(depth, &instruction.container);
                return Ok(());
            }
            Err(e) => {
                self.mark_skipped(depth, &instruction.container);
                return Err(e);
            }
        };

        let mut bounds = Bounds::default();
        compute_area(
            instruction.container.as_ref(),
            instruction.filter_area,
            instruction.renderables.as_deref(),
            &mut bounds,
        );

        let resolution = negotiated.resolution;
        if negotiated.clip_to_viewport {
            let (vw, vh) = self.backend.root_viewport_px();
            bounds.fit(
                0.0,
                f64::from(vw) / root_resolution,
                0.0,
                f64::from(vh) / root_resolution,
            );
        }
        bounds
            .scale(resolution)
            .ceil()
            .scale(1.0 / resolution)
            .pad(negotiated.padding);

        if !bounds.is_positive() {
            tracing::trace!("bounds have no area, skipping frame");
            self.mark_skipped(depth, &instruction.container);
            return Ok(());
        }

        let offset = self.frames.previous_origin(depth).unwrap_or(Vec2::ZERO);
        let root_size = self.backend.root_size();
        let global_frame = Rect::from_origin_size(
            (offset.x * resolution, offset.y * resolution),
            (root_size.width * resolution, root_size.height * resolution),
        );

        let output_surface = self.backend.current_surface();
        let (back_texture, input) = match self.acquire_capture(
            &output_surface,
            &bounds,
            offset,
            resolution,
            &negotiated,
        ) {
            Ok(textures) => textures,
            Err(e) => {
                self.mark_skipped(depth, &instruction.container);
                return Err(e);
            }
        };
        self.backend.push_offset(bounds.min().to_vec2());

        let frame = self.frames.acquire_frame(depth);
        frame.container = Some(Rc::clone(&instruction.container));
        frame.filters = negotiated.filters;
        frame.bounds = bounds;
        frame.resolution = resolution;
        frame.antialias = negotiated.antialias;
        frame.padding = negotiated.padding;
        frame.blend_required = negotiated.blend_required;
        frame.clip_to_viewport = negotiated.clip_to_viewport;
        frame.offset = offset;
        frame.global_frame = global_frame;
        frame.output_surface = Some(output_surface);
        frame.back_texture = back_texture;
        frame.input_texture = Some(input);
        Ok(())
    }

    /// Take the frame's textures from the pool and bind the input. On error everything taken so
    /// far is back in the pool and the bound surface is unchanged.
    fn acquire_capture(
        &mut self,
        output_surface: &RenderSurface,
        bounds: &Bounds,
        offset: Vec2,
        resolution: f64,
        negotiated: &Negotiated,
    ) -> FxResult<(Option<Texture>, Texture)> {
        let back = if negotiated.blend_required {
            Some(self.copy_back_texture(output_surface, bounds, offset)?)
        } else {
            None
        };

        let input = self.pool.get_optimal_texture(
            bounds.width(),
            bounds.height(),
            resolution,
            negotiated.antialias,
        );
        if let Err(e) = self
            .backend
            .bind(&RenderSurface::Texture(input.clone()), true)
        {
            self.pool.return_texture(input);
            if let Some(back) = back {
                self.pool.return_texture(back);
            }
            return Err(e);
        }
        Ok((back, input))
    }

    fn copy_back_texture(
        &mut self,
        output_surface: &RenderSurface,
        bounds: &Bounds,
        offset: Vec2,
    ) -> FxResult<Texture> {
        self.backend.finish_render_pass()?;
        let bg_res = self.surface_resolution(output_surface);
        let back = self
            .pool
            .get_optimal_texture(bounds.width(), bounds.height(), bg_res, false);
        let src_origin = (
            ((bounds.min_x - offset.x) * bg_res).floor() as i64,
            ((bounds.min_y - offset.y) * bg_res).floor() as i64,
        );
        let size = (
            ceil_px(bounds.width(), bg_res),
            ceil_px(bounds.height(), bg_res),
        );
        match self
            .backend
            .copy_to_texture(output_surface, &back, src_origin, size, (0, 0))
        {
            Ok(()) => Ok(back),
            Err(e) => {
                self.pool.return_texture(back);
                Err(e)
            }
        }
    }

    /// Finish the innermost frame: run its filters onto the surface that was bound at `push`
    /// time and return its textures to the pool.
    #[tracing::instrument(skip_all, fields(depth = self.depth))]
    pub fn pop(&mut self) -> FxResult<()> {
        let Some(depth) = self.depth.checked_sub(1) else {
            return Err(FxError::backend("pop without a matching push"));
        };
        self.depth = depth;

        if self.frames.frame_at(depth).is_none_or(|f| f.skip) {
            return Ok(());
        }

        self.backend.pop_offset();
        self.backend.finish_render_pass()?;

        let previous = self.active.replace(depth);
        let result = self.apply_filters_to_output(depth, false);
        self.active = previous;

        if let Some(frame) = self.frames.frame_at_mut(depth) {
            if let Some(back) = frame.back_texture.take() {
                self.pool.return_texture(back);
            }
            if let Some(input) = frame.input_texture.take() {
                self.pool.return_texture(input);
            }
        }
        result
    }

    fn apply_filters_to_output(&mut self, depth: usize, clear: bool) -> FxResult<()> {
        let (filters, input, output) = {
            let frame = self
                .frames
                .frame_at(depth)
                .ok_or_else(|| FxError::backend("no filter frame at this depth"))?;
            let input = frame
                .input_texture
                .clone()
                .ok_or_else(|| FxError::backend("filter frame has no input texture"))?;
            let output = frame
                .output_surface
                .clone()
                .ok_or_else(|| FxError::backend("filter frame has no output surface"))?;
            (frame.filters.clone(), input, output)
        };

        let Some((last, rest)) = filters.split_last() else {
            return Ok(());
        };
        if rest.is_empty() {
            return last.apply(self, &input, &output, clear);
        }

        let scratch = self.pool.get_same_size_texture(&input, false);
        let result = self.ping_pong(rest, last.as_ref(), &input, &scratch, &output, clear);
        self.pool.return_texture(scratch);
        result
    }

    fn ping_pong(
        &mut self,
        rest: &[Rc<dyn Filter>],
        last: &dyn Filter,
        input: &Texture,
        scratch: &Texture,
        output: &RenderSurface,
        clear: bool,
    ) -> FxResult<()> {
        let mut flip = input;
        let mut flop = scratch;
        for filter in rest {
            filter.apply(self, flip, &RenderSurface::Texture(flop.clone()), true)?;
            std::mem::swap(&mut flip, &mut flop);
        }
        last.apply(self, flip, output, clear)
    }

    /// Run `filters` over an existing texture instead of a scene subtree.
    ///
    /// Returns the source texture unchanged when no filter is enabled or the chain cannot run
    /// here. Otherwise the result is a texture from this system's pool, sized to the source plus
    /// the chain's padding; hand it back with `pool_mut().return_texture` when done.
    #[tracing::instrument(skip_all, fields(filters = filters.len()))]
    pub fn generate_filtered_texture(
        &mut self,
        texture: &Texture,
        filters: &[Rc<dyn Filter>],
    ) -> FxResult<Texture> {
        let negotiated = match negotiate(
            filters,
            texture.resolution(),
            texture.source.antialias,
            self.backend.kind(),
            self.backend.supports_back_buffer(),
        )? {
            Negotiation::Ready(n) => n,
            Negotiation::NothingEnabled => return Ok(texture.clone()),
            Negotiation::Incompatible { label } | Negotiation::MissingBackBuffer { label } => {
                self.warn_once(
                    format!("texture:{label}"),
                    "filter cannot run on the active renderer; texture left unfiltered",
                );
                return Ok(texture.clone());
            }
        };

        let resolution = negotiated.resolution;
        let mut bounds = Bounds::from_rect(Rect::from_origin_size((0.0, 0.0), texture.size()));
        bounds
            .scale(resolution)
            .ceil()
            .scale(1.0 / resolution)
            .pad(negotiated.padding);
        if !bounds.is_positive() {
            return Ok(texture.clone());
        }

        let restore = self.backend.current_surface();
        let offset = bounds.min().to_vec2();
        let input = self.pool.get_optimal_texture(
            bounds.width(),
            bounds.height(),
            resolution,
            negotiated.antialias,
        );
        let output = self.pool.get_optimal_texture(
            bounds.width(),
            bounds.height(),
            resolution,
            negotiated.antialias,
        );

        let depth = self.depth;
        self.depth += 1;
        {
            let frame = self.frames.acquire_frame(depth);
            frame.filters = negotiated.filters;
            frame.bounds = bounds;
            frame.resolution = resolution;
            frame.antialias = negotiated.antialias;
            frame.padding = negotiated.padding;
            frame.blend_required = negotiated.blend_required;
            frame.offset = offset;
            frame.global_frame = Rect::from_origin_size(
                (offset.x * resolution, offset.y * resolution),
                (
                    texture.source.width() * resolution,
                    texture.source.height() * resolution,
                ),
            );
            frame.output_surface = Some(RenderSurface::Texture(output.clone()));
            frame.input_texture = Some(input.clone());
        }

        let previous = self.active.replace(depth);
        let result = self.run_texture_chain(texture, &input, -offset, depth);
        self.active = previous;

        if let Some(frame) = self.frames.frame_at_mut(depth) {
            frame.input_texture = None;
        }
        self.depth = depth;
        self.pool.return_texture(input);

        match result.and_then(|()| self.backend.bind(&restore, false)) {
            Ok(()) => Ok(output),
            Err(e) => {
                self.pool.return_texture(output);
                Err(e)
            }
        }
    }

    fn run_texture_chain(
        &mut self,
        source: &Texture,
        input: &Texture,
        origin: Vec2,
        depth: usize,
    ) -> FxResult<()> {
        self.copy_into_padded(source, input, origin)?;
        self.backend.finish_render_pass()?;
        self.apply_filters_to_output(depth, true)
    }

    fn copy_into_padded(&mut self, source: &Texture, target: &Texture, origin: Vec2) -> FxResult<()> {
        let program = internal::passthrough_program();
        let uniforms = FilterUniforms::new(
            source,
            origin,
            Rect::ZERO,
            target.size(),
            false,
        );
        self.backend
            .bind(&RenderSurface::Texture(target.clone()), true)?;
        self.backend.draw_filter_pass(&FilterPass {
            program: &program,
            params: &[],
            uniforms,
            input: source,
            back: None,
            blend_mode: BlendMode::Normal,
        })
    }

    /// Drop every pooled texture, releasing backend storage when `destroy` is set.
    pub fn clear_pool(&mut self, destroy: bool) {
        for texture in self.pool.clear(destroy) {
            self.backend.destroy_texture(&texture);
        }
    }

    fn active_frame(&self) -> FxResult<&FilterFrame> {
        self.active
            .and_then(|d| self.frames.frame_at(d))
            .ok_or_else(|| FxError::backend("no filter frame is being applied"))
    }
}

impl<B: FilterBackend> FilterPassContext for FilterSystem<B> {
    fn apply_filter(
        &mut self,
        filter: &dyn Filter,
        input: &Texture,
        output: &RenderSurface,
        clear: bool,
    ) -> FxResult<()> {
        let frame = self.active_frame()?;

        // Only the pass that lands on the frame's real output knows its placement; intermediate
        // ping-pong passes draw at the origin of their scratch texture.
        let is_final = frame
            .output_surface
            .as_ref()
            .is_some_and(|s| s.same_target(output));
        let origin = if is_final {
            frame.bounds.min().to_vec2() - frame.offset
        } else {
            Vec2::ZERO
        };
        let global_frame = frame.global_frame;
        let back = frame.back_texture.clone();

        let uniforms = FilterUniforms::new(
            input,
            origin,
            global_frame,
            self.surface_size(output),
            output.is_root(),
        );
        let params = filter.params();
        let settings = filter.settings();

        self.backend.bind(output, clear)?;
        self.backend.draw_filter_pass(&FilterPass {
            program: filter.program(),
            params: &params,
            uniforms,
            input,
            back: back.as_ref(),
            blend_mode: settings.blend_mode,
        })?;
        self.stats.passes += 1;
        Ok(())
    }

    fn texture_pool(&mut self) -> &mut TexturePool {
        &mut self.pool
    }

    fn renderer_kind(&self) -> RendererKind {
        self.backend.kind()
    }

    fn back_texture(&self) -> Option<&Texture> {
        self.active_frame().ok()?.back_texture.as_ref()
    }

    fn calculate_sprite_matrix(&self, sprite: &dyn SpriteLike) -> FxResult<Affine> {
        let frame = self.active_frame()?;
        let input = frame
            .input_texture
            .as_ref()
            .ok_or_else(|| FxError::backend("filter frame has no input texture"))?;

        let size = sprite.texture_size();
        if size.width <= 0.0 || size.height <= 0.0 {
            return Err(FxError::validation("sprite texture size must be > 0"));
        }

        let mapped = Affine::new([
            input.source.width(),
            0.0,
            0.0,
            input.source.height(),
            frame.bounds.min_x,
            frame.bounds.min_y,
        ]);
        let mut world = sprite.world_transform();
        if let Some(cache_to_local) = sprite.cache_to_local_transform() {
            world = cache_to_local * world;
        }

        Ok(Affine::translate(sprite.anchor())
            * Affine::scale_non_uniform(1.0 / size.width, 1.0 / size.height)
            * world.inverse()
            * mapped)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/system/mod.rs"]
mod tests;
