use std::collections::HashMap;

use crate::filter::{Fragment, PixelView};
use crate::foundation::core::{Rect, Rgba8Premul, Vec2};
use crate::foundation::error::{FxError, FxResult};
use crate::render::backend::{FilterBackend, FilterPass, FrameRGBA, RenderSurface, RendererKind};
use crate::render::blend;
use crate::texture::{Texture, TextureId};

/// Options for the CPU backend.
#[derive(Clone, Debug)]
pub struct CpuBackendOpts {
    /// Root surface width in device pixels.
    pub width: u32,
    /// Root surface height in device pixels.
    pub height: u32,
    /// Device pixels per logical unit of the root surface.
    pub resolution: f64,
    pub antialias: bool,
    /// Allow destination copies for blend-required filters.
    pub use_back_buffer: bool,
    /// Straight-alpha colour the root starts with. Transparent when unset.
    pub clear_rgba: Option<[u8; 4]>,
}

impl Default for CpuBackendOpts {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            resolution: 1.0,
            antialias: false,
            use_back_buffer: true,
            clear_rgba: None,
        }
    }
}

impl CpuBackendOpts {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_antialias(mut self, antialias: bool) -> Self {
        self.antialias = antialias;
        self
    }

    pub fn with_back_buffer(mut self, use_back_buffer: bool) -> Self {
        self.use_back_buffer = use_back_buffer;
        self
    }

    /// Return options with a configured clear color for the root surface.
    pub fn with_clear_rgba(mut self, clear: Option<[u8; 4]>) -> Self {
        self.clear_rgba = clear;
        self
    }
}

#[derive(Clone, Debug, Default)]
struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    fn fill(&mut self, px: [u8; 4]) {
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    fn idx(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }

    fn get(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.idx(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    fn set(&mut self, x: u32, y: u32, px: [u8; 4]) {
        let i = self.idx(x, y);
        self.data[i..i + 4].copy_from_slice(&px);
    }

    fn view(&self) -> PixelView<'_> {
        PixelView::new(self.width, self.height, &self.data)
    }
}

/// Pixel range whose centres fall inside `[lo, hi)` logical units at `res`.
fn covered_px(lo: f64, hi: f64, res: f64, limit: u32) -> std::ops::Range<u32> {
    let start = (lo * res - 0.5).ceil().max(0.0);
    let end = (hi * res - 0.5).ceil().max(0.0);
    let start = (start as u32).min(limit);
    let end = (end as u32).min(limit);
    start..end.max(start)
}

/// Software backend: premultiplied RGBA8 buffers, filter programs run through their
/// [`crate::filter::CpuShader`] half.
pub struct CpuBackend {
    opts: CpuBackendOpts,
    root: PixelBuffer,
    textures: HashMap<TextureId, PixelBuffer>,
    bound: RenderSurface,
    offsets: Vec<Vec2>,
}

impl CpuBackend {
    pub fn new(opts: CpuBackendOpts) -> FxResult<Self> {
        if opts.width == 0 || opts.height == 0 {
            return Err(FxError::validation("root surface dimensions must be > 0"));
        }
        if !opts.resolution.is_finite() || opts.resolution <= 0.0 {
            return Err(FxError::validation(
                "root resolution must be finite and > 0",
            ));
        }
        let mut root = PixelBuffer::new(opts.width, opts.height);
        if let Some([r, g, b, a]) = opts.clear_rgba {
            root.fill(Rgba8Premul::from_straight_rgba(r, g, b, a).to_array());
        }
        Ok(Self {
            opts,
            root,
            textures: HashMap::new(),
            bound: RenderSurface::Root,
            offsets: Vec::new(),
        })
    }

    pub fn opts(&self) -> &CpuBackendOpts {
        &self.opts
    }

    /// Backing buffers currently allocated for textures.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn current_offset(&self) -> Vec2 {
        self.offsets.last().copied().unwrap_or(Vec2::ZERO)
    }

    fn ensure(&mut self, texture: &Texture) -> &mut PixelBuffer {
        let (w, h) = (texture.source.pixel_width, texture.source.pixel_height);
        let buf = self
            .textures
            .entry(texture.id())
            .or_insert_with(|| PixelBuffer::new(w, h));
        if buf.width != w || buf.height != h {
            *buf = PixelBuffer::new(w, h);
        }
        buf
    }

    fn surface_resolution(&self, surface: &RenderSurface) -> f64 {
        surface
            .texture()
            .map_or(self.opts.resolution, Texture::resolution)
    }

    fn take_target(&mut self, surface: &RenderSurface) -> PixelBuffer {
        match surface {
            RenderSurface::Root => std::mem::take(&mut self.root),
            RenderSurface::Texture(t) => {
                self.ensure(t);
                self.textures.remove(&t.id()).unwrap_or_default()
            }
        }
    }

    fn restore_target(&mut self, surface: &RenderSurface, buf: PixelBuffer) {
        match surface {
            RenderSurface::Root => self.root = buf,
            RenderSurface::Texture(t) => {
                self.textures.insert(t.id(), buf);
            }
        }
    }

    fn shade(&self, pass: &FilterPass<'_>, target: &mut PixelBuffer, res: f64) -> FxResult<()> {
        let shader = pass.program.cpu().ok_or_else(|| {
            FxError::backend(format!(
                "filter program '{}' has no CPU implementation",
                pass.program.name()
            ))
        })?;
        let input = self
            .textures
            .get(&pass.input.id())
            .ok_or_else(|| FxError::backend("filter input texture has no storage"))?
            .view();
        let back = pass
            .back
            .and_then(|t| self.textures.get(&t.id()))
            .map(PixelBuffer::view);

        let u = &pass.uniforms;
        let ox = f64::from(u.output_frame[0]);
        let oy = f64::from(u.output_frame[1]);
        let ow = f64::from(u.output_frame[2]);
        let oh = f64::from(u.output_frame[3]);
        let in_w = f64::from(u.input_size[0]);
        let in_h = f64::from(u.input_size[1]);

        for py in covered_px(oy, oy + oh, res, target.height) {
            let y = (f64::from(py) + 0.5) / res;
            for px in covered_px(ox, ox + ow, res, target.width) {
                let x = (f64::from(px) + 0.5) / res;
                let frag = Fragment {
                    uv: [((x - ox) / in_w) as f32, ((y - oy) / in_h) as f32],
                    position: [px as f32 + 0.5, py as f32 + 0.5],
                    params: pass.params,
                    uniforms: u,
                    input,
                    back,
                };
                let src = shader.fragment(&frag);
                let dst = blend::to_f32(target.get(px, py));
                target.set(px, py, blend::to_u8(blend::blend(pass.blend_mode, dst, src)));
            }
        }
        Ok(())
    }
}

impl FilterBackend for CpuBackend {
    fn kind(&self) -> RendererKind {
        RendererKind::Cpu
    }

    fn root_viewport_px(&self) -> (u32, u32) {
        (self.opts.width, self.opts.height)
    }

    fn root_resolution(&self) -> f64 {
        self.opts.resolution
    }

    fn root_antialias(&self) -> bool {
        self.opts.antialias
    }

    fn supports_back_buffer(&self) -> bool {
        self.opts.use_back_buffer
    }

    fn current_surface(&self) -> RenderSurface {
        self.bound.clone()
    }

    fn bind(&mut self, surface: &RenderSurface, clear: bool) -> FxResult<()> {
        match surface {
            RenderSurface::Root => {
                if clear {
                    self.root.fill([0; 4]);
                }
            }
            RenderSurface::Texture(t) => {
                let buf = self.ensure(t);
                if clear {
                    buf.fill([0; 4]);
                }
            }
        }
        self.bound = surface.clone();
        Ok(())
    }

    fn finish_render_pass(&mut self) -> FxResult<()> {
        Ok(())
    }

    fn push_offset(&mut self, offset: Vec2) {
        self.offsets.push(offset);
    }

    fn pop_offset(&mut self) {
        self.offsets.pop();
    }

    fn copy_to_texture(
        &mut self,
        src: &RenderSurface,
        dst: &Texture,
        src_origin_px: (i64, i64),
        size_px: (u32, u32),
        dst_origin_px: (u32, u32),
    ) -> FxResult<()> {
        if src.texture().is_some_and(|t| t.id() == dst.id()) {
            return Err(FxError::backend("copy source and destination alias"));
        }
        let (w, h) = size_px;
        let mut staged = Vec::with_capacity((w as usize) * (h as usize));
        {
            let src_buf = match src {
                RenderSurface::Root => &self.root,
                RenderSurface::Texture(t) => {
                    self.ensure(t);
                    self.textures
                        .get(&t.id())
                        .ok_or_else(|| FxError::backend("copy source has no storage"))?
                }
            };
            for y in 0..i64::from(h) {
                for x in 0..i64::from(w) {
                    let sx = src_origin_px.0 + x;
                    let sy = src_origin_px.1 + y;
                    let inside = sx >= 0
                        && sy >= 0
                        && sx < i64::from(src_buf.width)
                        && sy < i64::from(src_buf.height);
                    staged.push(if inside {
                        src_buf.get(sx as u32, sy as u32)
                    } else {
                        [0; 4]
                    });
                }
            }
        }

        let dst_buf = self.ensure(dst);
        for y in 0..h {
            for x in 0..w {
                let dx = dst_origin_px.0 + x;
                let dy = dst_origin_px.1 + y;
                if dx < dst_buf.width && dy < dst_buf.height {
                    dst_buf.set(dx, dy, staged[(y as usize) * (w as usize) + x as usize]);
                }
            }
        }
        Ok(())
    }

    fn draw_filter_pass(&mut self, pass: &FilterPass<'_>) -> FxResult<()> {
        let target = self.bound.clone();
        if target.texture().is_some_and(|t| t.id() == pass.input.id()) {
            return Err(FxError::backend(
                "filter pass reads from the surface it draws into",
            ));
        }
        self.ensure(pass.input);
        if let Some(back) = pass.back {
            self.ensure(back);
        }

        let res = self.surface_resolution(&target);
        let mut buf = self.take_target(&target);
        let result = self.shade(pass, &mut buf, res);
        self.restore_target(&target, buf);
        result
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba8Premul) -> FxResult<()> {
        let target = self.bound.clone();
        let res = self.surface_resolution(&target);
        let r = rect - self.current_offset();
        let color = color.to_array();

        let mut buf = self.take_target(&target);
        for py in covered_px(r.y0, r.y1, res, buf.height) {
            for px in covered_px(r.x0, r.x1, res, buf.width) {
                let dst = buf.get(px, py);
                buf.set(px, py, blend::over(dst, color));
            }
        }
        self.restore_target(&target, buf);
        Ok(())
    }

    fn upload_texture(&mut self, texture: &Texture, rgba: &[u8]) -> FxResult<()> {
        let (w, h) = (texture.source.pixel_width, texture.source.pixel_height);
        if rgba.len() != (w as usize) * (h as usize) * 4 {
            return Err(FxError::validation(format!(
                "upload expects {w}x{h} rgba8 pixels ({} bytes), got {}",
                (w as usize) * (h as usize) * 4,
                rgba.len()
            )));
        }
        self.textures.insert(
            texture.id(),
            PixelBuffer {
                width: w,
                height: h,
                data: rgba.to_vec(),
            },
        );
        Ok(())
    }

    fn read_pixels(&mut self, surface: &RenderSurface) -> FxResult<FrameRGBA> {
        let buf = match surface {
            RenderSurface::Root => &self.root,
            RenderSurface::Texture(t) => {
                self.ensure(t);
                self.textures
                    .get(&t.id())
                    .ok_or_else(|| FxError::backend("texture has no storage"))?
            }
        };
        Ok(FrameRGBA {
            width: buf.width,
            height: buf.height,
            data: buf.data.clone(),
            premultiplied: true,
        })
    }

    fn destroy_texture(&mut self, texture: &Texture) {
        self.textures.remove(&texture.id());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
