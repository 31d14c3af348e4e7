use crate::filter::{BlendMode, FilterProgram};
use crate::foundation::core::{Rect, Rgba8Premul, Size, Vec2};
use crate::foundation::error::FxResult;
use crate::system::uniforms::FilterUniforms;
use crate::texture::Texture;

/// A rendered surface as RGBA8 pixels.
///
/// Frames are **premultiplied alpha**. The `premultiplied` flag is included to make this explicit
/// at API boundaries.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Premultiplied pixel at `(x, y)`, transparent when out of range.
    pub fn pixel(&self, x: u32, y: u32) -> Rgba8Premul {
        if x >= self.width || y >= self.height {
            return Rgba8Premul::transparent();
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Rgba8Premul::from_array([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ])
    }
}

/// Available backend kinds.
///
/// - `Cpu` is always available.
/// - `Gpu` requires the cargo feature `gpu`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    Cpu,
    Gpu,
}

/// A render target: the root surface or an offscreen texture.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderSurface {
    Root,
    Texture(Texture),
}

impl RenderSurface {
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }

    pub fn texture(&self) -> Option<&Texture> {
        match self {
            Self::Root => None,
            Self::Texture(t) => Some(t),
        }
    }

    /// Whether both name the same backing storage. Logical frames are not compared.
    pub fn same_target(&self, other: &RenderSurface) -> bool {
        match (self, other) {
            (Self::Root, Self::Root) => true,
            (Self::Texture(a), Self::Texture(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl From<Texture> for RenderSurface {
    fn from(t: Texture) -> Self {
        Self::Texture(t)
    }
}

/// One full-screen-quad draw issued by the filter system.
#[derive(Debug)]
pub struct FilterPass<'a> {
    pub program: &'a FilterProgram,
    pub params: &'a [f32],
    pub uniforms: FilterUniforms,
    pub input: &'a Texture,
    pub back: Option<&'a Texture>,
    pub blend_mode: BlendMode,
}

/// The render-target capability the filter system drives.
///
/// Draws always go to the currently bound surface. Backends allocate texture storage lazily the
/// first time a [`Texture`] id is bound, copied into or uploaded to.
pub trait FilterBackend {
    fn kind(&self) -> RendererKind;

    /// Root surface size in device pixels.
    fn root_viewport_px(&self) -> (u32, u32);

    fn root_resolution(&self) -> f64;

    fn root_antialias(&self) -> bool;

    /// Root surface size in logical units.
    fn root_size(&self) -> Size {
        let (w, h) = self.root_viewport_px();
        let res = self.root_resolution();
        Size::new(f64::from(w) / res, f64::from(h) / res)
    }

    /// Whether destination copies for blend-required filters are available.
    fn supports_back_buffer(&self) -> bool;

    fn current_surface(&self) -> RenderSurface;

    /// Make `surface` the target of subsequent draws, clearing it to transparent when asked.
    fn bind(&mut self, surface: &RenderSurface, clear: bool) -> FxResult<()>;

    /// Flush pending draws so their results can be sampled or copied.
    fn finish_render_pass(&mut self) -> FxResult<()>;

    /// Translate subsequent scene draws by `-offset` (logical units).
    fn push_offset(&mut self, offset: Vec2);

    fn pop_offset(&mut self);

    /// Copy `size_px` device pixels at `src_origin_px` of `src` to `dst_origin_px` of `dst`.
    ///
    /// Source pixels outside `src` read as transparent.
    fn copy_to_texture(
        &mut self,
        src: &RenderSurface,
        dst: &Texture,
        src_origin_px: (i64, i64),
        size_px: (u32, u32),
        dst_origin_px: (u32, u32),
    ) -> FxResult<()>;

    /// Run one filter program into the bound surface.
    fn draw_filter_pass(&mut self, pass: &FilterPass<'_>) -> FxResult<()>;

    /// Scene content stand-in: fill `rect` (logical units, pre-offset) on the bound surface.
    fn fill_rect(&mut self, rect: Rect, color: Rgba8Premul) -> FxResult<()>;

    /// Replace a texture's pixels with tightly packed premultiplied RGBA8 of its backing size.
    fn upload_texture(&mut self, texture: &Texture, rgba: &[u8]) -> FxResult<()>;

    /// Read the full backing store of a surface.
    fn read_pixels(&mut self, surface: &RenderSurface) -> FxResult<FrameRGBA>;

    /// Release backing storage. Unknown textures are ignored.
    fn destroy_texture(&mut self, texture: &Texture);
}
