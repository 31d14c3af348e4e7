use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use crate::filter::RendererMask;
use crate::system::uniforms::FilterUniforms;

/// Per-pixel program run by the CPU backend.
///
/// `fragment` receives the interpolated input texture coordinate and returns a premultiplied
/// colour in `0.0..=1.0`. Blending into the output is done by the backend.
pub trait CpuShader {
    fn fragment(&self, frag: &Fragment<'_>) -> [f32; 4];
}

/// Read-only view of premultiplied RGBA8 pixels.
#[derive(Clone, Copy, Debug)]
pub struct PixelView<'a> {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) data: &'a [u8],
}

impl<'a> PixelView<'a> {
    pub(crate) fn new(width: u32, height: u32, data: &'a [u8]) -> Self {
        debug_assert_eq!(data.len(), (width as usize) * (height as usize) * 4);
        Self {
            width,
            height,
            data,
        }
    }

    fn texel(&self, x: i64, y: i64) -> [f32; 4] {
        let x = x.clamp(0, i64::from(self.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.height) - 1) as usize;
        let idx = (y * self.width as usize + x) * 4;
        [
            f32::from(self.data[idx]) / 255.0,
            f32::from(self.data[idx + 1]) / 255.0,
            f32::from(self.data[idx + 2]) / 255.0,
            f32::from(self.data[idx + 3]) / 255.0,
        ]
    }

    /// Bilinear sample at normalized coordinates, clamp-to-edge.
    pub fn sample(&self, uv: [f32; 2]) -> [f32; 4] {
        if self.width == 0 || self.height == 0 {
            return [0.0; 4];
        }
        let x = f64::from(uv[0]) * f64::from(self.width) - 0.5;
        let y = f64::from(uv[1]) * f64::from(self.height) - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = (x - x0) as f32;
        let fy = (y - y0) as f32;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let a = self.texel(x0, y0);
        let b = self.texel(x0 + 1, y0);
        let c = self.texel(x0, y0 + 1);
        let d = self.texel(x0 + 1, y0 + 1);

        let mut out = [0.0f32; 4];
        for i in 0..4 {
            let top = a[i] + (b[i] - a[i]) * fx;
            let bottom = c[i] + (d[i] - c[i]) * fx;
            out[i] = top + (bottom - top) * fy;
        }
        out
    }
}

/// Inputs of one fragment invocation.
pub struct Fragment<'a> {
    /// Normalized coordinate into the input texture's backing store.
    pub uv: [f32; 2],
    /// Output position in device pixels of the bound surface.
    pub position: [f32; 2],
    /// Filter-specific parameters, as returned by `Filter::params`.
    pub params: &'a [f32],
    pub uniforms: &'a FilterUniforms,
    pub(crate) input: PixelView<'a>,
    pub(crate) back: Option<PixelView<'a>>,
}

impl Fragment<'_> {
    /// Sample the input texture.
    pub fn sample(&self, uv: [f32; 2]) -> [f32; 4] {
        self.input.sample(uv)
    }

    /// Sample the input texture with `uv` clamped to the valid frame region.
    pub fn sample_clamped(&self, uv: [f32; 2]) -> [f32; 4] {
        let c = self.uniforms.input_clamp;
        self.input
            .sample([uv[0].clamp(c[0], c[2]), uv[1].clamp(c[1], c[3])])
    }

    /// Sample the destination copy. Transparent when the frame has no back texture.
    pub fn sample_back(&self, uv: [f32; 2]) -> [f32; 4] {
        match self.back {
            Some(back) => back.sample(uv),
            None => [0.0; 4],
        }
    }

    pub fn param(&self, idx: usize) -> f32 {
        self.params.get(idx).copied().unwrap_or(0.0)
    }
}

/// Compiled program pair attached to a filter.
///
/// Either half may be missing; a filter runs only on the backends whose half is present.
#[derive(Clone)]
pub struct FilterProgram {
    name: Cow<'static, str>,
    cpu: Option<Rc<dyn CpuShader>>,
    wgsl: Option<Cow<'static, str>>,
}

impl fmt::Debug for FilterProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterProgram")
            .field("name", &self.name)
            .field("cpu", &self.cpu.is_some())
            .field("wgsl", &self.wgsl.is_some())
            .finish()
    }
}

impl FilterProgram {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            cpu: None,
            wgsl: None,
        }
    }

    pub fn with_cpu(mut self, shader: impl CpuShader + 'static) -> Self {
        self.cpu = Some(Rc::new(shader));
        self
    }

    /// Attach a WGSL fragment stage. The source must define
    /// `fn fs_main(in: VsOut) -> @location(0) vec4<f32>`; bindings and the vertex stage come from
    /// the GPU backend's prelude.
    pub fn with_wgsl(mut self, source: impl Into<Cow<'static, str>>) -> Self {
        self.wgsl = Some(source.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cpu(&self) -> Option<&dyn CpuShader> {
        self.cpu.as_deref()
    }

    pub fn wgsl(&self) -> Option<&str> {
        self.wgsl.as_deref()
    }

    /// Backends this program can run on.
    pub fn compatible_renderers(&self) -> RendererMask {
        let mut mask = RendererMask::empty();
        if self.cpu.is_some() {
            mask |= RendererMask::CPU;
        }
        if self.wgsl.is_some() {
            mask |= RendererMask::GPU;
        }
        mask
    }
}

impl<F> CpuShader for F
where
    F: Fn(&Fragment<'_>) -> [f32; 4],
{
    fn fragment(&self, frag: &Fragment<'_>) -> [f32; 4] {
        self(frag)
    }
}
