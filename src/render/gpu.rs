use std::collections::HashMap;
use std::num::NonZeroU64;

use crate::effects::internal::fill_program;
use crate::filter::{BlendMode, FilterProgram};
use crate::foundation::core::{Rect, Rgba8Premul, Vec2};
use crate::foundation::error::{FxError, FxResult};
use crate::render::backend::{FilterBackend, FilterPass, FrameRGBA, RenderSurface, RendererKind};
use crate::system::uniforms::FilterUniforms;
use crate::texture::{Texture, TextureId};

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Filter parameters available to WGSL through `param(i)`.
pub const MAX_GPU_PARAMS: usize = 32;
const PARAMS_BYTES: u64 = (MAX_GPU_PARAMS * 4) as u64;

/// Bindings, vertex stage and sampling helpers shared by every filter program.
const PRELUDE_WGSL: &str = r#"
struct FilterGlobals {
    input_size: vec4<f32>,
    input_pixel: vec4<f32>,
    input_clamp: vec4<f32>,
    output_frame: vec4<f32>,
    global_frame: vec4<f32>,
    output_texture: vec4<f32>,
};

struct FilterParams {
    v: array<vec4<f32>, 8>,
};

@group(0) @binding(0) var<uniform> globals: FilterGlobals;
@group(0) @binding(1) var input_tex: texture_2d<f32>;
@group(0) @binding(2) var input_smp: sampler;
@group(0) @binding(3) var back_tex: texture_2d<f32>;
@group(0) @binding(4) var<uniform> params: FilterParams;

struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> VsOut {
    let corner = vec2<f32>(f32(vi & 1u), f32((vi >> 1u) & 1u));
    let pos = corner * globals.output_frame.zw + globals.output_frame.xy;
    let ot = globals.output_texture.xy;
    var o: VsOut;
    o.position = vec4<f32>(pos.x * 2.0 / ot.x - 1.0, 1.0 - pos.y * 2.0 / ot.y, 0.0, 1.0);
    o.uv = corner * (globals.output_frame.zw * globals.input_size.zw);
    return o;
}

fn param(i: u32) -> f32 {
    return params.v[i / 4u][i % 4u];
}

fn sample_input(uv: vec2<f32>) -> vec4<f32> {
    return textureSampleLevel(input_tex, input_smp, uv, 0.0);
}

fn sample_clamped(uv: vec2<f32>) -> vec4<f32> {
    return sample_input(clamp(uv, globals.input_clamp.xy, globals.input_clamp.zw));
}

fn sample_back(uv: vec2<f32>) -> vec4<f32> {
    return textureSampleLevel(back_tex, input_smp, uv, 0.0);
}
"#;

/// Options for the wgpu backend.
#[derive(Clone, Debug)]
pub struct GpuBackendOpts {
    /// Root surface width in device pixels.
    pub width: u32,
    /// Root surface height in device pixels.
    pub height: u32,
    pub resolution: f64,
    pub antialias: bool,
    pub use_back_buffer: bool,
    /// Straight-alpha colour the root starts with. Transparent when unset.
    pub clear_rgba: Option<[u8; 4]>,
}

impl Default for GpuBackendOpts {
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

impl GpuBackendOpts {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_back_buffer(mut self, use_back_buffer: bool) -> Self {
        self.use_back_buffer = use_back_buffer;
        self
    }

    pub fn with_clear_rgba(mut self, clear: Option<[u8; 4]>) -> Self {
        self.clear_rgba = clear;
        self
    }
}

struct GpuSurface {
    width: u32,
    height: u32,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

fn create_surface(device: &wgpu::Device, width: u32, height: u32, label: &str) -> GpuSurface {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuSurface {
        width,
        height,
        texture,
        view,
    }
}

fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    use wgpu::{BlendComponent, BlendFactor as F, BlendOperation, BlendState};

    let component = |src_factor, dst_factor| BlendComponent {
        src_factor,
        dst_factor,
        operation: BlendOperation::Add,
    };
    match mode {
        BlendMode::Normal => BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        BlendMode::Add => BlendState {
            color: component(F::One, F::One),
            alpha: component(F::One, F::One),
        },
        BlendMode::Multiply => BlendState {
            color: component(F::Dst, F::OneMinusSrcAlpha),
            alpha: component(F::DstAlpha, F::OneMinusSrcAlpha),
        },
        BlendMode::Screen => BlendState {
            color: component(F::One, F::OneMinusSrc),
            alpha: component(F::One, F::OneMinusSrcAlpha),
        },
        BlendMode::Erase => BlendState {
            color: component(F::Zero, F::OneMinusSrcAlpha),
            alpha: component(F::Zero, F::OneMinusSrcAlpha),
        },
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

/// Clip a `len`-long span starting at `origin` of a source to `0..src_len`, and its destination
/// counterpart starting at `dst_origin` to `0..dst_len`. Returns `(src_start, dst_start, len)`.
fn clip_span(origin: i64, len: u32, src_len: u32, dst_origin: u32, dst_len: u32) -> (u32, u32, u32) {
    let skip = (-origin).max(0);
    let src_start = origin.max(0);
    let dst_start = i64::from(dst_origin) + skip;
    let end = (origin + i64::from(len))
        .min(i64::from(src_len))
        .min(src_start + i64::from(dst_len) - dst_start);
    let len = (end - src_start).max(0);
    (src_start as u32, dst_start.max(0) as u32, len as u32)
}

/// Hardware backend on wgpu. Every operation is submitted immediately, so
/// [`FilterBackend::finish_render_pass`] has nothing left to flush.
pub struct GpuBackend {
    opts: GpuBackendOpts,
    device: wgpu::Device,
    queue: wgpu::Queue,
    sampler: wgpu::Sampler,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    globals: wgpu::Buffer,
    params: wgpu::Buffer,
    dummy: GpuSurface,
    root: GpuSurface,
    textures: HashMap<TextureId, GpuSurface>,
    pipelines: HashMap<(String, BlendMode), wgpu::RenderPipeline>,
    fill: FilterProgram,
    bound: RenderSurface,
    offsets: Vec<Vec2>,
}

impl GpuBackend {
    /// Acquire an adapter and device and allocate the root surface.
    ///
    /// Fails with [`FxError::Backend`] when no adapter is available.
    pub fn new(opts: GpuBackendOpts) -> FxResult<Self> {
        if opts.width == 0 || opts.height == 0 {
            return Err(FxError::validation("root surface dimensions must be > 0"));
        }
        if !opts.resolution.is_finite() || opts.resolution <= 0.0 {
            return Err(FxError::validation(
                "root resolution must be finite and > 0",
            ));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                FxError::backend("no gpu adapter available")
            }
            other => FxError::backend(format!("wgpu request_adapter failed: {other:?}")),
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("scenefx_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| FxError::backend(format!("wgpu request_device failed: {e:?}")))?;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("scenefx_filter_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniform_entry = |binding, size: u64| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: NonZeroU64::new(size),
            },
            count: None,
        };
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scenefx_filter_bgl"),
            entries: &[
                uniform_entry(0, FilterUniforms::SIZE as u64),
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                texture_entry(3),
                uniform_entry(4, PARAMS_BYTES),
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scenefx_filter_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let uniform_buffer = |label, size| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let globals = uniform_buffer("scenefx_filter_globals", FilterUniforms::SIZE as u64);
        let params = uniform_buffer("scenefx_filter_params", PARAMS_BYTES);

        let dummy = create_surface(&device, 1, 1, "scenefx_dummy");
        let root = create_surface(&device, opts.width, opts.height, "scenefx_root");

        let backend = Self {
            opts,
            device,
            queue,
            sampler,
            bind_group_layout,
            pipeline_layout,
            globals,
            params,
            dummy,
            root,
            textures: HashMap::new(),
            pipelines: HashMap::new(),
            fill: fill_program(),
            bound: RenderSurface::Root,
            offsets: Vec::new(),
        };

        let clear = match backend.opts.clear_rgba {
            Some([r, g, b, a]) => {
                let [r, g, b, a] = Rgba8Premul::from_straight_rgba(r, g, b, a).to_f32();
                wgpu::Color {
                    r: f64::from(r),
                    g: f64::from(g),
                    b: f64::from(b),
                    a: f64::from(a),
                }
            }
            None => wgpu::Color::TRANSPARENT,
        };
        backend.clear_surface(&RenderSurface::Root, clear)?;
        tracing::debug!(
            width = backend.opts.width,
            height = backend.opts.height,
            "gpu filter backend ready"
        );
        Ok(backend)
    }

    pub fn opts(&self) -> &GpuBackendOpts {
        &self.opts
    }

    /// Render pipelines compiled so far.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    fn ensure(&mut self, texture: &Texture) {
        let (w, h) = (texture.source.pixel_width, texture.source.pixel_height);
        let stale = self
            .textures
            .get(&texture.id())
            .is_none_or(|s| s.width != w || s.height != h);
        if stale {
            let surface = create_surface(&self.device, w, h, "scenefx_texture");
            if let Some(old) = self.textures.insert(texture.id(), surface) {
                old.texture.destroy();
            }
        }
    }

    fn surface(&self, surface: &RenderSurface) -> FxResult<&GpuSurface> {
        match surface {
            RenderSurface::Root => Ok(&self.root),
            RenderSurface::Texture(t) => self
                .textures
                .get(&t.id())
                .ok_or_else(|| FxError::backend(format!("texture {:?} has no storage", t.id()))),
        }
    }

    fn surface_resolution(&self, surface: &RenderSurface) -> f64 {
        surface
            .texture()
            .map_or(self.opts.resolution, Texture::resolution)
    }

    fn ensure_pipeline(&mut self, program: &FilterProgram, blend: BlendMode) -> FxResult<()> {
        let wgsl = program.wgsl().ok_or_else(|| {
            FxError::backend(format!(
                "filter program '{}' has no WGSL implementation",
                program.name()
            ))
        })?;
        let key = (wgsl.to_owned(), blend);
        if self.pipelines.contains_key(&key) {
            return Ok(());
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let source = format!("{PRELUDE_WGSL}\n{wgsl}");
        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(program.name()),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(program.name()),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend: Some(blend_state(blend)),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(FxError::backend(format!(
                "filter program '{}' failed to compile: {err}",
                program.name()
            )));
        }

        tracing::debug!(program = program.name(), ?blend, "compiled filter pipeline");
        self.pipelines.insert(key, pipeline);
        Ok(())
    }

    fn clear_surface(&self, surface: &RenderSurface, color: wgpu::Color) -> FxResult<()> {
        let target = self.surface(surface)?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scenefx_clear_encoder"),
            });
        {
            let _rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scenefx_clear_rp"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    /// Draw one quad into the bound surface. The program's pipeline must already exist.
    fn draw_quad(
        &self,
        program: &FilterProgram,
        blend: BlendMode,
        uniforms: &FilterUniforms,
        params: &[f32],
        input: Option<&Texture>,
        back: Option<&Texture>,
    ) -> FxResult<()> {
        if params.len() > MAX_GPU_PARAMS {
            return Err(FxError::validation(format!(
                "filter program '{}' passes {} params, the gpu backend accepts {MAX_GPU_PARAMS}",
                program.name(),
                params.len()
            )));
        }
        let wgsl = program.wgsl().unwrap_or_default();
        let pipeline = self
            .pipelines
            .get(&(wgsl.to_owned(), blend))
            .ok_or_else(|| FxError::backend("filter pipeline was not compiled"))?;

        let target = self.surface(&self.bound)?;
        let input = match input {
            Some(t) => self.surface(&RenderSurface::Texture(t.clone()))?,
            None => &self.dummy,
        };
        let back = match back {
            Some(t) => self.surface(&RenderSurface::Texture(t.clone()))?,
            None => &self.dummy,
        };

        let res = self.surface_resolution(&self.bound);
        let vw = (f64::from(uniforms.output_texture[0]) * res).min(f64::from(target.width));
        let vh = (f64::from(uniforms.output_texture[1]) * res).min(f64::from(target.height));
        if vw <= 0.0 || vh <= 0.0 {
            return Ok(());
        }

        let mut param_bytes = [0u8; PARAMS_BYTES as usize];
        for (chunk, v) in param_bytes.chunks_exact_mut(4).zip(params) {
            chunk.copy_from_slice(&v.to_le_bytes());
        }
        self.queue
            .write_buffer(&self.globals, 0, &uniforms.to_le_bytes());
        self.queue.write_buffer(&self.params, 0, &param_bytes);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scenefx_filter_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.globals.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&input.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&back.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: self.params.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scenefx_filter_encoder"),
            });
        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scenefx_filter_rp"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rp.set_viewport(0.0, 0.0, vw as f32, vh as f32, 0.0, 1.0);
            rp.set_pipeline(pipeline);
            rp.set_bind_group(0, &bind_group, &[]);
            rp.draw(0..4, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }
}

impl FilterBackend for GpuBackend {
    fn kind(&self) -> RendererKind {
        RendererKind::Gpu
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
        if let RenderSurface::Texture(t) = surface {
            self.ensure(t);
        }
        if clear {
            self.clear_surface(surface, wgpu::Color::TRANSPARENT)?;
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
        if let RenderSurface::Texture(t) = src {
            self.ensure(t);
        }
        self.ensure(dst);

        let src_surface = self.surface(src)?;
        let dst_surface = self.surface(&RenderSurface::Texture(dst.clone()))?;

        let (sx, dx, w) = clip_span(
            src_origin_px.0,
            size_px.0,
            src_surface.width,
            dst_origin_px.0,
            dst_surface.width,
        );
        let (sy, dy, h) = clip_span(
            src_origin_px.1,
            size_px.1,
            src_surface.height,
            dst_origin_px.1,
            dst_surface.height,
        );

        // Requested pixels outside the source read as transparent.
        if w != size_px.0 || h != size_px.1 {
            let zw = size_px.0.min(dst_surface.width.saturating_sub(dst_origin_px.0));
            let zh = size_px.1.min(dst_surface.height.saturating_sub(dst_origin_px.1));
            if zw > 0 && zh > 0 {
                let zeros = vec![0u8; (zw as usize) * (zh as usize) * 4];
                self.queue.write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: &dst_surface.texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d {
                            x: dst_origin_px.0,
                            y: dst_origin_px.1,
                            z: 0,
                        },
                        aspect: wgpu::TextureAspect::All,
                    },
                    &zeros,
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(zw * 4),
                        rows_per_image: Some(zh),
                    },
                    wgpu::Extent3d {
                        width: zw,
                        height: zh,
                        depth_or_array_layers: 1,
                    },
                );
            }
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scenefx_copy_encoder"),
            });
        if w > 0 && h > 0 {
            encoder.copy_texture_to_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &src_surface.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d { x: sx, y: sy, z: 0 },
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyTextureInfo {
                    texture: &dst_surface.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d { x: dx, y: dy, z: 0 },
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::Extent3d {
                    width: w,
                    height: h,
                    depth_or_array_layers: 1,
                },
            );
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn draw_filter_pass(&mut self, pass: &FilterPass<'_>) -> FxResult<()> {
        if self
            .bound
            .texture()
            .is_some_and(|t| t.id() == pass.input.id())
        {
            return Err(FxError::backend(
                "filter pass reads from the surface it draws into",
            ));
        }
        self.ensure(pass.input);
        if let Some(back) = pass.back {
            self.ensure(back);
        }
        self.ensure_pipeline(pass.program, pass.blend_mode)?;
        self.draw_quad(
            pass.program,
            pass.blend_mode,
            &pass.uniforms,
            pass.params,
            Some(pass.input),
            pass.back,
        )
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba8Premul) -> FxResult<()> {
        let r = rect - self.offsets.last().copied().unwrap_or(Vec2::ZERO);
        let size = self
            .bound
            .texture()
            .map_or_else(|| self.root_size(), Texture::size);

        let uniforms = FilterUniforms {
            input_size: [1.0; 4],
            output_frame: [r.x0 as f32, r.y0 as f32, r.width() as f32, r.height() as f32],
            output_texture: [
                size.width as f32,
                size.height as f32,
                if self.bound.is_root() { -1.0 } else { 1.0 },
                0.0,
            ],
            ..FilterUniforms::default()
        };

        let fill = self.fill.clone();
        self.ensure_pipeline(&fill, BlendMode::Normal)?;
        self.draw_quad(
            &fill,
            BlendMode::Normal,
            &uniforms,
            &color.to_f32(),
            None,
            None,
        )
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
        self.ensure(texture);
        let surface = self.surface(&RenderSurface::Texture(texture.clone()))?;
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &surface.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(w * 4),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn read_pixels(&mut self, surface: &RenderSurface) -> FxResult<FrameRGBA> {
        if let RenderSurface::Texture(t) = surface {
            self.ensure(t);
        }
        let target = self.surface(surface)?;
        let (width, height) = (target.width, target.height);

        let bytes_per_row = align_to(width * 4, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scenefx_readback"),
            size: u64::from(bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scenefx_readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| FxError::backend(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| FxError::backend("readback channel closed"))?
            .map_err(|e| FxError::backend(format!("readback map failed: {e:?}")))?;

        let mapped = slice.get_mapped_range();
        let row_bytes = (width as usize) * 4;
        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * bytes_per_row as usize;
            data.extend_from_slice(&mapped[start..start + row_bytes]);
        }
        drop(mapped);
        readback.unmap();

        Ok(FrameRGBA {
            width,
            height,
            data,
            premultiplied: true,
        })
    }

    fn destroy_texture(&mut self, texture: &Texture) {
        if let Some(surface) = self.textures.remove(&texture.id()) {
            surface.texture.destroy();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/gpu.rs"]
mod tests;
