//! Filter pipeline for 2D scene-graph renderers.
//!
//! A filtered subtree is captured into a pooled offscreen texture on [`FilterSystem::push`] and
//! drawn back through its filter chain on [`FilterSystem::pop`]. Chains run on the software
//! [`CpuBackend`] by default, or on the wgpu backend with the `gpu` feature. Backends without a
//! shader stage use [`CanvasFilterSystem`] instead.
#![forbid(unsafe_code)]

mod foundation;

pub mod canvas;
pub mod effects;
pub mod filter;
pub mod render;
pub mod scene;
pub mod system;
pub mod texture;

pub use canvas::{CanvasContext, CanvasFilterSystem, CanvasState};
pub use filter::{
    Antialias, BlendMode, CanvasCapability, Filter, FilterProgram, FilterSettings, FilterState,
    Resolution, RendererMask, ShaderFilter,
};
pub use foundation::bounds::Bounds;
pub use foundation::core::{Affine, Point, Rect, Rgba8Premul, Size, Vec2};
pub use foundation::error::{FxError, FxResult};
pub use render::cpu::{CpuBackend, CpuBackendOpts};
#[cfg(feature = "gpu")]
pub use render::gpu::{GpuBackend, GpuBackendOpts};
pub use render::{FilterBackend, FrameRGBA, RenderSurface, RendererKind};
pub use system::{FilterInstruction, FilterPassContext, FilterSystem, FilterSystemStats};
pub use texture::pool::{TexturePool, TexturePoolStats};
pub use texture::{Texture, TextureId, TextureSource};
