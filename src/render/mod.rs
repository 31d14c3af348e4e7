//! Render backends the filter system draws through.

pub mod backend;
pub(crate) mod blend;
pub mod cpu;
#[cfg(feature = "gpu")]
pub mod gpu;

pub use backend::{FilterBackend, FilterPass, FrameRGBA, RenderSurface, RendererKind};
