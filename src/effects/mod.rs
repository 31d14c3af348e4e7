//! Built-in leaf filters.
//!
//! Every effect ships both program halves, so it runs on the CPU and the GPU backend alike.
//! WGSL sources only contain the fragment stage; the GPU backend prepends the shared prelude
//! (`FilterGlobals`, bindings, `param`, `sample_input`, `sample_clamped`, `sample_back`).

pub mod alpha;
pub mod blend_mode;
pub mod blur;
pub mod color_matrix;
pub(crate) mod internal;

pub use alpha::AlphaFilter;
pub use blend_mode::{BlendModeFilter, CompositeMode};
pub use blur::{BlurFilter, BlurPass};
pub use color_matrix::{ColorMatrix, ColorMatrixFilter, ColorPreset, IDENTITY_MATRIX};
