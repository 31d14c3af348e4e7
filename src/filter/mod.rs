//! The filter contract: settings negotiated per frame, the program a filter runs, and the
//! [`Filter`] trait the pipeline drives.

pub mod parse;
pub mod program;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::foundation::error::{FxError, FxResult};
use crate::render::backend::{RenderSurface, RendererKind};
use crate::system::FilterPassContext;
use crate::texture::Texture;

pub use program::{CpuShader, FilterProgram, Fragment, PixelView};

/// Render resolution a filter asks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ResolutionRepr", into = "ResolutionRepr")]
pub enum Resolution {
    /// Follow the root render target.
    #[default]
    Inherit,
    /// Device pixels per logical unit.
    Value(f64),
}

impl Resolution {
    pub fn resolve(self, root: f64) -> f64 {
        match self {
            Self::Inherit => root,
            Self::Value(v) => v,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum ResolutionRepr {
    Value(f64),
    Keyword(String),
}

impl TryFrom<ResolutionRepr> for Resolution {
    type Error = String;

    fn try_from(repr: ResolutionRepr) -> Result<Self, Self::Error> {
        match repr {
            ResolutionRepr::Value(v) if v.is_finite() && v > 0.0 => Ok(Self::Value(v)),
            ResolutionRepr::Value(v) => Err(format!("resolution must be finite and > 0, got {v}")),
            ResolutionRepr::Keyword(k) if k.eq_ignore_ascii_case("inherit") => Ok(Self::Inherit),
            ResolutionRepr::Keyword(k) => Err(format!("unknown resolution keyword '{k}'")),
        }
    }
}

impl From<Resolution> for ResolutionRepr {
    fn from(r: Resolution) -> Self {
        match r {
            Resolution::Inherit => Self::Keyword("inherit".to_owned()),
            Resolution::Value(v) => Self::Value(v),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Antialias {
    On,
    #[default]
    Off,
    /// Follow the root render target.
    Inherit,
}

/// How a filter's output is combined with the surface it is drawn onto.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    #[default]
    Normal,
    Add,
    Multiply,
    Screen,
    Erase,
}

bitflags::bitflags! {
    /// Set of render backends a filter can run on.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct RendererMask: u8 {
        const CPU = 1 << 0;
        const GPU = 1 << 1;
    }
}

impl RendererMask {
    pub fn supports(self, kind: RendererKind) -> bool {
        self.contains(kind.into())
    }
}

impl From<RendererKind> for RendererMask {
    fn from(kind: RendererKind) -> Self {
        match kind {
            RendererKind::Cpu => Self::CPU,
            RendererKind::Gpu => Self::GPU,
        }
    }
}

/// What the canvas fallback can do with a filter.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasCapability {
    /// Folded into the context's global alpha.
    AlphaMultiply(f32),
    /// Native canvas filter function, e.g. `blur(4px)`.
    Native(String),
    /// No canvas equivalent; the filter is dropped with a warning.
    Unsupported,
}

/// Per-filter knobs read by frame negotiation.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Extra logical units added on every side of the captured area.
    pub padding: f64,
    pub resolution: Resolution,
    pub antialias: Antialias,
    pub blend_mode: BlendMode,
    /// Disabled filters are skipped as if absent.
    pub enabled: bool,
    /// The filter samples what was already drawn behind the subtree.
    pub blend_required: bool,
    /// Allow the captured area to be clipped to the visible viewport.
    pub clip_to_viewport: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            padding: 0.0,
            resolution: Resolution::Inherit,
            antialias: Antialias::Off,
            blend_mode: BlendMode::Normal,
            enabled: true,
            blend_required: false,
            clip_to_viewport: true,
        }
    }
}

/// Interior-mutable settings cell shared by the built-in filters.
///
/// Filters are held as `Rc<dyn Filter>` by scene nodes, so settings are changed through `&self`.
#[derive(Debug, Default)]
pub struct FilterState(Cell<FilterSettings>);

impl FilterState {
    pub fn new(settings: FilterSettings) -> Self {
        Self(Cell::new(settings))
    }

    pub fn get(&self) -> FilterSettings {
        self.0.get()
    }

    pub fn set(&self, settings: FilterSettings) {
        self.0.set(settings);
    }

    pub fn update(&self, f: impl FnOnce(&mut FilterSettings)) {
        let mut s = self.0.get();
        f(&mut s);
        self.0.set(s);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.update(|s| s.enabled = enabled);
    }

    pub fn set_padding(&self, padding: f64) {
        self.update(|s| s.padding = padding);
    }

    pub fn set_resolution(&self, resolution: Resolution) {
        self.update(|s| s.resolution = resolution);
    }

    pub fn set_blend_mode(&self, blend_mode: BlendMode) {
        self.update(|s| s.blend_mode = blend_mode);
    }
}

/// Upcast helper so default trait methods can hand `self` to the pipeline as `&dyn Filter`.
pub trait AsDynFilter {
    fn as_dyn_filter(&self) -> &dyn Filter;
}

impl<T: Filter> AsDynFilter for T {
    fn as_dyn_filter(&self) -> &dyn Filter {
        self
    }
}

/// A post-processing effect applied to the pixels of a subtree.
///
/// The default [`Filter::apply`] runs the filter's own program once. Composite filters (a blur
/// built from a horizontal and a vertical pass, say) override it and chain sub-passes through
/// the same context, borrowing scratch textures from its pool.
pub trait Filter: AsDynFilter {
    fn settings(&self) -> FilterSettings;

    fn program(&self) -> &FilterProgram;

    /// Parameter block uploaded next to the shared uniforms.
    fn params(&self) -> Vec<f32> {
        Vec::new()
    }

    fn label(&self) -> &str {
        self.program().name()
    }

    fn compatible_renderers(&self) -> RendererMask {
        self.program().compatible_renderers()
    }

    fn canvas_capability(&self) -> CanvasCapability {
        CanvasCapability::Unsupported
    }

    fn apply(
        &self,
        ctx: &mut dyn FilterPassContext,
        input: &Texture,
        output: &RenderSurface,
        clear: bool,
    ) -> FxResult<()> {
        ctx.apply_filter(self.as_dyn_filter(), input, output, clear)
    }
}

/// A leaf filter built directly from a program and a parameter block.
pub struct ShaderFilter {
    state: FilterState,
    program: FilterProgram,
    params: RefCell<Vec<f32>>,
}

impl ShaderFilter {
    pub fn new(program: FilterProgram, params: Vec<f32>) -> Self {
        Self {
            state: FilterState::default(),
            program,
            params: RefCell::new(params),
        }
    }

    pub fn with_settings(self, settings: FilterSettings) -> Self {
        self.state.set(settings);
        self
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn set_params(&self, params: Vec<f32>) {
        *self.params.borrow_mut() = params;
    }

    pub fn into_rc(self) -> Rc<dyn Filter> {
        Rc::new(self)
    }
}

impl Filter for ShaderFilter {
    fn settings(&self) -> FilterSettings {
        self.state.get()
    }

    fn program(&self) -> &FilterProgram {
        &self.program
    }

    fn params(&self) -> Vec<f32> {
        self.params.borrow().clone()
    }
}

pub(crate) fn validate_settings(settings: &FilterSettings) -> FxResult<()> {
    if !settings.padding.is_finite() || settings.padding < 0.0 {
        return Err(FxError::validation("filter padding must be finite and >= 0"));
    }
    if let Resolution::Value(v) = settings.resolution
        && (!v.is_finite() || v <= 0.0)
    {
        return Err(FxError::validation("filter resolution must be finite and > 0"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/filter/mod.rs"]
mod tests;
