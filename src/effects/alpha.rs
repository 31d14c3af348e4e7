use std::cell::Cell;

use crate::filter::{
    CanvasCapability, Filter, FilterProgram, FilterSettings, FilterState, Fragment,
};

const ALPHA_WGSL: &str = r#"
@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return sample_input(in.uv) * param(0u);
}
"#;

/// Multiplies the captured subtree by a constant alpha.
///
/// Unlike setting a node's own alpha, overlapping children are flattened first, so the result
/// has no see-through seams.
pub struct AlphaFilter {
    state: FilterState,
    alpha: Cell<f32>,
    program: FilterProgram,
}

impl AlphaFilter {
    pub fn new(alpha: f32) -> Self {
        Self {
            state: FilterState::new(FilterSettings::default()),
            alpha: Cell::new(alpha.clamp(0.0, 1.0)),
            program: FilterProgram::new("alpha")
                .with_cpu(|f: &Fragment<'_>| f.sample(f.uv).map(|c| c * f.param(0)))
                .with_wgsl(ALPHA_WGSL),
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha.get()
    }

    pub fn set_alpha(&self, alpha: f32) {
        self.alpha.set(alpha.clamp(0.0, 1.0));
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }
}

impl Default for AlphaFilter {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Filter for AlphaFilter {
    fn settings(&self) -> FilterSettings {
        self.state.get()
    }

    fn program(&self) -> &FilterProgram {
        &self.program
    }

    fn params(&self) -> Vec<f32> {
        vec![self.alpha.get()]
    }

    fn canvas_capability(&self) -> CanvasCapability {
        CanvasCapability::AlphaMultiply(self.alpha.get())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/alpha.rs"]
mod tests;
