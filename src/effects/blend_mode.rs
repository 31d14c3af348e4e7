use std::cell::Cell;

use crate::filter::{CpuShader, Filter, FilterProgram, FilterSettings, FilterState, Fragment};

/// Separable blend functions a [`BlendModeFilter`] can composite with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeMode {
    #[default]
    Multiply,
    Screen,
    Darken,
    Lighten,
    Difference,
}

impl CompositeMode {
    fn index(self) -> f32 {
        match self {
            Self::Multiply => 0.0,
            Self::Screen => 1.0,
            Self::Darken => 2.0,
            Self::Lighten => 3.0,
            Self::Difference => 4.0,
        }
    }

    fn from_index(i: f32) -> Self {
        match i as u32 {
            1 => Self::Screen,
            2 => Self::Darken,
            3 => Self::Lighten,
            4 => Self::Difference,
            _ => Self::Multiply,
        }
    }

    /// `B(cb, cs)` on unpremultiplied channels.
    pub fn blend(self, cb: f32, cs: f32) -> f32 {
        match self {
            Self::Multiply => cb * cs,
            Self::Screen => cb + cs - cb * cs,
            Self::Darken => cb.min(cs),
            Self::Lighten => cb.max(cs),
            Self::Difference => (cb - cs).abs(),
        }
    }
}

const BLEND_MODE_WGSL: &str = r#"
fn blend_channel(mode: u32, cb: vec3<f32>, cs: vec3<f32>) -> vec3<f32> {
    var mixed = cb * cs;
    switch mode {
        case 1u: { mixed = cb + cs - cb * cs; }
        case 2u: { mixed = min(cb, cs); }
        case 3u: { mixed = max(cb, cs); }
        case 4u: { mixed = abs(cb - cs); }
        default: {}
    }
    return mixed;
}

fn unpremultiply(c: vec4<f32>) -> vec3<f32> {
    if (c.a > 0.0) {
        return c.rgb / c.a;
    }
    return vec3<f32>(0.0);
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let front = sample_input(in.uv);
    let back = sample_back(in.uv);
    let mixed = blend_channel(u32(param(0u)), unpremultiply(back), unpremultiply(front));
    let rgb = (1.0 - back.a) * front.rgb + (1.0 - front.a) * back.rgb + front.a * back.a * mixed;
    return vec4<f32>(rgb, front.a + back.a * (1.0 - front.a));
}
"#;

struct BlendModeShader;

impl CpuShader for BlendModeShader {
    fn fragment(&self, f: &Fragment<'_>) -> [f32; 4] {
        let mode = CompositeMode::from_index(f.param(0));
        let front = f.sample(f.uv);
        let back = f.sample_back(f.uv);
        let (fa, ba) = (front[3], back[3]);
        let unpremul = |c: f32, a: f32| if a > 0.0 { c / a } else { 0.0 };

        let mut out = [0.0f32; 4];
        for i in 0..3 {
            let mixed = mode.blend(unpremul(back[i], ba), unpremul(front[i], fa));
            out[i] = (1.0 - ba) * front[i] + (1.0 - fa) * back[i] + fa * ba * mixed;
        }
        out[3] = fa + ba * (1.0 - fa);
        out
    }
}

/// Composites the captured subtree against what was already drawn behind it.
///
/// Needs a destination copy, so it only runs on backends with a back buffer.
pub struct BlendModeFilter {
    state: FilterState,
    mode: Cell<CompositeMode>,
    program: FilterProgram,
}

impl BlendModeFilter {
    pub fn new(mode: CompositeMode) -> Self {
        Self {
            state: FilterState::new(FilterSettings {
                blend_required: true,
                ..FilterSettings::default()
            }),
            mode: Cell::new(mode),
            program: FilterProgram::new("blend-mode")
                .with_cpu(BlendModeShader)
                .with_wgsl(BLEND_MODE_WGSL),
        }
    }

    pub fn mode(&self) -> CompositeMode {
        self.mode.get()
    }

    pub fn set_mode(&self, mode: CompositeMode) {
        self.mode.set(mode);
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }
}

impl Filter for BlendModeFilter {
    fn settings(&self) -> FilterSettings {
        self.state.get()
    }

    fn program(&self) -> &FilterProgram {
        &self.program
    }

    fn params(&self) -> Vec<f32> {
        vec![self.mode.get().index()]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blend_mode.rs"]
mod tests;
