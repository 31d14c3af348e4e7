use std::cell::Cell;

use crate::filter::{
    BlendMode, CanvasCapability, CpuShader, Filter, FilterProgram, FilterSettings, FilterState,
    Fragment,
};
use crate::foundation::error::{FxError, FxResult};
use crate::render::backend::RenderSurface;
use crate::system::FilterPassContext;
use crate::texture::Texture;

/// Half-kernels (outermost tap first, centre tap last) for the supported odd kernel sizes.
const GAUSSIAN_HALF_KERNELS: [(u32, &[f32]); 6] = [
    (5, &[0.153388, 0.221461, 0.250301]),
    (7, &[0.071303, 0.131514, 0.189879, 0.214607]),
    (9, &[0.028532, 0.067234, 0.124009, 0.179044, 0.20236]),
    (11, &[0.0093, 0.028002, 0.065984, 0.121703, 0.175713, 0.198596]),
    (13, &[0.002406, 0.009255, 0.027867, 0.065666, 0.121117, 0.174868, 0.197641]),
    (15, &[0.000489, 0.002403, 0.009246, 0.02784, 0.065602, 0.120999, 0.174697, 0.197448]),
];

/// Full symmetric tap weights for `kernel_size`.
pub(crate) fn kernel_weights(kernel_size: u32) -> FxResult<Vec<f32>> {
    let Some((_, half)) = GAUSSIAN_HALF_KERNELS
        .iter()
        .find(|(size, _)| *size == kernel_size)
    else {
        return Err(FxError::validation(format!(
            "blur kernel size must be one of 5, 7, 9, 11, 13, 15 (got {kernel_size})"
        )));
    };
    let mut weights = half.to_vec();
    weights.extend(half.iter().rev().skip(1));
    Ok(weights)
}

const BLUR_WGSL: &str = r#"
@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let dir = vec2<f32>(param(0u), param(1u));
    let step = dir * param(2u) * globals.input_size.zw;
    let taps = u32(param(3u));
    let half = f32(taps / 2u);
    var color = vec4<f32>(0.0);
    for (var i = 0u; i < taps; i = i + 1u) {
        let uv = in.uv + step * (f32(i) - half);
        color = color + sample_input(uv) * param(4u + i);
    }
    return color;
}
"#;

struct BlurShader;

impl CpuShader for BlurShader {
    fn fragment(&self, f: &Fragment<'_>) -> [f32; 4] {
        let strength = f.param(2);
        let step = [
            f.param(0) * strength * f.uniforms.input_size[2],
            f.param(1) * strength * f.uniforms.input_size[3],
        ];
        let taps = f.param(3) as usize;
        let half = (taps / 2) as f32;

        let mut acc = [0.0f32; 4];
        for i in 0..taps {
            let k = i as f32 - half;
            let c = f.sample([f.uv[0] + step[0] * k, f.uv[1] + step[1] * k]);
            let w = f.param(4 + i);
            for (a, c) in acc.iter_mut().zip(c) {
                *a += c * w;
            }
        }
        acc
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlurAxis {
    Horizontal,
    Vertical,
}

/// One-dimensional gaussian blur.
///
/// `strength` is the tap spacing in logical units, split evenly over `passes` ping-ponged
/// applications.
pub struct BlurPass {
    state: FilterState,
    axis: BlurAxis,
    strength: Cell<f32>,
    passes: Cell<u32>,
    weights: Vec<f32>,
    pass_strength: Cell<f32>,
    program: FilterProgram,
}

impl BlurPass {
    pub fn new(axis: BlurAxis, strength: f32, passes: u32, kernel_size: u32) -> FxResult<Self> {
        if !strength.is_finite() {
            return Err(FxError::validation("blur strength must be finite"));
        }
        let pass = Self {
            state: FilterState::default(),
            axis,
            strength: Cell::new(strength),
            passes: Cell::new(passes.max(1)),
            weights: kernel_weights(kernel_size)?,
            pass_strength: Cell::new(strength),
            program: FilterProgram::new(match axis {
                BlurAxis::Horizontal => "blur-x",
                BlurAxis::Vertical => "blur-y",
            })
            .with_cpu(BlurShader)
            .with_wgsl(BLUR_WGSL),
        };
        pass.update_padding();
        Ok(pass)
    }

    fn update_padding(&self) {
        self.state
            .set_padding(1.0 + f64::from(self.strength.get().abs()) * 2.0);
    }

    pub fn axis(&self) -> BlurAxis {
        self.axis
    }

    pub fn strength(&self) -> f32 {
        self.strength.get()
    }

    pub fn set_strength(&self, strength: f32) {
        self.strength.set(strength);
        self.update_padding();
    }

    pub fn passes(&self) -> u32 {
        self.passes.get()
    }

    pub fn set_passes(&self, passes: u32) {
        self.passes.set(passes.max(1));
    }

    pub fn kernel_size(&self) -> usize {
        self.weights.len()
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    fn ping_pong(
        &self,
        ctx: &mut dyn FilterPassContext,
        input: &Texture,
        temp: &Texture,
        output: &RenderSurface,
        clear: bool,
    ) -> FxResult<()> {
        let mut flip = input;
        let mut flop = temp;
        for _ in 0..self.passes.get() - 1 {
            ctx.apply_filter(self, flip, &RenderSurface::Texture(flop.clone()), true)?;
            std::mem::swap(&mut flip, &mut flop);
        }
        ctx.apply_filter(self, flip, output, clear)
    }
}

impl Filter for BlurPass {
    fn settings(&self) -> FilterSettings {
        self.state.get()
    }

    fn program(&self) -> &FilterProgram {
        &self.program
    }

    fn params(&self) -> Vec<f32> {
        let dir = match self.axis {
            BlurAxis::Horizontal => [1.0, 0.0],
            BlurAxis::Vertical => [0.0, 1.0],
        };
        let mut params = Vec::with_capacity(4 + self.weights.len());
        params.extend_from_slice(&dir);
        params.push(self.pass_strength.get());
        params.push(self.weights.len() as f32);
        params.extend_from_slice(&self.weights);
        params
    }

    fn canvas_capability(&self) -> CanvasCapability {
        CanvasCapability::Native(format!("blur({}px)", self.strength.get().abs()))
    }

    fn apply(
        &self,
        ctx: &mut dyn FilterPassContext,
        input: &Texture,
        output: &RenderSurface,
        clear: bool,
    ) -> FxResult<()> {
        let passes = self.passes.get();
        self.pass_strength.set(self.strength.get() / passes as f32);
        if passes == 1 {
            return ctx.apply_filter(self, input, output, clear);
        }

        let temp = ctx.texture_pool().get_same_size_texture(input, false);
        let result = self.ping_pong(ctx, input, &temp, output, clear);
        ctx.texture_pool().return_texture(temp);
        result
    }
}

/// Two-axis gaussian blur: a horizontal pass into a scratch texture, then a vertical pass into
/// the output. An axis with zero strength is skipped.
pub struct BlurFilter {
    state: FilterState,
    blur_x: BlurPass,
    blur_y: BlurPass,
}

impl BlurFilter {
    pub fn new(strength: f32, quality: u32) -> FxResult<Self> {
        Self::with_axes(strength, strength, quality, 5)
    }

    pub fn with_axes(
        strength_x: f32,
        strength_y: f32,
        quality: u32,
        kernel_size: u32,
    ) -> FxResult<Self> {
        let filter = Self {
            state: FilterState::default(),
            blur_x: BlurPass::new(BlurAxis::Horizontal, strength_x, quality, kernel_size)?,
            blur_y: BlurPass::new(BlurAxis::Vertical, strength_y, quality, kernel_size)?,
        };
        filter.update_padding();
        Ok(filter)
    }

    fn update_padding(&self) {
        let max = self.blur_x.strength().abs().max(self.blur_y.strength().abs());
        self.state.set_padding(f64::from(max) * 2.0);
    }

    pub fn strength_x(&self) -> f32 {
        self.blur_x.strength()
    }

    pub fn strength_y(&self) -> f32 {
        self.blur_y.strength()
    }

    pub fn set_strength(&self, strength: f32) {
        self.set_strength_xy(strength, strength);
    }

    pub fn set_strength_xy(&self, x: f32, y: f32) {
        self.blur_x.set_strength(x);
        self.blur_y.set_strength(y);
        self.update_padding();
    }

    pub fn quality(&self) -> u32 {
        self.blur_x.passes()
    }

    pub fn set_quality(&self, quality: u32) {
        self.blur_x.set_passes(quality);
        self.blur_y.set_passes(quality);
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }
}

impl Filter for BlurFilter {
    fn settings(&self) -> FilterSettings {
        self.state.get()
    }

    fn program(&self) -> &FilterProgram {
        self.blur_x.program()
    }

    fn label(&self) -> &str {
        "blur"
    }

    fn canvas_capability(&self) -> CanvasCapability {
        let max = self.blur_x.strength().abs().max(self.blur_y.strength().abs());
        CanvasCapability::Native(format!("blur({max}px)"))
    }

    fn apply(
        &self,
        ctx: &mut dyn FilterPassContext,
        input: &Texture,
        output: &RenderSurface,
        clear: bool,
    ) -> FxResult<()> {
        let blend_mode = self.state.get().blend_mode;
        let x = self.blur_x.strength().abs();
        let y = self.blur_y.strength().abs();

        if x > 0.0 && y > 0.0 {
            let temp = ctx.texture_pool().get_same_size_texture(input, false);
            self.blur_x.state().set_blend_mode(BlendMode::Normal);
            self.blur_y.state().set_blend_mode(blend_mode);
            let result =
                match self
                    .blur_x
                    .apply(ctx, input, &RenderSurface::Texture(temp.clone()), true)
                {
                    Ok(()) => self.blur_y.apply(ctx, &temp, output, clear),
                    Err(e) => Err(e),
                };
            ctx.texture_pool().return_texture(temp);
            result
        } else if y > 0.0 {
            self.blur_y.state().set_blend_mode(blend_mode);
            self.blur_y.apply(ctx, input, output, clear)
        } else {
            self.blur_x.state().set_blend_mode(blend_mode);
            self.blur_x.apply(ctx, input, output, clear)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
