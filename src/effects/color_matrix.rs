use std::cell::Cell;

use crate::filter::{
    CanvasCapability, CpuShader, Filter, FilterProgram, FilterSettings, FilterState, Fragment,
};
use crate::foundation::error::{FxError, FxResult};

pub type ColorMatrix = [f32; 20];

pub const IDENTITY_MATRIX: ColorMatrix = [
    1.0, 0.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, 0.0,
];

/// Named matrices with a native canvas equivalent.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "preset", content = "amount", rename_all = "lowercase")]
pub enum ColorPreset {
    Brightness(f32),
    Grayscale(f32),
    Sepia(f32),
    Negative,
}

impl ColorPreset {
    /// Row-major 4x5 matrix; offsets are in `0.0..=1.0` units.
    pub fn matrix(self) -> ColorMatrix {
        match self {
            Self::Brightness(b) => [
                b, 0.0, 0.0, 0.0, 0.0, //
                0.0, b, 0.0, 0.0, 0.0, //
                0.0, 0.0, b, 0.0, 0.0, //
                0.0, 0.0, 0.0, 1.0, 0.0,
            ],
            Self::Grayscale(amount) => {
                let s = 1.0 - amount.clamp(0.0, 1.0);
                [
                    0.2126 + 0.7874 * s,
                    0.7152 - 0.7152 * s,
                    0.0722 - 0.0722 * s,
                    0.0,
                    0.0,
                    0.2126 - 0.2126 * s,
                    0.7152 + 0.2848 * s,
                    0.0722 - 0.0722 * s,
                    0.0,
                    0.0,
                    0.2126 - 0.2126 * s,
                    0.7152 - 0.7152 * s,
                    0.0722 + 0.9278 * s,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    1.0,
                    0.0,
                ]
            }
            Self::Sepia(amount) => {
                let s = 1.0 - amount.clamp(0.0, 1.0);
                [
                    0.393 + 0.607 * s,
                    0.769 - 0.769 * s,
                    0.189 - 0.189 * s,
                    0.0,
                    0.0,
                    0.349 - 0.349 * s,
                    0.686 + 0.314 * s,
                    0.168 - 0.168 * s,
                    0.0,
                    0.0,
                    0.272 - 0.272 * s,
                    0.534 - 0.534 * s,
                    0.131 + 0.869 * s,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    1.0,
                    0.0,
                ]
            }
            Self::Negative => [
                -1.0, 0.0, 0.0, 0.0, 1.0, //
                0.0, -1.0, 0.0, 0.0, 1.0, //
                0.0, 0.0, -1.0, 0.0, 1.0, //
                0.0, 0.0, 0.0, 1.0, 0.0,
            ],
        }
    }

    fn canvas_filter(self) -> String {
        match self {
            Self::Brightness(b) => format!("brightness({b})"),
            Self::Grayscale(a) => format!("grayscale({})", a.clamp(0.0, 1.0)),
            Self::Sepia(a) => format!("sepia({})", a.clamp(0.0, 1.0)),
            Self::Negative => "invert(1)".to_owned(),
        }
    }
}

const COLOR_MATRIX_WGSL: &str = r#"
@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    var c = sample_input(in.uv);
    if (c.a > 0.0) {
        c = vec4<f32>(c.rgb / c.a, c.a);
    }
    let r = param(0u) * c.r + param(1u) * c.g + param(2u) * c.b + param(3u) * c.a + param(4u);
    let g = param(5u) * c.r + param(6u) * c.g + param(7u) * c.b + param(8u) * c.a + param(9u);
    let b = param(10u) * c.r + param(11u) * c.g + param(12u) * c.b + param(13u) * c.a + param(14u);
    let a = param(15u) * c.r + param(16u) * c.g + param(17u) * c.b + param(18u) * c.a + param(19u);
    let rgb = clamp(mix(c.rgb, vec3<f32>(r, g, b), param(20u)), vec3<f32>(0.0), vec3<f32>(1.0));
    let alpha = clamp(a, 0.0, 1.0);
    return vec4<f32>(rgb * alpha, alpha);
}
"#;

struct ColorMatrixShader;

impl CpuShader for ColorMatrixShader {
    fn fragment(&self, f: &Fragment<'_>) -> [f32; 4] {
        let mut c = f.sample(f.uv);
        let a = c[3];
        if a > 0.0 {
            for v in &mut c[..3] {
                *v /= a;
            }
        }
        let row = |i: usize| {
            f.param(i) * c[0]
                + f.param(i + 1) * c[1]
                + f.param(i + 2) * c[2]
                + f.param(i + 3) * c[3]
                + f.param(i + 4)
        };
        let result = [row(0), row(5), row(10), row(15)];
        let mix = f.param(20);
        let alpha = result[3].clamp(0.0, 1.0);
        let mut out = [0.0f32; 4];
        for i in 0..3 {
            out[i] = (c[i] + (result[i] - c[i]) * mix).clamp(0.0, 1.0) * alpha;
        }
        out[3] = alpha;
        out
    }
}

/// 4x5 colour matrix applied to unpremultiplied colour, mixed with the original by `alpha`.
pub struct ColorMatrixFilter {
    state: FilterState,
    matrix: Cell<ColorMatrix>,
    preset: Cell<Option<ColorPreset>>,
    alpha: Cell<f32>,
    program: FilterProgram,
}

impl ColorMatrixFilter {
    pub fn new(matrix: ColorMatrix) -> FxResult<Self> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(FxError::validation("color matrix entries must be finite"));
        }
        Ok(Self::build(matrix, None))
    }

    pub fn from_preset(preset: ColorPreset) -> Self {
        Self::build(preset.matrix(), Some(preset))
    }

    fn build(matrix: ColorMatrix, preset: Option<ColorPreset>) -> Self {
        Self {
            state: FilterState::default(),
            matrix: Cell::new(matrix),
            preset: Cell::new(preset),
            alpha: Cell::new(1.0),
            program: FilterProgram::new("color-matrix")
                .with_cpu(ColorMatrixShader)
                .with_wgsl(COLOR_MATRIX_WGSL),
        }
    }

    pub fn matrix(&self) -> ColorMatrix {
        self.matrix.get()
    }

    /// Replace the matrix. Clears any preset, so the canvas fallback no longer expresses it.
    pub fn set_matrix(&self, matrix: ColorMatrix) {
        self.matrix.set(matrix);
        self.preset.set(None);
    }

    pub fn set_preset(&self, preset: ColorPreset) {
        self.matrix.set(preset.matrix());
        self.preset.set(Some(preset));
    }

    pub fn preset(&self) -> Option<ColorPreset> {
        self.preset.get()
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

impl Filter for ColorMatrixFilter {
    fn settings(&self) -> FilterSettings {
        self.state.get()
    }

    fn program(&self) -> &FilterProgram {
        &self.program
    }

    fn params(&self) -> Vec<f32> {
        let mut params = self.matrix.get().to_vec();
        params.push(self.alpha.get());
        params
    }

    fn canvas_capability(&self) -> CanvasCapability {
        match self.preset.get() {
            Some(preset) if self.alpha.get() == 1.0 => {
                CanvasCapability::Native(preset.canvas_filter())
            }
            _ => CanvasCapability::Unsupported,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/color_matrix.rs"]
mod tests;
