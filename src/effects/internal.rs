use crate::filter::{FilterProgram, Fragment};

const PASSTHROUGH_WGSL: &str = r#"
@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return sample_input(in.uv);
}
"#;

#[cfg(feature = "gpu")]
const FILL_WGSL: &str = r#"
@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return vec4<f32>(param(0u), param(1u), param(2u), param(3u));
}
"#;

/// Copies the input unchanged.
pub(crate) fn passthrough_program() -> FilterProgram {
    FilterProgram::new("passthrough")
        .with_cpu(|f: &Fragment<'_>| f.sample(f.uv))
        .with_wgsl(PASSTHROUGH_WGSL)
}

/// Solid premultiplied colour taken from params `0..4`.
#[cfg(feature = "gpu")]
pub(crate) fn fill_program() -> FilterProgram {
    FilterProgram::new("fill")
        .with_cpu(|f: &Fragment<'_>| [f.param(0), f.param(1), f.param(2), f.param(3)])
        .with_wgsl(FILL_WGSL)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/internal.rs"]
mod tests;
