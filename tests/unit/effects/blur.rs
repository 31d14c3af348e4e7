use super::*;

use crate::filter::PixelView;
use crate::system::uniforms::FilterUniforms;

#[test]
fn kernels_are_symmetric_and_normalized() {
    for size in [5u32, 7, 9, 11, 13, 15] {
        let w = kernel_weights(size).expect("kernel");
        assert_eq!(w.len(), size as usize);
        let sum: f32 = w.iter().sum();
        assert!((sum - 1.0).abs() < 1e-3, "size {size} sums to {sum}");
        for i in 0..w.len() {
            assert_eq!(w[i], w[w.len() - 1 - i]);
        }
    }
    assert_eq!(
        kernel_weights(5).expect("kernel"),
        vec![0.153388, 0.221461, 0.250301, 0.221461, 0.153388]
    );
}

#[test]
fn unsupported_kernel_size_is_rejected() {
    assert!(matches!(kernel_weights(6), Err(FxError::Validation(_))));
    assert!(BlurFilter::with_axes(1.0, 1.0, 1, 4).is_err());
}

#[test]
fn padding_tracks_the_larger_axis() {
    let blur = BlurFilter::with_axes(5.0, 0.0, 1, 5).expect("blur");
    assert_eq!(blur.settings().padding, 10.0);

    blur.set_strength_xy(-3.0, 7.5);
    assert_eq!(blur.settings().padding, 15.0);
}

#[test]
fn pass_params_carry_direction_strength_and_weights() {
    let pass = BlurPass::new(BlurAxis::Vertical, 4.0, 1, 5).expect("pass");
    let p = pass.params();
    assert_eq!(&p[..4], &[0.0, 1.0, 4.0, 5.0]);
    assert_eq!(p.len(), 9);
    assert_eq!(pass.label(), "blur-y");
}

#[test]
fn canvas_string_uses_max_strength() {
    let blur = BlurFilter::with_axes(2.0, -6.0, 1, 5).expect("blur");
    assert_eq!(
        blur.canvas_capability(),
        CanvasCapability::Native("blur(6px)".to_owned())
    );
}

#[test]
fn uniform_input_stays_uniform() {
    let data = [80u8, 40, 20, 255].repeat(16);
    let pass = BlurPass::new(BlurAxis::Horizontal, 1.0, 1, 5).expect("pass");
    let params = pass.params();
    let uniforms = FilterUniforms {
        input_size: [4.0, 4.0, 0.25, 0.25],
        ..FilterUniforms::default()
    };
    let frag = Fragment {
        uv: [0.375, 0.625],
        position: [0.0, 0.0],
        params: &params,
        uniforms: &uniforms,
        input: PixelView::new(4, 4, &data),
        back: None,
    };
    let out = BlurShader.fragment(&frag);
    assert!((out[0] - 80.0 / 255.0).abs() < 1e-4);
    assert!((out[3] - 1.0).abs() < 1e-4);
}

#[test]
fn quality_sets_passes_on_both_axes() {
    let blur = BlurFilter::new(2.0, 3).expect("blur");
    assert_eq!(blur.quality(), 3);
    blur.set_quality(0);
    assert_eq!(blur.quality(), 1);
}
