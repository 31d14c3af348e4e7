use super::*;

use crate::filter::PixelView;
use crate::system::uniforms::FilterUniforms;

fn run(filter: &ColorMatrixFilter, px: [u8; 4]) -> [f32; 4] {
    let params = filter.params();
    let uniforms = FilterUniforms::default();
    let frag = Fragment {
        uv: [0.5, 0.5],
        position: [0.0, 0.0],
        params: &params,
        uniforms: &uniforms,
        input: PixelView::new(1, 1, &px),
        back: None,
    };
    ColorMatrixShader.fragment(&frag)
}

#[test]
fn identity_preserves_premultiplied_colour() {
    let filter = ColorMatrixFilter::new(IDENTITY_MATRIX).expect("matrix");
    let out = run(&filter, [100, 50, 25, 128]);
    assert!((out[0] - 100.0 / 255.0).abs() < 1e-4);
    assert!((out[3] - 128.0 / 255.0).abs() < 1e-4);
}

#[test]
fn negative_inverts_opaque_colour() {
    let filter = ColorMatrixFilter::from_preset(ColorPreset::Negative);
    let out = run(&filter, [255, 0, 51, 255]);
    assert!(out[0].abs() < 1e-6);
    assert!((out[1] - 1.0).abs() < 1e-6);
    assert!((out[2] - 204.0 / 255.0).abs() < 1e-4);
}

#[test]
fn translucent_pixels_are_unpremultiplied_before_the_matrix() {
    let filter = ColorMatrixFilter::from_preset(ColorPreset::Negative);
    let out = run(&filter, [128, 0, 0, 128]);
    let a = 128.0 / 255.0;
    assert!(out[0].abs() < 1e-4);
    assert!((out[1] - a).abs() < 1e-4);
    assert!((out[2] - a).abs() < 1e-4);
    assert!((out[3] - a).abs() < 1e-4);

    assert_eq!(run(&filter, [0, 0, 0, 0])[3], 0.0);
}

#[test]
fn alpha_mixes_towards_the_original() {
    let filter = ColorMatrixFilter::from_preset(ColorPreset::Brightness(0.0));
    filter.set_alpha(0.5);
    let out = run(&filter, [200, 200, 200, 255]);
    assert!((out[0] - 100.0 / 255.0).abs() < 1e-4);
}

#[test]
fn full_grayscale_uses_luma_weights() {
    let m = ColorPreset::Grayscale(1.0).matrix();
    assert!((m[0] - 0.2126).abs() < 1e-6);
    assert!((m[6] - 0.7152).abs() < 1e-6);
    assert!((m[12] - 0.0722).abs() < 1e-6);
    assert!((ColorPreset::Grayscale(0.0).matrix()[0] - 1.0).abs() < 1e-6);
}

#[test]
fn presets_map_to_canvas_filters() {
    let cases = [
        (ColorPreset::Brightness(1.5), "brightness(1.5)"),
        (ColorPreset::Grayscale(1.0), "grayscale(1)"),
        (ColorPreset::Sepia(0.5), "sepia(0.5)"),
        (ColorPreset::Negative, "invert(1)"),
    ];
    for (preset, css) in cases {
        assert_eq!(
            ColorMatrixFilter::from_preset(preset).canvas_capability(),
            CanvasCapability::Native(css.to_owned())
        );
    }
}

#[test]
fn custom_matrix_is_not_canvas_expressible() {
    let filter = ColorMatrixFilter::from_preset(ColorPreset::Sepia(1.0));
    filter.set_matrix(IDENTITY_MATRIX);
    assert_eq!(filter.preset(), None);
    assert_eq!(filter.canvas_capability(), CanvasCapability::Unsupported);

    let mixed = ColorMatrixFilter::from_preset(ColorPreset::Negative);
    mixed.set_alpha(0.5);
    assert_eq!(mixed.canvas_capability(), CanvasCapability::Unsupported);
}

#[test]
fn non_finite_matrix_is_rejected() {
    let mut m = IDENTITY_MATRIX;
    m[3] = f32::NAN;
    assert!(ColorMatrixFilter::new(m).is_err());
}

#[test]
fn params_append_alpha() {
    let filter = ColorMatrixFilter::new(IDENTITY_MATRIX).expect("matrix");
    let p = filter.params();
    assert_eq!(p.len(), 21);
    assert_eq!(p[20], 1.0);
}
