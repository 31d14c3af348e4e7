use super::*;

use crate::filter::{CanvasCapability, PixelView};
use crate::system::uniforms::FilterUniforms;

fn run(mode: CompositeMode, front: [u8; 4], back: Option<[u8; 4]>) -> [f32; 4] {
    let filter = BlendModeFilter::new(mode);
    let params = filter.params();
    let uniforms = FilterUniforms::default();
    let back_px = back.unwrap_or([0; 4]);
    let frag = Fragment {
        uv: [0.5, 0.5],
        position: [0.0, 0.0],
        params: &params,
        uniforms: &uniforms,
        input: PixelView::new(1, 1, &front),
        back: back.map(|_| PixelView::new(1, 1, &back_px)),
    };
    BlendModeShader.fragment(&frag)
}

#[test]
fn requires_a_back_buffer() {
    let filter = BlendModeFilter::new(CompositeMode::Screen);
    assert!(filter.settings().blend_required);
    assert_eq!(filter.canvas_capability(), CanvasCapability::Unsupported);
}

#[test]
fn multiply_over_opaque_backdrop() {
    let out = run(CompositeMode::Multiply, [255, 128, 0, 255], Some([128, 128, 128, 255]));
    assert!((out[0] - 128.0 / 255.0).abs() < 1e-4);
    assert!((out[1] - (128.0 / 255.0) * (128.0 / 255.0)).abs() < 1e-4);
    assert!(out[2].abs() < 1e-6);
    assert!((out[3] - 1.0).abs() < 1e-6);
}

#[test]
fn transparent_backdrop_keeps_front() {
    let out = run(CompositeMode::Difference, [60, 30, 0, 128], None);
    assert!((out[0] - 60.0 / 255.0).abs() < 1e-6);
    assert!((out[3] - 128.0 / 255.0).abs() < 1e-6);
}

#[test]
fn blend_functions() {
    assert_eq!(CompositeMode::Screen.blend(0.5, 0.5), 0.75);
    assert_eq!(CompositeMode::Darken.blend(0.2, 0.7), 0.2);
    assert_eq!(CompositeMode::Lighten.blend(0.2, 0.7), 0.7);
    assert!((CompositeMode::Difference.blend(0.2, 0.7) - 0.5).abs() < 1e-6);
    for mode in [
        CompositeMode::Multiply,
        CompositeMode::Screen,
        CompositeMode::Darken,
        CompositeMode::Lighten,
        CompositeMode::Difference,
    ] {
        assert_eq!(CompositeMode::from_index(mode.index()), mode);
    }
}
