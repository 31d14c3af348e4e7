use super::*;

#[test]
fn clip_span_inside_source_is_untouched() {
    assert_eq!(clip_span(2, 4, 10, 0, 8), (2, 0, 4));
}

#[test]
fn clip_span_skips_pixels_before_source_origin() {
    // Two leading pixels fall left of the source and stay transparent.
    assert_eq!(clip_span(-2, 10, 5, 0, 16), (0, 2, 5));
}

#[test]
fn clip_span_respects_destination_extent() {
    assert_eq!(clip_span(0, 10, 10, 4, 8), (0, 4, 4));
    assert_eq!(clip_span(-20, 4, 10, 0, 8).2, 0);
}

#[test]
fn readback_rows_are_aligned() {
    assert_eq!(align_to(4, 256), 256);
    assert_eq!(align_to(256, 256), 256);
    assert_eq!(align_to(260, 256), 512);
}

#[test]
fn blend_states_follow_fixed_function_modes() {
    assert_eq!(
        blend_state(BlendMode::Normal),
        wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING
    );
    let erase = blend_state(BlendMode::Erase);
    assert_eq!(erase.color.src_factor, wgpu::BlendFactor::Zero);
    assert_eq!(erase.alpha.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
    assert_eq!(
        blend_state(BlendMode::Add).color.dst_factor,
        wgpu::BlendFactor::One
    );
}

#[test]
fn prelude_declares_the_program_contract() {
    for needle in ["fn vs_main", "struct VsOut", "fn param(", "fn sample_input(", "fn sample_back("] {
        assert!(PRELUDE_WGSL.contains(needle), "prelude is missing {needle}");
    }
    assert_eq!(PARAMS_BYTES, 128);
}
