use super::*;

use crate::effects::internal::passthrough_program;

#[test]
fn resolution_accepts_keyword_or_number() {
    let r: Resolution = serde_json::from_str("\"inherit\"").unwrap();
    assert_eq!(r, Resolution::Inherit);
    let r: Resolution = serde_json::from_str("0.5").unwrap();
    assert_eq!(r, Resolution::Value(0.5));
    assert_eq!(r.resolve(2.0), 0.5);
    assert_eq!(Resolution::Inherit.resolve(2.0), 2.0);

    assert!(serde_json::from_str::<Resolution>("0").is_err());
    assert!(serde_json::from_str::<Resolution>("\"auto\"").is_err());
    assert_eq!(
        serde_json::to_string(&Resolution::Inherit).unwrap(),
        "\"inherit\""
    );
}

#[test]
fn settings_default_and_partial_json() {
    let s = FilterSettings::default();
    assert_eq!(s.padding, 0.0);
    assert_eq!(s.resolution, Resolution::Inherit);
    assert_eq!(s.antialias, Antialias::Off);
    assert_eq!(s.blend_mode, BlendMode::Normal);
    assert!(s.enabled && s.clip_to_viewport && !s.blend_required);

    let s: FilterSettings =
        serde_json::from_str(r#"{ "padding": 4, "antialias": "inherit" }"#).unwrap();
    assert_eq!(s.padding, 4.0);
    assert_eq!(s.antialias, Antialias::Inherit);
    assert!(s.enabled);
}

#[test]
fn filter_state_updates_through_shared_reference() {
    let state = FilterState::default();
    state.set_padding(3.0);
    state.set_enabled(false);
    state.set_resolution(Resolution::Value(2.0));
    state.set_blend_mode(BlendMode::Screen);
    let s = state.get();
    assert_eq!(s.padding, 3.0);
    assert!(!s.enabled);
    assert_eq!(s.resolution, Resolution::Value(2.0));
    assert_eq!(s.blend_mode, BlendMode::Screen);
}

#[test]
fn renderer_mask_follows_program_halves() {
    let both = passthrough_program();
    assert_eq!(both.compatible_renderers(), RendererMask::CPU | RendererMask::GPU);
    let gpu_only = FilterProgram::new("gpu-only").with_wgsl("fn fs_main() {}");
    assert!(gpu_only.compatible_renderers().supports(RendererKind::Gpu));
    assert!(!gpu_only.compatible_renderers().supports(RendererKind::Cpu));
    assert!(FilterProgram::new("none").compatible_renderers().is_empty());
}

#[test]
fn shader_filter_exposes_program_and_params() {
    let f = ShaderFilter::new(passthrough_program(), vec![1.0, 2.0]);
    f.set_params(vec![3.0]);
    f.state().set_padding(2.0);
    let f = f.into_rc();
    assert_eq!(f.label(), "passthrough");
    assert_eq!(f.params(), vec![3.0]);
    assert_eq!(f.settings().padding, 2.0);
    assert_eq!(f.canvas_capability(), CanvasCapability::Unsupported);
}

#[test]
fn validate_settings_rejects_non_finite_values() {
    assert!(validate_settings(&FilterSettings::default()).is_ok());
    let mut s = FilterSettings::default();
    s.padding = f64::NAN;
    assert!(validate_settings(&s).is_err());
    s.padding = -1.0;
    assert!(validate_settings(&s).is_err());
    s.padding = 0.0;
    s.resolution = Resolution::Value(0.0);
    assert!(matches!(validate_settings(&s), Err(FxError::Validation(_))));
}
