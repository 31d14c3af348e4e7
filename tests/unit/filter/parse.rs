use super::*;

use serde_json::json;

use crate::filter::CanvasCapability;

#[test]
fn parses_alpha_and_rejects_out_of_range() {
    let f = parse_filter(&FilterSpec::new("alpha", json!({ "alpha": 0.25 }))).unwrap();
    assert_eq!(f.label(), "alpha");
    assert_eq!(f.params(), vec![0.25]);
    assert_eq!(f.canvas_capability(), CanvasCapability::AlphaMultiply(0.25));

    assert!(parse_filter(&FilterSpec::new("alpha", json!({ "alpha": 2.0 }))).is_err());
    assert!(parse_filter(&FilterSpec::new("alpha", json!({}))).is_err());
}

#[test]
fn blur_defaults_and_per_axis_strength() {
    let f = parse_filter(&FilterSpec::new("blur", json!({}))).unwrap();
    assert_eq!(f.settings().padding, 16.0);

    let f = parse_filter(&FilterSpec::new(
        "Blur",
        json!({ "strength_x": 2.0, "strength_y": 5.0, "quality": 1 }),
    ))
    .unwrap();
    assert_eq!(f.settings().padding, 10.0);
}

#[test]
fn blur_rejects_bad_kernel_and_quality() {
    assert!(parse_filter(&FilterSpec::new("blur", json!({ "kernel_size": 6 }))).is_err());
    assert!(parse_filter(&FilterSpec::new("blur", json!({ "quality": 0 }))).is_err());
    assert!(parse_filter(&FilterSpec::new("blur", json!({ "quality": -1 }))).is_err());
}

#[test]
fn color_matrix_from_preset_or_matrix() {
    let f = parse_filter(&FilterSpec::new(
        "color-matrix",
        json!({ "preset": "sepia", "amount": 0.5 }),
    ))
    .unwrap();
    assert_eq!(
        f.canvas_capability(),
        CanvasCapability::Native("sepia(0.5)".to_owned())
    );

    let mut identity = vec![0.0; 20];
    for i in [0, 6, 12, 18] {
        identity[i] = 1.0;
    }
    let f = parse_filter(&FilterSpec::new(
        "color_matrix",
        json!({ "matrix": identity, "alpha": 0.5 }),
    ))
    .unwrap();
    assert_eq!(f.params().len(), 21);
    assert_eq!(f.params()[20], 0.5);
    assert_eq!(f.canvas_capability(), CanvasCapability::Unsupported);
}

#[test]
fn color_matrix_needs_exactly_one_source() {
    assert!(parse_filter(&FilterSpec::new("color_matrix", json!({}))).is_err());
    assert!(parse_filter(&FilterSpec::new("color_matrix", json!({ "matrix": [1.0, 2.0] }))).is_err());
    assert!(
        parse_filter(&FilterSpec::new(
            "color_matrix",
            json!({ "preset": "negative", "matrix": [] })
        ))
        .is_err()
    );
    assert!(parse_filter(&FilterSpec::new("color_matrix", json!({ "preset": "hue" }))).is_err());
}

#[test]
fn blend_mode_requires_back_buffer() {
    let f = parse_filter(&FilterSpec::new("blend_mode", json!({ "mode": "screen" }))).unwrap();
    assert!(f.settings().blend_required);
    assert!(parse_filter(&FilterSpec::new("blend_mode", json!({ "mode": "hue" }))).is_err());
}

#[test]
fn settings_override_is_applied_and_validated() {
    let spec: FilterSpec = serde_json::from_value(json!({
        "kind": "alpha",
        "params": { "alpha": 1.0 },
        "settings": { "padding": 3.0, "resolution": 0.5, "enabled": false, "blend_mode": "add" }
    }))
    .unwrap();
    let f = parse_filter(&spec).unwrap();
    let s = f.settings();
    assert_eq!(s.padding, 3.0);
    assert_eq!(s.resolution, Resolution::Value(0.5));
    assert!(!s.enabled);
    assert_eq!(s.blend_mode, BlendMode::Add);

    let mut bad = FilterSpec::new("alpha", json!({ "alpha": 1.0 }));
    bad.settings.padding = Some(-1.0);
    assert!(matches!(parse_filter(&bad), Err(FxError::Validation(_))));
}

#[test]
fn unknown_kind_lists_builtins() {
    let Err(err) = parse_filter(&FilterSpec::new("glow", json!({}))) else {
        panic!("unknown kind must not parse");
    };
    let msg = err.to_string();
    assert!(msg.contains("glow"));
    for kind in BUILTIN_KINDS {
        assert!(msg.contains(kind));
    }
    assert!(parse_filter(&FilterSpec::new("  ", json!({}))).is_err());
}

#[test]
fn chain_accepts_array_or_object() {
    let chain = json!([
        { "kind": "alpha", "params": { "alpha": 0.5 } },
        { "kind": "blur", "params": { "strength": 1.0 } }
    ]);
    assert_eq!(parse_filter_chain(&chain).unwrap().len(), 2);
    let wrapped = json!({ "filters": chain });
    assert_eq!(parse_filter_chain(&wrapped).unwrap().len(), 2);

    assert!(parse_filter_chain(&json!(3)).is_err());
    assert!(parse_filter_chain(&json!({ "other": [] })).is_err());
    assert!(matches!(
        parse_filter_chain(&json!([{ "params": {} }])),
        Err(FxError::Serde(_))
    ));
}
