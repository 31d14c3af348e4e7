use super::*;

use crate::filter::{FilterProgram, FilterSettings, Fragment, Resolution, ShaderFilter};

fn cpu_program() -> FilterProgram {
    FilterProgram::new("copy").with_cpu(|f: &Fragment<'_>| f.sample(f.uv))
}

fn filter(settings: FilterSettings) -> Rc<dyn Filter> {
    ShaderFilter::new(cpu_program(), Vec::new())
        .with_settings(settings)
        .into_rc()
}

fn ready(n: FxResult<Negotiation>) -> Negotiated {
    match n.expect("negotiation") {
        Negotiation::Ready(n) => n,
        _ => panic!("expected a ready negotiation"),
    }
}

#[test]
fn resolution_is_the_minimum_with_inherit_as_root() {
    let filters = vec![
        filter(FilterSettings {
            resolution: Resolution::Value(2.0),
            ..FilterSettings::default()
        }),
        filter(FilterSettings {
            resolution: Resolution::Value(1.0),
            ..FilterSettings::default()
        }),
        filter(FilterSettings {
            resolution: Resolution::Inherit,
            ..FilterSettings::default()
        }),
    ];
    let n = ready(negotiate(&filters, 1.0, false, RendererKind::Cpu, false));
    assert_eq!(n.resolution, 1.0);

    let n = ready(negotiate(&filters[..1], 1.0, false, RendererKind::Cpu, false));
    assert_eq!(n.resolution, 2.0);
}

#[test]
fn padding_sums_and_truncates() {
    let filters = vec![
        filter(FilterSettings {
            padding: 4.0,
            ..FilterSettings::default()
        }),
        filter(FilterSettings {
            padding: 6.7,
            ..FilterSettings::default()
        }),
    ];
    let n = ready(negotiate(&filters, 1.0, false, RendererKind::Cpu, false));
    assert_eq!(n.padding, 10.0);
}

#[test]
fn antialias_is_anded_with_inherit_following_root() {
    let on = filter(FilterSettings {
        antialias: Antialias::On,
        ..FilterSettings::default()
    });
    let inherit = filter(FilterSettings {
        antialias: Antialias::Inherit,
        ..FilterSettings::default()
    });
    let off = filter(FilterSettings::default());

    let chain = vec![Rc::clone(&on), Rc::clone(&inherit)];
    assert!(ready(negotiate(&chain, 1.0, true, RendererKind::Cpu, false)).antialias);
    assert!(!ready(negotiate(&chain, 1.0, false, RendererKind::Cpu, false)).antialias);

    let chain = vec![on, off];
    assert!(!ready(negotiate(&chain, 1.0, true, RendererKind::Cpu, false)).antialias);
}

#[test]
fn disabled_filters_are_dropped_from_the_chain() {
    let filters = vec![
        filter(FilterSettings {
            enabled: false,
            padding: 50.0,
            ..FilterSettings::default()
        }),
        filter(FilterSettings {
            padding: 2.0,
            clip_to_viewport: false,
            ..FilterSettings::default()
        }),
    ];
    let n = ready(negotiate(&filters, 1.0, false, RendererKind::Cpu, false));
    assert_eq!(n.filters.len(), 1);
    assert_eq!(n.padding, 2.0);
    assert!(!n.clip_to_viewport);
}

#[test]
fn all_disabled_means_nothing_enabled() {
    let filters = vec![filter(FilterSettings {
        enabled: false,
        ..FilterSettings::default()
    })];
    assert!(matches!(
        negotiate(&filters, 1.0, false, RendererKind::Cpu, false),
        Ok(Negotiation::NothingEnabled)
    ));
}

#[test]
fn one_incompatible_filter_fails_the_whole_chain() {
    let gpu_only: Rc<dyn Filter> = ShaderFilter::new(
        FilterProgram::new("gpu-only").with_wgsl("fn fs_main() {}"),
        Vec::new(),
    )
    .into_rc();
    let filters = vec![filter(FilterSettings::default()), gpu_only];
    match negotiate(&filters, 1.0, false, RendererKind::Cpu, false) {
        Ok(Negotiation::Incompatible { label }) => assert_eq!(label, "gpu-only"),
        _ => panic!("expected incompatible"),
    }
}

#[test]
fn blend_required_without_back_buffer_fails() {
    let filters = vec![filter(FilterSettings {
        blend_required: true,
        ..FilterSettings::default()
    })];
    assert!(matches!(
        negotiate(&filters, 1.0, false, RendererKind::Cpu, false),
        Ok(Negotiation::MissingBackBuffer { .. })
    ));
    assert!(ready(negotiate(&filters, 1.0, false, RendererKind::Cpu, true)).blend_required);
}

#[test]
fn invalid_settings_are_validation_errors() {
    let filters = vec![filter(FilterSettings {
        padding: -1.0,
        ..FilterSettings::default()
    })];
    assert!(matches!(
        negotiate(&filters, 1.0, false, RendererKind::Cpu, false),
        Err(FxError::Validation(_))
    ));
}
