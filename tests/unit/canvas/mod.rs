use super::*;

use crate::effects::{AlphaFilter, BlurFilter, ColorMatrixFilter, ColorPreset, IDENTITY_MATRIX};

fn rc<F: Filter + 'static>(f: F) -> Rc<dyn Filter> {
    Rc::new(f)
}

#[test]
fn alpha_filters_fold_into_global_alpha() {
    let mut sys = CanvasFilterSystem::new(CanvasState::default());
    sys.push(&[rc(AlphaFilter::new(0.5)), rc(AlphaFilter::new(0.5))]);
    let frame = sys.top_frame().unwrap();
    assert!(!frame.skip);
    assert_eq!(frame.alpha_multiplier, 0.25);
    assert!(frame.filter_strings.is_empty());
    assert_eq!(sys.context().global_alpha, 0.25);
    assert_eq!(sys.context().filter, "none");

    sys.pop().unwrap();
    assert_eq!(sys.context(), &CanvasState::default());
}

#[test]
fn native_strings_append_to_the_enclosing_filter() {
    let mut sys = CanvasFilterSystem::new(CanvasState::default());
    sys.push(&[rc(BlurFilter::new(4.0, 1).unwrap())]);
    assert_eq!(sys.context().filter, "blur(4px)");

    sys.push(&[rc(ColorMatrixFilter::from_preset(ColorPreset::Negative))]);
    assert_eq!(sys.context().filter, "blur(4px) invert(1)");

    sys.pop().unwrap();
    assert_eq!(sys.context().filter, "blur(4px)");
    sys.pop().unwrap();
    assert_eq!(sys.context().filter, "none");
    assert_eq!(sys.depth(), 0);
}

#[test]
fn unsupported_filters_are_dropped_individually() {
    let mut sys = CanvasFilterSystem::new(CanvasState::default());
    let custom = rc(ColorMatrixFilter::new(IDENTITY_MATRIX).unwrap());
    sys.push(&[Rc::clone(&custom), rc(AlphaFilter::new(0.5))]);
    assert_eq!(sys.context().global_alpha, 0.5);
    assert_eq!(sys.stats().dropped, 1);
    sys.pop().unwrap();

    // A chain of only unsupported filters is a no-op frame.
    sys.push(&[custom]);
    assert!(sys.top_frame().unwrap().skip);
    assert_eq!(sys.stats().skipped, 1);
    sys.pop().unwrap();
    assert_eq!(sys.context(), &CanvasState::default());
}

#[test]
fn disabled_and_identity_filters_skip() {
    let mut sys = CanvasFilterSystem::new(CanvasState::default());
    let off = AlphaFilter::new(0.1);
    off.state().set_enabled(false);
    sys.push(&[rc(off), rc(AlphaFilter::new(1.0))]);
    assert!(sys.top_frame().unwrap().skip);
    sys.push(&[]);
    assert!(sys.top_frame().unwrap().skip);
    assert_eq!(sys.depth(), 2);
    sys.pop().unwrap();
    sys.pop().unwrap();
}

#[test]
fn pop_without_push_is_an_error() {
    let mut sys = CanvasFilterSystem::new(CanvasState::default());
    assert!(matches!(sys.pop(), Err(FxError::Backend(_))));
}
