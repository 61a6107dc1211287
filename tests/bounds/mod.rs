//! Tests for bounds derivation and the bounded parameter transform

use approx::assert_relative_eq;
use ndarray::{array, Array1};
use pvfit_rs::parameters::{
    characteristic_scale, derive_bounds, BoundsPair, BoundsPolicy, BoundsRule, BoundsTransform,
};
use pvfit_rs::PvFitError;

#[test]
fn test_derived_bounds_contain_reference() {
    let reference = array![51.0, 200.0, 85.0, 0.7, 10.0, 272.0, 37.0, 0.8];
    let bounds = derive_bounds(&reference, 8.3).unwrap();

    assert!(bounds.contains(&reference));
    assert_eq!(bounds.len(), reference.len());

    assert_relative_eq!(bounds.lower[0], 51.0 * 0.75);
    assert_relative_eq!(bounds.upper[0], 51.0 * 1.32);
    assert_relative_eq!(bounds.lower[1], 200.0 - 16.6);
    assert_relative_eq!(bounds.upper[1], 200.0 + 16.6);
    assert_relative_eq!(bounds.lower[6], 18.5);
    assert_relative_eq!(bounds.upper[6], 370.0);
    assert_eq!((bounds.lower[7], bounds.upper[7]), (0.0, 1.0));
}

#[test]
fn test_derivation_is_deterministic() {
    let reference = array![3.0, -12.0, 4.0, 0.2];
    let a = derive_bounds(&reference, 0.5).unwrap();
    let b = derive_bounds(&reference, 0.5).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_negative_height_policy() {
    let reference = array![-5.0, 10.0, 2.0, 0.5];

    match derive_bounds(&reference, 1.0) {
        Err(PvFitError::InvalidBounds { index, .. }) => assert_eq!(index, 0),
        other => panic!("Expected InvalidBounds, got {:?}", other),
    }

    let bounds = BoundsRule::new()
        .with_policy(BoundsPolicy::Sort)
        .derive(&reference, 1.0)
        .unwrap();
    assert_relative_eq!(bounds.lower[0], -6.6);
    assert_relative_eq!(bounds.upper[0], -3.75);
    assert!(bounds.contains(&reference));
}

#[test]
fn test_rule_json_defaults() {
    let rule = BoundsRule::from_json(r#"{ "center_span": 3.0 }"#).unwrap();
    assert_eq!(rule.center_span, 3.0);
    assert_eq!(rule.height_upper, BoundsRule::default().height_upper);

    let back = BoundsRule::from_json(&rule.to_json().unwrap()).unwrap();
    assert_eq!(back, rule);
}

#[test]
fn test_characteristic_scale() {
    let x = Array1::linspace(0.0, 700.0, 11);
    assert_relative_eq!(characteristic_scale(&x, 70.0).unwrap(), 10.0);
    assert!(characteristic_scale(&Array1::zeros(0), 70.0).is_err());
}

#[test]
fn test_pair_validation() {
    assert!(matches!(
        BoundsPair::new(array![0.0, 1.0], array![1.0]),
        Err(PvFitError::DimensionMismatch(_))
    ));
    assert!(matches!(
        BoundsPair::new(array![0.0, 2.0], array![1.0, 1.0]),
        Err(PvFitError::InvalidBounds { index: 1, .. })
    ));
    assert!(matches!(
        BoundsPair::new(array![f64::NAN], array![1.0]),
        Err(PvFitError::InvalidBounds { index: 0, .. })
    ));
}

#[test]
fn test_transform_stays_inside_box() {
    let bounds = BoundsPair::new(array![0.0, 5.0, f64::NEG_INFINITY], array![1.0, f64::INFINITY, -2.0])
        .unwrap();

    for (i, transform) in bounds.transforms().iter().enumerate() {
        for internal in [-1e3, -3.0, -0.5, 0.0, 0.7, 2.0, 1e3] {
            let external = transform.to_external(internal);
            assert!(
                external >= bounds.lower[i] && external <= bounds.upper[i],
                "parameter {} left its box: {}",
                i,
                external
            );
        }
    }
}

#[test]
fn test_transform_inverse() {
    let pair = BoundsPair::new(array![0.5], array![2.0]).unwrap();
    let transform = BoundsTransform::new(pair.get(0));

    for value in [0.6, 1.0, 1.9] {
        let internal = transform.to_internal(value).unwrap();
        assert_relative_eq!(transform.to_external(internal), value, epsilon = 1e-12);
    }
}

#[test]
fn test_clip_and_strict_feasibility() {
    let bounds = BoundsPair::new(array![0.0, 0.0], array![1.0, 1.0]).unwrap();
    let clipped = bounds.clip(&array![-1.0, 2.0]);
    assert_eq!(clipped, array![0.0, 1.0]);

    let inside = bounds.make_strictly_feasible(&array![0.0, 1.0]);
    assert!(inside[0] > 0.0 && inside[0] < 1.0);
    assert!(inside[1] > 0.0 && inside[1] < 1.0);
}
