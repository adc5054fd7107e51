use graphbench::domain::{
    Comparer, Metric,
    metric::AVERAGE_FOR_PREFIX,
    units::{self, Unit},
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_bigger_is_better_regresses_below_floor(
        old in -1.0e6f64..1.0e6,
        new in -1.0e6f64..1.0e6,
        t in 0.001f64..0.999,
    ) {
        let expected = new < old - old * t;
        prop_assert_eq!(Comparer::BiggerIsBetter.has_regressed(new, old, t), expected);
    }

    #[test]
    fn prop_smaller_is_better_regresses_above_floor(
        old in -1.0e6f64..1.0e6,
        new in -1.0e6f64..1.0e6,
        t in 0.001f64..0.999,
    ) {
        let expected = new > old + old * t;
        prop_assert_eq!(Comparer::SmallerIsBetter.has_regressed(new, old, t), expected);
    }

    #[test]
    fn prop_floor_is_the_flip_point(old in 0.0f64..1.0e6, t in 0.001f64..0.999) {
        for comparer in [Comparer::BiggerIsBetter, Comparer::SmallerIsBetter] {
            let floor = comparer.allowed_regression(old, t);
            prop_assert!(!comparer.has_regressed(floor, old, t));
        }
    }
}

#[test]
fn test_ordering_follows_direction() {
    assert!(Comparer::BiggerIsBetter.is_better(2.0, 1.0));
    assert!(!Comparer::BiggerIsBetter.is_better(1.0, 2.0));
    assert!(Comparer::SmallerIsBetter.is_better(1.0, 2.0));
    assert!(!Comparer::SmallerIsBetter.is_better(2.0, 2.0));
}

#[test]
fn test_floor_values() {
    assert!((Comparer::BiggerIsBetter.allowed_regression(10.0, 0.1) - 9.0).abs() < 1e-9);
    assert!((Comparer::SmallerIsBetter.allowed_regression(1.0, 0.1) - 1.1).abs() < 1e-9);
    assert!((Comparer::SmallerIsBetter.allowed_regression(10.0, 0.2) - 12.0).abs() < 1e-9);
}

#[test]
fn test_derived_comparer_for_latency_metrics() {
    let name = format!("{AVERAGE_FOR_PREFIX}lookup");
    assert_eq!(
        Comparer::derive_from(&name, &units::UNKNOWN),
        Comparer::SmallerIsBetter
    );
    assert_eq!(
        Comparer::derive_from("anything", &units::MILLISECOND),
        Comparer::SmallerIsBetter
    );
    assert_eq!(
        Comparer::derive_from("Average reads", &units::reads_per_ms()),
        Comparer::BiggerIsBetter
    );
}

#[test]
fn test_metric_constructors() {
    let untracked = Metric::new("Peak reads", 3.0, units::reads_per_ms());
    assert!(!untracked.should_track_regression());
    assert_eq!(untracked.comparer(), Comparer::BiggerIsBetter);

    let tracked = Metric::tracked("latency", 4.0, units::MILLISECOND, Comparer::SmallerIsBetter);
    assert!(tracked.should_track_regression());
    assert!((tracked.allowed_regression(0.5) - 6.0).abs() < 1e-9);

    let best = Metric::tracked("latency", 2.0, units::MILLISECOND, Comparer::SmallerIsBetter);
    assert!(tracked.has_regressed_from(&best, 0.5));
}

#[test]
fn test_unit_per_composes_names() {
    let rate = units::CORE_API_READ.per(&units::MILLISECOND);
    assert_eq!(rate.key(), "Core API read / ms");
    assert_eq!(rate, units::reads_per_ms());
    assert_eq!(Unit::new("ms"), units::MILLISECOND);
    assert!(units::SECOND.is_time());
    assert!(!rate.is_time());
}
