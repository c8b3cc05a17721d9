//! Movement plausibility checks between consecutive snapshots
//!
//! Values are compared raw: no unit conversion, no tick-rate normalisation.
//! Callers must capture snapshots at a consistent interval.

use crate::rules::Thresholds;

use super::types::PlayerState;

/// Speed above the configured maximum. Non-finite speeds always violate.
pub fn speed_violation(current: &PlayerState, thresholds: &Thresholds) -> bool {
    !current.speed.is_finite() || current.speed > thresholds.max_speed
}

/// Displacement since the previous snapshot, if there is one
pub fn displacement(current: &PlayerState, previous: Option<&PlayerState>) -> Option<f64> {
    previous.map(|prev| current.position.distance_to(&prev.position))
}

/// Displacement above the configured maximum. No previous snapshot means
/// there is nothing to compare against.
pub fn displacement_violation(
    current: &PlayerState,
    previous: Option<&PlayerState>,
    thresholds: &Thresholds,
) -> bool {
    match displacement(current, previous) {
        Some(dist) => !dist.is_finite() || dist > thresholds.max_teleport_distance,
        None => false,
    }
}

/// Combined movement check (true = violation)
pub fn check_movement(
    current: &PlayerState,
    previous: Option<&PlayerState>,
    thresholds: &Thresholds,
) -> bool {
    speed_violation(current, thresholds) || displacement_violation(current, previous, thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Position;
    use proptest::prelude::*;

    fn at(x: f64, y: f64, speed: f64) -> PlayerState {
        PlayerState {
            position: Position::new(x, y),
            speed,
            ..Default::default()
        }
    }

    #[test]
    fn speed_over_limit() {
        let t = Thresholds::default();
        assert!(speed_violation(&at(0.0, 0.0, 100.01), &t));
        assert!(!speed_violation(&at(0.0, 0.0, 100.0), &t));
        assert!(speed_violation(&at(0.0, 0.0, f64::NAN), &t));
    }

    #[test]
    fn displacement_uses_euclidean_distance() {
        let t = Thresholds::default();
        let prev = at(0.0, 0.0, 0.0);
        // 30-40-50 triangle sits exactly on the limit
        assert!(!displacement_violation(&at(30.0, 40.0, 0.0), Some(&prev), &t));
        assert!(displacement_violation(&at(30.0, 40.1, 0.0), Some(&prev), &t));
    }

    #[test]
    fn no_previous_snapshot_means_no_displacement_violation() {
        let t = Thresholds::default();
        assert!(!displacement_violation(&at(9999.0, 9999.0, 0.0), None, &t));
        assert!(!check_movement(&at(9999.0, 9999.0, 10.0), None, &t));
    }

    #[test]
    fn non_finite_displacement_violates() {
        let t = Thresholds::default();
        let prev = at(0.0, 0.0, 0.0);
        assert!(displacement_violation(&at(f64::NAN, 0.0, 0.0), Some(&prev), &t));
        assert!(displacement_violation(&at(0.0, f64::INFINITY, 0.0), Some(&prev), &t));
        assert!(displacement_violation(&at(f64::MAX, f64::MAX, 0.0), Some(&prev), &t));
    }

    proptest! {
        #[test]
        fn speed_within_limit_never_fires(speed in -1.0e6f64..=100.0) {
            prop_assert!(!speed_violation(&at(0.0, 0.0, speed), &Thresholds::default()));
        }

        #[test]
        fn small_displacement_never_fires(
            x in -1.0e4f64..1.0e4,
            y in -1.0e4f64..1.0e4,
            angle in 0.0f64..std::f64::consts::TAU,
            dist in 0.0f64..=49.999,
        ) {
            let prev = at(x, y, 0.0);
            let cur = at(x + dist * angle.cos(), y + dist * angle.sin(), 0.0);
            prop_assert!(!displacement_violation(&cur, Some(&prev), &Thresholds::default()));
        }
    }
}
