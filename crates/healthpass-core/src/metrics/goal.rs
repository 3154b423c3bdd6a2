//! Goal-range classification for recorded readings.

use serde::{Deserialize, Serialize};

use super::{GoalRange, MetricValue};

/// Outcome of classifying a reading against the configured goal.
///
/// `Unset` means no goal range exists for the reading's metric kind; it is
/// distinct from `OutOfRange` and callers must not alert on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalCheck {
    InRange,
    OutOfRange,
    Unset,
}

/// Classify `value` against `range`.
///
/// Bounds are inclusive on both ends. A blood-pressure reading is in range
/// only when both systolic and diastolic fall within their respective pairs.
/// A range configured for a different metric kind counts as no range at all.
pub fn evaluate(value: &MetricValue, range: Option<&GoalRange>) -> GoalCheck {
    let Some(range) = range else {
        return GoalCheck::Unset;
    };

    let in_range = match (value, range) {
        (
            MetricValue::BloodPressure {
                systolic,
                diastolic,
            },
            GoalRange::BloodPressure {
                systolic_min,
                systolic_max,
                diastolic_min,
                diastolic_max,
            },
        ) => {
            let systolic_ok = *systolic >= *systolic_min && *systolic <= *systolic_max;
            let diastolic_ok = *diastolic >= *diastolic_min && *diastolic <= *diastolic_max;
            systolic_ok && diastolic_ok
        }
        (MetricValue::Weight { kg }, GoalRange::Weight { min, max }) => {
            *kg >= *min && *kg <= *max
        }
        (MetricValue::Glucose { mg_dl }, GoalRange::Glucose { min, max }) => {
            *mg_dl >= *min && *mg_dl <= *max
        }
        _ => return GoalCheck::Unset,
    };

    if in_range {
        GoalCheck::InRange
    } else {
        GoalCheck::OutOfRange
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bp_goal() -> GoalRange {
        GoalRange::BloodPressure {
            systolic_min: 90.0,
            systolic_max: 120.0,
            diastolic_min: 60.0,
            diastolic_max: 80.0,
        }
    }

    #[test]
    fn no_range_is_unset() {
        let reading = MetricValue::Weight { kg: 70.0 };
        assert_eq!(evaluate(&reading, None), GoalCheck::Unset);
    }

    #[test]
    fn systolic_breach_is_out_of_range() {
        let reading = MetricValue::BloodPressure {
            systolic: 130.0,
            diastolic: 75.0,
        };
        assert_eq!(evaluate(&reading, Some(&bp_goal())), GoalCheck::OutOfRange);
    }

    #[test]
    fn both_dimensions_in_range() {
        let reading = MetricValue::BloodPressure {
            systolic: 118.0,
            diastolic: 79.0,
        };
        assert_eq!(evaluate(&reading, Some(&bp_goal())), GoalCheck::InRange);
    }

    #[test]
    fn bounds_are_inclusive() {
        let reading = MetricValue::BloodPressure {
            systolic: 120.0,
            diastolic: 60.0,
        };
        assert_eq!(evaluate(&reading, Some(&bp_goal())), GoalCheck::InRange);

        let goal = GoalRange::Glucose {
            min: 70.0,
            max: 100.0,
        };
        let reading = MetricValue::Glucose { mg_dl: 100.0 };
        assert_eq!(evaluate(&reading, Some(&goal)), GoalCheck::InRange);
    }

    #[test]
    fn scalar_below_min_is_out_of_range() {
        let goal = GoalRange::Weight {
            min: 60.0,
            max: 80.0,
        };
        let reading = MetricValue::Weight { kg: 55.0 };
        assert_eq!(evaluate(&reading, Some(&goal)), GoalCheck::OutOfRange);
    }

    #[test]
    fn mismatched_kind_is_unset() {
        let reading = MetricValue::Weight { kg: 70.0 };
        assert_eq!(evaluate(&reading, Some(&bp_goal())), GoalCheck::Unset);
    }

    #[test]
    fn classification_is_total_for_configured_ranges() {
        // Every (reading, matching range) pair yields InRange or OutOfRange,
        // never Unset.
        let cases = [
            (
                MetricValue::BloodPressure {
                    systolic: 200.0,
                    diastolic: 40.0,
                },
                bp_goal(),
            ),
            (
                MetricValue::Weight { kg: 0.0 },
                GoalRange::Weight {
                    min: 60.0,
                    max: 80.0,
                },
            ),
            (
                MetricValue::Glucose { mg_dl: 85.0 },
                GoalRange::Glucose {
                    min: 70.0,
                    max: 100.0,
                },
            ),
        ];
        for (value, range) in cases {
            assert_ne!(evaluate(&value, Some(&range)), GoalCheck::Unset);
        }
    }
}
