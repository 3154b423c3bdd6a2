//! Vital-sign readings and user-configured goal ranges.
//!
//! Readings are append-only: once recorded they are never mutated by the
//! core. One goal range is active per metric kind and is overwritten
//! wholesale on update.

pub mod goal;

pub use goal::{evaluate, GoalCheck};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Tracked vital-sign kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    BloodPressure,
    Weight,
    Glucose,
}

impl MetricKind {
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::BloodPressure => "blood pressure",
            MetricKind::Weight => "weight",
            MetricKind::Glucose => "glucose",
        }
    }
}

/// One measured value. Blood pressure carries both dimensions of a single
/// measurement; the other kinds are scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricValue {
    BloodPressure { systolic: f64, diastolic: f64 },
    Weight { kg: f64 },
    Glucose { mg_dl: f64 },
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::BloodPressure { .. } => MetricKind::BloodPressure,
            MetricValue::Weight { .. } => MetricKind::Weight,
            MetricValue::Glucose { .. } => MetricKind::Glucose,
        }
    }
}

/// A recorded vital-sign reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricReading {
    pub id: Uuid,
    pub value: MetricValue,
    pub recorded_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl MetricReading {
    pub fn new(value: MetricValue, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            value,
            recorded_at,
            notes: None,
        }
    }
}

/// User-configured acceptable interval for one metric kind. Blood pressure
/// has two independent pairs; both must hold for a reading to be in range.
///
/// The evaluator does not assume `min <= max` -- a reversed range simply
/// classifies every reading out of range. `validate` rejects reversed
/// ranges so they are caught where the range is configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GoalRange {
    BloodPressure {
        systolic_min: f64,
        systolic_max: f64,
        diastolic_min: f64,
        diastolic_max: f64,
    },
    Weight {
        min: f64,
        max: f64,
    },
    Glucose {
        min: f64,
        max: f64,
    },
}

impl GoalRange {
    pub fn kind(&self) -> MetricKind {
        match self {
            GoalRange::BloodPressure { .. } => MetricKind::BloodPressure,
            GoalRange::Weight { .. } => MetricKind::Weight,
            GoalRange::Glucose { .. } => MetricKind::Glucose,
        }
    }

    /// Reject ranges whose lower bound exceeds the upper bound.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let check = |metric: &str, min: f64, max: f64| {
            if min > max {
                Err(ValidationError::InvalidRange {
                    metric: metric.to_string(),
                    min,
                    max,
                })
            } else {
                Ok(())
            }
        };
        match *self {
            GoalRange::BloodPressure {
                systolic_min,
                systolic_max,
                diastolic_min,
                diastolic_max,
            } => {
                check("systolic", systolic_min, systolic_max)?;
                check("diastolic", diastolic_min, diastolic_max)
            }
            GoalRange::Weight { min, max } => check("weight", min, max),
            GoalRange::Glucose { min, max } => check("glucose", min, max),
        }
    }
}
