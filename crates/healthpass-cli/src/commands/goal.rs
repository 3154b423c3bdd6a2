//! Goal range commands for CLI.

use clap::Subcommand;
use healthpass_core::metrics::{GoalRange, MetricKind};
use healthpass_core::storage::MetricsDb;

use super::metric::parse_kind;

#[derive(Subcommand)]
pub enum GoalAction {
    /// Set the blood-pressure goal range
    SetBp {
        /// Lowest acceptable systolic (mmHg)
        systolic_min: f64,
        /// Highest acceptable systolic (mmHg)
        systolic_max: f64,
        /// Lowest acceptable diastolic (mmHg)
        diastolic_min: f64,
        /// Highest acceptable diastolic (mmHg)
        diastolic_max: f64,
    },
    /// Set the weight goal range
    SetWeight {
        /// Lowest acceptable weight (kg)
        min: f64,
        /// Highest acceptable weight (kg)
        max: f64,
    },
    /// Set the glucose goal range
    SetGlucose {
        /// Lowest acceptable glucose (mg/dL)
        min: f64,
        /// Highest acceptable glucose (mg/dL)
        max: f64,
    },
    /// Show configured goal ranges
    Show,
    /// Clear the goal range for a kind
    Clear {
        /// Metric kind: bp, weight, or glucose
        kind: String,
    },
}

fn set(db: &MetricsDb, range: GoalRange) -> Result<(), Box<dyn std::error::Error>> {
    range.validate()?;
    db.set_goal(&range)?;
    println!("{}", serde_json::to_string_pretty(&range)?);
    Ok(())
}

pub fn run(action: GoalAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = MetricsDb::open()?;

    match action {
        GoalAction::SetBp {
            systolic_min,
            systolic_max,
            diastolic_min,
            diastolic_max,
        } => set(
            &db,
            GoalRange::BloodPressure {
                systolic_min,
                systolic_max,
                diastolic_min,
                diastolic_max,
            },
        )?,
        GoalAction::SetWeight { min, max } => set(&db, GoalRange::Weight { min, max })?,
        GoalAction::SetGlucose { min, max } => set(&db, GoalRange::Glucose { min, max })?,
        GoalAction::Show => {
            let kinds = [
                MetricKind::BloodPressure,
                MetricKind::Weight,
                MetricKind::Glucose,
            ];
            for kind in kinds {
                match db.goal(kind)? {
                    Some(range) => {
                        println!("{}: {}", kind.label(), serde_json::to_string(&range)?)
                    }
                    None => println!("{}: not set", kind.label()),
                }
            }
        }
        GoalAction::Clear { kind } => {
            let kind = parse_kind(&kind)?;
            db.clear_goal(kind)?;
            println!("Cleared {} goal", kind.label());
        }
    }
    Ok(())
}
