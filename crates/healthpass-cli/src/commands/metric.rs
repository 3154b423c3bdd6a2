//! Vital-sign recording commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use healthpass_core::metrics::{self, GoalCheck, MetricKind, MetricReading, MetricValue};
use healthpass_core::storage::MetricsDb;
use healthpass_core::Event;

#[derive(Subcommand)]
pub enum MetricAction {
    /// Record a blood-pressure measurement
    RecordBp {
        /// Systolic pressure (mmHg)
        systolic: f64,
        /// Diastolic pressure (mmHg)
        diastolic: f64,
        /// Free-text note
        #[arg(long)]
        notes: Option<String>,
    },
    /// Record a body-weight measurement
    RecordWeight {
        /// Weight (kg)
        kg: f64,
        /// Free-text note
        #[arg(long)]
        notes: Option<String>,
    },
    /// Record a glucose measurement
    RecordGlucose {
        /// Glucose (mg/dL)
        mg_dl: f64,
        /// Free-text note
        #[arg(long)]
        notes: Option<String>,
    },
    /// List readings of a kind
    List {
        /// Metric kind: bp, weight, or glucose
        kind: String,
        /// History window in days
        #[arg(long, default_value = "30")]
        days: i64,
    },
    /// Show the most recent reading of a kind
    Latest {
        /// Metric kind: bp, weight, or glucose
        kind: String,
    },
}

pub fn parse_kind(s: &str) -> Result<MetricKind, Box<dyn std::error::Error>> {
    match s {
        "bp" | "blood-pressure" | "blood_pressure" => Ok(MetricKind::BloodPressure),
        "weight" => Ok(MetricKind::Weight),
        "glucose" => Ok(MetricKind::Glucose),
        _ => Err(format!("unknown metric kind: {s}").into()),
    }
}

fn record(db: &MetricsDb, value: MetricValue, notes: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let mut reading = MetricReading::new(value, Utc::now());
    reading.notes = notes;
    db.record(&reading)?;

    // Immediate feedback against the configured goal; never alert when no
    // goal is set.
    let goal = db.goal(value.kind())?;
    let check = metrics::evaluate(&value, goal.as_ref());
    let event = Event::GoalChecked {
        reading_id: reading.id,
        check,
        at: reading.recorded_at,
    };
    tracing::debug!(?event);
    match check {
        GoalCheck::InRange => {
            println!("Recorded {}: within your goal range", value.kind().label());
        }
        GoalCheck::OutOfRange => {
            println!(
                "\u{26A0}\u{FE0F} Recorded {}: outside your goal range!",
                value.kind().label()
            );
        }
        GoalCheck::Unset => {
            println!("Recorded {}", value.kind().label());
        }
    }
    println!("{}", serde_json::to_string_pretty(&reading)?);
    Ok(())
}

pub fn run(action: MetricAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = MetricsDb::open()?;

    match action {
        MetricAction::RecordBp {
            systolic,
            diastolic,
            notes,
        } => record(
            &db,
            MetricValue::BloodPressure {
                systolic,
                diastolic,
            },
            notes,
        )?,
        MetricAction::RecordWeight { kg, notes } => {
            record(&db, MetricValue::Weight { kg }, notes)?
        }
        MetricAction::RecordGlucose { mg_dl, notes } => {
            record(&db, MetricValue::Glucose { mg_dl }, notes)?
        }
        MetricAction::List { kind, days } => {
            let readings = db.history(parse_kind(&kind)?, days)?;
            println!("{}", serde_json::to_string_pretty(&readings)?);
        }
        MetricAction::Latest { kind } => {
            let reading = db.latest(parse_kind(&kind)?)?;
            println!("{}", serde_json::to_string_pretty(&reading)?);
        }
    }
    Ok(())
}
