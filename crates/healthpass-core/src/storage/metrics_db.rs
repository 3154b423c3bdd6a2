//! SQLite-backed vital-sign readings and goal ranges.
//!
//! Readings are append-only; the core never mutates them. Goal ranges are
//! one-per-kind and replaced wholesale on update.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::database::Database;
use crate::error::StoreError;
use crate::metrics::{GoalRange, MetricKind, MetricReading, MetricValue};

// === Helper Functions ===

/// Format metric kind for database storage
fn format_kind(kind: MetricKind) -> &'static str {
    match kind {
        MetricKind::BloodPressure => "blood_pressure",
        MetricKind::Weight => "weight",
        MetricKind::Glucose => "glucose",
    }
}

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Build a MetricReading from a database row
fn row_to_reading(row: &rusqlite::Row) -> Result<MetricReading, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let kind_str: String = row.get(1)?;
    let recorded_str: String = row.get(6)?;

    let value = match kind_str.as_str() {
        "blood_pressure" => MetricValue::BloodPressure {
            systolic: row.get(3)?,
            diastolic: row.get(4)?,
        },
        "weight" => MetricValue::Weight { kg: row.get(2)? },
        _ => MetricValue::Glucose { mg_dl: row.get(2)? },
    };

    Ok(MetricReading {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        value,
        recorded_at: parse_datetime_fallback(&recorded_str),
        notes: row.get(5)?,
    })
}

const SELECT_COLUMNS: &str = "id, kind, value, systolic, diastolic, notes, recorded_at";

/// Append-only reading log plus per-kind goal configuration.
pub struct MetricsDb {
    db: Database,
}

impl MetricsDb {
    /// Open on the default database.
    pub fn open() -> Result<Self, StoreError> {
        Ok(Self {
            db: Database::open()?,
        })
    }

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a reading. Blood pressure writes both dimensions; the scalar
    /// kinds write `value`.
    pub fn record(&self, reading: &MetricReading) -> Result<Uuid, StoreError> {
        let (value, systolic, diastolic) = match reading.value {
            MetricValue::BloodPressure {
                systolic,
                diastolic,
            } => (None, Some(systolic), Some(diastolic)),
            MetricValue::Weight { kg } => (Some(kg), None, None),
            MetricValue::Glucose { mg_dl } => (Some(mg_dl), None, None),
        };
        self.db.conn().execute(
            "INSERT INTO metrics (id, kind, value, systolic, diastolic, notes, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                reading.id.to_string(),
                format_kind(reading.value.kind()),
                value,
                systolic,
                diastolic,
                reading.notes,
                reading.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(reading.id)
    }

    /// Most recent reading of a kind.
    pub fn latest(&self, kind: MetricKind) -> Result<Option<MetricReading>, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM metrics
             WHERE kind = ?1 ORDER BY recorded_at DESC LIMIT 1"
        );
        let mut stmt = self.db.conn().prepare(&sql)?;
        let reading = stmt
            .query_row(params![format_kind(kind)], row_to_reading)
            .optional()?;
        Ok(reading)
    }

    /// Readings of a kind over the last `days`, ascending for charting.
    pub fn history(&self, kind: MetricKind, days: i64) -> Result<Vec<MetricReading>, StoreError> {
        let since = Utc::now() - Duration::days(days);
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM metrics
             WHERE kind = ?1 AND recorded_at >= ?2
             ORDER BY recorded_at ASC"
        );
        let mut stmt = self.db.conn().prepare(&sql)?;
        let rows = stmt.query_map(params![format_kind(kind), since.to_rfc3339()], row_to_reading)?;

        let mut readings = Vec::new();
        for row in rows {
            readings.push(row?);
        }
        Ok(readings)
    }

    /// Replace the goal range for its kind wholesale.
    pub fn set_goal(&self, range: &GoalRange) -> Result<(), StoreError> {
        let payload = serde_json::to_string(range)?;
        self.db.conn().execute(
            "INSERT OR REPLACE INTO goals (kind, payload, updated_at) VALUES (?1, ?2, ?3)",
            params![
                format_kind(range.kind()),
                payload,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The active goal range for a kind, if configured.
    pub fn goal(&self, kind: MetricKind) -> Result<Option<GoalRange>, StoreError> {
        let mut stmt = self
            .db
            .conn()
            .prepare("SELECT payload FROM goals WHERE kind = ?1")?;
        let payload: Option<String> = stmt
            .query_row(params![format_kind(kind)], |row| row.get(0))
            .optional()?;
        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    pub fn clear_goal(&self, kind: MetricKind) -> Result<(), StoreError> {
        self.db
            .conn()
            .execute("DELETE FROM goals WHERE kind = ?1", params![format_kind(kind)])?;
        Ok(())
    }
}
