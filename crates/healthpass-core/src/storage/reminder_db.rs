//! SQLite-backed reminder storage.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::database::Database;
use crate::error::StoreError;
use crate::reminder::store::{ReminderFilter, ReminderStore};
use crate::reminder::{Reminder, ReminderCategory, RepeatRule};

// === Helper Functions ===

/// Parse reminder category from database string
fn parse_category(category_str: &str) -> ReminderCategory {
    match category_str {
        "medication" => ReminderCategory::Medication,
        "appointment" => ReminderCategory::Appointment,
        "exam" => ReminderCategory::Exam,
        "vaccine" => ReminderCategory::Vaccine,
        _ => ReminderCategory::Other,
    }
}

/// Format reminder category for database storage
fn format_category(category: ReminderCategory) -> &'static str {
    match category {
        ReminderCategory::Medication => "medication",
        ReminderCategory::Appointment => "appointment",
        ReminderCategory::Exam => "exam",
        ReminderCategory::Vaccine => "vaccine",
        ReminderCategory::Other => "other",
    }
}

/// Parse repeat rule from database string
fn parse_repeat(repeat_str: &str) -> RepeatRule {
    match repeat_str {
        "daily" => RepeatRule::Daily,
        "weekly" => RepeatRule::Weekly,
        "monthly" => RepeatRule::Monthly,
        "yearly" => RepeatRule::Yearly,
        _ => RepeatRule::None,
    }
}

/// Format repeat rule for database storage
fn format_repeat(repeat: RepeatRule) -> &'static str {
    match repeat {
        RepeatRule::None => "none",
        RepeatRule::Daily => "daily",
        RepeatRule::Weekly => "weekly",
        RepeatRule::Monthly => "monthly",
        RepeatRule::Yearly => "yearly",
    }
}

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Parse an optional datetime column; unparseable values map to None
fn parse_datetime_opt(dt_str: Option<String>) -> Option<DateTime<Utc>> {
    dt_str.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

/// Build a Reminder from a database row
fn row_to_reminder(row: &rusqlite::Row) -> Result<Reminder, rusqlite::Error> {
    let id_str: String = row.get(0)?;
    let category_str: String = row.get(3)?;
    let anchor_str: String = row.get(4)?;
    let repeat_str: String = row.get(5)?;
    let created_str: String = row.get(9)?;

    Ok(Reminder {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        title: row.get(1)?,
        description: row.get(2)?,
        category: parse_category(&category_str),
        anchor_time: parse_datetime_fallback(&anchor_str),
        repeat: parse_repeat(&repeat_str),
        enabled: row.get::<_, i64>(6)? != 0,
        completed_at: parse_datetime_opt(row.get(7)?),
        last_dispatched_at: parse_datetime_opt(row.get(8)?),
        created_at: parse_datetime_fallback(&created_str),
    })
}

const SELECT_COLUMNS: &str = "id, title, description, category, anchor_time, repeat_rule, \
                              enabled, completed_at, last_dispatched_at, created_at";

/// Durable reminder store over SQLite.
pub struct SqliteReminderStore {
    db: Database,
}

impl SqliteReminderStore {
    /// Open the store on the default database.
    pub fn open() -> Result<Self, StoreError> {
        Ok(Self {
            db: Database::open()?,
        })
    }

    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl ReminderStore for SqliteReminderStore {
    fn list(&self, filter: &ReminderFilter) -> Result<Vec<Reminder>, StoreError> {
        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM reminders WHERE 1=1");
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(enabled) = filter.enabled {
            sql.push_str(" AND enabled = ?");
            args.push(Box::new(enabled as i64));
        }
        if let Some(category) = filter.category {
            sql.push_str(" AND category = ?");
            args.push(Box::new(format_category(category).to_string()));
        }
        if let Some(from) = filter.from {
            sql.push_str(" AND anchor_time >= ?");
            args.push(Box::new(from.to_rfc3339()));
        }
        if let Some(until) = filter.until {
            sql.push_str(" AND anchor_time <= ?");
            args.push(Box::new(until.to_rfc3339()));
        }
        sql.push_str(" ORDER BY anchor_time ASC");

        let mut stmt = self.db.conn().prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), row_to_reminder)?;

        let mut reminders = Vec::new();
        for row in rows {
            reminders.push(row?);
        }
        Ok(reminders)
    }

    fn get(&self, id: Uuid) -> Result<Option<Reminder>, StoreError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM reminders WHERE id = ?1");
        let mut stmt = self.db.conn().prepare(&sql)?;
        let reminder = stmt
            .query_row(params![id.to_string()], row_to_reminder)
            .optional()?;
        Ok(reminder)
    }

    fn save(&mut self, reminder: &Reminder) -> Result<(), StoreError> {
        self.db.conn().execute(
            "INSERT OR REPLACE INTO reminders
             (id, title, description, category, anchor_time, repeat_rule,
              enabled, completed_at, last_dispatched_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                reminder.id.to_string(),
                reminder.title,
                reminder.description,
                format_category(reminder.category),
                reminder.anchor_time.to_rfc3339(),
                format_repeat(reminder.repeat),
                reminder.enabled as i64,
                reminder.completed_at.map(|t| t.to_rfc3339()),
                reminder.last_dispatched_at.map(|t| t.to_rfc3339()),
                reminder.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.db
            .conn()
            .execute("DELETE FROM reminders WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    fn find_due_within(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<Reminder>, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM reminders
             WHERE enabled = 1
               AND completed_at IS NULL
               AND anchor_time >= ?1
               AND anchor_time <= ?2
               AND (last_dispatched_at IS NULL OR last_dispatched_at < anchor_time)
             ORDER BY anchor_time ASC"
        );
        let mut stmt = self.db.conn().prepare(&sql)?;
        let rows = stmt.query_map(
            params![now.to_rfc3339(), (now + window).to_rfc3339()],
            row_to_reminder,
        )?;

        let mut reminders = Vec::new();
        for row in rows {
            reminders.push(row?);
        }
        Ok(reminders)
    }
}
