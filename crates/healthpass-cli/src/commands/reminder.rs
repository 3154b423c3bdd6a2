//! Reminder management commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use healthpass_core::reminder::{Reminder, ReminderCategory, ReminderFilter, RepeatRule};
use healthpass_core::storage::SqliteReminderStore;
use healthpass_core::{Event, ReminderStore};
use uuid::Uuid;

use super::parse_datetime;

#[derive(Subcommand)]
pub enum ReminderAction {
    /// Create a new reminder
    Add {
        /// Reminder title
        title: String,
        /// When the reminder is due (RFC 3339 or 'YYYY-MM-DD HH:MM' local)
        at: String,
        /// Reminder description
        #[arg(long)]
        description: Option<String>,
        /// Category: medication, appointment, exam, vaccine, or other
        #[arg(long, default_value = "other")]
        category: String,
        /// Repeat rule: none, daily, weekly, monthly, or yearly
        #[arg(long, default_value = "none")]
        repeat: String,
    },
    /// List reminders
    List {
        /// Only enabled or only disabled reminders
        #[arg(long)]
        enabled: Option<bool>,
        /// Filter by category
        #[arg(long)]
        category: Option<String>,
    },
    /// Get reminder details
    Get {
        /// Reminder ID
        id: String,
    },
    /// Update a reminder
    Update {
        /// Reminder ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New due time (clears dispatch history)
        #[arg(long)]
        at: Option<String>,
        /// New repeat rule
        #[arg(long)]
        repeat: Option<String>,
    },
    /// Enable a reminder
    Enable {
        /// Reminder ID
        id: String,
    },
    /// Disable a reminder
    Disable {
        /// Reminder ID
        id: String,
    },
    /// Mark a reminder as completed
    Complete {
        /// Reminder ID
        id: String,
    },
    /// Delete a reminder
    Delete {
        /// Reminder ID
        id: String,
    },
}

fn parse_category(s: &str) -> Result<ReminderCategory, Box<dyn std::error::Error>> {
    match s {
        "medication" => Ok(ReminderCategory::Medication),
        "appointment" => Ok(ReminderCategory::Appointment),
        "exam" => Ok(ReminderCategory::Exam),
        "vaccine" => Ok(ReminderCategory::Vaccine),
        "other" => Ok(ReminderCategory::Other),
        _ => Err(format!("unknown category: {s}").into()),
    }
}

fn parse_repeat(s: &str) -> Result<RepeatRule, Box<dyn std::error::Error>> {
    match s {
        "none" => Ok(RepeatRule::None),
        "daily" => Ok(RepeatRule::Daily),
        "weekly" => Ok(RepeatRule::Weekly),
        "monthly" => Ok(RepeatRule::Monthly),
        "yearly" => Ok(RepeatRule::Yearly),
        _ => Err(format!("unknown repeat rule: {s}").into()),
    }
}

fn load(store: &SqliteReminderStore, id: &str) -> Result<Reminder, Box<dyn std::error::Error>> {
    let id = Uuid::parse_str(id)?;
    store
        .get(id)?
        .ok_or_else(|| format!("no reminder with id {id}").into())
}

pub fn run(action: ReminderAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteReminderStore::open()?;

    match action {
        ReminderAction::Add {
            title,
            at,
            description,
            category,
            repeat,
        } => {
            let reminder = Reminder::new(
                title,
                parse_category(&category)?,
                parse_datetime(&at)?,
                parse_repeat(&repeat)?,
            )
            .with_description(description.unwrap_or_default());
            store.save(&reminder)?;
            println!("Reminder created: {}", reminder.id);
            println!("{}", serde_json::to_string_pretty(&reminder)?);
        }
        ReminderAction::List { enabled, category } => {
            let filter = ReminderFilter {
                enabled,
                category: category.as_deref().map(parse_category).transpose()?,
                ..ReminderFilter::default()
            };
            let reminders = store.list(&filter)?;
            println!("{}", serde_json::to_string_pretty(&reminders)?);
        }
        ReminderAction::Get { id } => {
            let reminder = load(&store, &id)?;
            println!("{}", serde_json::to_string_pretty(&reminder)?);
        }
        ReminderAction::Update {
            id,
            title,
            description,
            at,
            repeat,
        } => {
            let mut reminder = load(&store, &id)?;
            if let Some(title) = title {
                reminder.title = title;
            }
            if let Some(description) = description {
                reminder.description = description;
            }
            if let Some(repeat) = repeat {
                reminder.repeat = parse_repeat(&repeat)?;
            }
            if let Some(at) = at {
                // A new anchor starts a fresh cycle.
                reminder.reschedule(parse_datetime(&at)?);
            }
            store.save(&reminder)?;
            println!("{}", serde_json::to_string_pretty(&reminder)?);
        }
        ReminderAction::Enable { id } => {
            let mut reminder = load(&store, &id)?;
            reminder.enabled = true;
            store.save(&reminder)?;
            println!("Reminder enabled: {}", reminder.id);
        }
        ReminderAction::Disable { id } => {
            let mut reminder = load(&store, &id)?;
            reminder.enabled = false;
            store.save(&reminder)?;
            println!("Reminder disabled: {}", reminder.id);
        }
        ReminderAction::Complete { id } => {
            let mut reminder = load(&store, &id)?;
            let at = Utc::now();
            reminder.complete(at);
            store.save(&reminder)?;
            let event = Event::ReminderCompleted {
                reminder_id: reminder.id,
                at,
            };
            tracing::debug!(?event);
            println!("Reminder completed: {}", reminder.id);
        }
        ReminderAction::Delete { id } => {
            let id = Uuid::parse_str(&id)?;
            store.delete(id)?;
            println!("Reminder deleted: {id}");
        }
    }
    Ok(())
}
