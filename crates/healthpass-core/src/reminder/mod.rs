//! Reminder entities, repeat rules, and the due-notification machinery.

pub mod recurrence;
pub mod scheduler;
pub mod store;

pub use recurrence::next_occurrence;
pub use scheduler::{ReminderScheduler, SchedulerOptions};
pub use store::{MemoryReminderStore, ReminderFilter, ReminderStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the reminder is about. Drives the notification prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderCategory {
    Medication,
    Appointment,
    Exam,
    Vaccine,
    Other,
}

impl ReminderCategory {
    pub fn icon(&self) -> &'static str {
        match self {
            ReminderCategory::Medication => "\u{1F48A}",  // pill
            ReminderCategory::Appointment => "\u{1F4C5}", // calendar
            ReminderCategory::Exam => "\u{1F4CB}",        // clipboard
            ReminderCategory::Vaccine => "\u{1F489}",     // syringe
            ReminderCategory::Other => "\u{1F514}",       // bell
        }
    }
}

/// Recurrence policy. A closed set -- `next_occurrence` matches every
/// variant explicitly, with no fallthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatRule {
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RepeatRule {
    pub fn repeats(&self) -> bool {
        !matches!(self, RepeatRule::None)
    }
}

/// Derived position of a reminder in its lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    /// Anchor lies in the future (or the reminder is disabled).
    Idle,
    /// Anchor has passed and no delivery covers it yet.
    Due,
    /// The current occurrence was delivered but the anchor has not been
    /// advanced yet (a persist is still pending).
    Dispatched,
    /// Non-repeating and already fired or completed; never fires again
    /// until re-enabled with a new anchor.
    Terminal,
}

/// A user-configured scheduled alert with optional recurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: ReminderCategory,
    /// The next (or original) scheduled instant. For a repeating reminder
    /// this is always advanced strictly forward once passed.
    pub anchor_time: DateTime<Utc>,
    pub repeat: RepeatRule,
    pub enabled: bool,
    /// Set by an explicit caller action; terminal for non-repeating rules.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Anchor instant covered by the last successful dispatch. This is the
    /// durable dedup marker shared by both delivery channels; it records the
    /// occurrence, not the wall-clock moment of delivery.
    #[serde(default)]
    pub last_dispatched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    /// Create an enabled reminder. An anchor already in the past is kept as
    /// given and becomes due on the first tick.
    pub fn new(
        title: impl Into<String>,
        category: ReminderCategory,
        anchor_time: DateTime<Utc>,
        repeat: RepeatRule,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            category,
            anchor_time,
            repeat,
            enabled: true,
            completed_at: None,
            last_dispatched_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The current occurrence was already delivered through some channel.
    pub fn occurrence_dispatched(&self) -> bool {
        self.last_dispatched_at
            .is_some_and(|t| t >= self.anchor_time)
    }

    /// A non-repeating reminder that has fired or been completed never
    /// fires again.
    pub fn is_terminal(&self) -> bool {
        self.repeat == RepeatRule::None
            && (self.completed_at.is_some() || self.occurrence_dispatched())
    }

    pub fn state(&self, now: DateTime<Utc>) -> ReminderState {
        if self.is_terminal() {
            ReminderState::Terminal
        } else if !self.enabled || now < self.anchor_time {
            ReminderState::Idle
        } else if self.occurrence_dispatched() {
            ReminderState::Dispatched
        } else {
            ReminderState::Due
        }
    }

    /// Explicit completion. Point awarding and audit logging belong to the
    /// persistence backend, not the core.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.completed_at = Some(at);
    }

    /// Re-enable with a fresh anchor, clearing terminal/dispatch history so
    /// the reminder starts clean.
    pub fn reschedule(&mut self, anchor_time: DateTime<Utc>) {
        self.anchor_time = anchor_time;
        self.enabled = true;
        self.completed_at = None;
        self.last_dispatched_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base(repeat: RepeatRule, anchor: DateTime<Utc>) -> Reminder {
        Reminder::new("take meds", ReminderCategory::Medication, anchor, repeat)
    }

    #[test]
    fn new_reminder_is_enabled_and_idle_before_anchor() {
        let now = Utc::now();
        let reminder = base(RepeatRule::None, now + Duration::hours(1));
        assert!(reminder.enabled);
        assert_eq!(reminder.state(now), ReminderState::Idle);
    }

    #[test]
    fn due_once_anchor_passes() {
        let now = Utc::now();
        let reminder = base(RepeatRule::Daily, now - Duration::minutes(1));
        assert_eq!(reminder.state(now), ReminderState::Due);
    }

    #[test]
    fn dispatched_marker_makes_none_rule_terminal() {
        let now = Utc::now();
        let mut reminder = base(RepeatRule::None, now - Duration::minutes(1));
        reminder.last_dispatched_at = Some(reminder.anchor_time);
        assert!(reminder.is_terminal());
        assert_eq!(reminder.state(now), ReminderState::Terminal);
    }

    #[test]
    fn repeating_rule_is_never_terminal() {
        let now = Utc::now();
        let mut reminder = base(RepeatRule::Weekly, now - Duration::minutes(1));
        reminder.last_dispatched_at = Some(reminder.anchor_time);
        assert!(!reminder.is_terminal());
        assert_eq!(reminder.state(now), ReminderState::Dispatched);
    }

    #[test]
    fn reschedule_clears_history() {
        let now = Utc::now();
        let mut reminder = base(RepeatRule::None, now - Duration::hours(1));
        reminder.last_dispatched_at = Some(reminder.anchor_time);
        reminder.complete(now);
        reminder.enabled = false;

        reminder.reschedule(now + Duration::hours(2));
        assert!(reminder.enabled);
        assert!(reminder.completed_at.is_none());
        assert!(reminder.last_dispatched_at.is_none());
        assert_eq!(reminder.state(now), ReminderState::Idle);
    }
}
