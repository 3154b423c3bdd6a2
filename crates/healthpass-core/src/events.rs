use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics::GoalCheck;
use crate::reminder::ReminderCategory;

/// Every observable state change in the system produces an Event.
/// The CLI renders them; callers embedding the core can subscribe to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A reminder's anchor has been reached and a dispatch will be attempted.
    ReminderDue {
        reminder_id: Uuid,
        anchor: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// The at-time notification was delivered for this occurrence.
    ReminderFired {
        reminder_id: Uuid,
        category: ReminderCategory,
        title: String,
        anchor: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// The "coming up" advance notice was delivered.
    PreAlertFired {
        reminder_id: Uuid,
        title: String,
        anchor: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// A duplicate delivery attempt for an occurrence that already fired.
    /// Suppressed by design, not an error.
    DispatchSuppressed {
        reminder_id: Uuid,
        anchor: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// Notification permission is missing. Emitted once per scheduler
    /// lifetime as an actionable prompt, not on every retried tick.
    PermissionPrompt {
        at: DateTime<Utc>,
    },
    /// The caller explicitly completed a reminder.
    ReminderCompleted {
        reminder_id: Uuid,
        at: DateTime<Utc>,
    },
    /// A freshly recorded reading was classified against its goal range.
    GoalChecked {
        reading_id: Uuid,
        check: GoalCheck,
        at: DateTime<Utc>,
    },
}
