//! Notification dispatch and deduplication.
//!
//! Two delivery channels can observe the same due reminder: the foreground
//! watch loop and a background wake-up. The dispatcher's in-memory key set
//! guards against duplicates within one process; the durable
//! `last_dispatched_at` marker on the reminder row (written by the
//! scheduler) guards across processes. No occurrence is ever shown twice.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::NotifyError;

/// Which alert a delivery attempt belongs to. The advance notice and the
/// at-time alert dedup independently for the same occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    AtTime,
    PreAlert,
}

/// Identifies one delivery attempt: a reminder, the occurrence it covers,
/// and the alert kind. Transient -- never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub reminder_id: Uuid,
    pub fire_at: DateTime<Utc>,
    pub kind: AlertKind,
}

/// Outcome of a dispatch attempt. `SuppressedDuplicate` is by design, not
/// an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    Delivered,
    SuppressedDuplicate,
    Failed(NotifyError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Platform delivery boundary: a system notification center, a push
/// network, or the CLI console.
pub trait NotificationChannel {
    fn request_permission(&mut self) -> Permission;

    /// Emit a user-visible alert now. `target` is the in-app route opened
    /// when the user taps the notification.
    fn show(
        &mut self,
        title: &str,
        body: &str,
        key: DedupKey,
        target: &str,
    ) -> Result<(), NotifyError>;

    /// Non-blocking registration of a future wake-up with the platform.
    /// Fire-and-forget: the caller never waits on actual display.
    fn schedule_for(&mut self, instant: DateTime<Utc>, reminder_id: Uuid)
        -> Result<(), NotifyError>;

    /// Cancel any registered wake-up for the reminder.
    fn cancel(&mut self, reminder_id: Uuid);
}

/// Dedup-guarded dispatcher over one delivery channel.
pub struct Dispatcher<C> {
    channel: C,
    seen: HashSet<DedupKey>,
    /// In-app route carried on every notification.
    target: String,
}

impl<C: NotificationChannel> Dispatcher<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            seen: HashSet::new(),
            target: "/reminders".to_string(),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Attempt delivery. A repeated key within this process lifetime is
    /// suppressed without touching the channel.
    pub fn dispatch(&mut self, key: DedupKey, title: &str, body: &str) -> DispatchResult {
        if self.seen.contains(&key) {
            debug!(reminder_id = %key.reminder_id, kind = ?key.kind, "duplicate dispatch suppressed");
            return DispatchResult::SuppressedDuplicate;
        }
        if self.channel.request_permission() == Permission::Denied {
            return DispatchResult::Failed(NotifyError::PermissionDenied);
        }
        match self.channel.show(title, body, key, &self.target) {
            Ok(()) => {
                self.seen.insert(key);
                info!(reminder_id = %key.reminder_id, kind = ?key.kind, "notification delivered");
                DispatchResult::Delivered
            }
            Err(err) => {
                warn!(reminder_id = %key.reminder_id, error = %err, "notification delivery failed");
                DispatchResult::Failed(err)
            }
        }
    }

    /// Record a key as delivered without emitting -- used when the durable
    /// marker shows another channel already covered the occurrence.
    pub fn mark_delivered(&mut self, key: DedupKey) {
        self.seen.insert(key);
    }

    /// Drop all dedup state and platform wake-ups for one reminder, so a
    /// later re-enable starts clean.
    pub fn forget(&mut self, reminder_id: Uuid) {
        self.seen.retain(|k| k.reminder_id != reminder_id);
        self.channel.cancel(reminder_id);
    }

    /// Drop dedup state and wake-ups for every reminder not in `known`
    /// (deleted since the last tick).
    pub fn retain_known(&mut self, known: &HashSet<Uuid>) {
        let stale: HashSet<Uuid> = self
            .seen
            .iter()
            .map(|k| k.reminder_id)
            .filter(|id| !known.contains(id))
            .collect();
        if stale.is_empty() {
            return;
        }
        self.seen.retain(|k| known.contains(&k.reminder_id));
        for id in stale {
            self.channel.cancel(id);
        }
    }

    pub fn schedule_wakeup(
        &mut self,
        instant: DateTime<Utc>,
        reminder_id: Uuid,
    ) -> Result<(), NotifyError> {
        self.channel.schedule_for(instant, reminder_id)
    }
}

/// Console-backed channel used by the CLI watch loop. Permission maps to
/// the `notifications.enabled` config switch.
pub struct ConsoleChannel {
    enabled: bool,
}

impl ConsoleChannel {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl NotificationChannel for ConsoleChannel {
    fn request_permission(&mut self) -> Permission {
        if self.enabled {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    fn show(
        &mut self,
        title: &str,
        body: &str,
        key: DedupKey,
        _target: &str,
    ) -> Result<(), NotifyError> {
        match key.kind {
            AlertKind::PreAlert => println!("(coming up) {title} -- {body}"),
            AlertKind::AtTime => println!("{title} -- {body}"),
        }
        Ok(())
    }

    fn schedule_for(
        &mut self,
        _instant: DateTime<Utc>,
        _reminder_id: Uuid,
    ) -> Result<(), NotifyError> {
        // The watch loop polls; there is no platform timer to register.
        Ok(())
    }

    fn cancel(&mut self, _reminder_id: Uuid) {}
}
