//! Reminder persistence boundary.
//!
//! The backing store is an external collaborator (a local database or a
//! remote table). The core requires only read-your-writes consistency for a
//! single actor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::{Reminder, ReminderCategory};
use crate::error::StoreError;

/// Filter for listing reminders.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReminderFilter {
    pub enabled: Option<bool>,
    pub category: Option<ReminderCategory>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl ReminderFilter {
    fn matches(&self, reminder: &Reminder) -> bool {
        if let Some(enabled) = self.enabled {
            if reminder.enabled != enabled {
                return false;
            }
        }
        if let Some(category) = self.category {
            if reminder.category != category {
                return false;
            }
        }
        if let Some(from) = self.from {
            if reminder.anchor_time < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if reminder.anchor_time > until {
                return false;
            }
        }
        true
    }
}

/// Durable keyed collection of reminders.
pub trait ReminderStore {
    /// Reminders matching `filter`, ordered by anchor time ascending.
    fn list(&self, filter: &ReminderFilter) -> Result<Vec<Reminder>, StoreError>;

    fn get(&self, id: Uuid) -> Result<Option<Reminder>, StoreError>;

    /// Upsert: the whole record is written, keyed by id.
    fn save(&mut self, reminder: &Reminder) -> Result<(), StoreError>;

    fn delete(&mut self, id: Uuid) -> Result<(), StoreError>;

    /// Enabled, unfired, non-completed reminders whose anchor falls within
    /// `now ..= now + window`.
    fn find_due_within(
        &self,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<Reminder>, StoreError> {
        let filter = ReminderFilter {
            enabled: Some(true),
            from: Some(now),
            until: Some(now + window),
            ..ReminderFilter::default()
        };
        Ok(self
            .list(&filter)?
            .into_iter()
            .filter(|r| r.completed_at.is_none() && !r.occurrence_dispatched())
            .collect())
    }
}

/// In-memory store. Clones share the same map, which lets tests model two
/// delivery channels working against one durable backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryReminderStore {
    inner: Arc<Mutex<HashMap<Uuid, Reminder>>>,
}

impl MemoryReminderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Reminder>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl ReminderStore for MemoryReminderStore {
    fn list(&self, filter: &ReminderFilter) -> Result<Vec<Reminder>, StoreError> {
        let mut reminders: Vec<Reminder> = self
            .lock()
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        reminders.sort_by_key(|r| r.anchor_time);
        Ok(reminders)
    }

    fn get(&self, id: Uuid) -> Result<Option<Reminder>, StoreError> {
        Ok(self.lock().get(&id).cloned())
    }

    fn save(&mut self, reminder: &Reminder) -> Result<(), StoreError> {
        self.lock().insert(reminder.id, reminder.clone());
        Ok(())
    }

    fn delete(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.lock().remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::RepeatRule;

    fn reminder(anchor: DateTime<Utc>) -> Reminder {
        Reminder::new(
            "checkup",
            ReminderCategory::Appointment,
            anchor,
            RepeatRule::None,
        )
    }

    #[test]
    fn save_get_roundtrip() {
        let mut store = MemoryReminderStore::new();
        let r = reminder(Utc::now());
        store.save(&r).unwrap();
        let loaded = store.get(r.id).unwrap().unwrap();
        assert_eq!(loaded.title, "checkup");
    }

    #[test]
    fn list_is_ordered_by_anchor() {
        let mut store = MemoryReminderStore::new();
        let now = Utc::now();
        let late = reminder(now + Duration::hours(2));
        let early = reminder(now + Duration::hours(1));
        store.save(&late).unwrap();
        store.save(&early).unwrap();

        let listed = store.list(&ReminderFilter::default()).unwrap();
        assert_eq!(listed[0].id, early.id);
        assert_eq!(listed[1].id, late.id);
    }

    #[test]
    fn filter_by_enabled() {
        let mut store = MemoryReminderStore::new();
        let mut off = reminder(Utc::now());
        off.enabled = false;
        store.save(&off).unwrap();
        store.save(&reminder(Utc::now())).unwrap();

        let filter = ReminderFilter {
            enabled: Some(true),
            ..ReminderFilter::default()
        };
        assert_eq!(store.list(&filter).unwrap().len(), 1);
    }

    #[test]
    fn due_window_excludes_fired_and_disabled() {
        let mut store = MemoryReminderStore::new();
        let now = Utc::now();

        let due = reminder(now + Duration::minutes(3));
        store.save(&due).unwrap();

        let mut fired = reminder(now + Duration::minutes(2));
        fired.last_dispatched_at = Some(fired.anchor_time);
        store.save(&fired).unwrap();

        let mut disabled = reminder(now + Duration::minutes(1));
        disabled.enabled = false;
        store.save(&disabled).unwrap();

        let found = store.find_due_within(now, Duration::minutes(5)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, due.id);
    }

    #[test]
    fn clones_share_state() {
        let mut store = MemoryReminderStore::new();
        let other = store.clone();
        let r = reminder(Utc::now());
        store.save(&r).unwrap();
        assert!(other.get(r.id).unwrap().is_some());
    }
}
