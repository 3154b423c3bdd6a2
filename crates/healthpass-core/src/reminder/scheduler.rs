//! Due-reminder evaluation.
//!
//! The scheduler is a wall-clock-based state machine. It does not use
//! internal threads -- the caller is responsible for invoking `tick()`
//! periodically, from whichever delivery channel woke up.
//!
//! ## State Transitions (per reminder)
//!
//! ```text
//! Idle -> Due -> Dispatched -> (Idle | Terminal)
//! ```
//!
//! A repeating reminder re-enters `Idle` with its anchor advanced; a
//! non-repeating one becomes `Terminal` pending explicit completion.
//!
//! Two uncoordinated tick sources may drive the same store. Correctness
//! rests on the durable `last_dispatched_at` marker written next to the
//! reminder: any channel reads it before dispatching, so no occurrence
//! fires twice even without a shared lock.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use super::recurrence::next_occurrence;
use super::store::{ReminderFilter, ReminderStore};
use super::Reminder;
use crate::clock::Clock;
use crate::error::{CoreError, NotifyError};
use crate::events::Event;
use crate::notify::{AlertKind, DedupKey, DispatchResult, Dispatcher, NotificationChannel};

/// Scheduler tuning knobs, sourced from config.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    /// "Coming up" window before the anchor. Zero disables pre-alerts.
    pub pre_alert: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            pre_alert: Duration::minutes(5),
        }
    }
}

/// Evaluates every stored reminder against the injected clock and drives
/// notification delivery through the dispatcher.
pub struct ReminderScheduler<S, C, K> {
    store: S,
    dispatcher: Dispatcher<C>,
    clock: K,
    options: SchedulerOptions,
    permission_prompted: bool,
}

impl<S, C, K> ReminderScheduler<S, C, K>
where
    S: ReminderStore,
    C: NotificationChannel,
    K: Clock,
{
    pub fn new(store: S, channel: C, clock: K) -> Self {
        Self::with_options(store, channel, clock, SchedulerOptions::default())
    }

    pub fn with_options(store: S, channel: C, clock: K, options: SchedulerOptions) -> Self {
        Self {
            store,
            dispatcher: Dispatcher::new(channel),
            clock,
            options,
            permission_prompted: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn channel(&self) -> &C {
        self.dispatcher.channel()
    }

    pub fn channel_mut(&mut self) -> &mut C {
        self.dispatcher.channel_mut()
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// One evaluation pass over every reminder in the store.
    ///
    /// Safe to call from any delivery channel, at any frequency; redundant
    /// calls are idempotent per occurrence. A failure in one reminder's
    /// evaluation is logged and never aborts the pass for the others.
    pub fn tick(&mut self) -> Vec<Event> {
        let now = self.clock.now();
        let reminders = match self.store.list(&ReminderFilter::default()) {
            Ok(reminders) => reminders,
            Err(error) => {
                warn!(error = %error, "reminder store unavailable; skipping tick");
                return Vec::new();
            }
        };

        // Reminders deleted since the last tick keep no dedup state or
        // platform wake-ups behind.
        let known: HashSet<_> = reminders.iter().map(|r| r.id).collect();
        self.dispatcher.retain_known(&known);

        let mut events = Vec::new();
        for reminder in reminders {
            let id = reminder.id;
            if let Err(error) = self.evaluate(reminder, now, &mut events) {
                warn!(reminder_id = %id, error = %error, "reminder evaluation failed; continuing");
            }
        }
        events
    }

    fn evaluate(
        &mut self,
        mut reminder: Reminder,
        now: DateTime<Utc>,
        events: &mut Vec<Event>,
    ) -> Result<(), CoreError> {
        if !reminder.enabled {
            // Disabled mid-cycle: never due, and any pending dedup state or
            // registered wake-up is cleared so a re-enable starts clean.
            self.dispatcher.forget(reminder.id);
            return Ok(());
        }
        if reminder.is_terminal() {
            return Ok(());
        }

        if now < reminder.anchor_time {
            if self.options.pre_alert > Duration::zero()
                && reminder.anchor_time - now <= self.options.pre_alert
            {
                self.pre_alert(&reminder, now, events);
            }
            // Keep the platform wake-up registered for the anchor. Losing
            // this registration only degrades to polling, so a failure is
            // not an error.
            if let Err(error) = self
                .dispatcher
                .schedule_wakeup(reminder.anchor_time, reminder.id)
            {
                debug!(reminder_id = %reminder.id, error = %error, "wake-up registration failed");
            }
            return Ok(());
        }

        let key = DedupKey {
            reminder_id: reminder.id,
            fire_at: reminder.anchor_time,
            kind: AlertKind::AtTime,
        };

        if reminder.occurrence_dispatched() {
            // The durable marker says another channel (or an earlier tick
            // whose save did not stick) already delivered this occurrence.
            // Align the local dedup state and finish the pending persist.
            self.dispatcher.mark_delivered(key);
            events.push(Event::DispatchSuppressed {
                reminder_id: reminder.id,
                anchor: reminder.anchor_time,
                at: now,
            });
            return self.persist_dispatched(reminder, now);
        }

        events.push(Event::ReminderDue {
            reminder_id: reminder.id,
            anchor: reminder.anchor_time,
            at: now,
        });

        let title = format!("{} {}", reminder.category.icon(), reminder.title);
        match self.dispatcher.dispatch(key, &title, &reminder.description) {
            DispatchResult::Delivered => {
                events.push(Event::ReminderFired {
                    reminder_id: reminder.id,
                    category: reminder.category,
                    title: reminder.title.clone(),
                    anchor: reminder.anchor_time,
                    at: now,
                });
                reminder.last_dispatched_at = Some(reminder.anchor_time);
                self.persist_dispatched(reminder, now)?;
            }
            DispatchResult::SuppressedDuplicate => {
                // Delivered earlier in this process, but the marker never
                // reached the store. Do not re-show; re-persist.
                events.push(Event::DispatchSuppressed {
                    reminder_id: reminder.id,
                    anchor: reminder.anchor_time,
                    at: now,
                });
                reminder.last_dispatched_at = Some(reminder.anchor_time);
                self.persist_dispatched(reminder, now)?;
            }
            DispatchResult::Failed(NotifyError::PermissionDenied) => {
                self.note_permission_denied(now, events);
                // Stays Due; retried on every tick until permission is
                // granted or the reminder is disabled.
            }
            DispatchResult::Failed(error) => {
                warn!(reminder_id = %reminder.id, error = %error, "delivery failed; reminder stays due");
            }
        }
        Ok(())
    }

    /// Write the dispatch marker back to the store and, for repeating
    /// rules, advance the anchor to the next occurrence.
    fn persist_dispatched(
        &mut self,
        mut reminder: Reminder,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if reminder.repeat.repeats() {
            reminder.anchor_time = next_occurrence(reminder.anchor_time, reminder.repeat, now)?;
        }
        self.store.save(&reminder)?;
        if reminder.repeat.repeats() {
            if let Err(error) = self
                .dispatcher
                .schedule_wakeup(reminder.anchor_time, reminder.id)
            {
                debug!(reminder_id = %reminder.id, error = %error, "wake-up registration failed");
            }
        }
        Ok(())
    }

    fn pre_alert(&mut self, reminder: &Reminder, now: DateTime<Utc>, events: &mut Vec<Event>) {
        let key = DedupKey {
            reminder_id: reminder.id,
            fire_at: reminder.anchor_time,
            kind: AlertKind::PreAlert,
        };
        let title = format!("{} {}", reminder.category.icon(), reminder.title);
        match self.dispatcher.dispatch(key, &title, &reminder.description) {
            DispatchResult::Delivered => {
                events.push(Event::PreAlertFired {
                    reminder_id: reminder.id,
                    title: reminder.title.clone(),
                    anchor: reminder.anchor_time,
                    at: now,
                });
            }
            DispatchResult::SuppressedDuplicate => {
                // Already nudged for this occurrence.
            }
            DispatchResult::Failed(NotifyError::PermissionDenied) => {
                self.note_permission_denied(now, events);
            }
            DispatchResult::Failed(error) => {
                debug!(reminder_id = %reminder.id, error = %error, "pre-alert delivery failed");
            }
        }
    }

    /// Surfaced once per scheduler lifetime as an actionable prompt, not on
    /// every retried tick.
    fn note_permission_denied(&mut self, now: DateTime<Utc>, events: &mut Vec<Event>) {
        if !self.permission_prompted {
            self.permission_prompted = true;
            events.push(Event::PermissionPrompt { at: now });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::StoreError;
    use crate::notify::Permission;
    use crate::reminder::store::MemoryReminderStore;
    use crate::reminder::{ReminderCategory, RepeatRule};
    use uuid::Uuid;

    struct TestChannel {
        shown: Vec<DedupKey>,
        scheduled: Vec<(DateTime<Utc>, Uuid)>,
        cancelled: Vec<Uuid>,
        permission: Permission,
        fail_shows: u32,
    }

    impl Default for TestChannel {
        fn default() -> Self {
            Self {
                shown: Vec::new(),
                scheduled: Vec::new(),
                cancelled: Vec::new(),
                permission: Permission::Granted,
                fail_shows: 0,
            }
        }
    }

    impl NotificationChannel for TestChannel {
        fn request_permission(&mut self) -> Permission {
            self.permission
        }

        fn show(
            &mut self,
            _title: &str,
            _body: &str,
            key: DedupKey,
            _target: &str,
        ) -> Result<(), crate::error::NotifyError> {
            if self.fail_shows > 0 {
                self.fail_shows -= 1;
                return Err(crate::error::NotifyError::ChannelUnavailable(
                    "injected".to_string(),
                ));
            }
            self.shown.push(key);
            Ok(())
        }

        fn schedule_for(
            &mut self,
            instant: DateTime<Utc>,
            reminder_id: Uuid,
        ) -> Result<(), crate::error::NotifyError> {
            self.scheduled.push((instant, reminder_id));
            Ok(())
        }

        fn cancel(&mut self, reminder_id: Uuid) {
            self.cancelled.push(reminder_id);
        }
    }

    /// Store wrapper that fails a programmable number of saves, modelling a
    /// temporarily unreachable backend.
    struct FlakyStore {
        inner: MemoryReminderStore,
        fail_saves: u32,
    }

    impl ReminderStore for FlakyStore {
        fn list(&self, filter: &ReminderFilter) -> Result<Vec<Reminder>, StoreError> {
            self.inner.list(filter)
        }

        fn get(&self, id: Uuid) -> Result<Option<Reminder>, StoreError> {
            self.inner.get(id)
        }

        fn save(&mut self, reminder: &Reminder) -> Result<(), StoreError> {
            if self.fail_saves > 0 {
                self.fail_saves -= 1;
                return Err(StoreError::Unavailable("injected".to_string()));
            }
            self.inner.save(reminder)
        }

        fn delete(&mut self, id: Uuid) -> Result<(), StoreError> {
            self.inner.delete(id)
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap()
    }

    fn reminder(anchor: DateTime<Utc>, repeat: RepeatRule) -> Reminder {
        Reminder::new("take meds", ReminderCategory::Medication, anchor, repeat)
            .with_description("two pills with water")
    }

    fn scheduler_at(
        store: MemoryReminderStore,
        now: DateTime<Utc>,
    ) -> ReminderScheduler<MemoryReminderStore, TestChannel, ManualClock> {
        ReminderScheduler::new(store, TestChannel::default(), ManualClock::new(now))
    }

    fn fired_count(events: &[Event]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, Event::ReminderFired { .. }))
            .count()
    }

    #[test]
    fn fires_when_due_and_advances_past_missed_days() {
        let mut store = MemoryReminderStore::new();
        let r = reminder(utc("2025-01-01T08:00:00Z"), RepeatRule::Daily);
        store.save(&r).unwrap();

        let mut scheduler = scheduler_at(store, utc("2025-01-03T09:00:00Z"));
        let events = scheduler.tick();

        assert_eq!(fired_count(&events), 1);
        assert_eq!(scheduler.channel().shown.len(), 1);

        let stored = scheduler.store().get(r.id).unwrap().unwrap();
        assert_eq!(stored.anchor_time, utc("2025-01-04T08:00:00Z"));
        assert_eq!(stored.last_dispatched_at, Some(utc("2025-01-01T08:00:00Z")));
    }

    #[test]
    fn second_tick_in_same_window_does_not_refire() {
        let mut store = MemoryReminderStore::new();
        let r = reminder(utc("2025-01-01T08:00:00Z"), RepeatRule::Daily);
        store.save(&r).unwrap();

        let mut scheduler = scheduler_at(store, utc("2025-01-01T08:00:30Z"));
        scheduler.tick();
        let events = scheduler.tick();

        assert_eq!(fired_count(&events), 0);
        assert_eq!(scheduler.channel().shown.len(), 1);
    }

    #[test]
    fn no_double_fire_when_marker_save_fails() {
        let mut inner = MemoryReminderStore::new();
        let r = reminder(utc("2025-01-01T08:00:00Z"), RepeatRule::None);
        inner.save(&r).unwrap();
        let store = FlakyStore {
            inner: inner.clone(),
            fail_saves: 1,
        };

        let mut scheduler = ReminderScheduler::new(
            store,
            TestChannel::default(),
            ManualClock::new(utc("2025-01-01T08:01:00Z")),
        );

        // First tick delivers but cannot persist the marker.
        let events = scheduler.tick();
        assert_eq!(fired_count(&events), 1);
        assert!(inner.get(r.id).unwrap().unwrap().last_dispatched_at.is_none());

        // Second tick: the in-memory dedup suppresses the re-show and the
        // healed store finally gets the marker.
        let events = scheduler.tick();
        assert_eq!(fired_count(&events), 0);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::DispatchSuppressed { .. })));
        assert_eq!(scheduler.channel().shown.len(), 1);
        assert!(inner.get(r.id).unwrap().unwrap().occurrence_dispatched());
    }

    #[test]
    fn two_channels_one_store_deliver_exactly_once() {
        let mut store = MemoryReminderStore::new();
        let r = reminder(utc("2025-01-01T08:00:00Z"), RepeatRule::None);
        store.save(&r).unwrap();

        // Two scheduler instances with independent in-memory dedup, sharing
        // one durable store -- the foreground loop and a background wake-up.
        let now = utc("2025-01-01T08:00:00Z");
        let mut foreground = scheduler_at(store.clone(), now);
        let mut background = scheduler_at(store, now);

        foreground.tick();
        background.tick();

        let total = foreground.channel().shown.len() + background.channel().shown.len();
        assert_eq!(total, 1);
    }

    #[test]
    fn non_repeating_reminder_is_terminal_after_firing() {
        let mut store = MemoryReminderStore::new();
        let r = reminder(utc("2025-01-01T08:00:00Z"), RepeatRule::None);
        store.save(&r).unwrap();

        let clock = ManualClock::new(utc("2025-01-01T08:00:00Z"));
        let mut scheduler =
            ReminderScheduler::new(store, TestChannel::default(), clock.clone());

        scheduler.tick();
        assert_eq!(scheduler.channel().shown.len(), 1);

        for _ in 0..5 {
            clock.advance(Duration::days(1));
            let events = scheduler.tick();
            assert_eq!(fired_count(&events), 0);
        }
        assert_eq!(scheduler.channel().shown.len(), 1);

        // Explicit reschedule with a new anchor starts a fresh cycle.
        let mut stored = scheduler.store().get(r.id).unwrap().unwrap();
        stored.reschedule(clock.now() - Duration::minutes(1));
        scheduler.store_mut().save(&stored).unwrap();

        let events = scheduler.tick();
        assert_eq!(fired_count(&events), 1);
        assert_eq!(scheduler.channel().shown.len(), 2);
    }

    #[test]
    fn disabled_reminder_never_fires() {
        let mut store = MemoryReminderStore::new();
        let mut r = reminder(utc("2025-01-01T08:00:00Z"), RepeatRule::Daily);
        r.enabled = false;
        store.save(&r).unwrap();

        let clock = ManualClock::new(utc("2025-01-01T07:00:00Z"));
        let mut scheduler =
            ReminderScheduler::new(store, TestChannel::default(), clock.clone());

        for _ in 0..10 {
            clock.advance(Duration::hours(1));
            scheduler.tick();
        }
        assert!(scheduler.channel().shown.is_empty());
    }

    #[test]
    fn reenabling_with_past_anchor_fires_on_next_tick() {
        let mut store = MemoryReminderStore::new();
        let mut r = reminder(utc("2025-01-01T08:00:00Z"), RepeatRule::None);
        r.enabled = false;
        store.save(&r).unwrap();

        let mut scheduler = scheduler_at(store, utc("2025-01-01T09:00:00Z"));
        scheduler.tick();
        assert!(scheduler.channel().shown.is_empty());

        let mut stored = scheduler.store().get(r.id).unwrap().unwrap();
        stored.enabled = true;
        scheduler.store_mut().save(&stored).unwrap();

        let events = scheduler.tick();
        assert_eq!(fired_count(&events), 1);
    }

    #[test]
    fn pre_alert_fires_once_inside_window() {
        let mut store = MemoryReminderStore::new();
        let r = reminder(utc("2025-01-01T08:00:00Z"), RepeatRule::Daily);
        store.save(&r).unwrap();

        let clock = ManualClock::new(utc("2025-01-01T07:57:00Z"));
        let mut scheduler =
            ReminderScheduler::new(store, TestChannel::default(), clock.clone());

        let events = scheduler.tick();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::PreAlertFired { .. })));
        assert_eq!(scheduler.channel().shown.len(), 1);
        assert_eq!(scheduler.channel().shown[0].kind, AlertKind::PreAlert);

        // Re-ticking inside the window does not nag again.
        let events = scheduler.tick();
        assert!(!events
            .iter()
            .any(|e| matches!(e, Event::PreAlertFired { .. })));
        assert_eq!(scheduler.channel().shown.len(), 1);

        // The at-time alert still fires under its own key.
        clock.set(utc("2025-01-01T08:00:00Z"));
        let events = scheduler.tick();
        assert_eq!(fired_count(&events), 1);
        assert_eq!(scheduler.channel().shown.len(), 2);
        assert_eq!(scheduler.channel().shown[1].kind, AlertKind::AtTime);
    }

    #[test]
    fn outside_pre_alert_window_stays_quiet() {
        let mut store = MemoryReminderStore::new();
        let r = reminder(utc("2025-01-01T08:00:00Z"), RepeatRule::None);
        store.save(&r).unwrap();

        let mut scheduler = scheduler_at(store, utc("2025-01-01T07:00:00Z"));
        let events = scheduler.tick();
        assert!(events.is_empty());
        assert!(scheduler.channel().shown.is_empty());
        // The anchor wake-up is registered with the platform instead.
        assert_eq!(
            scheduler.channel().scheduled,
            vec![(utc("2025-01-01T08:00:00Z"), r.id)]
        );
    }

    #[test]
    fn permission_denied_prompts_once_and_keeps_reminder_due() {
        let mut store = MemoryReminderStore::new();
        let r = reminder(utc("2025-01-01T08:00:00Z"), RepeatRule::None);
        store.save(&r).unwrap();

        let mut scheduler = scheduler_at(store, utc("2025-01-01T08:00:00Z"));
        scheduler.channel_mut().permission = Permission::Denied;

        let mut prompts = 0;
        for _ in 0..3 {
            let events = scheduler.tick();
            prompts += events
                .iter()
                .filter(|e| matches!(e, Event::PermissionPrompt { .. }))
                .count();
        }
        assert_eq!(prompts, 1);
        assert!(scheduler.channel().shown.is_empty());

        // Granting permission lets the still-due reminder deliver.
        scheduler.channel_mut().permission = Permission::Granted;
        let events = scheduler.tick();
        assert_eq!(fired_count(&events), 1);
    }

    #[test]
    fn delivery_failure_is_retried_next_tick() {
        let mut store = MemoryReminderStore::new();
        let r = reminder(utc("2025-01-01T08:00:00Z"), RepeatRule::None);
        store.save(&r).unwrap();

        let mut scheduler = scheduler_at(store, utc("2025-01-01T08:00:00Z"));
        scheduler.channel_mut().fail_shows = 1;

        let events = scheduler.tick();
        assert_eq!(fired_count(&events), 0);
        let stored = scheduler.store().get(r.id).unwrap().unwrap();
        assert!(stored.last_dispatched_at.is_none());

        let events = scheduler.tick();
        assert_eq!(fired_count(&events), 1);
        assert_eq!(scheduler.channel().shown.len(), 1);
    }

    #[test]
    fn disabling_clears_dedup_so_reenable_starts_clean() {
        let mut store = MemoryReminderStore::new();
        let r = reminder(utc("2025-01-01T08:00:00Z"), RepeatRule::Daily);
        store.save(&r).unwrap();

        // Deliver the pre-alert, then disable mid-cycle.
        let mut scheduler = scheduler_at(store, utc("2025-01-01T07:58:00Z"));
        scheduler.tick();
        assert_eq!(scheduler.channel().shown.len(), 1);

        let mut stored = scheduler.store().get(r.id).unwrap().unwrap();
        stored.enabled = false;
        scheduler.store_mut().save(&stored).unwrap();
        scheduler.tick();
        assert!(scheduler.channel().cancelled.contains(&r.id));

        // Re-enable: the cleared dedup lets the same occurrence nudge again.
        stored.enabled = true;
        scheduler.store_mut().save(&stored).unwrap();
        let events = scheduler.tick();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::PreAlertFired { .. })));
    }

    #[test]
    fn deleted_reminder_releases_wakeups_and_dedup() {
        let mut store = MemoryReminderStore::new();
        let r = reminder(utc("2025-01-01T08:00:00Z"), RepeatRule::None);
        store.save(&r).unwrap();

        let mut scheduler = scheduler_at(store, utc("2025-01-01T07:58:00Z"));
        scheduler.tick();
        assert_eq!(scheduler.channel().shown.len(), 1);

        scheduler.store_mut().delete(r.id).unwrap();
        scheduler.tick();
        assert!(scheduler.channel().cancelled.contains(&r.id));
    }

    #[test]
    fn store_outage_skips_tick_without_panicking() {
        struct DownStore;
        impl ReminderStore for DownStore {
            fn list(&self, _filter: &ReminderFilter) -> Result<Vec<Reminder>, StoreError> {
                Err(StoreError::Unavailable("down".to_string()))
            }
            fn get(&self, _id: Uuid) -> Result<Option<Reminder>, StoreError> {
                Err(StoreError::Unavailable("down".to_string()))
            }
            fn save(&mut self, _reminder: &Reminder) -> Result<(), StoreError> {
                Err(StoreError::Unavailable("down".to_string()))
            }
            fn delete(&mut self, _id: Uuid) -> Result<(), StoreError> {
                Err(StoreError::Unavailable("down".to_string()))
            }
        }

        let mut scheduler = ReminderScheduler::new(
            DownStore,
            TestChannel::default(),
            ManualClock::new(Utc::now()),
        );
        assert!(scheduler.tick().is_empty());
    }
}
