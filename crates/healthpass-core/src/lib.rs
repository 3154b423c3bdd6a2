//! # HealthPass Core Library
//!
//! This library provides the core business logic for the HealthPass health
//! tracker. It implements a CLI-first philosophy where all operations are
//! available via a standalone CLI binary; any GUI shell is a thin layer over
//! the same core library.
//!
//! ## Architecture
//!
//! - **Reminder Scheduler**: A wall-clock-based state machine that requires
//!   the caller to periodically invoke `tick()`; two uncoordinated delivery
//!   channels may drive it against the same store without double-firing
//! - **Recurrence Engine**: Pure next-occurrence computation for daily,
//!   weekly, monthly, and yearly repeat rules
//! - **Notification Dispatch**: Dedup-guarded delivery over a pluggable
//!   platform channel
//! - **Goal Evaluation**: Classification of vital-sign readings against
//!   user-configured target ranges
//! - **Storage**: SQLite-based reminder and reading storage plus TOML-based
//!   configuration
//!
//! ## Key Components
//!
//! - [`ReminderScheduler`]: Core due-notification state machine
//! - [`next_occurrence`](reminder::next_occurrence): Recurrence computation
//! - [`Dispatcher`]: Deduplicated notification delivery
//! - [`evaluate`](metrics::evaluate): Goal-range classification
//! - [`Database`]: Reminder and reading persistence
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod metrics;
pub mod notify;
pub mod reminder;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{
    ConfigError, CoreError, NotifyError, RecurrenceError, StoreError, ValidationError,
};
pub use events::Event;
pub use metrics::{GoalCheck, GoalRange, MetricKind, MetricReading, MetricValue};
pub use notify::{
    AlertKind, ConsoleChannel, DedupKey, Dispatcher, DispatchResult, NotificationChannel,
    Permission,
};
pub use reminder::{
    MemoryReminderStore, Reminder, ReminderCategory, ReminderFilter, ReminderScheduler,
    ReminderState, ReminderStore, RepeatRule, SchedulerOptions,
};
pub use storage::{Config, Database, MetricsDb, SqliteReminderStore};
