//! Foreground watch loop: the polling delivery channel.
//!
//! Ticks the scheduler immediately on startup, then on a fixed interval
//! (default 60 seconds) until interrupted. `--once` runs a single tick and
//! exits, which is how an external wake-up (cron, platform timer) drives the
//! same scheduler as its background channel.

use healthpass_core::clock::SystemClock;
use healthpass_core::notify::ConsoleChannel;
use healthpass_core::reminder::{ReminderScheduler, SchedulerOptions};
use healthpass_core::storage::{Config, SqliteReminderStore};
use healthpass_core::Event;
use tracing::debug;

pub fn run(once: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = SqliteReminderStore::open()?;
    let channel = ConsoleChannel::new(config.notifications.enabled);
    let options = SchedulerOptions {
        pre_alert: config.pre_alert(),
    };
    let mut scheduler = ReminderScheduler::with_options(store, channel, SystemClock, options);

    if once {
        render(scheduler.tick());
        return Ok(());
    }

    let poll = std::time::Duration::from_secs(config.notifications.poll_interval_secs);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let mut interval = tokio::time::interval(poll);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    render(scheduler.tick());
                }
                _ = tokio::signal::ctrl_c() => {
                    println!("stopping watch loop");
                    break;
                }
            }
        }
    });
    Ok(())
}

fn render(events: Vec<Event>) {
    for event in events {
        match event {
            Event::PermissionPrompt { .. } => {
                println!(
                    "Notifications are disabled. Enable them with:\n  \
                     healthpass-cli config set notifications.enabled true"
                );
            }
            // Deliveries are already printed by the console channel.
            other => debug!(event = ?other, "scheduler event"),
        }
    }
}
