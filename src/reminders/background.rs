//! Background reminder loop.
//!
//! A single thread wakes at every tick boundary, runs the daily reset when
//! the local date has moved past the last reset, then scans for due doses.
//! A failed iteration is logged and retried at the next boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, Timelike};

use super::reset::DailyReset;
use super::scheduler::ReminderTicker;

/// Sleep granularity for shutdown responsiveness.
const SLEEP_GRANULARITY: Duration = Duration::from_millis(500);

/// Handle for the background reminder thread. Dropping it stops the loop.
pub struct ReminderLoopHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl ReminderLoopHandle {
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for ReminderLoopHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Start the reminder loop on its own thread.
pub fn start_reminder_loop(ticker: ReminderTicker, reset: DailyReset, tick_secs: u64) -> ReminderLoopHandle {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    let tick_secs = tick_secs.max(1);

    let handle = std::thread::spawn(move || {
        tracing::info!(tick_secs, "Reminder loop started");
        reminder_loop(&ticker, &reset, tick_secs, &flag);
        tracing::info!("Reminder loop shutting down");
    });

    ReminderLoopHandle {
        shutdown,
        handle: Some(handle),
    }
}

fn reminder_loop(ticker: &ReminderTicker, reset: &DailyReset, tick_secs: u64, shutdown: &AtomicBool) {
    // Catch up on a missed midnight before the first scan
    run_iteration(ticker, reset, Local::now().naive_local());

    while !shutdown.load(Ordering::Relaxed) {
        let wait = until_next_boundary(Local::now().naive_local(), tick_secs);
        if !sleep_unless_shutdown(wait, shutdown) {
            return;
        }
        run_iteration(ticker, reset, Local::now().naive_local());
    }
}

fn run_iteration(ticker: &ReminderTicker, reset: &DailyReset, now: NaiveDateTime) {
    if let Err(e) = reset.run_if_due(now.date()) {
        tracing::error!(error = %e, "Daily reset failed, will retry next tick");
        return;
    }
    if let Err(e) = ticker.tick(now) {
        tracing::error!(error = %e, "Reminder tick aborted");
    }
}

/// Time left until the next multiple of `tick_secs` within the day.
/// With the default 60 s this lands just after each minute turns.
fn until_next_boundary(now: NaiveDateTime, tick_secs: u64) -> Duration {
    let into_day = u64::from(now.num_seconds_from_midnight());
    let elapsed = Duration::from_secs(into_day % tick_secs) + Duration::from_nanos(u64::from(now.nanosecond() % 1_000_000_000));
    Duration::from_secs(tick_secs).saturating_sub(elapsed)
}

/// Returns `false` if shutdown was requested while sleeping.
fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) -> bool {
    let mut remaining = total;
    while !remaining.is_zero() {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        let step = remaining.min(SLEEP_GRANULARITY);
        std::thread::sleep(step);
        remaining -= step;
    }
    !shutdown.load(Ordering::Relaxed)
}
