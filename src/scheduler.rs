use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::deadline::now_local;
use crate::error::TaskError;
use crate::events::{EventSink, ReminderPayload};
use crate::models::Task;
use crate::state::AppState;
use crate::store::TaskStore;

/// Open tasks whose deadline is at or before `now + lookahead`, earliest first.
///
/// Nothing is remembered between calls: a task that stays inside the window is returned
/// again on every scan.
pub fn scan(
    store: &TaskStore,
    now: NaiveDateTime,
    lookahead: Duration,
) -> Result<Vec<Task>, TaskError> {
    Ok(collect_due_tasks(store.list_all()?, now, lookahead))
}

fn collect_due_tasks(tasks: Vec<Task>, now: NaiveDateTime, lookahead: Duration) -> Vec<Task> {
    let horizon = now
        .checked_add_signed(lookahead)
        .unwrap_or(NaiveDateTime::MAX);
    let mut due: Vec<Task> = tasks
        .into_iter()
        .filter(|task| !task.completed && task.deadline <= horizon)
        .collect();
    due.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.id.cmp(&b.id)));
    due
}

/// Spawns the periodic reminder check on the current tokio runtime. Interval and lookahead
/// come from the settings on every tick, so changes apply from the next check; abort the
/// handle to stop it.
pub fn start_scheduler<S>(state: AppState, sink: Arc<S>) -> JoinHandle<()>
where
    S: EventSink + 'static,
{
    let mut period = state.settings().reminder_interval();
    tokio::spawn(async move {
        let mut interval = reminder_interval(Instant::now(), period);
        loop {
            interval.tick().await;
            let configured = state.settings().reminder_interval();
            if configured != period {
                log::info!("reminder interval changed secs={}", configured.as_secs());
                period = configured;
                interval = reminder_interval(Instant::now() + period, period);
            }
            let now = now_local();
            match state.due_tasks(now) {
                Ok(tasks) if !tasks.is_empty() => {
                    log::info!("reminders due count={}", tasks.len());
                    sink.emit_reminder(ReminderPayload {
                        scanned_at: now,
                        tasks,
                    });
                }
                Ok(_) => {}
                Err(err) => log::warn!("reminder scan failed: {err}"),
            }
        }
    })
}

fn reminder_interval(start: Instant, period: std::time::Duration) -> Interval {
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}
