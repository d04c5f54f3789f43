use cron::Schedule;
use std::time::Duration;

/// Time until the schedule's next firing, or `None` when the schedule is
/// exhausted.
pub(crate) fn until_next_tick(schedule: &Schedule) -> Option<Duration> {
    let next = schedule.upcoming(chrono::Local).next()?;
    (next - chrono::Local::now()).to_std().ok()
}
