use chrono::{DateTime, TimeDelta, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub completed: bool,
}

impl Task {
    /// Placeholder returned by `TaskService::find_by_id` when no row matches.
    pub fn unknown() -> Self {
        Self {
            id: 0,
            name: "Unknown".to_string(),
            completed: false,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.id == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct WorkEntry {
    pub id: i64,
    pub task_id: Option<i64>,
    pub started_on: DateTime<Utc>,
    pub finished_on: Option<DateTime<Utc>>,
}

impl WorkEntry {
    pub fn is_open(&self) -> bool {
        self.finished_on.is_none()
    }

    /// Elapsed time of the entry; open entries are measured up to `now`.
    pub fn elapsed(&self, now: DateTime<Utc>) -> TimeDelta {
        self.finished_on.unwrap_or(now) - self.started_on
    }
}

/// Renders a duration as `1h 02m 03s`, dropping leading zero units.
pub fn format_duration(duration: TimeDelta) -> String {
    let total = duration.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unknown_task_is_the_sentinel() {
        let task = Task::unknown();
        assert_eq!(task.id, 0);
        assert_eq!(task.name, "Unknown");
        assert!(task.is_unknown());
    }

    #[test]
    fn open_entry_elapsed_runs_until_now() {
        let started_on = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let entry = WorkEntry {
            id: 1,
            task_id: Some(1),
            started_on,
            finished_on: None,
        };
        let now = started_on + TimeDelta::minutes(90);

        assert!(entry.is_open());
        assert_eq!(entry.elapsed(now), TimeDelta::minutes(90));
    }

    #[test]
    fn closed_entry_ignores_now() {
        let started_on = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let entry = WorkEntry {
            id: 1,
            task_id: Some(1),
            started_on,
            finished_on: Some(started_on + TimeDelta::seconds(45)),
        };

        assert!(!entry.is_open());
        assert_eq!(
            entry.elapsed(started_on + TimeDelta::days(1)),
            TimeDelta::seconds(45)
        );
    }

    #[test]
    fn durations_drop_leading_zero_units() {
        assert_eq!(format_duration(TimeDelta::zero()), "0s");
        assert_eq!(format_duration(TimeDelta::seconds(42)), "42s");
        assert_eq!(format_duration(TimeDelta::seconds(125)), "2m 05s");
        assert_eq!(format_duration(TimeDelta::seconds(3723)), "1h 02m 03s");
        assert_eq!(format_duration(TimeDelta::seconds(-5)), "0s");
    }
}
