use chrono::{DateTime, Utc};
use tracing::debug;

use crate::task::Task;

/// Whether the user has granted the platform alert permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// A one-shot alert the platform scheduler should fire.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub fire_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

/// Plans the alert for one task. Skipped silently (returns `None`) when the
/// task has no reminder time, the time is not in the future, or permission
/// was never granted.
pub fn plan(task: &Task, now: DateTime<Utc>, permission: Permission) -> Option<Reminder> {
    if permission != Permission::Granted {
        debug!(id = %task.id, "alert permission not granted; skipping reminder");
        return None;
    }

    let fire_at = task.notify_at?;
    if fire_at <= now {
        debug!(id = %task.id, "reminder time already passed; skipping");
        return None;
    }

    let body = match task.due_date {
        Some(due) => format!("{} (due {})", task.title, due.format("%Y-%m-%d")),
        None => task.title.clone(),
    };

    Some(Reminder {
        fire_at,
        title: task.title.clone(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{Permission, plan};
    use crate::task::{Task, TaskDraft};

    fn fixed_now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0)
            .single()
            .expect("valid instant")
    }

    fn task_with_notify(offset_hours: i64) -> Task {
        let now = fixed_now();
        Task::create(
            TaskDraft {
                title: "water the plants".to_string(),
                notify_at: Some(now + Duration::hours(offset_hours)),
                ..TaskDraft::default()
            },
            now,
        )
    }

    #[test]
    fn future_reminder_is_planned() {
        let task = task_with_notify(2);
        let reminder = plan(&task, fixed_now(), Permission::Granted).expect("planned");
        assert_eq!(reminder.fire_at, task.notify_at.expect("set"));
        assert_eq!(reminder.body, "water the plants");
    }

    #[test]
    fn body_carries_the_due_date_when_present() {
        let mut task = task_with_notify(2);
        task.due_date = Some(fixed_now() + Duration::days(1));
        let reminder = plan(&task, fixed_now(), Permission::Granted).expect("planned");
        assert_eq!(reminder.body, "water the plants (due 2026-03-03)");
    }

    #[test]
    fn past_reminder_is_skipped() {
        let task = task_with_notify(-1);
        assert_eq!(plan(&task, fixed_now(), Permission::Granted), None);
    }

    #[test]
    fn missing_permission_skips_silently() {
        let task = task_with_notify(2);
        assert_eq!(plan(&task, fixed_now(), Permission::Denied), None);
    }

    #[test]
    fn task_without_notify_time_has_no_reminder() {
        let task = Task::create(
            TaskDraft {
                title: "no alarm".to_string(),
                ..TaskDraft::default()
            },
            fixed_now(),
        );
        assert_eq!(plan(&task, fixed_now(), Permission::Granted), None);
    }
}
