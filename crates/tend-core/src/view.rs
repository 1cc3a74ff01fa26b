use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::task::Task;

/// Window for the `due-close` filter: due within the next three calendar
/// days counts as close.
const DUE_CLOSE_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    #[default]
    All,
    Active,
    Completed,
    DueClose,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
}

impl FilterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterKind::All => "all",
            FilterKind::Active => "active",
            FilterKind::Completed => "completed",
            FilterKind::DueClose => "dueClose",
        }
    }
}

impl std::str::FromStr for FilterKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FilterKind::All),
            "active" => Ok(FilterKind::Active),
            "completed" | "done" => Ok(FilterKind::Completed),
            "dueclose" | "due-close" => Ok(FilterKind::DueClose),
            other => Err(anyhow::anyhow!("invalid filter: {other}")),
        }
    }
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::CreatedAt => "createdAt",
            SortKey::DueDate => "dueDate",
            SortKey::Priority => "priority",
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "createdat" | "created" | "created-at" => Ok(SortKey::CreatedAt),
            "duedate" | "due" | "due-date" => Ok(SortKey::DueDate),
            "priority" => Ok(SortKey::Priority),
            other => Err(anyhow::anyhow!("invalid sort key: {other}")),
        }
    }
}

/// Derives the display list: filter, then a stable sort. Pure over its
/// arguments; `now` is threaded in so two calls at the same instant agree.
pub fn project(
    tasks: &[Task],
    filter: FilterKind,
    sort: SortKey,
    now: DateTime<Utc>,
) -> Vec<&Task> {
    // One threshold per projection call; nothing else aliases it.
    let due_close_until = now + Duration::days(DUE_CLOSE_DAYS);

    let mut view: Vec<&Task> = tasks
        .iter()
        .filter(|task| matches_filter(task, filter, due_close_until))
        .collect();

    view.sort_by(|a, b| compare(a, b, sort));

    trace!(
        filter = filter.as_str(),
        sort = sort.as_str(),
        total = tasks.len(),
        shown = view.len(),
        "projected task view"
    );
    view
}

fn matches_filter(task: &Task, filter: FilterKind, due_close_until: DateTime<Utc>) -> bool {
    match filter {
        FilterKind::All => true,
        FilterKind::Active => !task.completed,
        FilterKind::Completed => task.completed,
        FilterKind::DueClose => {
            !task.completed
                && task
                    .due_date
                    .map(|due| due <= due_close_until)
                    .unwrap_or(false)
        }
    }
}

fn compare(a: &Task, b: &Task, sort: SortKey) -> Ordering {
    match sort {
        // Newest first.
        SortKey::CreatedAt => b.created_at.cmp(&a.created_at),
        // Soonest first; tasks without a due date sort after all that have one.
        SortKey::DueDate => match (a.due_date, b.due_date) {
            (Some(a_due), Some(b_due)) => a_due.cmp(&b_due),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::Priority => priority_rank(a).cmp(&priority_rank(b)),
    }
}

fn priority_rank(task: &Task) -> u8 {
    task.priority.map(|p| p.rank()).unwrap_or(3)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{FilterKind, SortKey, project};
    use crate::task::{Priority, Task, TaskDraft};

    fn fixed_now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0)
            .single()
            .expect("valid instant")
    }

    fn task(title: &str, created_offset_mins: i64) -> Task {
        Task::create(
            TaskDraft {
                title: title.to_string(),
                ..TaskDraft::default()
            },
            fixed_now() + Duration::minutes(created_offset_mins),
        )
    }

    #[test]
    fn all_returns_every_task() {
        let tasks = vec![task("a", 0), task("b", 1), task("c", 2)];
        let view = project(&tasks, FilterKind::All, SortKey::CreatedAt, fixed_now());
        assert_eq!(view.len(), 3);
    }

    #[test]
    fn active_and_completed_partition_the_collection() {
        let mut tasks = vec![task("a", 0), task("b", 1), task("c", 2)];
        tasks[1].completed = true;

        let now = fixed_now();
        let active = project(&tasks, FilterKind::Active, SortKey::CreatedAt, now);
        let completed = project(&tasks, FilterKind::Completed, SortKey::CreatedAt, now);

        assert_eq!(active.len() + completed.len(), tasks.len());
        for t in &tasks {
            let in_active = active.iter().any(|v| v.id == t.id);
            let in_completed = completed.iter().any(|v| v.id == t.id);
            assert!(in_active != in_completed, "{} must be in exactly one", t.title);
        }
    }

    #[test]
    fn due_close_keeps_only_incomplete_tasks_due_within_three_days() {
        let now = fixed_now();
        let mut soon = task("soon", 0);
        soon.due_date = Some(now + Duration::days(1));
        let mut far = task("far", 1);
        far.due_date = Some(now + Duration::days(10));
        let mut done_soon = task("done-soon", 2);
        done_soon.due_date = Some(now + Duration::days(1));
        done_soon.completed = true;
        let undated = task("undated", 3);

        let tasks = vec![soon.clone(), far, done_soon, undated];
        let view = project(&tasks, FilterKind::DueClose, SortKey::CreatedAt, now);

        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, soon.id);
    }

    #[test]
    fn due_close_includes_overdue_tasks() {
        let now = fixed_now();
        let mut overdue = task("overdue", 0);
        overdue.due_date = Some(now - Duration::days(2));

        let tasks = vec![overdue];
        let view = project(&tasks, FilterKind::DueClose, SortKey::CreatedAt, now);
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn created_at_sorts_newest_first() {
        let tasks = vec![task("oldest", 0), task("middle", 5), task("newest", 10)];
        let view = project(&tasks, FilterKind::All, SortKey::CreatedAt, fixed_now());
        let titles: Vec<&str> = view.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["newest", "middle", "oldest"]);
    }

    #[test]
    fn due_date_sorts_undated_last() {
        let now = fixed_now();
        let mut late = task("late", 0);
        late.due_date = Some(now + Duration::days(9));
        let undated_a = task("undated-a", 1);
        let mut early = task("early", 2);
        early.due_date = Some(now + Duration::days(1));
        let undated_b = task("undated-b", 3);

        let tasks = vec![late, undated_a, early, undated_b];
        let view = project(&tasks, FilterKind::All, SortKey::DueDate, now);
        let titles: Vec<&str> = view.iter().map(|t| t.title.as_str()).collect();

        // Undated ties keep their pre-sort relative order.
        assert_eq!(titles, vec!["early", "late", "undated-a", "undated-b"]);
    }

    #[test]
    fn priority_sorts_high_medium_low_then_none() {
        let mut none = task("none", 0);
        none.priority = None;
        let mut low = task("low", 1);
        low.priority = Some(Priority::Low);
        let mut high = task("high", 2);
        high.priority = Some(Priority::High);
        let mut medium = task("medium", 3);
        medium.priority = Some(Priority::Medium);

        let tasks = vec![none, low, high, medium];
        let view = project(&tasks, FilterKind::All, SortKey::Priority, fixed_now());
        let titles: Vec<&str> = view.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["high", "medium", "low", "none"]);
    }

    #[test]
    fn priority_ties_keep_insertion_order() {
        let mut first = task("first", 0);
        first.priority = Some(Priority::High);
        let mut second = task("second", 1);
        second.priority = Some(Priority::High);

        let tasks = vec![first, second];
        let view = project(&tasks, FilterKind::All, SortKey::Priority, fixed_now());
        let titles: Vec<&str> = view.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[test]
    fn selector_text_forms_reject_unknown_values() {
        assert!("dueClose".parse::<FilterKind>().is_ok());
        assert!("due-close".parse::<FilterKind>().is_ok());
        assert!("bogus".parse::<FilterKind>().is_err());
        assert!("createdAt".parse::<SortKey>().is_ok());
        assert!("bogus".parse::<SortKey>().is_err());
    }
}
