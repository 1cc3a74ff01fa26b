use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Sort rank: high sorts first; unprioritized tasks take rank 3 at the
    /// sort site.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(anyhow::anyhow!("invalid priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,

    pub title: String,

    pub completed: bool,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_at: Option<DateTime<Utc>>,
}

/// Input to task creation. `completed` is absent on purpose: new tasks always
/// start incomplete, whatever the caller says.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub notify_at: Option<DateTime<Utc>>,
}

/// Partial update. `id` and `created_at` are not patchable; the clear flags
/// reset an optional field that a bare `None` would leave untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub notify_at: Option<DateTime<Utc>>,
    pub clear_due_date: bool,
    pub clear_priority: bool,
    pub clear_notify_at: bool,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.completed.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.notify_at.is_none()
            && !self.clear_due_date
            && !self.clear_priority
            && !self.clear_notify_at
    }
}

impl Task {
    pub fn create(draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            completed: false,
            created_at: now,
            due_date: draft.due_date,
            priority: draft.priority,
            notify_at: draft.notify_at,
        }
    }

    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(due) = patch.due_date {
            self.due_date = Some(due);
        }
        if let Some(priority) = patch.priority {
            self.priority = Some(priority);
        }
        if let Some(notify) = patch.notify_at {
            self.notify_at = Some(notify);
        }
        if patch.clear_due_date {
            self.due_date = None;
        }
        if patch.clear_priority {
            self.priority = None;
        }
        if patch.clear_notify_at {
            self.notify_at = None;
        }
    }
}
