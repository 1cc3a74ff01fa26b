use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::persist::{self, StateRecord};
use crate::task::{Task, TaskDraft, TaskPatch};
use crate::view::{FilterKind, SortKey};

/// Owns the authoritative task collection and the active selectors.
///
/// Mutations commit in memory first and then persist. A failed write is
/// logged and swallowed: the user's edit stays applied and the next
/// successful write catches the file up. A missing id on update, delete, or
/// toggle is a silent no-op across the board; callers learn about it from
/// the return value, never from an error.
#[derive(Debug)]
pub struct TaskStore {
    state: StateRecord,
    state_path: PathBuf,
}

impl TaskStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        let state_path = data_dir.join(persist::STATE_FILE);

        let state = match persist::load_state(&state_path) {
            Ok(Some(record)) => record,
            Ok(None) => StateRecord::default(),
            Err(err) => {
                warn!(
                    file = %state_path.display(),
                    error = %format!("{err:#}"),
                    "state file unreadable; starting from empty state"
                );
                StateRecord::default()
            }
        };

        info!(
            state = %state_path.display(),
            tasks = state.tasks.len(),
            filter = state.filter.as_str(),
            sort = state.sort_by.as_str(),
            "opened task store"
        );

        Ok(Self { state, state_path })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn filter(&self) -> FilterKind {
        self.state.filter
    }

    pub fn sort_by(&self) -> SortKey {
        self.state.sort_by
    }

    pub fn find(&self, id: Uuid) -> Option<&Task> {
        self.state.tasks.iter().find(|task| task.id == id)
    }

    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    pub fn add_task(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> &Task {
        let task = Task::create(draft, now);
        debug!(id = %task.id, "task created");
        self.state.tasks.push(task);
        self.persist();
        self.state
            .tasks
            .last()
            .unwrap_or_else(|| unreachable!("task was just pushed"))
    }

    #[tracing::instrument(skip(self, patch), fields(id = %id))]
    pub fn update_task(&mut self, id: Uuid, patch: &TaskPatch) -> bool {
        let Some(task) = self.state.tasks.iter_mut().find(|task| task.id == id) else {
            debug!("update target not found; no-op");
            return false;
        };

        task.apply_patch(patch);
        self.persist();
        true
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn delete_task(&mut self, id: Uuid) -> bool {
        let before = self.state.tasks.len();
        self.state.tasks.retain(|task| task.id != id);
        if self.state.tasks.len() == before {
            debug!("delete target not found; no-op");
            return false;
        }

        self.persist();
        true
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn toggle_completion(&mut self, id: Uuid) -> Option<bool> {
        let task = self.state.tasks.iter_mut().find(|task| task.id == id)?;
        task.completed = !task.completed;
        let completed = task.completed;

        self.persist();
        Some(completed)
    }

    #[tracing::instrument(skip(self))]
    pub fn set_filter(&mut self, filter: FilterKind) {
        self.state.filter = filter;
        self.persist();
    }

    #[tracing::instrument(skip(self))]
    pub fn set_sort(&mut self, sort_by: SortKey) {
        self.state.sort_by = sort_by;
        self.persist();
    }

    /// Write-behind: a failure here must not take the in-memory mutation
    /// down with it.
    fn persist(&self) {
        if let Err(err) = persist::save_state(&self.state_path, &self.state) {
            warn!(
                file = %self.state_path.display(),
                error = %format!("{err:#}"),
                "state write failed; in-memory state kept"
            );
        }
    }
}
