use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::cli::Command;
use crate::config::Config;
use crate::convert::{CommandConvert, Convert};
use crate::datetime::{end_of_day, parse_date_arg};
use crate::reminder::{self, Permission};
use crate::render::{Renderer, short_id};
use crate::store::TaskStore;
use crate::task::{TaskDraft, TaskPatch};
use crate::view::{FilterKind, SortKey, project};

#[instrument(skip(store, cfg, renderer, command, now))]
pub fn dispatch(
    store: &mut TaskStore,
    cfg: &Config,
    renderer: &mut Renderer,
    command: Command,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    debug!(?command, "dispatching command");

    match command {
        Command::Add {
            title,
            due,
            priority,
            notify,
        } => cmd_add(store, title, due, priority, notify, now),
        Command::List { filter, sort } => cmd_list(store, renderer, filter, sort, now),
        Command::Done { id } => cmd_done(store, &id),
        Command::Delete { id } => cmd_delete(store, &id),
        Command::Edit {
            id,
            title,
            due,
            priority,
            notify,
            clear_due,
            clear_priority,
            clear_notify,
        } => cmd_edit(
            store,
            &id,
            EditArgs {
                title,
                due,
                priority,
                notify,
                clear_due,
                clear_priority,
                clear_notify,
            },
            now,
        ),
        Command::Filter { kind } => cmd_filter(store, &kind),
        Command::Sort { key } => cmd_sort(store, &key),
        Command::Quick { text } => cmd_quick(store, cfg, &text.join(" "), now),
        Command::Reminders => cmd_reminders(store, cfg, renderer, now),
    }
}

#[instrument(skip(store, due, priority, notify, now))]
fn cmd_add(
    store: &mut TaskStore,
    title: String,
    due: Option<String>,
    priority: Option<String>,
    notify: Option<String>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(anyhow!("title cannot be empty"));
    }

    let draft = TaskDraft {
        title,
        due_date: due.as_deref().map(|d| parse_date_arg(d, now)).transpose()?,
        priority: priority.as_deref().map(str::parse).transpose()?,
        notify_at: notify
            .as_deref()
            .map(|d| parse_date_arg(d, now))
            .transpose()?,
    };

    let task = store.add_task(draft, now);
    println!("Created task {}.", short_id(task));
    Ok(())
}

#[instrument(skip(store, renderer, filter, sort, now))]
fn cmd_list(
    store: &mut TaskStore,
    renderer: &mut Renderer,
    filter: Option<String>,
    sort: Option<String>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command list");

    // One-shot overrides; the persisted selectors stay as they are.
    let filter = match filter {
        Some(raw) => raw.parse::<FilterKind>()?,
        None => store.filter(),
    };
    let sort = match sort {
        Some(raw) => raw.parse::<SortKey>()?,
        None => store.sort_by(),
    };

    let view = project(store.tasks(), filter, sort, now);
    renderer.print_task_table(&view, now)?;
    Ok(())
}

#[instrument(skip(store))]
fn cmd_done(store: &mut TaskStore, id: &str) -> anyhow::Result<()> {
    info!("command done");

    let Some(id) = resolve_id(store, id)? else {
        println!("No matching task.");
        return Ok(());
    };

    match store.toggle_completion(id) {
        Some(true) => println!("Completed task {}.", &id.to_string()[..8]),
        Some(false) => println!("Reopened task {}.", &id.to_string()[..8]),
        None => println!("No matching task."),
    }
    Ok(())
}

#[instrument(skip(store))]
fn cmd_delete(store: &mut TaskStore, id: &str) -> anyhow::Result<()> {
    info!("command delete");

    let Some(id) = resolve_id(store, id)? else {
        println!("No matching task.");
        return Ok(());
    };

    if store.delete_task(id) {
        println!("Deleted task {}.", &id.to_string()[..8]);
    } else {
        println!("No matching task.");
    }
    Ok(())
}

struct EditArgs {
    title: Option<String>,
    due: Option<String>,
    priority: Option<String>,
    notify: Option<String>,
    clear_due: bool,
    clear_priority: bool,
    clear_notify: bool,
}

#[instrument(skip(store, args, now))]
fn cmd_edit(
    store: &mut TaskStore,
    id: &str,
    args: EditArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command edit");

    if let Some(title) = &args.title
        && title.trim().is_empty()
    {
        return Err(anyhow!("title cannot be empty"));
    }

    let patch = TaskPatch {
        title: args.title.map(|t| t.trim().to_string()),
        completed: None,
        due_date: args
            .due
            .as_deref()
            .map(|d| parse_date_arg(d, now))
            .transpose()?,
        priority: args.priority.as_deref().map(str::parse).transpose()?,
        notify_at: args
            .notify
            .as_deref()
            .map(|d| parse_date_arg(d, now))
            .transpose()?,
        clear_due_date: args.clear_due,
        clear_priority: args.clear_priority,
        clear_notify_at: args.clear_notify,
    };

    if patch.is_empty() {
        return Err(anyhow!("nothing to change; pass at least one field"));
    }

    let Some(id) = resolve_id(store, id)? else {
        println!("No matching task.");
        return Ok(());
    };

    if store.update_task(id, &patch) {
        println!("Modified task {}.", &id.to_string()[..8]);
    } else {
        println!("No matching task.");
    }
    Ok(())
}

#[instrument(skip(store))]
fn cmd_filter(store: &mut TaskStore, kind: &str) -> anyhow::Result<()> {
    info!("command filter");

    let kind = kind.parse::<FilterKind>()?;
    store.set_filter(kind);
    println!("Filter set to {}.", kind.as_str());
    Ok(())
}

#[instrument(skip(store))]
fn cmd_sort(store: &mut TaskStore, key: &str) -> anyhow::Result<()> {
    info!("command sort");

    let key = key.parse::<SortKey>()?;
    store.set_sort(key);
    println!("Sort set to {}.", key.as_str());
    Ok(())
}

#[instrument(skip(store, cfg, now))]
fn cmd_quick(
    store: &mut TaskStore,
    cfg: &Config,
    text: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command quick");

    if text.trim().is_empty() {
        return Err(anyhow!("nothing to convert; pass a sentence"));
    }

    let command = cfg
        .get("convert.command")
        .ok_or_else(|| anyhow!("convert.command is not configured; set it in ~/.tendrc"))?;
    let converter = CommandConvert::new(command, now.date_naive());

    // Conversion failures surface here, before any store mutation.
    let parsed = converter
        .convert(text)
        .context("natural-language conversion failed; task not added")?;

    let draft = TaskDraft {
        title: parsed.title,
        due_date: parsed.due_date.map(end_of_day),
        priority: parsed.priority,
        notify_at: None,
    };

    let task = store.add_task(draft, now);
    println!("Created task {} ({}).", short_id(task), task.title);
    Ok(())
}

#[instrument(skip(store, cfg, renderer, now))]
fn cmd_reminders(
    store: &mut TaskStore,
    cfg: &Config,
    renderer: &mut Renderer,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command reminders");

    let permission = if cfg.get_bool("notify.permission").unwrap_or(false) {
        Permission::Granted
    } else {
        Permission::Denied
    };

    let view = project(store.tasks(), store.filter(), store.sort_by(), now);
    let reminders: Vec<_> = view
        .iter()
        .filter_map(|task| reminder::plan(task, now, permission))
        .collect();

    renderer.print_reminders(&reminders)?;
    Ok(())
}

/// Resolves a full uuid or an unambiguous prefix of one. `Ok(None)` when no
/// task matches; an error only when the prefix is ambiguous.
fn resolve_id(store: &TaskStore, raw: &str) -> anyhow::Result<Option<Uuid>> {
    let needle = raw.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Err(anyhow!("task id cannot be empty"));
    }

    if let Ok(id) = Uuid::parse_str(&needle) {
        return Ok(store.find(id).map(|task| task.id));
    }

    let mut matches = store
        .tasks()
        .iter()
        .filter(|task| task.id.to_string().starts_with(&needle));

    let Some(first) = matches.next() else {
        return Ok(None);
    };
    if matches.next().is_some() {
        return Err(anyhow!("id prefix {needle} is ambiguous"));
    }

    Ok(Some(first.id))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use super::resolve_id;
    use crate::store::TaskStore;
    use crate::task::TaskDraft;

    #[test]
    fn id_prefix_resolves_and_unknown_is_none() {
        let temp = tempdir().expect("tempdir");
        let mut store = TaskStore::open(temp.path()).expect("open store");
        let now = Utc
            .with_ymd_and_hms(2026, 3, 2, 12, 0, 0)
            .single()
            .expect("valid instant");
        let id = store
            .add_task(
                TaskDraft {
                    title: "a".to_string(),
                    ..TaskDraft::default()
                },
                now,
            )
            .id;

        let prefix = id.to_string().chars().take(8).collect::<String>();
        assert_eq!(resolve_id(&store, &prefix).expect("resolve"), Some(id));
        assert_eq!(resolve_id(&store, &id.to_string()).expect("resolve"), Some(id));
        assert_eq!(
            resolve_id(&store, "ffffffff-ffff-ffff-ffff-ffffffffffff").expect("resolve"),
            None
        );
        assert!(resolve_id(&store, "").is_err());
    }
}
