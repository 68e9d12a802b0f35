/// Task model and owner-scoped database operations
///
/// A row in `tasks` is either a one-off task or a recurring habit,
/// discriminated by `kind`. Date fields are meaningful for tasks,
/// interval/frequency for habits; both groups are physically present on
/// every row.
///
/// Every operation here is scoped by the authenticated user's id. A lookup
/// that matches no row answers `None` whether the task is absent or owned by
/// someone else - existence is never revealed to non-owners.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_kind AS ENUM ('task', 'habit');
/// CREATE TYPE habit_interval AS ENUM ('daily', 'weekly', 'monthly');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     kind task_kind NOT NULL,
///     title TEXT NOT NULL,
///     done BOOLEAN NOT NULL DEFAULT FALSE,
///     user_id BIGINT NOT NULL REFERENCES users(id),
///     start_date TIMESTAMPTZ,
///     end_date TIMESTAMPTZ,
///     interval habit_interval,
///     frequency INTEGER,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use duet_shared::models::task::{CreateTask, Task, TaskKind};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, user_id: i64) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, user_id, CreateTask {
///     kind: TaskKind::Task,
///     title: "Buy milk".to_string(),
///     ..Default::default()
/// }).await?;
///
/// // Only the owner can see it; any other user_id answers None.
/// let mine = Task::find(&pool, task.id, user_id, None, true).await?;
/// assert!(mine.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::action::Action;

/// Discriminator between one-off tasks and recurring habits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// One-off task with an optional start/end date range
    Task,

    /// Recurring habit with an interval and frequency
    Habit,
}

/// Recurrence interval of a habit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "habit_interval", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    Weekly,
    Monthly,
}

/// Task model
///
/// `actions` is not a column; it is filled in only when the caller asks for
/// it, so reads that don't need the event history don't pay for it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Opaque unique task id
    pub id: Uuid,

    /// One-off task or recurring habit
    pub kind: TaskKind,

    /// Human-readable title
    pub title: String,

    /// Completion flag
    pub done: bool,

    /// Owning user; stamped by [`Task::create`], never caller-supplied
    pub user_id: i64,

    /// Start of the date range (tasks only)
    pub start_date: Option<DateTime<Utc>>,

    /// End of the date range (tasks only)
    pub end_date: Option<DateTime<Utc>>,

    /// Recurrence interval (habits only)
    pub interval: Option<Interval>,

    /// Recurrences per interval (habits only)
    pub frequency: Option<i32>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker; deletes are hard, so this stays NULL
    pub deleted_at: Option<DateTime<Utc>>,

    /// Actions on this task, ordered by occurrence; loaded on request
    #[sqlx(skip)]
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// Input for creating a new task
///
/// Deliberately carries no owner field: the authenticated user id is stamped
/// by [`Task::create`], and an owner smuggled into the request body is
/// ignored by deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTask {
    /// One-off task or recurring habit
    #[serde(default)]
    pub kind: TaskKind,

    /// Human-readable title
    pub title: String,

    /// Completion flag (defaults to false)
    #[serde(default)]
    pub done: bool,

    /// Start of the date range (tasks only)
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    /// End of the date range (tasks only)
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    /// Recurrence interval (habits only)
    #[serde(default)]
    pub interval: Option<Interval>,

    /// Recurrences per interval (habits only)
    #[serde(default)]
    pub frequency: Option<i32>,
}

impl Default for TaskKind {
    fn default() -> Self {
        TaskKind::Task
    }
}

/// Typed partial update for a task
///
/// `None` leaves a field untouched. For the nullable columns the outer
/// option distinguishes "absent from the patch" from "explicitly set to
/// null": `Some(None)` clears the column.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    /// New title
    #[serde(default)]
    pub title: Option<String>,

    /// New completion flag
    #[serde(default)]
    pub done: Option<bool>,

    /// New start date; `Some(None)` clears it
    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<DateTime<Utc>>>,

    /// New end date; `Some(None)` clears it
    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<DateTime<Utc>>>,

    /// New recurrence interval; `Some(None)` clears it
    #[serde(default, deserialize_with = "double_option")]
    pub interval: Option<Option<Interval>>,

    /// New frequency; `Some(None)` clears it
    #[serde(default, deserialize_with = "double_option")]
    pub frequency: Option<Option<i32>>,
}

// Maps a present-but-null JSON field to Some(None); an absent field stays
// None via #[serde(default)].
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

const TASK_COLUMNS: &str = "id, kind, title, done, user_id, start_date, end_date, \
                            interval, frequency, created_at, updated_at, deleted_at";

impl Task {
    /// Creates a new task owned by `user_id`
    ///
    /// The owner is stamped unconditionally from the authenticated identity;
    /// [`CreateTask`] has no owner field to spoof.
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        data: CreateTask,
    ) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (kind, title, done, user_id, start_date, end_date, interval, frequency)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(data.kind)
        .bind(data.title)
        .bind(data.done)
        .bind(user_id)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.interval)
        .bind(data.frequency)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds one task by `(id, owner)`, optionally narrowed by kind
    ///
    /// Returns `None` identically when the id does not exist and when it
    /// belongs to another user. Actions are loaded only when `with_actions`
    /// is set.
    pub async fn find(
        pool: &PgPool,
        task_id: Uuid,
        user_id: i64,
        kind: Option<TaskKind>,
        with_actions: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE id = $1 AND user_id = $2 AND ($3::task_kind IS NULL OR kind = $3)
            "#,
        ))
        .bind(task_id)
        .bind(user_id)
        .bind(kind)
        .fetch_optional(pool)
        .await?;

        match task {
            Some(mut task) => {
                if with_actions {
                    task.actions = Action::list_for_task(pool, task.id).await?;
                }
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    /// Lists the caller's tasks, optionally narrowed by kind
    ///
    /// When `with_actions` is set the actions for the whole page are fetched
    /// with one batched query, not one query per task.
    pub async fn list(
        pool: &PgPool,
        user_id: i64,
        kind: Option<TaskKind>,
        with_actions: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE user_id = $1 AND ($2::task_kind IS NULL OR kind = $2)
            ORDER BY created_at ASC, id ASC
            "#,
        ))
        .bind(user_id)
        .bind(kind)
        .fetch_all(pool)
        .await?;

        if with_actions && !tasks.is_empty() {
            let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();

            let mut grouped: HashMap<Uuid, Vec<Action>> = HashMap::new();
            for action in Action::list_for_tasks(pool, &ids).await? {
                grouped.entry(action.task_id).or_default().push(action);
            }

            for task in &mut tasks {
                task.actions = grouped.remove(&task.id).unwrap_or_default();
            }
        }

        Ok(tasks)
    }

    /// Applies a typed partial patch, scoped by `(id, owner)`
    ///
    /// Zero matched rows - the task is absent or foreign, the caller cannot
    /// tell which - answers `None`. On success the task is returned with its
    /// actions reloaded.
    pub async fn update(
        pool: &PgPool,
        task_id: Uuid,
        user_id: i64,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build the SET list from whichever fields the patch carries;
        // updated_at moves on every patch, even an empty one.
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2; // $1 = task id, $2 = owner

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${bind_count}"));
        }
        if data.done.is_some() {
            bind_count += 1;
            query.push_str(&format!(", done = ${bind_count}"));
        }
        if data.start_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", start_date = ${bind_count}"));
        }
        if data.end_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", end_date = ${bind_count}"));
        }
        if data.interval.is_some() {
            bind_count += 1;
            query.push_str(&format!(", interval = ${bind_count}"));
        }
        if data.frequency.is_some() {
            bind_count += 1;
            query.push_str(&format!(", frequency = ${bind_count}"));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND user_id = $2 RETURNING {TASK_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(task_id).bind(user_id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(done) = data.done {
            q = q.bind(done);
        }
        if let Some(start_date) = data.start_date {
            q = q.bind(start_date);
        }
        if let Some(end_date) = data.end_date {
            q = q.bind(end_date);
        }
        if let Some(interval) = data.interval {
            q = q.bind(interval);
        }
        if let Some(frequency) = data.frequency {
            q = q.bind(frequency);
        }

        match q.fetch_optional(pool).await? {
            Some(mut task) => {
                task.actions = Action::list_for_task(pool, task.id).await?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    /// Hard-deletes a task scoped by `(id, owner)`
    ///
    /// Returns whether a row was actually removed; deleting a task that is
    /// absent or foreign is a no-op, not an error.
    pub async fn delete(pool: &PgPool, task_id: Uuid, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(task_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_kind_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&TaskKind::Habit).unwrap(), "\"habit\"");
        assert_eq!(
            serde_json::from_str::<TaskKind>("\"task\"").unwrap(),
            TaskKind::Task
        );
        assert_eq!(
            serde_json::from_str::<Interval>("\"weekly\"").unwrap(),
            Interval::Weekly
        );
    }

    #[test]
    fn test_create_task_ignores_caller_supplied_owner() {
        // An attacker smuggling an owner into the payload gets nothing: the
        // struct has no such field and unknown keys are dropped.
        let input: CreateTask = serde_json::from_str(
            r#"{"kind": "task", "title": "Buy milk", "user_id": 999, "owner": 999}"#,
        )
        .expect("deserialize");

        assert_eq!(input.title, "Buy milk");
        assert_eq!(input.kind, TaskKind::Task);
    }

    #[test]
    fn test_create_task_defaults() {
        let input: CreateTask = serde_json::from_str(r#"{"title": "Stretch"}"#).expect("deserialize");

        assert_eq!(input.kind, TaskKind::Task);
        assert!(!input.done);
        assert!(input.start_date.is_none());
        assert!(input.interval.is_none());
    }

    #[test]
    fn test_update_task_distinguishes_absent_from_null() {
        let patch: UpdateTask =
            serde_json::from_str(r#"{"title": "Walk", "end_date": null}"#).expect("deserialize");

        assert_eq!(patch.title.as_deref(), Some("Walk"));
        // absent -> leave untouched
        assert!(patch.start_date.is_none());
        // null -> clear the column
        assert_eq!(patch.end_date, Some(None));
    }

    #[test]
    fn test_update_task_with_value() {
        let patch: UpdateTask = serde_json::from_str(
            r#"{"done": true, "interval": "daily", "frequency": 3}"#,
        )
        .expect("deserialize");

        assert_eq!(patch.done, Some(true));
        assert_eq!(patch.interval, Some(Some(Interval::Daily)));
        assert_eq!(patch.frequency, Some(Some(3)));
        assert!(patch.title.is_none());
    }

    #[test]
    fn test_update_task_default_is_empty_patch() {
        let patch = UpdateTask::default();
        assert!(patch.title.is_none());
        assert!(patch.done.is_none());
        assert!(patch.start_date.is_none());
        assert!(patch.end_date.is_none());
        assert!(patch.interval.is_none());
        assert!(patch.frequency.is_none());
    }
}
