/// Action model and owner-scoped database operations
///
/// An action is a progress/defer/done event on a task. It carries no owner
/// column of its own: ownership is always derived through the parent task,
/// and both mutations here resolve it with a lookup join against `tasks`
/// scoped to the caller. An action therefore cannot outlive or escape its
/// task, and the task's owner is the single source of truth for who may
/// touch it.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE action_kind AS ENUM ('progress', 'defer', 'done');
///
/// CREATE TABLE actions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     kind action_kind NOT NULL,
///     occurred_at TIMESTAMPTZ NOT NULL,
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE
/// );
/// ```
///
/// The JSON field for `occurred_at` is `when`, matching the API's event
/// vocabulary; the column avoids the reserved word.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// What an action records about its task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "action_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Progress was made on the task
    Progress,

    /// The task was pushed back
    Defer,

    /// The task was completed
    Done,
}

/// Action model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Action {
    /// Opaque unique action id
    pub id: Uuid,

    /// Event kind
    pub kind: ActionKind,

    /// When the event happened
    #[serde(rename = "when")]
    pub occurred_at: DateTime<Utc>,

    /// Parent task; the only route to this action's owner
    pub task_id: Uuid,
}

/// Input for recording a new action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAction {
    /// Parent task
    pub task_id: Uuid,

    /// Event kind
    pub kind: ActionKind,

    /// When the event happened; defaults to now
    #[serde(default, rename = "when")]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl Action {
    /// Records an action on a task the caller owns
    ///
    /// The insert selects its `task_id` out of `tasks` scoped to `user_id`,
    /// so the ownership check and the write are one atomic statement.
    /// Returns `None` - and writes nothing - when the task is absent or
    /// foreign; the two cases are indistinguishable.
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        data: CreateAction,
    ) -> Result<Option<Self>, sqlx::Error> {
        let occurred_at = data.occurred_at.unwrap_or_else(Utc::now);

        let action = sqlx::query_as::<_, Action>(
            r#"
            INSERT INTO actions (kind, occurred_at, task_id)
            SELECT $1::action_kind, $2::timestamptz, t.id
            FROM tasks t
            WHERE t.id = $3 AND t.user_id = $4
            RETURNING id, kind, occurred_at, task_id
            "#,
        )
        .bind(data.kind)
        .bind(occurred_at)
        .bind(data.task_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(action)
    }

    /// Deletes an action, scoped through its parent task's owner
    ///
    /// Returns whether a row was removed; `false` covers both a missing
    /// action and one whose task belongs to someone else.
    pub async fn delete(pool: &PgPool, action_id: Uuid, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM actions
            USING tasks
            WHERE actions.id = $1
              AND tasks.id = actions.task_id
              AND tasks.user_id = $2
            "#,
        )
        .bind(action_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the actions of one task, oldest first
    pub(crate) async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let actions = sqlx::query_as::<_, Action>(
            r#"
            SELECT id, kind, occurred_at, task_id
            FROM actions
            WHERE task_id = $1
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        Ok(actions)
    }

    /// Batch-lists the actions of many tasks in one query
    pub(crate) async fn list_for_tasks(
        pool: &PgPool,
        task_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let actions = sqlx::query_as::<_, Action>(
            r#"
            SELECT id, kind, occurred_at, task_id
            FROM actions
            WHERE task_id = ANY($1)
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(task_ids)
        .fetch_all(pool)
        .await?;

        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&ActionKind::Progress).unwrap(),
            "\"progress\""
        );
        assert_eq!(
            serde_json::from_str::<ActionKind>("\"defer\"").unwrap(),
            ActionKind::Defer
        );
    }

    #[test]
    fn test_action_serializes_timestamp_as_when() {
        let action = Action {
            id: Uuid::new_v4(),
            kind: ActionKind::Done,
            occurred_at: Utc::now(),
            task_id: Uuid::new_v4(),
        };

        let json = serde_json::to_value(&action).expect("serialize");
        assert!(json.get("when").is_some());
        assert!(json.get("occurred_at").is_none());
    }

    #[test]
    fn test_create_action_when_is_optional() {
        let json = format!(r#"{{"task_id": "{}", "kind": "progress"}}"#, Uuid::new_v4());
        let input: CreateAction = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(input.kind, ActionKind::Progress);
        assert!(input.occurred_at.is_none());
    }
}
