use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::workflow_repository::{NewWorkflowRecord, WorkflowChanges, WorkflowRepository};
use crate::models::interaction::{InteractionKind, Platform};
use crate::models::workflow::{
    Condition, ModerationVerbs, SystemWorkflowType, Workflow, WorkflowAction, WorkflowStatus,
};

pub struct PostgresWorkflowRepository {
    pub pool: PgPool,
}

const WORKFLOW_COLUMNS: &str = "id, name, status, priority, view_ids, platforms, \
     interaction_types, conditions, action, system_type, created_at, updated_at";

/// Evaluation order: system tier first (auto_moderator, then
/// auto_archive), then user workflows by priority.
const WORKFLOW_ORDER: &str = "ORDER BY (system_type IS NULL) ASC, \
     CASE system_type WHEN 'auto_moderator' THEN 0 WHEN 'auto_archive' THEN 1 ELSE 2 END ASC, \
     priority ASC, created_at ASC";

#[derive(FromRow)]
struct WorkflowRow {
    id: Uuid,
    name: String,
    status: String,
    priority: i32,
    view_ids: Vec<Uuid>,
    platforms: Vec<String>,
    interaction_types: Vec<String>,
    conditions: serde_json::Value,
    action: serde_json::Value,
    system_type: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

fn decode_err(msg: String) -> sqlx::Error {
    sqlx::Error::Decode(msg.into())
}

impl TryFrom<WorkflowRow> for Workflow {
    type Error = sqlx::Error;

    fn try_from(row: WorkflowRow) -> Result<Self, Self::Error> {
        let status = WorkflowStatus::parse(&row.status)
            .ok_or_else(|| decode_err(format!("unknown workflow status `{}`", row.status)))?;
        let platforms = row
            .platforms
            .iter()
            .map(|p| {
                Platform::parse(p).ok_or_else(|| decode_err(format!("unknown platform `{p}`")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let interaction_types = row
            .interaction_types
            .iter()
            .map(|k| {
                InteractionKind::parse(k)
                    .ok_or_else(|| decode_err(format!("unknown interaction type `{k}`")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let conditions: Vec<Condition> = serde_json::from_value(row.conditions)
            .map_err(|e| decode_err(format!("invalid conditions payload: {e}")))?;
        let action: WorkflowAction = serde_json::from_value(row.action)
            .map_err(|e| decode_err(format!("invalid action payload: {e}")))?;
        let system_type = row
            .system_type
            .as_deref()
            .map(|s| {
                SystemWorkflowType::parse(s)
                    .ok_or_else(|| decode_err(format!("unknown system workflow type `{s}`")))
            })
            .transpose()?;

        Ok(Workflow {
            id: row.id,
            name: row.name,
            status,
            priority: row.priority,
            view_ids: row.view_ids,
            platforms,
            interaction_types,
            conditions,
            action,
            system_type,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn platform_strings(platforms: &[Platform]) -> Vec<String> {
    platforms.iter().map(|p| p.as_str().to_string()).collect()
}

fn kind_strings(kinds: &[InteractionKind]) -> Vec<String> {
    kinds.iter().map(|k| k.as_str().to_string()).collect()
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(value).map_err(|e| decode_err(format!("serialize failed: {e}")))
}

#[async_trait]
impl WorkflowRepository for PostgresWorkflowRepository {
    async fn create_workflow(&self, new: NewWorkflowRecord) -> Result<Workflow, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO workflows
                (name, status, priority, view_ids, platforms, interaction_types,
                 conditions, action, system_type, created_at, updated_at)
            VALUES
                ($1, $2,
                 (SELECT COALESCE(MAX(priority), 0) + 1 FROM workflows WHERE system_type IS NULL),
                 $3, $4, $5, $6, $7, $8, now(), now())
            RETURNING {WORKFLOW_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, WorkflowRow>(&sql)
            .bind(&new.name)
            .bind(new.status.as_str())
            .bind(&new.view_ids)
            .bind(platform_strings(&new.platforms))
            .bind(kind_strings(&new.interaction_types))
            .bind(to_json(&new.conditions)?)
            .bind(to_json(&new.action)?)
            .bind(new.system_type.map(|t| t.as_str()))
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn list_workflows(&self) -> Result<Vec<Workflow>, sqlx::Error> {
        let sql = format!("SELECT {WORKFLOW_COLUMNS} FROM workflows {WORKFLOW_ORDER}");
        let rows = sqlx::query_as::<_, WorkflowRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Workflow::try_from).collect()
    }

    async fn list_active_workflows(&self) -> Result<Vec<Workflow>, sqlx::Error> {
        let sql = format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE status = 'active' {WORKFLOW_ORDER}"
        );
        let rows = sqlx::query_as::<_, WorkflowRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Workflow::try_from).collect()
    }

    async fn find_workflow(&self, workflow_id: Uuid) -> Result<Option<Workflow>, sqlx::Error> {
        let sql = format!("SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = $1");
        let row = sqlx::query_as::<_, WorkflowRow>(&sql)
            .bind(workflow_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Workflow::try_from).transpose()
    }

    async fn update_workflow(
        &self,
        workflow_id: Uuid,
        changes: WorkflowChanges,
    ) -> Result<Option<Workflow>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE workflows
            SET name = $2,
                view_ids = $3,
                platforms = $4,
                interaction_types = $5,
                conditions = $6,
                action = $7,
                updated_at = now()
            WHERE id = $1
            RETURNING {WORKFLOW_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, WorkflowRow>(&sql)
            .bind(workflow_id)
            .bind(&changes.name)
            .bind(&changes.view_ids)
            .bind(platform_strings(&changes.platforms))
            .bind(kind_strings(&changes.interaction_types))
            .bind(to_json(&changes.conditions)?)
            .bind(to_json(&changes.action)?)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Workflow::try_from).transpose()
    }

    async fn delete_workflow(&self, workflow_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = $1 AND system_type IS NULL")
            .bind(workflow_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_workflow_status(
        &self,
        workflow_id: Uuid,
        status: WorkflowStatus,
    ) -> Result<Option<Workflow>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE workflows
            SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING {WORKFLOW_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, WorkflowRow>(&sql)
            .bind(workflow_id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Workflow::try_from).transpose()
    }

    async fn ordering_version(&self) -> Result<i64, sqlx::Error> {
        let version: (i64,) =
            sqlx::query_as("SELECT version FROM workflow_ordering WHERE singleton")
                .fetch_one(&self.pool)
                .await?;
        Ok(version.0)
    }

    async fn apply_user_ordering(
        &self,
        ordering: &[(Uuid, i32)],
        expected_version: i64,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let bumped = sqlx::query(
            "UPDATE workflow_ordering SET version = version + 1 WHERE singleton AND version = $1",
        )
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;
        if bumped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for (workflow_id, priority) in ordering {
            sqlx::query(
                "UPDATE workflows SET priority = $2, updated_at = now() \
                 WHERE id = $1 AND system_type IS NULL",
            )
            .bind(workflow_id)
            .bind(priority)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn ensure_system_workflows(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO workflow_ordering (singleton, version) VALUES (TRUE, 0) \
             ON CONFLICT (singleton) DO NOTHING",
        )
        .execute(&self.pool)
        .await?;

        let moderator_conditions = to_json(&vec![Condition::Prompt {
            prompt: "spam, scams, or abusive content".to_string(),
        }])?;
        let moderator_action = to_json(&WorkflowAction::Moderate {
            verbs: ModerationVerbs::default(),
        })?;
        sqlx::query(
            r#"
            INSERT INTO workflows
                (name, status, priority, view_ids, platforms, interaction_types,
                 conditions, action, system_type, created_at, updated_at)
            VALUES ('Auto-moderator', 'paused', 0, '{}', '{}', '{}', $1, $2, 'auto_moderator', now(), now())
            ON CONFLICT (system_type) DO NOTHING
            "#,
        )
        .bind(moderator_conditions)
        .bind(moderator_action)
        .execute(&self.pool)
        .await?;

        let archive_conditions = to_json(&vec![Condition::Prompt {
            prompt: "promotional or bot-generated content with no reply value".to_string(),
        }])?;
        let archive_action = to_json(&WorkflowAction::Archive)?;
        sqlx::query(
            r#"
            INSERT INTO workflows
                (name, status, priority, view_ids, platforms, interaction_types,
                 conditions, action, system_type, created_at, updated_at)
            VALUES ('Auto-archive', 'paused', 0, '{}', '{}', '{}', $1, $2, 'auto_archive', now(), now())
            ON CONFLICT (system_type) DO NOTHING
            "#,
        )
        .bind(archive_conditions)
        .bind(archive_action)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
