use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::interaction_repository::{
    DispatchFailure, InteractionPage, InteractionRepository, ListByViewParams, OverviewStats,
    SortOrder, WorkflowDispatchCount,
};
use crate::models::interaction::{
    DispatchState, Interaction, InteractionKind, InteractionStatus, NewInteraction,
    PendingResponse, Platform,
};
use crate::models::workflow::ReviewPriority;

pub struct PostgresInteractionRepository {
    pub pool: PgPool,
}

const INTERACTION_COLUMNS: &str = "id, platform, kind, external_id, author_handle, \
     author_follower_count, author_is_verified, content, like_count, status, \
     review_priority, tags, view_ids, pending_response, dispatch_state, \
     matched_workflow_id, received_at, updated_at";

#[derive(FromRow)]
struct InteractionRow {
    id: Uuid,
    platform: String,
    kind: String,
    external_id: String,
    author_handle: String,
    author_follower_count: i64,
    author_is_verified: bool,
    content: String,
    like_count: i64,
    status: String,
    review_priority: Option<String>,
    tags: Vec<String>,
    view_ids: Vec<Uuid>,
    pending_response: Option<serde_json::Value>,
    dispatch_state: String,
    matched_workflow_id: Option<Uuid>,
    received_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

fn decode_err(msg: String) -> sqlx::Error {
    sqlx::Error::Decode(msg.into())
}

impl TryFrom<InteractionRow> for Interaction {
    type Error = sqlx::Error;

    fn try_from(row: InteractionRow) -> Result<Self, Self::Error> {
        let platform = Platform::parse(&row.platform)
            .ok_or_else(|| decode_err(format!("unknown platform `{}`", row.platform)))?;
        let kind = InteractionKind::parse(&row.kind)
            .ok_or_else(|| decode_err(format!("unknown interaction kind `{}`", row.kind)))?;
        let status = InteractionStatus::parse(&row.status)
            .ok_or_else(|| decode_err(format!("unknown interaction status `{}`", row.status)))?;
        let dispatch_state = DispatchState::parse(&row.dispatch_state).ok_or_else(|| {
            decode_err(format!("unknown dispatch state `{}`", row.dispatch_state))
        })?;
        let review_priority = row
            .review_priority
            .as_deref()
            .map(|p| {
                ReviewPriority::parse(p)
                    .ok_or_else(|| decode_err(format!("unknown review priority `{p}`")))
            })
            .transpose()?;
        let pending_response = row
            .pending_response
            .map(|v| {
                serde_json::from_value::<PendingResponse>(v)
                    .map_err(|e| decode_err(format!("invalid pending response payload: {e}")))
            })
            .transpose()?;

        Ok(Interaction {
            id: row.id,
            platform,
            kind,
            external_id: row.external_id,
            author_handle: row.author_handle,
            author_follower_count: row.author_follower_count,
            author_is_verified: row.author_is_verified,
            content: row.content,
            like_count: row.like_count,
            status,
            review_priority,
            tags: row.tags,
            view_ids: row.view_ids,
            pending_response,
            dispatch_state,
            matched_workflow_id: row.matched_workflow_id,
            received_at: row.received_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl InteractionRepository for PostgresInteractionRepository {
    async fn insert_interaction(
        &self,
        platform: Platform,
        new: NewInteraction,
    ) -> Result<Option<Interaction>, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO interactions
                (platform, kind, external_id, author_handle, author_follower_count,
                 author_is_verified, content, like_count, status, tags, view_ids,
                 dispatch_state, received_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'unread', '{{}}', '{{}}', 'pending', now(), now())
            ON CONFLICT (platform, external_id) DO NOTHING
            RETURNING {INTERACTION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, InteractionRow>(&sql)
            .bind(platform.as_str())
            .bind(new.kind.as_str())
            .bind(&new.external_id)
            .bind(&new.author_handle)
            .bind(new.author_follower_count)
            .bind(new.author_is_verified)
            .bind(&new.content)
            .bind(new.like_count)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Interaction::try_from).transpose()
    }

    async fn find_interaction(&self, id: Uuid) -> Result<Option<Interaction>, sqlx::Error> {
        let sql = format!("SELECT {INTERACTION_COLUMNS} FROM interactions WHERE id = $1");
        let row = sqlx::query_as::<_, InteractionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Interaction::try_from).transpose()
    }

    async fn list_by_view(
        &self,
        params: ListByViewParams,
    ) -> Result<InteractionPage, sqlx::Error> {
        fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &ListByViewParams) {
            qb.push(" WHERE ");
            qb.push_bind(params.view_id);
            qb.push(" = ANY(view_ids)");
            if let Some(tab) = params.tab {
                qb.push(" AND status = ");
                qb.push_bind(tab.as_str());
            }
            if !params.platforms.is_empty() {
                let platforms: Vec<String> = params
                    .platforms
                    .iter()
                    .map(|p| p.as_str().to_string())
                    .collect();
                qb.push(" AND platform = ANY(");
                qb.push_bind(platforms);
                qb.push(")");
            }
        }

        let mut count_qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM interactions");
        push_filters(&mut count_qb, &params);
        let total: i64 = count_qb
            .build()
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {INTERACTION_COLUMNS} FROM interactions"
        ));
        push_filters(&mut qb, &params);
        qb.push(match params.sort {
            SortOrder::Newest => " ORDER BY received_at DESC",
            SortOrder::Oldest => " ORDER BY received_at ASC",
            SortOrder::MostLiked => " ORDER BY like_count DESC, received_at DESC",
        });
        qb.push(" LIMIT ");
        qb.push_bind(params.page_size);
        qb.push(" OFFSET ");
        qb.push_bind((params.page.max(1) - 1) * params.page_size);

        let rows = qb
            .build_query_as::<InteractionRow>()
            .fetch_all(&self.pool)
            .await?;
        let interactions = rows
            .into_iter()
            .map(Interaction::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(InteractionPage {
            interactions,
            total,
        })
    }

    async fn set_status(&self, id: Uuid, status: InteractionStatus) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE interactions SET status = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(status.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn bulk_set_status(
        &self,
        ids: &[Uuid],
        status: InteractionStatus,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE interactions SET status = $2, updated_at = now() WHERE id = ANY($1)",
        )
        .bind(ids)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn set_view_ids(&self, id: Uuid, view_ids: &[Uuid]) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE interactions SET view_ids = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(view_ids)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn add_tags(&self, id: Uuid, tags: &[String]) -> Result<bool, sqlx::Error> {
        // Append only tags not already present; keeps existing order.
        let result = sqlx::query(
            r#"
            UPDATE interactions
            SET tags = tags || COALESCE(
                    (SELECT array_agg(DISTINCT t) FROM unnest($2::text[]) AS t
                     WHERE NOT (t = ANY(tags))),
                    '{}'),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(tags)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_review_priority(
        &self,
        id: Uuid,
        priority: ReviewPriority,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE interactions SET review_priority = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(priority.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_pending_response(
        &self,
        id: Uuid,
        pending: PendingResponse,
    ) -> Result<Option<Interaction>, sqlx::Error> {
        let payload = serde_json::to_value(&pending)
            .map_err(|e| decode_err(format!("serialize failed: {e}")))?;
        let sql = format!(
            r#"
            UPDATE interactions
            SET pending_response = $2, status = 'awaiting_approval', updated_at = now()
            WHERE id = $1
            RETURNING {INTERACTION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, InteractionRow>(&sql)
            .bind(id)
            .bind(payload)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Interaction::try_from).transpose()
    }

    async fn clear_pending_response(&self, id: Uuid) -> Result<Option<Interaction>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE interactions
            SET status = COALESCE(pending_response->>'prior_status', status),
                pending_response = NULL,
                updated_at = now()
            WHERE id = $1 AND pending_response IS NOT NULL
            RETURNING {INTERACTION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, InteractionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Interaction::try_from).transpose()
    }

    async fn mark_replied(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE interactions SET status = 'replied', pending_response = NULL, \
             updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn claim_next_pending(&self) -> Result<Option<Interaction>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE interactions
            SET dispatch_state = 'evaluating', updated_at = now()
            WHERE id = (
                SELECT id FROM interactions
                WHERE dispatch_state = 'pending'
                ORDER BY received_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING {INTERACTION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, InteractionRow>(&sql)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Interaction::try_from).transpose()
    }

    async fn mark_dispatched(&self, id: Uuid, workflow_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE interactions SET dispatch_state = 'dispatched', matched_workflow_id = $2, \
             updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(workflow_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_exhausted(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE interactions SET dispatch_state = 'exhausted', updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_dispatch_failed(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE interactions SET dispatch_state = 'failed', updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn requeue_for_dispatch(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE interactions SET dispatch_state = 'pending', updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_dispatch_failure(
        &self,
        interaction_id: Uuid,
        workflow_id: Option<Uuid>,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO dispatch_failures (interaction_id, workflow_id, error, created_at) \
             VALUES ($1, $2, $3, now())",
        )
        .bind(interaction_id)
        .bind(workflow_id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_dispatch_failures(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DispatchFailure>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, interaction_id, workflow_id, error, created_at \
             FROM dispatch_failures ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(DispatchFailure {
                    id: row.try_get("id")?,
                    interaction_id: row.try_get("interaction_id")?,
                    workflow_id: row.try_get("workflow_id")?,
                    error: row.try_get("error")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn find_dispatch_failure(
        &self,
        id: Uuid,
    ) -> Result<Option<DispatchFailure>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, interaction_id, workflow_id, error, created_at \
             FROM dispatch_failures WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(DispatchFailure {
                id: row.try_get("id")?,
                interaction_id: row.try_get("interaction_id")?,
                workflow_id: row.try_get("workflow_id")?,
                error: row.try_get("error")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }

    async fn delete_dispatch_failure(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM dispatch_failures WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn overview_stats(&self, since: OffsetDateTime) -> Result<OverviewStats, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'unread') AS unread,
                   COUNT(*) FILTER (WHERE status = 'read') AS read,
                   COUNT(*) FILTER (WHERE status = 'awaiting_approval') AS awaiting_approval,
                   COUNT(*) FILTER (WHERE status = 'replied') AS replied,
                   COUNT(*) FILTER (WHERE status = 'archived') AS archived,
                   COUNT(*) FILTER (WHERE matched_workflow_id IS NOT NULL) AS automated
            FROM interactions
            WHERE received_at >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(OverviewStats {
            total: row.try_get("total")?,
            unread: row.try_get("unread")?,
            read: row.try_get("read")?,
            awaiting_approval: row.try_get("awaiting_approval")?,
            replied: row.try_get("replied")?,
            archived: row.try_get("archived")?,
            automated: row.try_get("automated")?,
        })
    }

    async fn workflow_dispatch_counts(
        &self,
        since: OffsetDateTime,
    ) -> Result<Vec<WorkflowDispatchCount>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT matched_workflow_id AS workflow_id, COUNT(*) AS dispatched
            FROM interactions
            WHERE matched_workflow_id IS NOT NULL AND received_at >= $1
            GROUP BY matched_workflow_id
            ORDER BY dispatched DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(WorkflowDispatchCount {
                    workflow_id: row.try_get("workflow_id")?,
                    dispatched: row.try_get("dispatched")?,
                })
            })
            .collect()
    }
}
