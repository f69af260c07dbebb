use async_trait::async_trait;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::interaction::{
    Interaction, InteractionStatus, NewInteraction, PendingResponse, Platform,
};
use crate::models::workflow::ReviewPriority;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Newest,
    Oldest,
    MostLiked,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "newest" => Some(SortOrder::Newest),
            "oldest" => Some(SortOrder::Oldest),
            "most_liked" => Some(SortOrder::MostLiked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListByViewParams {
    pub view_id: Uuid,
    pub page: i64,
    pub page_size: i64,
    pub sort: SortOrder,
    /// Status tab; `None` lists every status.
    pub tab: Option<InteractionStatus>,
    pub platforms: Vec<Platform>,
}

#[derive(Debug)]
pub struct InteractionPage {
    pub interactions: Vec<Interaction>,
    pub total: i64,
}

/// A dispatch whose side effect failed. The interaction stays in its
/// pre-dispatch state and can be requeued from here.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchFailure {
    pub id: Uuid,
    pub interaction_id: Uuid,
    pub workflow_id: Option<Uuid>,
    pub error: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewStats {
    pub total: i64,
    pub unread: i64,
    pub read: i64,
    pub awaiting_approval: i64,
    pub replied: i64,
    pub archived: i64,
    /// Interactions a workflow acted on.
    pub automated: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowDispatchCount {
    pub workflow_id: Uuid,
    pub dispatched: i64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// Inserts an inbound interaction queued for dispatch. Returns None
    /// when (platform, external_id) was already ingested.
    async fn insert_interaction(
        &self,
        platform: Platform,
        new: NewInteraction,
    ) -> Result<Option<Interaction>, sqlx::Error>;

    async fn find_interaction(&self, id: Uuid) -> Result<Option<Interaction>, sqlx::Error>;

    async fn list_by_view(
        &self,
        params: ListByViewParams,
    ) -> Result<InteractionPage, sqlx::Error>;

    async fn set_status(&self, id: Uuid, status: InteractionStatus) -> Result<bool, sqlx::Error>;

    async fn bulk_set_status(
        &self,
        ids: &[Uuid],
        status: InteractionStatus,
    ) -> Result<u64, sqlx::Error>;

    async fn set_view_ids(&self, id: Uuid, view_ids: &[Uuid]) -> Result<bool, sqlx::Error>;

    /// Union-appends tags; re-adding an existing tag is a no-op.
    async fn add_tags(&self, id: Uuid, tags: &[String]) -> Result<bool, sqlx::Error>;

    async fn set_review_priority(
        &self,
        id: Uuid,
        priority: ReviewPriority,
    ) -> Result<bool, sqlx::Error>;

    /// Stores a draft and moves the interaction to awaiting_approval in
    /// one write.
    async fn set_pending_response(
        &self,
        id: Uuid,
        pending: PendingResponse,
    ) -> Result<Option<Interaction>, sqlx::Error>;

    /// Drops the draft and restores the status recorded in it.
    async fn clear_pending_response(&self, id: Uuid) -> Result<Option<Interaction>, sqlx::Error>;

    /// Clears any draft and moves the interaction to replied.
    async fn mark_replied(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    /// Claims the oldest pending interaction for dispatch
    /// (`FOR UPDATE SKIP LOCKED`), moving it to `evaluating`.
    async fn claim_next_pending(&self) -> Result<Option<Interaction>, sqlx::Error>;

    async fn mark_dispatched(&self, id: Uuid, workflow_id: Uuid) -> Result<bool, sqlx::Error>;

    async fn mark_exhausted(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    async fn mark_dispatch_failed(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    /// Puts an interaction back on the dispatch queue.
    async fn requeue_for_dispatch(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    async fn insert_dispatch_failure(
        &self,
        interaction_id: Uuid,
        workflow_id: Option<Uuid>,
        error: &str,
    ) -> Result<(), sqlx::Error>;

    async fn list_dispatch_failures(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DispatchFailure>, sqlx::Error>;

    async fn find_dispatch_failure(
        &self,
        id: Uuid,
    ) -> Result<Option<DispatchFailure>, sqlx::Error>;

    async fn delete_dispatch_failure(&self, id: Uuid) -> Result<bool, sqlx::Error>;

    // Analytics projections
    async fn overview_stats(&self, since: OffsetDateTime) -> Result<OverviewStats, sqlx::Error>;

    async fn workflow_dispatch_counts(
        &self,
        since: OffsetDateTime,
    ) -> Result<Vec<WorkflowDispatchCount>, sqlx::Error>;
}
