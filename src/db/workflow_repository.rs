use async_trait::async_trait;
use uuid::Uuid;

use crate::models::interaction::{InteractionKind, Platform};
use crate::models::workflow::{
    Condition, SystemWorkflowType, Workflow, WorkflowAction, WorkflowStatus,
};

/// Fields of a workflow to insert. Priority is assigned by the store:
/// next free rank in the user tier.
#[derive(Debug, Clone)]
pub struct NewWorkflowRecord {
    pub name: String,
    pub status: WorkflowStatus,
    pub view_ids: Vec<Uuid>,
    pub platforms: Vec<Platform>,
    pub interaction_types: Vec<InteractionKind>,
    pub conditions: Vec<Condition>,
    pub action: WorkflowAction,
    pub system_type: Option<SystemWorkflowType>,
}

/// Full replacement payload for an update; routes merge partial input
/// into the stored workflow before calling the repository.
#[derive(Debug, Clone)]
pub struct WorkflowChanges {
    pub name: String,
    pub view_ids: Vec<Uuid>,
    pub platforms: Vec<Platform>,
    pub interaction_types: Vec<InteractionKind>,
    pub conditions: Vec<Condition>,
    pub action: WorkflowAction,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn create_workflow(&self, new: NewWorkflowRecord) -> Result<Workflow, sqlx::Error>;

    /// All workflows, system tier first (auto_moderator, auto_archive),
    /// then user workflows ascending by priority.
    async fn list_workflows(&self) -> Result<Vec<Workflow>, sqlx::Error>;

    /// Same ordering as `list_workflows`, restricted to `active` status.
    /// This is the dispatch snapshot.
    async fn list_active_workflows(&self) -> Result<Vec<Workflow>, sqlx::Error>;

    async fn find_workflow(&self, workflow_id: Uuid) -> Result<Option<Workflow>, sqlx::Error>;

    async fn update_workflow(
        &self,
        workflow_id: Uuid,
        changes: WorkflowChanges,
    ) -> Result<Option<Workflow>, sqlx::Error>;

    /// Deletes a user workflow. Returns false when the workflow does not
    /// exist or is a system workflow (system rows are never deleted).
    async fn delete_workflow(&self, workflow_id: Uuid) -> Result<bool, sqlx::Error>;

    async fn set_workflow_status(
        &self,
        workflow_id: Uuid,
        status: WorkflowStatus,
    ) -> Result<Option<Workflow>, sqlx::Error>;

    /// Monotonic version of the user-tier ordering.
    async fn ordering_version(&self) -> Result<i64, sqlx::Error>;

    /// Atomically applies a full user-tier ordering. Compare-and-swap on
    /// `expected_version`; returns false (and changes nothing) when the
    /// version moved underneath the caller.
    async fn apply_user_ordering(
        &self,
        ordering: &[(Uuid, i32)],
        expected_version: i64,
    ) -> Result<bool, sqlx::Error>;

    /// Seeds the auto-moderator and auto-archive workflows if missing.
    async fn ensure_system_workflows(&self) -> Result<(), sqlx::Error>;
}
