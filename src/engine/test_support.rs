use std::sync::Arc;

use dashmap::DashMap;
use reqwest::Client;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::Config;
use crate::db::interaction_repository::MockInteractionRepository;
use crate::db::view_repository::MockViewRepository;
use crate::db::workflow_repository::MockWorkflowRepository;
use crate::models::interaction::{
    DispatchState, Interaction, InteractionKind, InteractionStatus, Platform,
};
use crate::models::workflow::{Workflow, WorkflowAction, WorkflowStatus};
use crate::services::ai::mock::{MockClassifier, MockGenerator};
use crate::services::platform::mock::MockPlatformClient;
use crate::state::AppState;

/// Assembles an AppState over mocks; pass `None` for collaborators a
/// test does not exercise.
pub(crate) fn build_state(
    interaction_repo: Option<MockInteractionRepository>,
    workflow_repo: Option<MockWorkflowRepository>,
    platform: Option<Arc<MockPlatformClient>>,
    classifier: Option<Arc<MockClassifier>>,
    generator: Option<Arc<MockGenerator>>,
) -> AppState {
    AppState {
        workflow_repo: Arc::new(workflow_repo.unwrap_or_default()),
        interaction_repo: Arc::new(interaction_repo.unwrap_or_default()),
        view_repo: Arc::new(MockViewRepository::new()),
        classifier: classifier.unwrap_or_default(),
        generator: generator.unwrap_or_default(),
        platform: platform.unwrap_or_default(),
        http_client: Arc::new(Client::new()),
        config: Arc::new(Config::test_stub()),
        dispatch_guard: Arc::new(DashMap::new()),
    }
}

pub(crate) fn interaction_fixture() -> Interaction {
    let now = OffsetDateTime::now_utc();
    Interaction {
        id: Uuid::new_v4(),
        platform: Platform::Instagram,
        kind: InteractionKind::Comment,
        external_id: "c-1".into(),
        author_handle: "jordan".into(),
        author_follower_count: 350,
        author_is_verified: false,
        content: "hello there".into(),
        like_count: 4,
        status: InteractionStatus::Unread,
        review_priority: None,
        tags: vec![],
        view_ids: vec![],
        pending_response: None,
        dispatch_state: DispatchState::Evaluating,
        matched_workflow_id: None,
        received_at: now,
        updated_at: now,
    }
}

pub(crate) fn workflow_fixture(action: WorkflowAction) -> Workflow {
    let now = OffsetDateTime::now_utc();
    Workflow {
        id: Uuid::new_v4(),
        name: "Fixture".into(),
        status: WorkflowStatus::Active,
        priority: 1,
        view_ids: vec![],
        platforms: vec![],
        interaction_types: vec![],
        conditions: vec![],
        action,
        system_type: None,
        created_at: now,
        updated_at: now,
    }
}
