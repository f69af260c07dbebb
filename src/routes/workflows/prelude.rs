pub(crate) use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
pub(crate) use serde::Deserialize;
pub(crate) use serde_json::json;
pub(crate) use tracing::error;
pub(crate) use uuid::Uuid;

pub(crate) use crate::{
    db::workflow_repository::{NewWorkflowRecord, WorkflowChanges},
    engine::rule_store::{plan_reorder, ReorderError},
    models::workflow::{validate_workflow, CreateWorkflow, UpdateWorkflow, WorkflowStatus},
    responses::JsonResponse,
    state::AppState,
};
