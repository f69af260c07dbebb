use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::models::view::{CreateView, UpdateView, ViewDefinition};
use crate::responses::JsonResponse;
use crate::state::AppState;

fn validate_definition(definition: &ViewDefinition) -> Result<(), &'static str> {
    match definition {
        ViewDefinition::Manual { .. } => Ok(()),
        ViewDefinition::AiPrompt { prompt } if prompt.trim().is_empty() => {
            Err("View prompt cannot be empty")
        }
        ViewDefinition::AiPrompt { .. } => Ok(()),
    }
}

pub async fn list_views(State(app_state): State<AppState>) -> Response {
    match app_state.view_repo.list_views().await {
        Ok(views) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "views": views
            })),
        )
            .into_response(),
        Err(e) => {
            error!(?e, "DB error listing views");
            JsonResponse::server_error("Failed to fetch views").into_response()
        }
    }
}

pub async fn create_view(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateView>,
) -> Response {
    if payload.name.trim().is_empty() {
        return JsonResponse::bad_request("View name is required").into_response();
    }
    if let Err(msg) = validate_definition(&payload.definition) {
        return JsonResponse::bad_request(msg).into_response();
    }

    match app_state
        .view_repo
        .create_view(&payload.name, payload.definition)
        .await
    {
        Ok(view) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "view": view
            })),
        )
            .into_response(),
        Err(e) => {
            error!(?e, "DB error creating view");
            JsonResponse::server_error("Failed to create view").into_response()
        }
    }
}

pub async fn update_view(
    State(app_state): State<AppState>,
    Path(view_id): Path<Uuid>,
    Json(payload): Json<UpdateView>,
) -> Response {
    let existing = match app_state.view_repo.find_view(view_id).await {
        Ok(Some(view)) => view,
        Ok(None) => return JsonResponse::not_found("View not found").into_response(),
        Err(e) => {
            error!(?e, "DB error fetching view");
            return JsonResponse::server_error("Failed to update view").into_response();
        }
    };

    let name = payload.name.unwrap_or(existing.name);
    let definition = payload.definition.unwrap_or(existing.definition);
    if name.trim().is_empty() {
        return JsonResponse::bad_request("View name is required").into_response();
    }
    if let Err(msg) = validate_definition(&definition) {
        return JsonResponse::bad_request(msg).into_response();
    }

    match app_state
        .view_repo
        .update_view(view_id, &name, definition)
        .await
    {
        Ok(Some(view)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "view": view
            })),
        )
            .into_response(),
        Ok(None) => JsonResponse::not_found("View not found").into_response(),
        Err(e) => {
            error!(?e, "DB error updating view");
            JsonResponse::server_error("Failed to update view").into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct PinPayload {
    #[serde(default = "default_pinned")]
    pub pinned: bool,
}

fn default_pinned() -> bool {
    true
}

pub async fn pin_view(
    State(app_state): State<AppState>,
    Path(view_id): Path<Uuid>,
    payload: Option<Json<PinPayload>>,
) -> Response {
    let pinned = payload.map(|Json(p)| p.pinned).unwrap_or(true);
    match app_state.view_repo.set_pinned(view_id, pinned).await {
        Ok(Some(view)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "view": view
            })),
        )
            .into_response(),
        Ok(None) => JsonResponse::not_found("View not found").into_response(),
        Err(e) => {
            error!(?e, "DB error pinning view");
            JsonResponse::server_error("Failed to pin view").into_response()
        }
    }
}

pub async fn duplicate_view(
    State(app_state): State<AppState>,
    Path(view_id): Path<Uuid>,
) -> Response {
    let existing = match app_state.view_repo.find_view(view_id).await {
        Ok(Some(view)) => view,
        Ok(None) => return JsonResponse::not_found("View not found").into_response(),
        Err(e) => {
            error!(?e, "DB error fetching view");
            return JsonResponse::server_error("Failed to duplicate view").into_response();
        }
    };

    let copy_name = format!("{} (copy)", existing.name);
    match app_state
        .view_repo
        .create_view(&copy_name, existing.definition)
        .await
    {
        Ok(view) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "view": view
            })),
        )
            .into_response(),
        Err(e) => {
            error!(?e, "DB error duplicating view");
            JsonResponse::server_error("Failed to duplicate view").into_response()
        }
    }
}

pub async fn delete_view(
    State(app_state): State<AppState>,
    Path(view_id): Path<Uuid>,
) -> Response {
    match app_state.view_repo.delete_view(view_id).await {
        Ok(true) => JsonResponse::success("View deleted").into_response(),
        Ok(false) => JsonResponse::not_found("View not found").into_response(),
        Err(e) => {
            error!(?e, "DB error deleting view");
            JsonResponse::server_error("Failed to delete view").into_response()
        }
    }
}
