use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use tracing::error;
use uuid::Uuid;

use crate::db::interaction_repository::{ListByViewParams, SortOrder};
use crate::models::interaction::{InteractionStatus, PendingResponse, Platform};
use crate::responses::JsonResponse;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 25;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    /// Status tab; omitted or "all" lists every status.
    pub tab: Option<String>,
    /// Comma-separated platform filter.
    pub platforms: Option<String>,
}

pub async fn list_by_view(
    State(app_state): State<AppState>,
    Path(view_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Response {
    match app_state.view_repo.find_view(view_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return JsonResponse::not_found("View not found").into_response(),
        Err(e) => {
            error!(?e, "DB error fetching view");
            return JsonResponse::server_error("Failed to fetch interactions").into_response();
        }
    }

    let tab = match query.tab.as_deref() {
        None | Some("all") => None,
        Some(raw) => match InteractionStatus::parse(raw) {
            Some(status) => Some(status),
            None => return JsonResponse::bad_request("Unknown tab").into_response(),
        },
    };

    let sort = match query.sort_by.as_deref() {
        None => SortOrder::Newest,
        Some(raw) => match SortOrder::parse(raw) {
            Some(sort) => sort,
            None => return JsonResponse::bad_request("Unknown sort order").into_response(),
        },
    };

    let mut platforms = Vec::new();
    if let Some(raw) = query.platforms.as_deref() {
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match Platform::parse(part) {
                Some(platform) => platforms.push(platform),
                None => return JsonResponse::bad_request("Unknown platform").into_response(),
            }
        }
    }

    let page = query.page.unwrap_or(1).max(1);
    let page_size = query
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let params = ListByViewParams {
        view_id,
        page,
        page_size,
        sort,
        tab,
        platforms,
    };

    match app_state.interaction_repo.list_by_view(params).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "interactions": result.interactions,
                "total": result.total,
                "page": page,
                "page_size": page_size
            })),
        )
            .into_response(),
        Err(e) => {
            error!(?e, "DB error listing interactions");
            JsonResponse::server_error("Failed to fetch interactions").into_response()
        }
    }
}

/// Manually request an AI draft for an interaction. Unlike the
/// generate_response workflow action, the stored draft carries no
/// workflow provenance.
pub async fn generate_response(
    State(app_state): State<AppState>,
    Path(interaction_id): Path<Uuid>,
) -> Response {
    let interaction = match app_state
        .interaction_repo
        .find_interaction(interaction_id)
        .await
    {
        Ok(Some(interaction)) => interaction,
        Ok(None) => return JsonResponse::not_found("Interaction not found").into_response(),
        Err(e) => {
            error!(?e, "DB error fetching interaction");
            return JsonResponse::server_error("Failed to generate response").into_response();
        }
    };

    let draft = match app_state
        .generator
        .draft_reply(&interaction, None, None)
        .await
    {
        Ok(draft) => draft,
        Err(e) => {
            error!(?e, interaction_id = %interaction_id, "AI draft failed");
            return JsonResponse::server_error("Failed to generate response").into_response();
        }
    };

    // Regeneration keeps the original pre-approval status.
    let prior_status = interaction
        .pending_response
        .as_ref()
        .map(|p| p.prior_status)
        .unwrap_or(interaction.status);
    let pending = PendingResponse {
        text: draft,
        workflow_id: None,
        prior_status,
        generated_at: OffsetDateTime::now_utc(),
    };

    match app_state
        .interaction_repo
        .set_pending_response(interaction_id, pending)
        .await
    {
        Ok(Some(interaction)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "interaction": interaction
            })),
        )
            .into_response(),
        Ok(None) => JsonResponse::not_found("Interaction not found").into_response(),
        Err(e) => {
            error!(?e, "DB error storing pending response");
            JsonResponse::server_error("Failed to generate response").into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct RespondPayload {
    pub text: String,
    #[serde(default = "default_true")]
    pub send_immediately: bool,
    #[serde(default)]
    pub add_to_approval_queue: bool,
}

fn default_true() -> bool {
    true
}

pub async fn respond(
    State(app_state): State<AppState>,
    Path(interaction_id): Path<Uuid>,
    Json(payload): Json<RespondPayload>,
) -> Response {
    if payload.text.trim().is_empty() {
        return JsonResponse::bad_request("Response text is required").into_response();
    }

    let interaction = match app_state
        .interaction_repo
        .find_interaction(interaction_id)
        .await
    {
        Ok(Some(interaction)) => interaction,
        Ok(None) => return JsonResponse::not_found("Interaction not found").into_response(),
        Err(e) => {
            error!(?e, "DB error fetching interaction");
            return JsonResponse::server_error("Failed to respond").into_response();
        }
    };

    if payload.send_immediately {
        if let Err(e) = app_state
            .platform
            .publish_reply(&interaction, &payload.text)
            .await
        {
            error!(?e, interaction_id = %interaction_id, "publish failed");
            return JsonResponse::server_error("Failed to publish response").into_response();
        }
        if let Err(e) = app_state.interaction_repo.mark_replied(interaction_id).await {
            error!(?e, "DB error marking replied");
            return JsonResponse::server_error("Response sent but not recorded").into_response();
        }
        return JsonResponse::success("Response published").into_response();
    }

    if payload.add_to_approval_queue {
        let pending = PendingResponse {
            text: payload.text,
            workflow_id: None,
            prior_status: interaction.status,
            generated_at: OffsetDateTime::now_utc(),
        };
        return match app_state
            .interaction_repo
            .set_pending_response(interaction_id, pending)
            .await
        {
            Ok(Some(_)) => JsonResponse::success("Response queued for approval").into_response(),
            Ok(None) => JsonResponse::not_found("Interaction not found").into_response(),
            Err(e) => {
                error!(?e, "DB error queueing response");
                JsonResponse::server_error("Failed to queue response").into_response()
            }
        };
    }

    JsonResponse::bad_request("Either send_immediately or add_to_approval_queue is required")
        .into_response()
}

/// Reject a pending draft: the draft is dropped, the interaction
/// returns to the status it held before entering the approval queue,
/// and nothing is ever published.
pub async fn reject_pending_response(
    State(app_state): State<AppState>,
    Path(interaction_id): Path<Uuid>,
) -> Response {
    match app_state
        .interaction_repo
        .clear_pending_response(interaction_id)
        .await
    {
        Ok(Some(interaction)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "interaction": interaction
            })),
        )
            .into_response(),
        Ok(None) => JsonResponse::not_found("No pending response to reject").into_response(),
        Err(e) => {
            error!(?e, "DB error rejecting pending response");
            JsonResponse::server_error("Failed to reject response").into_response()
        }
    }
}

pub async fn approve_response(
    State(app_state): State<AppState>,
    Path(interaction_id): Path<Uuid>,
) -> Response {
    let interaction = match app_state
        .interaction_repo
        .find_interaction(interaction_id)
        .await
    {
        Ok(Some(interaction)) => interaction,
        Ok(None) => return JsonResponse::not_found("Interaction not found").into_response(),
        Err(e) => {
            error!(?e, "DB error fetching interaction");
            return JsonResponse::server_error("Failed to approve response").into_response();
        }
    };

    let Some(pending) = interaction.pending_response.clone() else {
        return JsonResponse::bad_request("No pending response to approve").into_response();
    };

    // Publish first; the local transition only happens once the
    // platform accepted the reply.
    if let Err(e) = app_state
        .platform
        .publish_reply(&interaction, &pending.text)
        .await
    {
        error!(?e, interaction_id = %interaction_id, "publish failed");
        return JsonResponse::server_error("Failed to publish approved response").into_response();
    }

    match app_state.interaction_repo.mark_replied(interaction_id).await {
        Ok(true) => JsonResponse::success("Response approved and published").into_response(),
        Ok(false) => JsonResponse::not_found("Interaction not found").into_response(),
        Err(e) => {
            error!(?e, "DB error marking replied");
            JsonResponse::server_error("Response sent but not recorded").into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct BulkActionPayload {
    pub interaction_ids: Vec<Uuid>,
    pub action: String,
}

pub async fn bulk_action(
    State(app_state): State<AppState>,
    Json(payload): Json<BulkActionPayload>,
) -> Response {
    if payload.interaction_ids.is_empty() {
        return JsonResponse::bad_request("No interactions selected").into_response();
    }

    let status = match payload.action.as_str() {
        "mark_read" => InteractionStatus::Read,
        "archive" => InteractionStatus::Archived,
        _ => return JsonResponse::bad_request("Unknown bulk action").into_response(),
    };

    match app_state
        .interaction_repo
        .bulk_set_status(&payload.interaction_ids, status)
        .await
    {
        Ok(updated) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "updated": updated
            })),
        )
            .into_response(),
        Err(e) => {
            error!(?e, "DB error applying bulk action");
            JsonResponse::server_error("Failed to apply bulk action").into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct DeadLetterQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_dead_letters(
    State(app_state): State<AppState>,
    Query(query): Query<DeadLetterQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    match app_state
        .interaction_repo
        .list_dispatch_failures(limit, offset)
        .await
    {
        Ok(failures) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "dead_letters": failures
            })),
        )
            .into_response(),
        Err(e) => {
            error!(?e, "DB error listing dispatch failures");
            JsonResponse::server_error("Failed to fetch dead letters").into_response()
        }
    }
}

/// Puts the failed interaction back on the dispatch queue and clears
/// the dead letter.
pub async fn requeue_dead_letter(
    State(app_state): State<AppState>,
    Path(failure_id): Path<Uuid>,
) -> Response {
    let failure = match app_state
        .interaction_repo
        .find_dispatch_failure(failure_id)
        .await
    {
        Ok(Some(failure)) => failure,
        Ok(None) => return JsonResponse::not_found("Dead letter not found").into_response(),
        Err(e) => {
            error!(?e, "DB error fetching dispatch failure");
            return JsonResponse::server_error("Failed to requeue").into_response();
        }
    };

    if let Err(e) = app_state
        .interaction_repo
        .requeue_for_dispatch(failure.interaction_id)
        .await
    {
        error!(?e, "DB error requeueing interaction");
        return JsonResponse::server_error("Failed to requeue").into_response();
    }

    match app_state
        .interaction_repo
        .delete_dispatch_failure(failure_id)
        .await
    {
        Ok(_) => JsonResponse::success("Interaction requeued for dispatch").into_response(),
        Err(e) => {
            error!(?e, "DB error clearing dispatch failure");
            JsonResponse::server_error("Failed to requeue").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::interaction_repository::MockInteractionRepository;
    use crate::engine::test_support::{build_state, interaction_fixture};
    use crate::services::platform::mock::MockPlatformClient;
    use std::sync::Arc;

    #[tokio::test]
    async fn reject_pending_restores_prior_state() {
        let mut restored = interaction_fixture();
        restored.pending_response = None;
        restored.status = InteractionStatus::Read;

        let mut repo = MockInteractionRepository::new();
        repo.expect_clear_pending_response()
            .times(1)
            .returning(move |_| {
                let i = restored.clone();
                Box::pin(async move { Ok(Some(i)) })
            });
        let platform = Arc::new(MockPlatformClient::default());
        let state = build_state(Some(repo), None, Some(platform.clone()), None, None);

        let resp = reject_pending_response(State(state), Path(Uuid::new_v4())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        // Rejecting a draft never touches the platform.
        assert!(platform.recorded().is_empty());
    }

    #[tokio::test]
    async fn approve_publishes_before_marking_replied() {
        let mut with_pending = interaction_fixture();
        with_pending.status = InteractionStatus::AwaitingApproval;
        with_pending.pending_response = Some(PendingResponse {
            text: "Drafted reply".into(),
            workflow_id: Some(Uuid::new_v4()),
            prior_status: InteractionStatus::Unread,
            generated_at: OffsetDateTime::now_utc(),
        });
        let id = with_pending.id;

        let mut repo = MockInteractionRepository::new();
        repo.expect_find_interaction().returning(move |_| {
            let i = with_pending.clone();
            Box::pin(async move { Ok(Some(i)) })
        });
        repo.expect_mark_replied()
            .times(1)
            .returning(|_| Box::pin(async { Ok(true) }));
        let platform = Arc::new(MockPlatformClient::default());
        let state = build_state(Some(repo), None, Some(platform.clone()), None, None);

        let resp = approve_response(State(state), Path(id)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(platform.recorded().len(), 1);
    }

    #[tokio::test]
    async fn approve_failure_keeps_pending_state() {
        let mut with_pending = interaction_fixture();
        with_pending.status = InteractionStatus::AwaitingApproval;
        with_pending.pending_response = Some(PendingResponse {
            text: "Drafted reply".into(),
            workflow_id: None,
            prior_status: InteractionStatus::Unread,
            generated_at: OffsetDateTime::now_utc(),
        });
        let id = with_pending.id;

        // mark_replied must not be called when publish fails.
        let mut repo = MockInteractionRepository::new();
        repo.expect_find_interaction().returning(move |_| {
            let i = with_pending.clone();
            Box::pin(async move { Ok(Some(i)) })
        });
        let platform = Arc::new(MockPlatformClient::failing());
        let state = build_state(Some(repo), None, Some(platform), None, None);

        let resp = approve_response(State(state), Path(id)).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn bulk_action_rejects_unknown_verbs() {
        let state = build_state(None, None, None, None, None);
        let resp = bulk_action(
            State(state),
            Json(BulkActionPayload {
                interaction_ids: vec![Uuid::new_v4()],
                action: "explode".into(),
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
