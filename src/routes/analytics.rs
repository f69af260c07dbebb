use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use time::{Duration, OffsetDateTime};
use tracing::error;

use crate::responses::JsonResponse;
use crate::state::AppState;

const DEFAULT_WINDOW_DAYS: i64 = 30;
const MAX_WINDOW_DAYS: i64 = 365;

#[derive(Deserialize)]
pub struct WindowQuery {
    pub days: Option<i64>,
}

fn window_start(query: &WindowQuery) -> (i64, OffsetDateTime) {
    let days = query
        .days
        .unwrap_or(DEFAULT_WINDOW_DAYS)
        .clamp(1, MAX_WINDOW_DAYS);
    (days, OffsetDateTime::now_utc() - Duration::days(days))
}

pub async fn overview(
    State(app_state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Response {
    let (days, since) = window_start(&query);

    match app_state.interaction_repo.overview_stats(since).await {
        Ok(stats) => {
            let response_rate = if stats.total > 0 {
                stats.replied as f64 / stats.total as f64
            } else {
                0.0
            };
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "days": days,
                    "stats": stats,
                    "response_rate": response_rate
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(?e, "DB error computing overview stats");
            JsonResponse::server_error("Failed to fetch analytics").into_response()
        }
    }
}

pub async fn workflows(
    State(app_state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Response {
    let (days, since) = window_start(&query);

    let counts = match app_state
        .interaction_repo
        .workflow_dispatch_counts(since)
        .await
    {
        Ok(counts) => counts,
        Err(e) => {
            error!(?e, "DB error computing workflow dispatch counts");
            return JsonResponse::server_error("Failed to fetch analytics").into_response();
        }
    };

    let workflows = match app_state.workflow_repo.list_workflows().await {
        Ok(workflows) => workflows,
        Err(e) => {
            error!(?e, "DB error listing workflows for analytics");
            return JsonResponse::server_error("Failed to fetch analytics").into_response();
        }
    };

    let rows: Vec<serde_json::Value> = counts
        .iter()
        .map(|count| {
            let workflow = workflows.iter().find(|wf| wf.id == count.workflow_id);
            json!({
                "workflow_id": count.workflow_id,
                // Deleted workflows keep their historical counts.
                "name": workflow.map(|wf| wf.name.clone()),
                "system_type": workflow.and_then(|wf| wf.system_type),
                "dispatched": count.dispatched,
            })
        })
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "days": days,
            "workflows": rows
        })),
    )
        .into_response()
}
