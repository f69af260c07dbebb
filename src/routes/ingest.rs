use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};

use crate::models::interaction::{NewInteraction, Platform};
use crate::responses::JsonResponse;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "x-mentionflow-timestamp";
pub const SIGNATURE_HEADER: &str = "x-mentionflow-signature";

fn compute_signature(secret: &str, timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

/// Hex signature for a signed ingest request; exposed so connector
/// tooling and tests can produce valid requests.
pub fn sign_ingest_request(secret: &str, timestamp: &str, body: &[u8]) -> String {
    hex::encode(compute_signature(secret, timestamp, body))
}

/// Signed webhook through which platform connectors deliver inbound
/// interactions. Accepted interactions are queued for dispatch; the
/// worker picks them up.
pub async fn ingest_interaction(
    State(app_state): State<AppState>,
    Path(platform): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(platform) = Platform::parse(&platform) else {
        return JsonResponse::not_found("Unknown platform").into_response();
    };

    let timestamp = headers
        .get(TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if timestamp.is_empty() || signature.is_empty() {
        return JsonResponse::unauthorized("Missing signature").into_response();
    }

    let ts = timestamp.parse::<i64>().unwrap_or(0);
    let now = Utc::now().timestamp();
    if ts <= 0 || (now - ts).abs() > app_state.config.ingest_replay_window_sec {
        return JsonResponse::unauthorized("Stale or invalid timestamp").into_response();
    }

    let expected = compute_signature(&app_state.config.ingest_secret, timestamp, &body);
    let provided = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return JsonResponse::unauthorized("Invalid signature").into_response(),
    };
    if expected.ct_eq(&provided).unwrap_u8() != 1 {
        warn!(platform = platform.as_str(), "ingest signature mismatch");
        return JsonResponse::unauthorized("Invalid signature").into_response();
    }

    let payload: NewInteraction = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            return JsonResponse::bad_request(&format!("Invalid payload: {e}")).into_response();
        }
    };
    if payload.external_id.trim().is_empty() {
        return JsonResponse::bad_request("external_id is required").into_response();
    }

    match app_state
        .interaction_repo
        .insert_interaction(platform, payload)
        .await
    {
        Ok(Some(interaction)) => {
            info!(
                interaction_id = %interaction.id,
                platform = platform.as_str(),
                kind = interaction.kind.as_str(),
                "interaction ingested"
            );
            (
                StatusCode::ACCEPTED,
                Json(json!({
                    "success": true,
                    "interaction_id": interaction.id
                })),
            )
                .into_response()
        }
        // Connector retries land here; the first delivery won.
        Ok(None) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "duplicate": true
            })),
        )
            .into_response(),
        Err(e) => {
            error!(?e, "DB error ingesting interaction");
            JsonResponse::server_error("Failed to ingest interaction").into_response()
        }
    }
}
