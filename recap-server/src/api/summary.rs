//! Summary submission and listing handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use recap_common::transcript::merge_transcript;
use recap_common::types::{SummaryResponse, UserSummary};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::auth::UserInfo;
use crate::error::{ApiError, ApiResult};
use crate::jobs::{Attach, Job};
use crate::server::AppState;
use crate::services::ytdlp::video_id_from_url;
use crate::store::history::DEFAULT_RECENT_LIMIT;

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub url: String,
}

/// POST /api/summary
///
/// Cache hit answers synchronously with 200; otherwise the request is
/// deduplicated against in-flight work and either attached or queued,
/// both answered with 202. The summary itself arrives over SSE.
pub async fn submit_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SummaryRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) =
        body.map_err(|err| ApiError::BadRequest(format!("invalid request: {err}")))?;

    let user = authenticate(&state, &headers)?;
    let user_api_key = bearer_key(&headers);

    let video_id = video_id_from_url(&request.url)
        .ok_or_else(|| ApiError::BadRequest("invalid YouTube URL".to_string()))?;

    // Without a per-request key the server key must be admissible for
    // this user before any work is accepted.
    if user_api_key.is_none() && !state.key_policy.can_use_server_key(&user.id) {
        return Err(ApiError::Forbidden(
            "an LLM API key is required; configure one in settings".to_string(),
        ));
    }

    // Cache hit: answer synchronously, record history, backfill a missing
    // transcript when possible.
    if let Some(cached) = state.cache.get(&video_id) {
        info!(%video_id, user_id = %user.id, "cache hit");

        if let Err(err) = state.history.add(&user.id, &video_id, &cached.title) {
            warn!(%video_id, user_id = %user.id, %err, "failed to record history");
        }

        let mut transcript = cached.transcript.clone();
        if transcript.is_empty() {
            match state.summarizer.fetch_transcript(&video_id).await {
                Ok(fresh) => {
                    transcript = fresh;
                    if let Err(err) = state.cache.set(
                        &video_id,
                        &cached.title,
                        &cached.summary,
                        cached.timestamps.clone(),
                        transcript.clone(),
                    ) {
                        warn!(%video_id, %err, "failed to backfill cached transcript");
                    }
                }
                Err(err) => warn!(%video_id, %err, "transcript backfill failed"),
            }
        }

        let response = SummaryResponse {
            video_id: video_id.clone(),
            title: cached.title,
            summary: cached.summary,
            timestamps: cached.timestamps,
            transcript: merge_transcript(&transcript, state.config.merge_interval_seconds),
            cached: true,
        };
        return Ok((StatusCode::OK, Json(response)).into_response());
    }

    match state.registry.attach_or_start(&video_id, &user.id) {
        Attach::Attached => {
            info!(%video_id, user_id = %user.id, "attached to in-flight job");
            Ok(accepted(&video_id, "already in progress; you will be notified on completion"))
        }
        Attach::Started => {
            let job = Job {
                video_id: video_id.clone(),
                user_id: user.id.clone(),
                api_key: user_api_key,
                url: request.url,
            };

            match state.queue.try_enqueue(job) {
                Ok(()) => {
                    info!(%video_id, user_id = %user.id, "job queued");
                    Ok(accepted(&video_id, "request queued; you will be notified on completion"))
                }
                Err(_rejected) => {
                    // Roll back so the entry cannot outlive its chance to
                    // be serviced.
                    state.registry.remove(&video_id);
                    warn!(%video_id, user_id = %user.id, "job queue full; request rejected");
                    Err(ApiError::ServiceUnavailable(
                        "server busy, job queue full; please try again later".to_string(),
                    ))
                }
            }
        }
    }
}

/// GET /api/recent-summaries: global listing of recently cached titles.
pub async fn recent_summaries(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<recap_common::types::RecentSummary>>> {
    authenticate(&state, &headers)?;
    Ok(Json(state.cache.recent_titles(DEFAULT_RECENT_LIMIT)))
}

/// GET /api/user-recent-summaries: the caller's viewing history.
pub async fn user_recent_summaries(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let user = authenticate(&state, &headers)?;
    let summaries = state
        .history
        .recent(&user.id, DEFAULT_RECENT_LIMIT)
        .map_err(|err| ApiError::Internal(format!("failed to load history: {err}")))?;
    Ok(Json(summaries))
}

pub(crate) fn authenticate(state: &AppState, headers: &HeaderMap) -> ApiResult<UserInfo> {
    state
        .sessions
        .user_from_headers(headers)
        .ok_or(ApiError::Unauthorized)
}

/// Pull a user-supplied LLM key from `Authorization: Bearer <key>`.
fn bearer_key(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let key = value.strip_prefix("Bearer ")?.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

fn accepted(video_id: &str, message: &str) -> Response {
    (
        StatusCode::ACCEPTED,
        Json(json!({ "message": message, "video_id": video_id })),
    )
        .into_response()
}
