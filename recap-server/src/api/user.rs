//! User session endpoints.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::json;

use crate::api::summary::authenticate;
use crate::auth::session_cookie;
use crate::error::ApiResult;
use crate::server::AppState;

/// GET /user/info: the authenticated user's identity.
pub async fn user_info(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let user = authenticate(&state, &headers)?;
    Ok(Json(json!({
        "user": user,
        "authenticated": true,
    })))
}

/// GET /user/api-key-status: whether the caller needs to supply their
/// own LLM key.
pub async fn api_key_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let user = authenticate(&state, &headers)?;
    let can_use_server_key = state.key_policy.can_use_server_key(&user.id);

    Ok(Json(json!({
        "needsApiKey": !can_use_server_key,
        "serverKeyPolicy": state.key_policy.mode().as_str(),
    })))
}

/// POST /auth/logout: end the caller's session.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    if let Some(session_id) = session_cookie(&headers) {
        state.sessions.remove(&session_id);
    }
    Json(json!({ "message": "logged out" }))
}
