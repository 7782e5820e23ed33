//! Analytics and experiment handlers.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::USER_AGENT},
};
use chrono::Utc;
use serde_json::{Value, json};

use crate::error::Result;
use crate::middleware::{OptionalAuth, ValidJson};
use crate::services::analytics::{AnalyticsSummary, Assignments, TrackEvent};
use crate::state::AppState;

/// Header carrying the client's session id, used as the experiment seed.
const SESSION_ID_HEADER: &str = "x-session-id";

/// Record an event. A valid bearer token attaches the user id.
///
/// POST /api/analytics/events
///
/// # Errors
///
/// Returns 400 for an invalid event.
pub async fn track(
    State(state): State<AppState>,
    OptionalAuth(user_id): OptionalAuth,
    ValidJson(event): ValidJson<TrackEvent>,
) -> Result<(StatusCode, Json<Value>)> {
    state.analytics().record(event, user_id).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "accepted": true }))))
}

/// GET /api/analytics/summary
///
/// # Errors
///
/// Returns 500 if the event log cannot be read.
pub async fn summary(State(state): State<AppState>) -> Result<Json<AnalyticsSummary>> {
    Ok(Json(state.analytics().summary().await?))
}

/// Experiment variants for the caller.
///
/// GET /api/experiments
pub async fn experiments(headers: HeaderMap) -> Json<Assignments> {
    Json(Assignments::for_seed(&experiment_seed(&headers)))
}

/// Session id header, else user agent, else the current time in millis.
fn experiment_seed(headers: &HeaderMap) -> String {
    [SESSION_ID_HEADER, USER_AGENT.as_str()]
        .iter()
        .find_map(|name| {
            headers
                .get(*name)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
        })
        .map_or_else(|| Utc::now().timestamp_millis().to_string(), String::from)
}
