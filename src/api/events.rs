/// Event configuration endpoint
///
/// Clients poll this to decide whether to show a promotional state.
/// The schedule document is fetched per request and resolved against
/// the current time; responses are never cacheable.
use crate::{
    context::AppContext,
    error::AppResult,
    events::{resolve_active_event, EventConfig},
};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;

/// Build event routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/v1/event_config", get(get_event_config))
}

/// Response body for the event-config endpoint
#[derive(Debug, Serialize)]
pub struct EventConfigResponse {
    pub config: Option<EventConfig>,
    #[serde(rename = "globalEffects")]
    pub global_effects: GlobalEffects,
    pub server_time: String,
}

/// Client-side effect switches derived from the active event
#[derive(Debug, Serialize)]
pub struct GlobalEffects {
    pub celebration_music: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

/// Resolve and return the currently active event configuration
async fn get_event_config(State(ctx): State<AppContext>) -> AppResult<Response> {
    let document = ctx.schedule_store.load().await?;
    let now = Utc::now();

    let candidates = document.candidates();
    let active = resolve_active_event(&candidates, now).cloned();

    let body = EventConfigResponse {
        global_effects: GlobalEffects {
            celebration_music: active.is_some(),
            theme: active.as_ref().and_then(|config| config.theme.clone()),
        },
        config: active,
        server_time: now.to_rfc3339(),
    };

    // Clients re-poll against the advancing clock; never let a proxy
    // serve a stale window decision.
    Ok((
        [(header::CACHE_CONTROL, "no-store, no-cache, must-revalidate")],
        Json(body),
    )
        .into_response())
}
