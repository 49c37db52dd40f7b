use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Serialize;
use tracing::warn;

use nt_genai::outcome::Provenance;
use nt_genai::scout::{ScoutLink, ScoutReport, scout};
use nt_types::api::{Claims, ScoutRequest, SearchQuery};
use nt_types::models::{PublicTag, TagExchange};

use crate::auth::{AppState, blocking, session_user};
use crate::error::ApiError;

pub async fn discover(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<PublicTag>>, ApiError> {
    let user = session_user(&state, &claims).await?;
    let tags = blocking(&state, move |db| db.discover(&user.name, query.q.as_deref())).await?;
    Ok(Json(tags))
}

/// Passive discovery radar. Empty unless the node holds active Tag Pro.
pub async fn nearby(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<TagExchange>>, ApiError> {
    let email = claims.sub;
    let exchanges = blocking(&state, move |db| db.nearby_exchanges(&email)).await?;
    Ok(Json(exchanges))
}

#[derive(Debug, Serialize)]
pub struct ScoutResponse {
    pub text: String,
    pub links: Vec<ScoutLink>,
    pub fallback: bool,
    pub source: Provenance,
}

pub async fn global_scout(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<ScoutRequest>,
) -> Result<Json<ScoutResponse>, ApiError> {
    if req.query.trim().is_empty() {
        return Err(ApiError::bad_request("Enter a search query."));
    }

    let outcome = scout(state.model.as_ref(), &req.query, state.genai_deadline).await;
    let (report, source) = outcome.or_fallback(ScoutReport::fallback);
    let fallback = source != Provenance::Live;
    if fallback {
        warn!("Scout for \"{}\" served the fallback ({:?})", req.query, source);
    }

    Ok(Json(ScoutResponse {
        text: report.text,
        links: report.links,
        fallback,
        source,
    }))
}
