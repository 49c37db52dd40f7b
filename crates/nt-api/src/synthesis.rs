use axum::{Json, extract::State};
use serde::Serialize;
use tracing::{info, warn};

use nt_genai::outcome::Provenance;
use nt_genai::synthesis::{SynthesizedTag, synthesize_tag};
use nt_types::api::SynthesisRequest;

use crate::auth::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct SynthesisResponse {
    pub tag: SynthesizedTag,
    /// True when the default suggestion stands in for the model's.
    pub fallback: bool,
    pub source: Provenance,
}

/// Suggest a tag from a bio and goal. Used both during onboarding (before a
/// session exists) and from the tag editor.
pub async fn synthesize(
    State(state): State<AppState>,
    Json(req): Json<SynthesisRequest>,
) -> Result<Json<SynthesisResponse>, ApiError> {
    if req.bio.trim().is_empty() && req.goal.trim().is_empty() {
        return Err(ApiError::bad_request("Describe yourself or your goal first."));
    }

    let outcome = synthesize_tag(
        state.model.as_ref(),
        &req.bio,
        &req.goal,
        state.genai_deadline,
    )
    .await;
    let (tag, source) = outcome.or_fallback(SynthesizedTag::fallback);
    let fallback = source != Provenance::Live;
    if fallback {
        warn!("Serving default tag suggestion ({:?})", source);
    } else {
        info!("Synthesized tag \"{}\"", tag.title);
    }

    Ok(Json(SynthesisResponse {
        tag,
        fallback,
        source,
    }))
}
