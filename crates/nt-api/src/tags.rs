use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::{info, warn};

use nt_db::models::TagUpdate;
use nt_types::api::{Claims, TagDraft, TagUpdateRequest};
use nt_types::models::{GHOST_AVATAR, GHOST_NODE, NumberTag, PublicProfile, PublicTag};

use crate::auth::{AppState, blocking, new_tag_for, session_user};
use crate::error::ApiError;

/// A tag as the caller may see it: the full record for its owner, the
/// public projection for everyone else.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TagView {
    Owned(NumberTag),
    Public(PublicTag),
}

impl TagView {
    pub fn for_viewer(tag: NumberTag, viewer: &str) -> Self {
        if tag.owner == viewer {
            Self::Owned(tag)
        } else {
            Self::Public(tag.public_view())
        }
    }
}

fn ghost_profile() -> PublicProfile {
    PublicProfile {
        name: GHOST_NODE.to_string(),
        username: String::new(),
        bio: String::new(),
        location: String::new(),
        avatar: Some(GHOST_AVATAR.to_string()),
        joined_at: 0,
        is_pro: false,
    }
}

pub async fn create_tag(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(draft): Json<TagDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let user = session_user(&state, &claims).await?;
    let new_tag = new_tag_for(&user, draft);

    let tag = blocking(&state, move |db| db.broadcast_tag(new_tag))
        .await
        .inspect_err(|e| warn!("Unable to broadcast signal for {}: {}", user.name, e.message))?;

    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn my_tags(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<NumberTag>>, ApiError> {
    let user = session_user(&state, &claims).await?;
    let tags = blocking(&state, move |db| db.my_tags(&user.name)).await?;
    Ok(Json(tags))
}

pub async fn get_tag(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<TagView>, ApiError> {
    let user = session_user(&state, &claims).await?;
    let lookup = id.clone();
    let tag = blocking(&state, move |db| db.get_tag(&lookup))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("tag not found: {id}")))?;

    Ok(Json(TagView::for_viewer(tag, &user.name)))
}

pub async fn update_tag(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(req): Json<TagUpdateRequest>,
) -> Result<Json<NumberTag>, ApiError> {
    let user = session_user(&state, &claims).await?;
    let update = TagUpdate {
        title: req.title,
        intent: req.intent,
        public_title: req.public_title,
        public_intent: req.public_intent,
        is_masked: req.is_masked,
        category: req.category,
        color: req.color,
        tags: req.tags,
        location: req.location,
        contact_platform: req.contact_platform,
        contact_detail: req.contact_detail,
    };

    let tag_id = id.clone();
    let owner = user.name.clone();
    let tag = blocking(&state, move |db| db.update_own_tag(&tag_id, &owner, update))
        .await
        .map_err(|err| {
            if err.status == StatusCode::FORBIDDEN {
                warn!("{} tried to edit {} without owning it", user.name, id);
                ApiError::forbidden("Only the tag owner can edit this signal.")
            } else {
                err
            }
        })?;

    info!("{} synced changes to {}", user.name, id);
    Ok(Json(tag))
}

/// Owner card for a tag. Masked tags hide who is behind them.
pub async fn tag_owner(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<PublicProfile>, ApiError> {
    let user = session_user(&state, &claims).await?;
    let lookup = id.clone();
    let (tag, owner) = blocking(&state, move |db| {
        Ok((db.get_tag(&lookup)?, db.tag_owner_details(&lookup)?))
    })
    .await?;

    let tag = tag.ok_or_else(|| ApiError::not_found(format!("tag not found: {id}")))?;
    if tag.is_masked && tag.owner != user.name {
        return Ok(Json(ghost_profile()));
    }
    let owner = owner.ok_or_else(|| ApiError::not_found(format!("owner of {id} not found")))?;
    Ok(Json(PublicProfile::from(&owner)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nt_types::models::SocialPlatform;

    fn tag(owner: &str, masked: bool) -> NumberTag {
        NumberTag {
            id: "tag-1".into(),
            title: "Discreet Job Search".into(),
            intent: "Leaving my current employer".into(),
            public_title: Some("Strategic Networking".into()),
            public_intent: Some("Open to engineering conversations".into()),
            is_masked: masked,
            category: "Hiring".into(),
            color: "rose-500".into(),
            tags: vec!["Rust".into()],
            owner: owner.into(),
            location: "Lagos".into(),
            avatar: None,
            contact_platform: SocialPlatform::WhatsApp,
            contact_detail: "+2348000000000".into(),
            social_links: vec![],
        }
    }

    #[test]
    fn owner_sees_true_fields_others_see_mask() {
        let view = serde_json::to_value(TagView::for_viewer(tag("Ada", true), "Ada")).unwrap();
        assert_eq!(view["title"], "Discreet Job Search");
        assert_eq!(view["contactDetail"], "+2348000000000");

        let view = serde_json::to_value(TagView::for_viewer(tag("Ada", true), "Bo")).unwrap();
        assert_eq!(view["title"], "Strategic Networking");
        assert_eq!(view["owner"], GHOST_NODE);
        assert!(view.get("contactDetail").is_none());
        assert!(!view.to_string().contains("Leaving my current employer"));
    }
}
