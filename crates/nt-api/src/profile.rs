use axum::{Extension, Json, extract::State};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use tracing::{info, warn};

use nt_db::models::ProfileUpdate;
use nt_types::api::{AvatarRequest, Claims, ProfileUpdateRequest};
use nt_types::models::UserProfile;

use crate::auth::{AppState, blocking, session_user};
use crate::error::ApiError;

/// Largest decoded avatar image accepted, in bytes.
pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

/// Accept a remote image URL or a base64 `data:image/*` URL within the size cap.
pub fn validate_avatar(avatar: &str) -> Result<(), ApiError> {
    let avatar = avatar.trim();
    if avatar.starts_with("https://") || avatar.starts_with("http://") {
        return Ok(());
    }

    let rest = avatar
        .strip_prefix("data:image/")
        .ok_or_else(|| ApiError::bad_request("avatar must be an image URL or data URL"))?;
    let (_, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| ApiError::bad_request("avatar data URL must be base64 encoded"))?;

    // Upper bound before decoding: 4 base64 chars carry 3 bytes.
    if payload.len() / 4 * 3 > MAX_AVATAR_BYTES + 3 {
        return Err(ApiError::bad_request("avatar image is too large"));
    }
    let bytes = B64
        .decode(payload)
        .map_err(|_| ApiError::bad_request("avatar payload is not valid base64"))?;
    if bytes.is_empty() || bytes.len() > MAX_AVATAR_BYTES {
        return Err(ApiError::bad_request("avatar image is too large"));
    }
    Ok(())
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(session_user(&state, &claims).await?))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let update = ProfileUpdate {
        name: req.name,
        username: req.username,
        bio: req.bio,
        location: req.location,
        socials: req.socials,
    };

    let email = claims.sub;
    let user = blocking(&state, move |db| db.update_user_profile(&email, update)).await?;

    info!("Node Calibration Successful for {}", user.name);
    Ok(Json(user))
}

pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AvatarRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    if let Err(err) = validate_avatar(&req.avatar) {
        warn!("Rejected avatar for {}: {}", claims.sub, err.message);
        return Err(err);
    }

    let email = claims.sub;
    let user = blocking(&state, move |db| {
        if !db.update_user_avatar(&email, req.avatar.trim())? {
            return Ok(None);
        }
        db.find_user_by_email(&email)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Node identity not found."))?;

    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avatar_formats() {
        assert!(validate_avatar("https://picsum.photos/seed/ada/100/100").is_ok());
        assert!(validate_avatar("data:image/png;base64,iVBORw0KGgo=").is_ok());

        assert!(validate_avatar("javascript:alert(1)").is_err());
        assert!(validate_avatar("data:text/html;base64,PGI+").is_err());
        assert!(validate_avatar("data:image/png,rawbytes").is_err());
        assert!(validate_avatar("data:image/png;base64,@@@").is_err());
        assert!(validate_avatar("data:image/png;base64,").is_err());
    }

    #[test]
    fn oversized_avatar_is_rejected() {
        let payload = B64.encode(vec![0u8; MAX_AVATAR_BYTES + 1]);
        let err = validate_avatar(&format!("data:image/jpeg;base64,{payload}")).unwrap_err();
        assert_eq!(err.message, "avatar image is too large");
    }
}
