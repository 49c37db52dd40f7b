use std::sync::Arc;
use std::time::Duration;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info, warn};

use nt_db::Database;
use nt_db::models::{NewTag, NewUser};
use nt_genai::ContentModel;
use nt_types::api::{
    Claims, LoginRequest, RegisterRequest, Role, SendCodeRequest, SendCodeResponse,
    SessionResponse, TagDraft, VerifyCodeRequest,
};
use nt_types::models::{SocialLink, UserProfile};

use crate::checkout::CheckoutDesk;
use crate::error::ApiError;
use crate::verification::CodeDesk;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub admin_user: String,
    pub admin_password: String,
    pub model: Arc<dyn ContentModel>,
    pub genai_deadline: Duration,
    pub codes: CodeDesk,
    pub checkout: CheckoutDesk,
    /// Echo verification codes in responses instead of emailing them.
    pub demo_codes: bool,
}

/// Run a store call on the blocking pool.
pub(crate) async fn blocking<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> nt_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal()
        })?
        .map_err(ApiError::from)
}

/// The node behind a session token. A token for a vanished account is 401.
pub(crate) async fn session_user(
    state: &AppState,
    claims: &Claims,
) -> Result<UserProfile, ApiError> {
    let email = claims.sub.clone();
    blocking(state, move |db| db.current_user(Some(&email)))
        .await?
        .ok_or_else(|| ApiError::unauthorized("Node identity required."))
}

pub fn create_token(secret: &str, sub: &str, role: Role) -> anyhow::Result<String> {
    let ttl = match role {
        Role::Node => chrono::Duration::days(30),
        Role::Admin => chrono::Duration::hours(12),
    };
    let claims = Claims {
        sub: sub.to_string(),
        role,
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn session(state: &AppState, user: UserProfile) -> Result<SessionResponse, ApiError> {
    let token = create_token(&state.jwt_secret, &user.email, Role::Node).map_err(|e| {
        error!("token encoding failed: {}", e);
        ApiError::internal()
    })?;
    Ok(SessionResponse { token, user })
}

fn issue_code(state: &AppState, email: &str) -> SendCodeResponse {
    let code = state.codes.issue(email);
    if state.demo_codes {
        info!("[DEMO MODE] verification code for {} is {}", email, code);
    }
    SendCodeResponse {
        sent_to: email.to_string(),
        demo_code: state.demo_codes.then_some(code),
    }
}

/// Tag owned by `user`, with the node's location, avatar and socials filled in.
pub(crate) fn new_tag_for(user: &UserProfile, draft: TagDraft) -> NewTag {
    draft_tag(draft, &user.name, &user.location, user.avatar.clone(), user.socials.clone())
}

fn draft_tag(
    draft: TagDraft,
    owner: &str,
    location: &str,
    avatar: Option<String>,
    social_links: Vec<SocialLink>,
) -> NewTag {
    NewTag {
        title: draft.title,
        intent: draft.intent,
        public_title: draft.public_title,
        public_intent: draft.public_intent,
        is_masked: draft.is_masked,
        category: draft.category,
        color: draft.color,
        tags: draft.tags,
        owner: owner.to_string(),
        location: draft
            .location
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| location.to_string()),
        avatar,
        contact_platform: draft.contact_platform,
        contact_detail: draft.contact_detail,
        social_links,
    }
}

pub async fn send_verification(
    State(state): State<AppState>,
    Json(req): Json<SendCodeRequest>,
) -> Result<Json<SendCodeResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::bad_request(format!("invalid email: {}", req.email)));
    }

    let lookup = email.clone();
    if blocking(&state, move |db| db.find_user_by_email(&lookup))
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("A node is already registered with this email."));
    }

    Ok(Json(issue_code(&state, &email)))
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new_user = NewUser {
        avatar: Some(format!(
            "https://picsum.photos/seed/{}/100/100",
            req.username.trim()
        )),
        email: req.email,
        name: req.name,
        username: req.username,
        bio: req.bio,
        location: req.location,
        socials: req.socials,
    };
    new_user.validate()?;

    // Reject a bad onboarding tag before the account is written.
    let draft = req.tag;
    if let Some(draft) = &draft {
        draft_tag(draft.clone(), &new_user.name, &new_user.location, None, Vec::new())
            .validate()?;
    }

    // The code stays valid until the node is written.
    let email = new_user.email.clone();
    if !state.codes.check(&email, &req.code) {
        warn!("Rejected verification code for {}", email);
        return Err(ApiError::unauthorized("Security Fault: Invalid verification key."));
    }

    let user = blocking(&state, move |db| {
        let user = db.register_user(new_user)?;
        if let Some(draft) = draft {
            db.broadcast_tag(new_tag_for(&user, draft))?;
        }
        Ok(user)
    })
    .await?;
    state.codes.redeem(&email, &req.code);

    info!("Node {} joined the protocol", user.name);
    Ok((StatusCode::CREATED, Json(session(&state, user)?)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let email = req.email;
    let user = blocking(&state, move |db| db.find_user_by_email(&email))
        .await?
        .ok_or_else(|| ApiError::unauthorized("No node registered with this email."))?;

    info!("{} signed in", user.name);
    Ok(Json(session(&state, user)?))
}

pub async fn recovery(
    State(state): State<AppState>,
    Json(req): Json<SendCodeRequest>,
) -> Result<Json<SendCodeResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();
    let lookup = email.clone();
    blocking(&state, move |db| db.find_user_by_email(&lookup))
        .await?
        .ok_or_else(|| {
            ApiError::not_found(
                "Security Fault: No node found associated with this terminal identity.",
            )
        })?;

    Ok(Json(issue_code(&state, &email)))
}

pub async fn recovery_verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyCodeRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    if !state.codes.redeem(&req.email, &req.code) {
        warn!("Rejected recovery code for {}", req.email);
        return Err(ApiError::unauthorized("Security Fault: Invalid access code."));
    }

    let email = req.email;
    let user = blocking(&state, move |db| db.find_user_by_email(&email))
        .await?
        .ok_or_else(|| ApiError::unauthorized("No node registered with this email."))?;

    info!("{} recovered access", user.name);
    Ok(Json(session(&state, user)?))
}
