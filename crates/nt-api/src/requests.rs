use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use nt_db::models::NewRequest;
use nt_types::api::{Claims, ContactResponse, SendRequestRequest};
use nt_types::models::{ConnectionRequest, HANDSHAKE_COST, RequestStatus};
use nt_types::social::contact_links;

use crate::auth::{AppState, blocking, session_user};
use crate::error::ApiError;

const DEFAULT_OPPORTUNITY: &str = "Strategic Alignment";

pub async fn send_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendRequestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = session_user(&state, &claims).await?;
    let new_request = NewRequest {
        sender_logo: Some(
            user.avatar
                .clone()
                .unwrap_or_else(|| format!("https://picsum.photos/seed/{}/100/100", user.name)),
        ),
        sender_name: user.name,
        reason: req.reason,
        opportunity: req
            .opportunity
            .filter(|o| !o.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OPPORTUNITY.to_string()),
        tag_id: req.tag_id,
    };

    let request = blocking(&state, move |db| db.send_request(new_request))
        .await
        .map_err(|err| {
            if err.status == StatusCode::PAYMENT_REQUIRED {
                ApiError::payment_required(format!(
                    "Insufficient Resources for handshake. {HANDSHAKE_COST} TC required."
                ))
            } else {
                err
            }
        })?;

    info!("Signal transmitted: {}", request.id);
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn inbound(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ConnectionRequest>>, ApiError> {
    let user = session_user(&state, &claims).await?;
    Ok(Json(blocking(&state, move |db| db.inbound_requests(&user.name)).await?))
}

pub async fn outbound(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ConnectionRequest>>, ApiError> {
    let user = session_user(&state, &claims).await?;
    Ok(Json(blocking(&state, move |db| db.outbound_requests(&user.name)).await?))
}

/// Accept or decline on behalf of the targeted tag's owner.
async fn resolve(
    state: AppState,
    claims: Claims,
    id: String,
    status: RequestStatus,
) -> Result<Json<ConnectionRequest>, ApiError> {
    let user = session_user(&state, &claims).await?;
    let owner = user.name.clone();
    let request_id = id.clone();
    let request = blocking(&state, move |db| {
        db.respond_to_request(&request_id, &owner, status)
    })
    .await
    .map_err(|err| {
        if err.status == StatusCode::FORBIDDEN {
            warn!("{} tried to resolve {} without owning its tag", user.name, id);
            ApiError::forbidden("Only the owner of the targeted tag can respond to this signal.")
        } else {
            err
        }
    })?;

    Ok(Json(request))
}

pub async fn accept(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<ConnectionRequest>, ApiError> {
    resolve(state, claims, id, RequestStatus::Accepted).await
}

pub async fn decline(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<ConnectionRequest>, ApiError> {
    resolve(state, claims, id, RequestStatus::Declined).await
}

/// Direct contact channels of the other party of an accepted handshake.
/// The sender also gets the tag's preferred channel.
pub async fn contact(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<ContactResponse>, ApiError> {
    let user = session_user(&state, &claims).await?;
    let lookup = id.clone();
    let (request, tag) = blocking(&state, move |db| {
        let request = db.get_request(&lookup)?;
        let tag = match &request {
            Some(r) => db.get_tag(&r.tag_id)?,
            None => None,
        };
        Ok((request, tag))
    })
    .await?;

    let not_found = || ApiError::not_found(format!("request not found: {id}"));
    let request = request.ok_or_else(not_found)?;
    let tag = tag.ok_or_else(not_found)?;

    let (other, preferred) = if request.sender_name == user.name {
        (tag.owner.clone(), Some((tag.contact_platform, tag.contact_detail.as_str())))
    } else if tag.owner == user.name {
        (request.sender_name.clone(), None)
    } else {
        return Err(not_found());
    };
    if request.status != RequestStatus::Accepted {
        return Err(ApiError::forbidden("Contact channels open once the handshake is accepted."));
    }

    let lookup = other.clone();
    let other_user = blocking(&state, move |db| db.find_user_by_name(&lookup))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("node not found: {other}")))?;

    Ok(Json(ContactResponse {
        links: contact_links(&other_user.socials, preferred),
        name: other_user.name,
    }))
}
