use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};

use nt_types::api::{Claims, Role};

use crate::auth::AppState;
use crate::error::ApiError;

fn decode_claims(headers: &HeaderMap, secret: &str) -> Result<Claims, ApiError> {
    let bearer = headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| ApiError::unauthorized("Authentication Error: Node identity required."))?;

    let token_data = decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::unauthorized("Session expired or invalid."))?;

    Ok(token_data.claims)
}

/// Validate a node session and expose its claims to the handler.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = decode_claims(req.headers(), &state.jwt_secret)?;
    if claims.role != Role::Node {
        return Err(ApiError::forbidden("Node session required."));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Gate for the admin portal.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = decode_claims(req.headers(), &state.jwt_secret)?;
    if claims.role != Role::Admin {
        return Err(ApiError::forbidden("Admin clearance required."));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
