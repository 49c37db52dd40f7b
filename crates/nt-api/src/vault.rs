use axum::{Extension, Json, extract::State};
use serde::Serialize;
use tracing::info;

use nt_types::api::Claims;
use nt_types::models::{PRO_COST, Transaction, UserProfile};

use crate::auth::{AppState, blocking, session_user};
use crate::error::ApiError;

pub async fn transactions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let user = session_user(&state, &claims).await?;
    Ok(Json(blocking(&state, move |db| db.transactions(&user.name)).await?))
}

#[derive(Debug, Serialize)]
pub struct ProActivation {
    pub user: UserProfile,
    pub transaction: Transaction,
}

pub async fn subscribe_pro(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ProActivation>, ApiError> {
    let email = claims.sub;
    let (user, transaction) = blocking(&state, move |db| {
        let tx = db.subscribe_pro(&email)?;
        let user = db.find_user_by_email(&email)?;
        Ok((user, tx))
    })
    .await
    .map_err(|err| {
        if err.status == axum::http::StatusCode::PAYMENT_REQUIRED {
            ApiError::payment_required(format!(
                "Insufficient Vault TC. {PRO_COST} TC required for Pro Activation."
            ))
        } else {
            err
        }
    })?;
    let user = user.ok_or_else(|| ApiError::unauthorized("Node identity required."))?;

    info!("Tag Pro Activated for {}: Passive Discovery Radar is now ONLINE.", user.name);
    Ok(Json(ProActivation { user, transaction }))
}
