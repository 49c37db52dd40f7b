//! Admin portal: node directory, ledger browser and balance overrides.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use tracing::{error, info, warn};

use nt_db::models::{BalanceAudit, LedgerSummary};
use nt_types::api::{
    AdjustBalanceRequest, AdminLoginRequest, AdminSessionResponse, Claims, Role, SearchQuery,
};
use nt_types::models::{Transaction, UserProfile};

use crate::auth::{AppState, blocking, create_token};
use crate::error::ApiError;

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<Json<AdminSessionResponse>, ApiError> {
    if req.username != state.admin_user || req.password != state.admin_password {
        warn!("Rejected admin login for {}", req.username);
        return Err(ApiError::unauthorized("Access Denied: invalid admin credentials."));
    }

    let token = create_token(&state.jwt_secret, &req.username, Role::Admin).map_err(|e| {
        error!("token encoding failed: {}", e);
        ApiError::internal()
    })?;
    info!("Admin {} signed in", req.username);
    Ok(Json(AdminSessionResponse { token }))
}

fn needle(query: &SearchQuery) -> String {
    query.q.as_deref().unwrap_or_default().trim().to_lowercase()
}

pub async fn users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let needle = needle(&query);
    let users = blocking(&state, move |db| db.all_users()).await?;
    Ok(Json(
        users
            .into_iter()
            .filter(|u| {
                u.name.to_lowercase().contains(&needle)
                    || u.email.to_lowercase().contains(&needle)
                    || u.username.to_lowercase().contains(&needle)
            })
            .collect(),
    ))
}

pub async fn transactions(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let needle = needle(&query);
    let transactions = blocking(&state, move |db| db.all_transactions()).await?;
    Ok(Json(
        transactions
            .into_iter()
            .filter(|t| {
                t.user_name.to_lowercase().contains(&needle)
                    || t.description.to_lowercase().contains(&needle)
                    || t
                        .reference
                        .as_deref()
                        .is_some_and(|r| r.to_lowercase().contains(&needle))
            })
            .collect(),
    ))
}

pub async fn adjust_balance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(email): Path<String>,
    Json(req): Json<AdjustBalanceRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let reason = if req.reason.trim().is_empty() {
        format!("manual override by {}", claims.sub)
    } else {
        req.reason
    };
    let tx = blocking(&state, move |db| {
        db.adjust_user_balance(&email, req.amount, &reason)
    })
    .await?;

    info!("Node Calibration Successful: {} {:?} {}", tx.user_name, tx.kind, tx.amount);
    Ok(Json(tx))
}

pub async fn audit(State(state): State<AppState>) -> Result<Json<Vec<BalanceAudit>>, ApiError> {
    let audits = blocking(&state, |db| db.audit_ledger()).await?;
    for drift in audits.iter().filter(|a| !a.consistent) {
        warn!(
            "Ledger drift for {}: expected {} TC, holds {} TC",
            drift.name, drift.expected, drift.actual
        );
    }
    Ok(Json(audits))
}

pub async fn summary(State(state): State<AppState>) -> Result<Json<LedgerSummary>, ApiError> {
    Ok(Json(blocking(&state, |db| db.ledger_summary()).await?))
}
