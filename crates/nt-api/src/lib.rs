pub mod admin;
pub mod auth;
pub mod checkout;
pub mod discovery;
pub mod error;
pub mod middleware;
pub mod profile;
pub mod requests;
pub mod synthesis;
pub mod tags;
pub mod vault;
pub mod verification;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use serde_json::{Value, json};

use crate::auth::AppState;
use crate::middleware::{require_admin, require_auth};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Every HTTP route of the node. Transport layers (CORS, tracing, static
/// files) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/verification", post(auth::send_verification))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/recovery", post(auth::recovery))
        .route("/auth/recovery/verify", post(auth::recovery_verify))
        .route("/synthesis", post(synthesis::synthesize))
        .route("/vault/packages", get(checkout::list_packages))
        .route("/admin/login", post(admin::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/me", get(profile::get_me).put(profile::update_me))
        .route("/me/avatar", put(profile::update_avatar))
        .route("/tags", post(tags::create_tag))
        .route("/tags/mine", get(tags::my_tags))
        .route("/tags/{id}", get(tags::get_tag).put(tags::update_tag))
        .route("/tags/{id}/owner", get(tags::tag_owner))
        .route("/discovery", get(discovery::discover))
        .route("/discovery/nearby", get(discovery::nearby))
        .route("/scout", post(discovery::global_scout))
        .route("/requests", post(requests::send_request))
        .route("/requests/inbound", get(requests::inbound))
        .route("/requests/outbound", get(requests::outbound))
        .route("/requests/{id}/accept", post(requests::accept))
        .route("/requests/{id}/decline", post(requests::decline))
        .route("/requests/{id}/contact", get(requests::contact))
        .route("/vault/transactions", get(vault::transactions))
        .route("/vault/pro", post(vault::subscribe_pro))
        .route("/vault/checkout", post(checkout::open_checkout))
        .route(
            "/vault/checkout/{reference}/confirm",
            post(checkout::confirm_checkout),
        )
        .route(
            "/vault/checkout/{reference}/cancel",
            post(checkout::cancel_checkout),
        )
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/admin/users", get(admin::users))
        .route("/admin/users/{email}/adjust", post(admin::adjust_balance))
        .route("/admin/transactions", get(admin::transactions))
        .route("/admin/audit", get(admin::audit))
        .route("/admin/summary", get(admin::summary))
        .layer(from_fn_with_state(state.clone(), require_admin))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
}
