//! Vault top-ups through the hosted checkout widget.
//!
//! The browser opens the widget with the parameters from `open` and reports
//! back through `confirm` or `cancel`. The callback is trusted as-is; each
//! reference can credit the vault at most once.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use nt_types::api::{CheckoutRequest, CheckoutResponse, Claims};
use nt_types::models::{Transaction, TxKind};

use crate::auth::{AppState, blocking, session_user};
use crate::error::ApiError;

pub const CURRENCY: &str = "NGN";
/// How long an unsettled checkout stays claimable.
pub const CHECKOUT_TTL: Duration = Duration::from_secs(30 * 60);
/// Open checkouts kept per node; opening another drops the oldest.
pub const MAX_OPEN_PER_NODE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub name: &'static str,
    pub coins: i64,
    /// Whole naira.
    pub price: i64,
}

pub const PACKAGES: [Package; 3] = [
    Package {
        name: "Starter Node",
        coins: 1_000,
        price: 3_000,
    },
    Package {
        name: "Growth Scale",
        coins: 5_500,
        price: 15_000,
    },
    Package {
        name: "Institutional",
        coins: 18_000,
        price: 45_000,
    },
];

pub fn find_package(name: &str) -> Option<Package> {
    PACKAGES
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
        .copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckoutState {
    Open,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone)]
struct PendingCheckout {
    email: String,
    package: Package,
    state: CheckoutState,
    opened_at: Instant,
}

/// What `confirm` needs to credit the vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub email: String,
    pub package: Package,
}

/// Checkouts awaiting the widget callback. Settled, cancelled and expired
/// entries are dropped whenever a new checkout opens.
pub struct CheckoutDesk {
    public_key: String,
    checkouts: Mutex<HashMap<String, PendingCheckout>>,
    ttl: Duration,
}

impl CheckoutDesk {
    pub fn new(public_key: impl Into<String>) -> Self {
        Self::with_ttl(public_key, CHECKOUT_TTL)
    }

    pub fn with_ttl(public_key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            public_key: public_key.into(),
            checkouts: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn open(&self, email: &str, package: Package) -> CheckoutResponse {
        let reference = format!("NT-VX-{}", rand::rng().random_range(1..=1_000_000_000u64));
        let mut checkouts = self.checkouts.lock().unwrap_or_else(|e| e.into_inner());
        checkouts.retain(|_, c| c.state == CheckoutState::Open && c.opened_at.elapsed() < self.ttl);

        let mut mine: Vec<(Instant, String)> = checkouts
            .iter()
            .filter(|(_, c)| c.email.eq_ignore_ascii_case(email))
            .map(|(r, c)| (c.opened_at, r.clone()))
            .collect();
        if mine.len() >= MAX_OPEN_PER_NODE {
            mine.sort();
            for (_, stale) in &mine[..=mine.len() - MAX_OPEN_PER_NODE] {
                checkouts.remove(stale);
            }
        }

        checkouts.insert(
            reference.clone(),
            PendingCheckout {
                email: email.to_string(),
                package,
                state: CheckoutState::Open,
                opened_at: Instant::now(),
            },
        );

        CheckoutResponse {
            public_key: self.public_key.clone(),
            email: email.to_string(),
            amount: package.price * 100,
            currency: CURRENCY.to_string(),
            reference,
            package: package.name.to_string(),
            coins: package.coins,
        }
    }

    /// Claim an open checkout for settlement. Only the node that opened it
    /// may claim it, and only once.
    pub fn claim(&self, reference: &str, email: &str) -> Result<Settlement, ApiError> {
        let mut checkouts = self.checkouts.lock().unwrap_or_else(|e| e.into_inner());
        let checkout = checkouts
            .get_mut(reference)
            .filter(|c| c.email.eq_ignore_ascii_case(email))
            .ok_or_else(|| unknown_reference(reference))?;
        if checkout.state == CheckoutState::Open && checkout.opened_at.elapsed() >= self.ttl {
            return Err(ApiError::conflict(format!("checkout {reference} has expired")));
        }

        match checkout.state {
            CheckoutState::Open => {
                checkout.state = CheckoutState::Confirmed;
                Ok(Settlement {
                    email: checkout.email.clone(),
                    package: checkout.package,
                })
            }
            CheckoutState::Confirmed => Err(ApiError::conflict(format!(
                "checkout {reference} was already confirmed"
            ))),
            CheckoutState::Cancelled => Err(ApiError::conflict(format!(
                "checkout {reference} was cancelled"
            ))),
        }
    }

    /// Put a claimed checkout back if crediting the vault failed.
    pub fn release(&self, reference: &str) {
        let mut checkouts = self.checkouts.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(checkout) = checkouts.get_mut(reference) {
            checkout.state = CheckoutState::Open;
        }
    }

    pub fn cancel(&self, reference: &str, email: &str) -> Result<(), ApiError> {
        let mut checkouts = self.checkouts.lock().unwrap_or_else(|e| e.into_inner());
        let checkout = checkouts
            .get_mut(reference)
            .filter(|c| c.email.eq_ignore_ascii_case(email))
            .ok_or_else(|| unknown_reference(reference))?;
        if checkout.state == CheckoutState::Confirmed {
            return Err(ApiError::conflict(format!(
                "checkout {reference} was already confirmed"
            )));
        }
        checkout.state = CheckoutState::Cancelled;
        Ok(())
    }
}

fn unknown_reference(reference: &str) -> ApiError {
    ApiError::not_found(format!("unknown checkout reference: {reference}"))
}

// -- Handlers --

pub async fn list_packages() -> Json<[Package; 3]> {
    Json(PACKAGES)
}

pub async fn open_checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let package = find_package(&req.package)
        .ok_or_else(|| ApiError::bad_request(format!("unknown package: {}", req.package)))?;
    let user = session_user(&state, &claims).await?;

    let checkout = state.checkout.open(&user.email, package);
    info!("{} opened checkout {} for {}", user.name, checkout.reference, package.name);
    Ok((StatusCode::CREATED, Json(checkout)))
}

pub async fn confirm_checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(reference): Path<String>,
) -> Result<Json<Transaction>, ApiError> {
    let settlement = state.checkout.claim(&reference, &claims.sub)?;

    let ref_for_db = reference.clone();
    let credited = blocking(&state, move |db| {
        if db.has_reference(&ref_for_db)? {
            return Err(nt_db::StoreError::Conflict(format!(
                "reference {ref_for_db} is already on the ledger"
            )));
        }
        let user = db
            .find_user_by_email(&settlement.email)?
            .ok_or_else(|| nt_db::StoreError::NotFound {
                entity: "user",
                key: settlement.email.clone(),
            })?;
        db.add_transaction(
            &user.name,
            settlement.package.coins,
            TxKind::Credit,
            &format!("Vault Calibration: {}", settlement.package.name),
            Some(ref_for_db),
        )
    })
    .await;

    match credited {
        Ok(tx) => {
            info!("Vault synchronized: {} TC added to {} ({})", tx.amount, tx.user_name, reference);
            Ok(Json(tx))
        }
        Err(err) => {
            warn!("Checkout {} could not be settled: {}", reference, err.message);
            state.checkout.release(&reference);
            Err(err)
        }
    }
}

pub async fn cancel_checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(reference): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.checkout.cancel(&reference, &claims.sub)?;
    info!("Checkout {} closed without payment", reference);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_quotes_kobo_and_reference() {
        let desk = CheckoutDesk::new("pk_test_123");
        let package = find_package("growth scale").unwrap();
        let checkout = desk.open("ada@example.com", package);

        assert_eq!(checkout.amount, 1_500_000);
        assert_eq!(checkout.currency, "NGN");
        assert_eq!(checkout.coins, 5_500);
        assert_eq!(checkout.public_key, "pk_test_123");
        let n: u64 = checkout.reference.strip_prefix("NT-VX-").unwrap().parse().unwrap();
        assert!((1..=1_000_000_000).contains(&n));
    }

    #[test]
    fn reference_settles_at_most_once() {
        let desk = CheckoutDesk::new("pk");
        let checkout = desk.open("ada@example.com", PACKAGES[0]);

        let settlement = desk.claim(&checkout.reference, "ada@example.com").unwrap();
        assert_eq!(settlement.package, PACKAGES[0]);

        let again = desk.claim(&checkout.reference, "ada@example.com").unwrap_err();
        assert_eq!(again.status, StatusCode::CONFLICT);
        assert!(desk.cancel(&checkout.reference, "ada@example.com").is_err());
    }

    #[test]
    fn foreign_or_unknown_reference_is_not_found() {
        let desk = CheckoutDesk::new("pk");
        let checkout = desk.open("ada@example.com", PACKAGES[1]);

        let err = desk.claim(&checkout.reference, "bo@example.com").unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        let err = desk.claim("NT-VX-0", "ada@example.com").unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn cancelled_checkout_cannot_settle() {
        let desk = CheckoutDesk::new("pk");
        let checkout = desk.open("ada@example.com", PACKAGES[2]);
        desk.cancel(&checkout.reference, "ada@example.com").unwrap();
        assert_eq!(
            desk.claim(&checkout.reference, "ada@example.com").unwrap_err().status,
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn finished_checkouts_are_dropped_on_open() {
        let desk = CheckoutDesk::new("pk");
        let settled = desk.open("ada@example.com", PACKAGES[0]);
        desk.claim(&settled.reference, "ada@example.com").unwrap();
        let cancelled = desk.open("ada@example.com", PACKAGES[0]);
        desk.cancel(&cancelled.reference, "ada@example.com").unwrap();

        let open = desk.open("ada@example.com", PACKAGES[1]);
        assert_eq!(desk.checkouts.lock().unwrap().len(), 1);
        assert!(desk.claim(&open.reference, "ada@example.com").is_ok());
    }

    #[test]
    fn open_checkouts_per_node_are_capped() {
        let desk = CheckoutDesk::new("pk");
        let first = desk.open("ada@example.com", PACKAGES[0]);
        for _ in 0..MAX_OPEN_PER_NODE * 3 {
            desk.open("ada@example.com", PACKAGES[0]);
        }
        desk.open("bo@example.com", PACKAGES[0]);

        assert_eq!(desk.checkouts.lock().unwrap().len(), MAX_OPEN_PER_NODE + 1);
        let err = desk.claim(&first.reference, "ada@example.com").unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn expired_checkout_cannot_settle() {
        let desk = CheckoutDesk::with_ttl("pk", Duration::ZERO);
        let stale = desk.open("ada@example.com", PACKAGES[0]);
        let err = desk.claim(&stale.reference, "ada@example.com").unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        desk.open("ada@example.com", PACKAGES[0]);
        assert_eq!(desk.checkouts.lock().unwrap().len(), 1);
    }

    #[test]
    fn released_checkout_can_be_retried() {
        let desk = CheckoutDesk::new("pk");
        let checkout = desk.open("ada@example.com", PACKAGES[0]);
        desk.claim(&checkout.reference, "ada@example.com").unwrap();
        desk.release(&checkout.reference);
        assert!(desk.claim(&checkout.reference, "ada@example.com").is_ok());
    }
}
