//! Vault balances and the transaction ledger.
//!
//! A balance only ever moves together with a ledger row written in the same
//! state mutation, so `opening + Σ signed amounts == coins` holds for every
//! node after any sequence of calls.

use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use nt_types::models::{PRO_COST, PRO_DURATION_MS, Transaction, TxKind};

use crate::models::{BalanceAudit, LedgerSummary, ProtocolState};
use crate::{Database, Result, StoreError};

pub const PRO_DESCRIPTION: &str = "Tag Pro Subscription (30 Days)";

impl ProtocolState {
    /// Prepend a ledger row and apply it to the named node's balance.
    /// There is no floor: a debit may take the balance negative.
    pub(crate) fn record(
        &mut self,
        user_name: &str,
        amount: i64,
        kind: TxKind,
        description: &str,
        reference: Option<String>,
    ) -> Result<Transaction> {
        if amount < 0 {
            return Err(StoreError::Validation(
                "transaction amount must be a non-negative magnitude".to_string(),
            ));
        }
        let user = self
            .user_by_name_mut(user_name)
            .ok_or_else(|| StoreError::not_found("user", user_name))?;

        let tx = Transaction {
            id: format!("tx-{}", Uuid::new_v4()),
            user_name: user_name.to_string(),
            amount,
            kind,
            description: description.to_string(),
            timestamp: nt_types::now_millis(),
            reference: Some(reference.unwrap_or_else(|| {
                format!("REF-{}", rand::rng().random_range(100_000..=999_999))
            })),
        };
        user.coins = user.coins.checked_add(tx.signed_amount()).ok_or_else(|| {
            StoreError::Validation(format!("balance of {user_name} is out of range"))
        })?;
        if user.coins < 0 {
            warn!("Balance of {} is now negative ({})", user_name, user.coins);
        }

        self.transactions.insert(0, tx.clone());
        Ok(tx)
    }
}

impl Database {
    pub fn add_transaction(
        &self,
        user_name: &str,
        amount: i64,
        kind: TxKind,
        description: &str,
        reference: Option<String>,
    ) -> Result<Transaction> {
        self.mutate(|state| state.record(user_name, amount, kind, description, reference))
    }

    /// Ledger rows for one node, newest first.
    pub fn transactions(&self, user_name: &str) -> Result<Vec<Transaction>> {
        self.read_state(|s| {
            s.transactions
                .iter()
                .filter(|t| t.user_name == user_name)
                .cloned()
                .collect()
        })
    }

    pub fn all_transactions(&self) -> Result<Vec<Transaction>> {
        self.read_state(|s| s.transactions.clone())
    }

    pub fn has_reference(&self, reference: &str) -> Result<bool> {
        self.read_state(|s| {
            s.transactions
                .iter()
                .any(|t| t.reference.as_deref() == Some(reference))
        })
    }

    /// Debit the Pro fee and flag the node for 30 days.
    pub fn subscribe_pro(&self, email: &str) -> Result<Transaction> {
        self.mutate(|state| {
            let user = state
                .user_by_email(email)
                .ok_or_else(|| StoreError::not_found("user", email))?;
            if user.coins < PRO_COST {
                return Err(StoreError::InsufficientBalance {
                    required: PRO_COST,
                    available: user.coins,
                });
            }
            let name = user.name.clone();

            let tx = state.record(&name, PRO_COST, TxKind::Debit, PRO_DESCRIPTION, None)?;
            let user = state
                .user_by_name_mut(&name)
                .ok_or_else(|| StoreError::not_found("user", name.as_str()))?;
            user.is_pro = true;
            user.pro_expires_at = Some(tx.timestamp + PRO_DURATION_MS);

            info!("{} activated Tag Pro", name);
            Ok(tx)
        })
    }

    /// Administrative override outside the normal cost model. Positive
    /// amounts credit, negative amounts debit.
    pub fn adjust_user_balance(
        &self,
        email: &str,
        amount: i64,
        reason: &str,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(StoreError::Validation(
                "adjustment amount must be non-zero".to_string(),
            ));
        }
        let magnitude = amount.checked_abs().ok_or_else(|| {
            StoreError::Validation("adjustment amount is out of range".to_string())
        })?;
        let kind = if amount >= 0 {
            TxKind::Credit
        } else {
            TxKind::Debit
        };

        self.mutate(|state| {
            let name = state
                .user_by_email(email)
                .map(|u| u.name.clone())
                .ok_or_else(|| StoreError::not_found("user", email))?;
            warn!("Admin adjustment of {} TC for {}: {}", amount, name, reason);
            state.record(
                &name,
                magnitude,
                kind,
                &format!("Admin Intervention: {reason}"),
                None,
            )
        })
    }

    pub fn audit_balance(&self, email: &str) -> Result<Option<BalanceAudit>> {
        self.read_state(|s| audit(s, email))
    }

    pub fn audit_ledger(&self) -> Result<Vec<BalanceAudit>> {
        self.read_state(|s| s.users.iter().filter_map(|u| audit(s, &u.email)).collect())
    }

    pub fn ledger_summary(&self) -> Result<LedgerSummary> {
        self.read_state(|s| {
            let total = |kind: TxKind| {
                s.transactions
                    .iter()
                    .filter(|t| t.kind == kind)
                    .fold(0i64, |acc, t| acc.saturating_add(t.amount))
            };
            LedgerSummary {
                users: s.users.len(),
                transactions: s.transactions.len(),
                total_credited: total(TxKind::Credit),
                total_debited: total(TxKind::Debit),
            }
        })
    }
}

fn audit(state: &ProtocolState, email: &str) -> Option<BalanceAudit> {
    let user = state.user_by_email(email)?;
    let ledger_net: i64 = state
        .transactions
        .iter()
        .filter(|t| t.user_name == user.name)
        .fold(0, |acc, t| acc.saturating_add(t.signed_amount()));
    let expected = user.opening_coins.saturating_add(ledger_net);

    Some(BalanceAudit {
        email: user.email.clone(),
        name: user.name.clone(),
        opening: user.opening_coins,
        ledger_net,
        expected,
        actual: user.coins,
        consistent: expected == user.coins,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::register;
    use nt_types::models::SIGNUP_GRANT;

    #[test]
    fn transaction_moves_balance_and_prepends() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "ada@example.com", "Ada");

        db.add_transaction(
            "Ada",
            1_000,
            TxKind::Credit,
            "Vault Calibration: Starter Node",
            Some("NT-VX-1".into()),
        )
        .unwrap();
        let second = db
            .add_transaction("Ada", 200, TxKind::Debit, "manual", None)
            .unwrap();

        let user = db.find_user_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(user.coins, SIGNUP_GRANT + 800);

        let history = db.transactions("Ada").unwrap();
        assert_eq!(history[0], second);
        assert_eq!(history[1].reference.as_deref(), Some("NT-VX-1"));
        assert!(second.reference.unwrap().starts_with("REF-"));
        assert!(db.has_reference("NT-VX-1").unwrap());
    }

    #[test]
    fn debits_can_go_negative() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "ada@example.com", "Ada");
        db.add_transaction("Ada", 3_000, TxKind::Debit, "overdraw", None)
            .unwrap();
        let user = db.find_user_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(user.coins, -500);
    }

    #[test]
    fn unknown_user_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.add_transaction("Nobody", 10, TxKind::Credit, "x", None),
            Err(StoreError::NotFound { .. })
        ));
        assert!(db.all_transactions().unwrap().is_empty());
    }

    #[test]
    fn pro_subscription_from_five_thousand() {
        let db = Database::open_in_memory().unwrap();
        let tx = db.subscribe_pro("softking@gmail.com").unwrap();

        let user = db.find_user_by_email("softking@gmail.com").unwrap().unwrap();
        assert_eq!(user.coins, 2_000);
        assert!(user.is_pro);
        assert_eq!(user.pro_expires_at, Some(tx.timestamp + PRO_DURATION_MS));

        let history = db.transactions("Soft King").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, TxKind::Debit);
        assert_eq!(history[0].amount, PRO_COST);
        assert_eq!(history[0].description, PRO_DESCRIPTION);
    }

    #[test]
    fn pro_subscription_requires_funds() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "ada@example.com", "Ada");

        let err = db.subscribe_pro("ada@example.com").unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientBalance {
                required: PRO_COST,
                available: SIGNUP_GRANT
            }
        ));
        let user = db.find_user_by_email("ada@example.com").unwrap().unwrap();
        assert!(!user.is_pro);
        assert_eq!(user.coins, SIGNUP_GRANT);
        assert!(db.all_transactions().unwrap().is_empty());
    }

    #[test]
    fn admin_adjustment_direction_follows_sign() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "ada@example.com", "Ada");

        let credit = db.adjust_user_balance("ada@example.com", 700, "refund").unwrap();
        assert_eq!(credit.kind, TxKind::Credit);
        assert_eq!(credit.amount, 700);
        assert_eq!(credit.description, "Admin Intervention: refund");

        let debit = db
            .adjust_user_balance("ada@example.com", -4_000, "chargeback")
            .unwrap();
        assert_eq!(debit.kind, TxKind::Debit);
        assert_eq!(debit.amount, 4_000);

        let user = db.find_user_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(user.coins, SIGNUP_GRANT + 700 - 4_000);

        assert!(matches!(
            db.adjust_user_balance("ada@example.com", 0, "noop"),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn out_of_range_adjustments_leave_the_store_usable() {
        let db = Database::open_in_memory().unwrap();

        let overflow = db.adjust_user_balance("softking@gmail.com", i64::MAX, "huge");
        assert!(matches!(overflow, Err(StoreError::Validation(_))));
        let underflow = db.adjust_user_balance("softking@gmail.com", i64::MIN, "huge");
        assert!(matches!(underflow, Err(StoreError::Validation(_))));

        let user = db.find_user_by_email("softking@gmail.com").unwrap().unwrap();
        assert_eq!(user.coins, 5_000);
        assert!(db.all_transactions().unwrap().is_empty());

        db.adjust_user_balance("softking@gmail.com", i64::MAX - 5_000, "cap")
            .unwrap();
        assert!(matches!(
            db.add_transaction("Soft King", 1, TxKind::Credit, "one more", None),
            Err(StoreError::Validation(_))
        ));
        let audit = db.audit_balance("softking@gmail.com").unwrap().unwrap();
        assert_eq!(audit.actual, i64::MAX);
        assert!(audit.consistent);
    }

    #[test]
    fn ledger_reconciles_after_mixed_operations() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "ada@example.com", "Ada");
        register(&db, "bo@example.com", "Bo");

        db.adjust_user_balance("ada@example.com", 1_000, "promo").unwrap();
        db.subscribe_pro("ada@example.com").unwrap();
        db.add_transaction(
            "Bo",
            5_500,
            TxKind::Credit,
            "Vault Calibration: Growth Scale",
            None,
        )
        .unwrap();
        db.adjust_user_balance("bo@example.com", -25, "fix").unwrap();
        db.subscribe_pro("softking@gmail.com").unwrap();
        let _ = db.subscribe_pro("softking@gmail.com");

        let audits = db.audit_ledger().unwrap();
        assert_eq!(audits.len(), 3);
        assert!(audits.iter().all(|a| a.consistent), "{audits:?}");

        let summary = db.ledger_summary().unwrap();
        assert_eq!(summary.users, 3);
        assert_eq!(summary.total_credited, 6_500);
        assert_eq!(summary.total_debited, 3_000 + 25 + 3_000);
    }
}
