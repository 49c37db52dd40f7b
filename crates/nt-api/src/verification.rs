//! One-time email codes for onboarding and recovery.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;

pub const CODE_TTL: Duration = Duration::from_secs(10 * 60);

struct Issued {
    code: String,
    at: Instant,
}

/// Outstanding codes keyed by lowercased email. Issuing again replaces the
/// previous code; a code is consumed by the first successful redeem.
pub struct CodeDesk {
    codes: Mutex<HashMap<String, Issued>>,
    ttl: Duration,
}

impl Default for CodeDesk {
    fn default() -> Self {
        Self::with_ttl(CODE_TTL)
    }
}

impl CodeDesk {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            codes: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn issue(&self, email: &str) -> String {
        let code = rand::rng().random_range(100_000..=999_999).to_string();
        let mut codes = self.codes.lock().unwrap_or_else(|e| e.into_inner());
        codes.retain(|_, issued| issued.at.elapsed() < self.ttl);
        codes.insert(
            key(email),
            Issued {
                code: code.clone(),
                at: Instant::now(),
            },
        );
        code
    }

    /// Whether `code` is currently valid for `email`, without consuming it.
    pub fn check(&self, email: &str, code: &str) -> bool {
        let codes = self.codes.lock().unwrap_or_else(|e| e.into_inner());
        self.matches(&codes, &key(email), code)
    }

    pub fn redeem(&self, email: &str, code: &str) -> bool {
        let mut codes = self.codes.lock().unwrap_or_else(|e| e.into_inner());
        let key = key(email);
        let valid = self.matches(&codes, &key, code);
        if valid {
            codes.remove(&key);
        }
        valid
    }

    fn matches(&self, codes: &HashMap<String, Issued>, key: &str, code: &str) -> bool {
        codes
            .get(key)
            .is_some_and(|issued| issued.code == code.trim() && issued.at.elapsed() < self.ttl)
    }
}

fn key(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_six_digits_and_single_use() {
        let desk = CodeDesk::default();
        let code = desk.issue("Ada@Example.com");
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));

        assert!(!desk.redeem("ada@example.com", "000000x"));
        assert!(desk.redeem(" ada@example.com ", &code));
        assert!(!desk.redeem("ada@example.com", &code));
    }

    #[test]
    fn reissue_replaces_old_code() {
        let desk = CodeDesk::default();
        let first = desk.issue("ada@example.com");
        let second = desk.issue("ada@example.com");
        if first != second {
            assert!(!desk.redeem("ada@example.com", &first));
        }
        assert!(desk.redeem("ada@example.com", &second));
    }

    #[test]
    fn check_leaves_code_redeemable() {
        let desk = CodeDesk::default();
        let code = desk.issue("ada@example.com");
        assert!(!desk.check("ada@example.com", "nope"));
        assert!(desk.check("ada@example.com", &code));
        assert!(desk.check("ada@example.com", &code));
        assert!(desk.redeem("ada@example.com", &code));
        assert!(!desk.check("ada@example.com", &code));
    }

    #[test]
    fn expired_code_is_rejected() {
        let desk = CodeDesk::with_ttl(Duration::ZERO);
        let code = desk.issue("ada@example.com");
        assert!(!desk.redeem("ada@example.com", &code));
    }
}
