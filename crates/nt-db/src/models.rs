//! The persisted blob and the input/report types of the store.

use serde::{Deserialize, Serialize};

use nt_types::models::{
    ConnectionRequest, DAY_MS, DEFAULT_TAG_COLOR, NumberTag, SocialLink, SocialPlatform,
    Transaction, UserProfile, UserType,
};

use crate::StoreError;

pub const SEED_USER_COINS: i64 = 5_000;

/// Everything the node knows, serialized as one JSON object. Field names
/// match the blob the browser app wrote so old state loads unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtocolState {
    #[serde(default)]
    pub users: Vec<UserProfile>,
    #[serde(default)]
    pub tags: Vec<NumberTag>,
    #[serde(default)]
    pub requests: Vec<ConnectionRequest>,
    /// Newest first.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Kept for blob compatibility; exchanges are generated on read.
    #[serde(default)]
    pub exchanges: Vec<serde_json::Value>,
}

impl ProtocolState {
    /// Default state written on first access: one demo node and its tag.
    pub fn seeded(now: i64) -> Self {
        let socials = vec![
            SocialLink {
                platform: SocialPlatform::LinkedIn,
                url: "linkedin.com/in/softking".to_string(),
            },
            SocialLink {
                platform: SocialPlatform::X,
                url: "x.com/softking".to_string(),
            },
        ];
        let avatar = "https://picsum.photos/seed/softking/100/100".to_string();

        let user = UserProfile {
            id: "usr-default-1".to_string(),
            email: "softking@gmail.com".to_string(),
            name: "Soft King".to_string(),
            username: "softking_node".to_string(),
            bio: "Senior Protocol Architect specializing in intent-based networking.".to_string(),
            location: "Lagos, Nigeria".to_string(),
            coins: SEED_USER_COINS,
            socials: socials.clone(),
            joined_at: now - DAY_MS * 30,
            user_type: UserType::Individual,
            is_pro: false,
            pro_expires_at: None,
            avatar: Some(avatar.clone()),
            opening_coins: SEED_USER_COINS,
        };

        let tag = NumberTag {
            id: "tag-seed-1".to_string(),
            title: "Senior Developer".to_string(),
            intent: "Open to consulting with up to three strategic projects.".to_string(),
            public_title: None,
            public_intent: None,
            is_masked: false,
            category: "Collaboration".to_string(),
            color: DEFAULT_TAG_COLOR.to_string(),
            tags: vec!["React".into(), "Architecture".into(), "Web3".into()],
            owner: user.name.clone(),
            location: user.location.clone(),
            avatar: Some(avatar),
            contact_platform: SocialPlatform::LinkedIn,
            contact_detail: user.email.clone(),
            social_links: socials,
        };

        Self {
            users: vec![user],
            tags: vec![tag],
            ..Self::default()
        }
    }

    pub fn user_by_email(&self, email: &str) -> Option<&UserProfile> {
        self.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email.trim()))
    }

    pub fn user_by_email_mut(&mut self, email: &str) -> Option<&mut UserProfile> {
        self.users
            .iter_mut()
            .find(|u| u.email.eq_ignore_ascii_case(email.trim()))
    }

    pub fn user_by_name(&self, name: &str) -> Option<&UserProfile> {
        self.users.iter().find(|u| u.name == name)
    }

    pub fn user_by_name_mut(&mut self, name: &str) -> Option<&mut UserProfile> {
        self.users.iter_mut().find(|u| u.name == name)
    }

    pub fn tag(&self, id: &str) -> Option<&NumberTag> {
        self.tags.iter().find(|t| t.id == id)
    }

    /// Blobs written before opening balances were tracked carry no
    /// `openingCoins`. Derive it from the balance minus the ledger so the
    /// audit reconciles from the first load.
    pub(crate) fn backfill_opening_balances(&mut self, raw: &serde_json::Value) {
        let Some(raw_users) = raw.get("users").and_then(|u| u.as_array()) else {
            return;
        };
        let missing: Vec<&str> = raw_users
            .iter()
            .filter(|u| u.get("openingCoins").is_none())
            .filter_map(|u| u.get("id").and_then(|id| id.as_str()))
            .collect();

        for user in self.users.iter_mut().filter(|u| missing.contains(&u.id.as_str())) {
            let ledger_net = self
                .transactions
                .iter()
                .filter(|t| t.user_name == user.name)
                .fold(0i64, |acc, t| acc.saturating_add(t.signed_amount()));
            user.opening_coins = user.coins.saturating_sub(ledger_net);
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// A masked tag is only ever shown through its public title.
pub(crate) fn require_public_title(
    is_masked: bool,
    public_title: Option<&str>,
) -> Result<(), StoreError> {
    if is_masked && public_title.is_none_or(|t| t.trim().is_empty()) {
        return Err(StoreError::Validation(
            "masked tags need a public title".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub username: String,
    pub bio: String,
    pub location: String,
    pub socials: Vec<SocialLink>,
    pub avatar: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), StoreError> {
        require("email", &self.email)?;
        require("name", &self.name)?;
        require("username", &self.username)?;
        if !self.email.contains('@') {
            return Err(StoreError::Validation(format!(
                "invalid email: {}",
                self.email
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub socials: Option<Vec<SocialLink>>,
}

#[derive(Debug, Clone)]
pub struct NewTag {
    pub title: String,
    pub intent: String,
    pub public_title: Option<String>,
    pub public_intent: Option<String>,
    pub is_masked: bool,
    pub category: String,
    pub color: Option<String>,
    pub tags: Vec<String>,
    pub owner: String,
    pub location: String,
    pub avatar: Option<String>,
    pub contact_platform: SocialPlatform,
    pub contact_detail: String,
    pub social_links: Vec<SocialLink>,
}

impl NewTag {
    pub fn validate(&self) -> Result<(), StoreError> {
        require("title", &self.title)?;
        require("intent", &self.intent)?;
        require("owner", &self.owner)?;
        require_public_title(self.is_masked, self.public_title.as_deref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagUpdate {
    pub title: Option<String>,
    pub intent: Option<String>,
    pub public_title: Option<String>,
    pub public_intent: Option<String>,
    pub is_masked: Option<bool>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub tags: Option<Vec<String>>,
    pub location: Option<String>,
    pub contact_platform: Option<SocialPlatform>,
    pub contact_detail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRequest {
    pub sender_name: String,
    pub sender_logo: Option<String>,
    pub reason: String,
    pub opportunity: String,
    pub tag_id: String,
}

/// Reconciliation of one node's balance against the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceAudit {
    pub email: String,
    pub name: String,
    pub opening: i64,
    pub ledger_net: i64,
    pub expected: i64,
    pub actual: i64,
    pub consistent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub users: usize,
    pub transactions: usize,
    pub total_credited: i64,
    pub total_debited: i64,
}
