use std::fmt;

use serde::{Deserialize, Serialize};

/// Balance credited to every freshly registered node.
pub const SIGNUP_GRANT: i64 = 2_500;
/// Flat fee debited from the requester when a handshake is accepted.
pub const HANDSHAKE_COST: i64 = 50;
/// Price of a Tag Pro subscription.
pub const PRO_COST: i64 = 3_000;
pub const PRO_DURATION_MS: i64 = 30 * DAY_MS;
pub const DAY_MS: i64 = 86_400_000;
pub const DEFAULT_TAG_COLOR: &str = "emerald-500";
pub const GHOST_NODE: &str = "Ghost Node";
pub const GHOST_AVATAR: &str = "https://picsum.photos/seed/ghost/100/100";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocialPlatform {
    WhatsApp,
    Telegram,
    Instagram,
    LinkedIn,
    X,
    Portfolio,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub platform: SocialPlatform,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    #[default]
    Individual,
    Business,
}

fn default_opening_coins() -> i64 {
    SIGNUP_GRANT
}

/// A registered node. Balances are whole Tag Coins and may go negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: String,
    pub coins: i64,
    #[serde(default)]
    pub socials: Vec<SocialLink>,
    pub joined_at: i64,
    #[serde(rename = "type", default)]
    pub user_type: UserType,
    #[serde(default)]
    pub is_pro: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pro_expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Balance the account was created with; the ledger is reconciled against it.
    #[serde(default = "default_opening_coins")]
    pub opening_coins: i64,
}

impl UserProfile {
    /// Pro status that has not lapsed. Legacy records without an expiry stay active.
    pub fn has_active_pro(&self, now: i64) -> bool {
        self.is_pro && self.pro_expires_at.is_none_or(|expires| expires > now)
    }
}

/// Public view of a node: no email, no balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub name: String,
    pub username: String,
    pub bio: String,
    pub location: String,
    pub avatar: Option<String>,
    pub joined_at: i64,
    pub is_pro: bool,
}

impl From<&UserProfile> for PublicProfile {
    fn from(user: &UserProfile) -> Self {
        Self {
            name: user.name.clone(),
            username: user.username.clone(),
            bio: user.bio.clone(),
            location: user.location.clone(),
            avatar: user.avatar.clone(),
            joined_at: user.joined_at,
            is_pro: user.is_pro,
        }
    }
}

/// A declared intent. `title`/`intent` hold the true values; the optional
/// public fields are the neutral mask shown when `is_masked` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberTag {
    pub id: String,
    pub title: String,
    pub intent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_intent: Option<String>,
    #[serde(default)]
    pub is_masked: bool,
    pub category: String,
    pub color: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub owner: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub contact_platform: SocialPlatform,
    #[serde(default)]
    pub contact_detail: String,
    #[serde(default)]
    pub social_links: Vec<SocialLink>,
}

impl NumberTag {
    pub fn display_title(&self) -> &str {
        match (&self.public_title, self.is_masked) {
            (Some(mask), true) => mask,
            _ => &self.title,
        }
    }

    pub fn display_intent(&self) -> &str {
        match (&self.public_intent, self.is_masked) {
            (Some(mask), true) => mask,
            _ => &self.intent,
        }
    }

    /// Case-insensitive discovery match. Masked tags still match on their true
    /// title and intent, so a query can find a ghost node without revealing it.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        let hit = |s: &str| s.to_lowercase().contains(&query);

        hit(self.display_title())
            || hit(self.display_intent())
            || (self.is_masked && (hit(&self.title) || hit(&self.intent)))
            || self.tags.iter().any(|t| hit(t))
    }

    pub fn public_view(&self) -> PublicTag {
        PublicTag {
            id: self.id.clone(),
            owner: if self.is_masked {
                GHOST_NODE.to_string()
            } else {
                self.owner.clone()
            },
            title: self.display_title().to_string(),
            intent: self.display_intent().to_string(),
            is_masked: self.is_masked,
            category: self.category.clone(),
            color: self.color.clone(),
            tags: self.tags.clone(),
            location: self.location.clone(),
            avatar: if self.is_masked {
                Some(GHOST_AVATAR.to_string())
            } else {
                self.avatar.clone()
            },
        }
    }
}

/// What a non-owner sees of a tag. Contact details and true masked values never appear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTag {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub intent: String,
    pub is_masked: bool,
    pub category: String,
    pub color: String,
    pub tags: Vec<String>,
    pub location: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    pub id: String,
    pub sender_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_logo: Option<String>,
    pub reason: String,
    pub opportunity: String,
    pub status: RequestStatus,
    pub tag_id: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Credit,
    Debit,
}

/// Ledger entry. `amount` is a magnitude; the direction lives in `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_name: String,
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub description: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Transaction {
    pub fn signed_amount(&self) -> i64 {
        match self.kind {
            TxKind::Credit => self.amount,
            TxKind::Debit => -self.amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeStatus {
    Waiting,
    Accepted,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagPreview {
    pub title: String,
    pub intent: String,
    pub category: String,
    pub color: String,
}

/// A proximity match synthesized on read. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagExchange {
    pub id: String,
    pub tag_id: String,
    pub distance: String,
    pub match_score: u8,
    pub timestamp: i64,
    pub status: ExchangeStatus,
    pub tag_preview: TagPreview,
}
