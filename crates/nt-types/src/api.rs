use serde::{Deserialize, Serialize};

use crate::models::{SocialLink, SocialPlatform, UserProfile};

// -- Session --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Node,
    Admin,
}

/// Session token claims. For nodes `sub` is the account email; for the
/// admin portal it is the admin username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: UserProfile,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendCodeRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeResponse {
    pub sent_to: String,
    /// Only populated when demo codes are enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub code: String,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub socials: Vec<SocialLink>,
    /// Tag synthesized during onboarding, broadcast on completion.
    #[serde(default)]
    pub tag: Option<TagDraft>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AdminSessionResponse {
    pub token: String,
}

// -- Profile --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub socials: Option<Vec<SocialLink>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AvatarRequest {
    /// `data:image/...;base64,` URL produced by the browser file reader.
    pub avatar: String,
}

// -- Tags --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynthesisRequest {
    pub bio: String,
    pub goal: String,
}

/// Fields a node submits when broadcasting a tag. Owner, id and avatar are
/// filled in server-side.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TagDraft {
    pub title: String,
    pub intent: String,
    #[serde(default)]
    pub public_title: Option<String>,
    #[serde(default)]
    pub public_intent: Option<String>,
    #[serde(default)]
    pub is_masked: bool,
    pub category: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_contact_platform")]
    pub contact_platform: SocialPlatform,
    #[serde(default)]
    pub contact_detail: String,
}

fn default_contact_platform() -> SocialPlatform {
    SocialPlatform::LinkedIn
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TagUpdateRequest {
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

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoutRequest {
    pub query: String,
}

// -- Requests --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendRequestRequest {
    pub tag_id: String,
    pub reason: String,
    #[serde(default)]
    pub opportunity: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub name: String,
    pub links: Vec<SocialLink>,
}

// -- Vault --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckoutRequest {
    pub package: String,
}

/// Parameters handed to the hosted checkout widget.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub public_key: String,
    pub email: String,
    /// Minor currency units (kobo).
    pub amount: i64,
    pub currency: String,
    pub reference: String,
    pub package: String,
    pub coins: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdjustBalanceRequest {
    pub amount: i64,
    #[serde(default)]
    pub reason: String,
}
