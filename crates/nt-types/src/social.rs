use crate::models::{SocialLink, SocialPlatform};

/// Platforms offered as direct contact buttons once a handshake is accepted.
pub const CONTACT_PLATFORMS: [SocialPlatform; 3] = [
    SocialPlatform::WhatsApp,
    SocialPlatform::Telegram,
    SocialPlatform::LinkedIn,
];

/// Turn a handle or number into a clickable profile URL. Values that are
/// already URLs pass through untouched.
pub fn format_social_url(platform: SocialPlatform, value: &str) -> String {
    if value.is_empty() {
        return "#".to_string();
    }
    if value.starts_with("http") {
        return value.to_string();
    }
    let clean = value.replacen('@', "", 1);
    let clean = clean.trim();
    match platform {
        SocialPlatform::WhatsApp => format!("https://wa.me/{clean}"),
        SocialPlatform::Telegram => format!("https://t.me/{clean}"),
        SocialPlatform::LinkedIn => format!("https://linkedin.com/in/{clean}"),
        SocialPlatform::Instagram => format!("https://instagram.com/{clean}"),
        SocialPlatform::X => format!("https://x.com/{clean}"),
        SocialPlatform::Portfolio => value.to_string(),
    }
}

/// Contact links for a handshake partner: their messaging socials, with the
/// tag's preferred channel first when it is not already listed.
pub fn contact_links(
    socials: &[SocialLink],
    preferred: Option<(SocialPlatform, &str)>,
) -> Vec<SocialLink> {
    let mut links: Vec<SocialLink> = socials
        .iter()
        .filter(|s| CONTACT_PLATFORMS.contains(&s.platform))
        .cloned()
        .collect();

    if let Some((platform, detail)) = preferred {
        if !detail.is_empty() && !links.iter().any(|s| s.platform == platform) {
            links.insert(
                0,
                SocialLink {
                    platform,
                    url: detail.to_string(),
                },
            );
        }
    }

    links
        .into_iter()
        .map(|s| SocialLink {
            url: format_social_url(s.platform, &s.url),
            platform: s.platform,
        })
        .collect()
}
