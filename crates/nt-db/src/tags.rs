use rand::Rng;
use tracing::info;
use uuid::Uuid;

use nt_types::models::{
    DEFAULT_TAG_COLOR, ExchangeStatus, NumberTag, PublicTag, TagExchange, TagPreview, UserProfile,
};

use crate::models::{NewTag, TagUpdate, require_public_title};
use crate::{Database, Result, StoreError};

impl Database {
    pub fn broadcast_tag(&self, new_tag: NewTag) -> Result<NumberTag> {
        new_tag.validate()?;

        self.mutate(|state| {
            if state.user_by_name(&new_tag.owner).is_none() {
                return Err(StoreError::not_found("user", new_tag.owner.as_str()));
            }

            let tag = NumberTag {
                id: format!("tag-{}", Uuid::new_v4()),
                title: new_tag.title,
                intent: new_tag.intent,
                public_title: new_tag.public_title,
                public_intent: new_tag.public_intent,
                is_masked: new_tag.is_masked,
                category: new_tag.category,
                color: new_tag
                    .color
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string()),
                tags: new_tag.tags,
                owner: new_tag.owner,
                location: new_tag.location,
                avatar: new_tag.avatar,
                contact_platform: new_tag.contact_platform,
                contact_detail: new_tag.contact_detail,
                social_links: new_tag.social_links,
            };

            info!("Broadcast tag {} for {}", tag.id, tag.owner);
            state.tags.push(tag.clone());
            Ok(tag)
        })
    }

    /// Merge changes into a tag. Returns whether the tag existed.
    pub fn update_tag(&self, id: &str, update: TagUpdate) -> Result<bool> {
        self.mutate(|state| {
            let Some(tag) = state.tags.iter_mut().find(|t| t.id == id) else {
                return Ok(false);
            };
            apply_update(tag, update)?;
            Ok(true)
        })
    }

    /// Merge changes into a tag on behalf of `owner`. The ownership check
    /// and the write happen under one lock.
    pub fn update_own_tag(&self, id: &str, owner: &str, update: TagUpdate) -> Result<NumberTag> {
        self.mutate(|state| {
            let tag = state
                .tags
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| StoreError::not_found("tag", id))?;
            if tag.owner != owner {
                return Err(StoreError::NotOwner {
                    entity: "tag",
                    key: id.to_string(),
                    name: owner.to_string(),
                });
            }
            apply_update(tag, update)?;
            Ok(tag.clone())
        })
    }

    pub fn get_tag(&self, id: &str) -> Result<Option<NumberTag>> {
        self.read_state(|s| s.tag(id).cloned())
    }

    pub fn my_tags(&self, owner: &str) -> Result<Vec<NumberTag>> {
        self.read_state(|s| s.tags.iter().filter(|t| t.owner == owner).cloned().collect())
    }

    pub fn discovery_tags(&self) -> Result<Vec<NumberTag>> {
        self.read_state(|s| s.tags.clone())
    }

    /// Other owners' tags matching `query`, projected for public display.
    pub fn discover(&self, viewer: &str, query: Option<&str>) -> Result<Vec<PublicTag>> {
        let query = query.unwrap_or_default();
        self.read_state(|s| {
            s.tags
                .iter()
                .filter(|t| t.owner != viewer && t.matches(query))
                .map(NumberTag::public_view)
                .collect()
        })
    }

    pub fn tag_owner_details(&self, tag_id: &str) -> Result<Option<UserProfile>> {
        self.read_state(|s| {
            s.tag(tag_id)
                .and_then(|t| s.user_by_name(&t.owner))
                .cloned()
        })
    }

    /// Proximity matches for an active Pro node: other owners' tags sharing
    /// the category of the node's first tag. Distances and scores are
    /// synthetic; nothing is stored.
    pub fn nearby_exchanges(&self, email: &str) -> Result<Vec<TagExchange>> {
        let now = nt_types::now_millis();
        self.read_state(|s| {
            let Some(user) = s.user_by_email(email).filter(|u| u.has_active_pro(now)) else {
                return Vec::new();
            };
            let Some(category) = s
                .tags
                .iter()
                .find(|t| t.owner == user.name)
                .map(|t| t.category.as_str())
            else {
                return Vec::new();
            };

            let mut rng = rand::rng();
            s.tags
                .iter()
                .filter(|t| t.owner != user.name && t.category == category)
                .map(|t| TagExchange {
                    id: format!("exch-{}", t.id),
                    tag_id: t.id.clone(),
                    distance: format!("{:.1}km", rng.random_range(0.0..2.0)),
                    match_score: 85 + rng.random_range(0..15u8),
                    timestamp: now,
                    status: ExchangeStatus::Waiting,
                    tag_preview: TagPreview {
                        title: t.display_title().to_string(),
                        intent: t.display_intent().to_string(),
                        category: t.category.clone(),
                        color: t.color.clone(),
                    },
                })
                .collect()
        })
    }
}

fn apply_update(tag: &mut NumberTag, update: TagUpdate) -> Result<()> {
    if let Some(title) = update.title.filter(|t| !t.trim().is_empty()) {
        tag.title = title;
    }
    if let Some(intent) = update.intent.filter(|t| !t.trim().is_empty()) {
        tag.intent = intent;
    }
    if update.public_title.is_some() {
        tag.public_title = update.public_title;
    }
    if update.public_intent.is_some() {
        tag.public_intent = update.public_intent;
    }
    if let Some(masked) = update.is_masked {
        tag.is_masked = masked;
    }
    if let Some(category) = update.category {
        tag.category = category;
    }
    if let Some(color) = update.color.filter(|c| !c.is_empty()) {
        tag.color = color;
    }
    if let Some(tags) = update.tags {
        tag.tags = tags;
    }
    if let Some(location) = update.location {
        tag.location = location;
    }
    if let Some(platform) = update.contact_platform {
        tag.contact_platform = platform;
    }
    if let Some(detail) = update.contact_detail {
        tag.contact_detail = detail;
    }
    require_public_title(tag.is_masked, tag.public_title.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_tag, register};

    #[test]
    fn broadcast_assigns_id_and_default_color() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "ada@example.com", "Ada");

        let tag = db.broadcast_tag(new_tag("Ada", "Hiring", "Hiring")).unwrap();
        assert!(tag.id.starts_with("tag-"));
        assert_eq!(tag.color, DEFAULT_TAG_COLOR);
        assert_eq!(db.my_tags("Ada").unwrap(), vec![tag]);
    }

    #[test]
    fn broadcast_validates_boundary() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "ada@example.com", "Ada");

        let mut tag = new_tag("Ada", "", "Hiring");
        assert!(matches!(db.broadcast_tag(tag.clone()), Err(StoreError::Validation(_))));

        tag.title = "Hiring".into();
        tag.is_masked = true;
        assert!(matches!(db.broadcast_tag(tag), Err(StoreError::Validation(_))));

        assert!(matches!(
            db.broadcast_tag(new_tag("Nobody", "Hiring", "Hiring")),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn update_reports_missing_tag() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.update_tag("tag-missing", TagUpdate::default()).unwrap());

        let updated = db
            .update_tag(
                "tag-seed-1",
                TagUpdate {
                    title: Some("Principal Engineer".into()),
                    color: Some(String::new()),
                    ..TagUpdate::default()
                },
            )
            .unwrap();
        assert!(updated);
        let tag = db.get_tag("tag-seed-1").unwrap().unwrap();
        assert_eq!(tag.title, "Principal Engineer");
        assert_eq!(tag.color, DEFAULT_TAG_COLOR);
    }

    #[test]
    fn masking_needs_a_public_title_on_update() {
        let db = Database::open_in_memory().unwrap();
        let mask = |public_title: Option<&str>| TagUpdate {
            is_masked: Some(true),
            public_title: public_title.map(str::to_string),
            ..TagUpdate::default()
        };

        assert!(matches!(
            db.update_tag("tag-seed-1", mask(None)),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            db.update_own_tag("tag-seed-1", "Soft King", mask(Some(" "))),
            Err(StoreError::Validation(_))
        ));
        assert!(!db.get_tag("tag-seed-1").unwrap().unwrap().is_masked);

        let tag = db
            .update_own_tag("tag-seed-1", "Soft King", mask(Some("Consulting")))
            .unwrap();
        assert!(tag.is_masked);
        assert_eq!(tag.display_title(), "Consulting");
    }

    #[test]
    fn only_the_owner_updates_through_update_own_tag() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "ada@example.com", "Ada");
        let retitle = TagUpdate {
            title: Some("Hijacked".into()),
            ..TagUpdate::default()
        };

        assert!(matches!(
            db.update_own_tag("tag-seed-1", "Ada", retitle.clone()),
            Err(StoreError::NotOwner { entity: "tag", .. })
        ));
        assert!(matches!(
            db.update_own_tag("tag-missing", "Ada", retitle),
            Err(StoreError::NotFound { .. })
        ));
        assert_eq!(db.get_tag("tag-seed-1").unwrap().unwrap().title, "Senior Developer");
    }

    #[test]
    fn discovery_hides_own_tags_and_masks_ghosts() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "ada@example.com", "Ada");
        let mut masked = new_tag("Ada", "Discreet Dating", "Social");
        masked.is_masked = true;
        masked.public_title = Some("Social Connection".into());
        db.broadcast_tag(masked).unwrap();

        let seen = db.discover("Soft King", None).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].owner, "Ghost Node");
        assert_eq!(seen[0].title, "Social Connection");

        assert_eq!(db.discover("Soft King", Some("dating")).unwrap().len(), 1);
        assert!(db.discover("Soft King", Some("blockchain")).unwrap().is_empty());
        assert_eq!(db.discover("Ada", None).unwrap()[0].id, "tag-seed-1");
    }

    #[test]
    fn owner_details_follow_denormalized_name() {
        let db = Database::open_in_memory().unwrap();
        let owner = db.tag_owner_details("tag-seed-1").unwrap().unwrap();
        assert_eq!(owner.email, "softking@gmail.com");
        assert_eq!(db.find_user_by_name("Soft King").unwrap(), Some(owner));
        assert!(db.tag_owner_details("tag-missing").unwrap().is_none());

        // The raw directory still carries true fields; only `discover` projects.
        let all = db.discovery_tags().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].contact_detail, "softking@gmail.com");
    }

    #[test]
    fn exchanges_require_active_pro() {
        let db = Database::open_in_memory().unwrap();
        register(&db, "ada@example.com", "Ada");
        db.broadcast_tag(new_tag("Ada", "Architect", "Collaboration")).unwrap();
        db.broadcast_tag(new_tag("Ada", "Investor", "Investment")).unwrap();

        assert!(db.nearby_exchanges("softking@gmail.com").unwrap().is_empty());

        db.subscribe_pro("softking@gmail.com").unwrap();
        let exchanges = db.nearby_exchanges("softking@gmail.com").unwrap();
        assert_eq!(exchanges.len(), 1);
        let exchange = &exchanges[0];
        assert_eq!(exchange.tag_preview.title, "Architect");
        assert!((85..100).contains(&exchange.match_score));
        assert!(exchange.distance.ends_with("km"));
        assert_eq!(exchange.status, ExchangeStatus::Waiting);
    }

    #[test]
    fn exchanges_empty_without_own_tag() {
        let db = Database::open_in_memory().unwrap();
        let user = register(&db, "ada@example.com", "Ada");
        db.adjust_user_balance(&user.email, 1_000, "top up").unwrap();
        db.subscribe_pro(&user.email).unwrap();
        assert!(db.nearby_exchanges(&user.email).unwrap().is_empty());
    }
}
