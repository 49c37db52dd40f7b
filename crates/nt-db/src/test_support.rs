use nt_types::models::{SocialPlatform, UserProfile};

use crate::Database;
use crate::models::{NewTag, NewUser};

pub(crate) fn new_user(email: &str, name: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        name: name.to_string(),
        username: name.to_lowercase(),
        ..NewUser::default()
    }
}

pub(crate) fn register(db: &Database, email: &str, name: &str) -> UserProfile {
    db.register_user(new_user(email, name)).unwrap()
}

pub(crate) fn new_tag(owner: &str, title: &str, category: &str) -> NewTag {
    NewTag {
        title: title.to_string(),
        intent: format!("{title} intent"),
        public_title: None,
        public_intent: None,
        is_masked: false,
        category: category.to_string(),
        color: None,
        tags: vec!["Networking".into()],
        owner: owner.to_string(),
        location: "Lagos".into(),
        avatar: None,
        contact_platform: SocialPlatform::LinkedIn,
        contact_detail: String::new(),
        social_links: vec![],
    }
}
