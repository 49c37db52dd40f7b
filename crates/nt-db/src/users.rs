use tracing::info;
use uuid::Uuid;

use nt_types::models::{SIGNUP_GRANT, UserProfile, UserType};

use crate::models::{NewUser, ProfileUpdate, ProtocolState};
use crate::{Database, Result, StoreError};

impl Database {
    /// Resolve the signed-in node from the session's stored email.
    pub fn current_user(&self, email: Option<&str>) -> Result<Option<UserProfile>> {
        match email {
            Some(email) if !email.trim().is_empty() => self.find_user_by_email(email),
            _ => Ok(None),
        }
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        self.read_state(|s| s.user_by_email(email).cloned())
    }

    pub fn find_user_by_name(&self, name: &str) -> Result<Option<UserProfile>> {
        self.read_state(|s| s.user_by_name(name).cloned())
    }

    pub fn all_users(&self) -> Result<Vec<UserProfile>> {
        self.read_state(|s| s.users.clone())
    }

    pub fn register_user(&self, new_user: NewUser) -> Result<UserProfile> {
        new_user.validate()?;
        let email = new_user.email.trim().to_lowercase();

        self.mutate(|state| {
            if state.user_by_email(&email).is_some() {
                return Err(StoreError::Conflict(format!(
                    "a node is already registered for {email}"
                )));
            }
            if state.user_by_name(new_user.name.trim()).is_some() {
                return Err(StoreError::Conflict(format!(
                    "the name {} is taken",
                    new_user.name.trim()
                )));
            }

            let avatar = new_user.avatar.unwrap_or_else(|| {
                format!("https://picsum.photos/seed/{}/100/100", new_user.username)
            });
            let user = UserProfile {
                id: format!("usr-{}", Uuid::new_v4()),
                email,
                name: new_user.name.trim().to_string(),
                username: new_user.username.trim().to_string(),
                bio: new_user.bio,
                location: new_user.location,
                coins: SIGNUP_GRANT,
                socials: new_user.socials,
                joined_at: nt_types::now_millis(),
                user_type: UserType::Individual,
                is_pro: false,
                pro_expires_at: None,
                avatar: Some(avatar),
                opening_coins: SIGNUP_GRANT,
            };

            info!("Registered node {} ({})", user.username, user.id);
            state.users.push(user.clone());
            Ok(user)
        })
    }

    pub fn update_user_profile(&self, email: &str, update: ProfileUpdate) -> Result<UserProfile> {
        self.mutate(|state| {
            let old_name = state
                .user_by_email(email)
                .map(|u| u.name.clone())
                .ok_or_else(|| StoreError::not_found("user", email))?;

            // Tags, requests and ledger rows point at users by name, so a
            // rename has to carry them along.
            let new_name = update
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty() && *n != old_name);
            if let Some(name) = &new_name {
                if state.user_by_name(name).is_some() {
                    return Err(StoreError::Conflict(format!("the name {name} is taken")));
                }
                rename_references(state, &old_name, name);
            }

            let user = state
                .user_by_email_mut(email)
                .ok_or_else(|| StoreError::not_found("user", email))?;
            if let Some(name) = new_name {
                user.name = name;
            }
            if let Some(username) = update.username.filter(|n| !n.trim().is_empty()) {
                user.username = username;
            }
            if let Some(bio) = update.bio {
                user.bio = bio;
            }
            if let Some(location) = update.location {
                user.location = location;
            }
            if let Some(socials) = update.socials {
                user.socials = socials;
            }
            Ok(user.clone())
        })
    }

    /// Returns whether a node with that email existed.
    pub fn update_user_avatar(&self, email: &str, avatar: &str) -> Result<bool> {
        self.mutate(|state| match state.user_by_email_mut(email) {
            Some(user) => {
                user.avatar = Some(avatar.to_string());
                Ok(true)
            }
            None => Ok(false),
        })
    }
}

fn rename_references(state: &mut ProtocolState, old: &str, new: &str) {
    for tag in state.tags.iter_mut().filter(|t| t.owner == old) {
        tag.owner = new.to_string();
    }
    for req in state.requests.iter_mut().filter(|r| r.sender_name == old) {
        req.sender_name = new.to_string();
    }
    for tx in state.transactions.iter_mut().filter(|t| t.user_name == old) {
        tx.user_name = new.to_string();
    }
}
