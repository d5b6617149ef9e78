//! Accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Address, Collection, Entity, ValidationError};
use crate::types::{Email, Phone, UserId, UserRole};

/// A stored account, including its password hash.
///
/// Never send this type to clients; convert to [`UserView`] first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<Phone>,
    #[serde(default)]
    pub role: UserRole,
    /// Argon2 PHC string.
    pub password_hash: String,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether the account may use the back-office.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// The client-facing shape of a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<Phone>,
    pub role: UserRole,
    #[serde(default)]
    pub addresses: Vec<Address>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            role: user.role,
            addresses: user.addresses.clone(),
            created_at: user.created_at,
        }
    }
}

impl Entity for User {
    type Id = UserId;
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> UserId {
        self.id
    }

    fn set_id(&mut self, id: UserId) {
        self.id = id;
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.email.as_str().to_owned())
    }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_owned();
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::new("name is required"));
        }
        if self.password_hash.is_empty() {
            return Err(ValidationError::new("password hash is missing"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_view_drops_password_hash() {
        let user: User = serde_json::from_value(json!({
            "id": 3,
            "name": "Reza",
            "email": "reza@example.com",
            "passwordHash": "$argon2id$v=19$secret",
        }))
        .unwrap();
        assert_eq!(user.role, UserRole::Customer);

        let view = serde_json::to_value(UserView::from(&user)).unwrap();
        assert!(view.get("passwordHash").is_none());
        assert_eq!(view["email"], "reza@example.com");
    }
}
