use serde::{Deserialize, Serialize};

use super::domain::{ContactInfo, UserId};

/// Which side of the marketplace a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Volunteer,
    Requester,
}

/// Profile fields the lifecycle engine reads from the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disability_type: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn contact(&self) -> ContactInfo {
        ContactInfo {
            name: self.display_name(),
            phone: self.phone.clone(),
        }
    }
}

/// Lookup seam onto the identity/user service.
pub trait UserDirectory: Send + Sync {
    fn exists(&self, user_id: &UserId) -> Result<bool, DirectoryError>;
    fn profile(&self, user_id: &UserId) -> Result<Option<UserProfile>, DirectoryError>;
}

/// Directory lookup failure.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}
