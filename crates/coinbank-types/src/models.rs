use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base URL for avatar images served by the identity provider's CDN.
pub const AVATAR_CDN_BASE: &str = "https://cdn.discordapp.com/avatars";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Public account number. Assigned by the server, never changes and
    /// is never handed out twice.
    pub number: i64,
    /// Minor currency units.
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

/// A third-party identity linked through the OAuth login flow.
/// The id comes from the provider and is never generated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIdentity {
    pub id: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub last_seen: DateTime<Utc>,
}

impl ExternalIdentity {
    /// CDN location of the avatar image, if the identity has one.
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar
            .as_deref()
            .map(|hash| format!("{}/{}/{}.png", AVATAR_CDN_BASE, self.id, hash))
    }
}
