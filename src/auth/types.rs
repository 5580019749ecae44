// Authentication types
// Wire shapes for the backend auth contract plus the locally cached session

use serde::{Deserialize, Serialize};

/// The authenticated client's credential bundle plus cached principal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Cached user record; may be absent if the stored copy was lost
    pub user: Option<Principal>,
}

/// Denormalized copy of the authenticated user
///
/// Advisory only. The backend stays authoritative for every
/// authorization decision; this record exists so the UI can render
/// a name and avatar without a roundtrip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub role: String,
    pub email: String,
}

/// Body for POST /auth/login
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body for POST /auth/register
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Response from login and register
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub user: Principal,
    pub access_token: String,
    pub refresh_token: String,
}

impl AuthResponse {
    /// The session this response establishes
    pub fn session(&self) -> Session {
        Session {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            user: Some(self.user.clone()),
        }
    }
}

/// Response from the refresh exchange
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Body for PUT /auth/profile; absent fields stay untouched
#[derive(Debug, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Body for PUT /auth/password
#[derive(Debug, Serialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// Envelope for endpoints that return `{"user": ...}`
#[derive(Debug, Deserialize)]
pub struct UserEnvelope {
    pub user: Principal,
}
