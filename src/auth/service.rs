// Account operations against the backend auth endpoints

use super::types::{
    AuthResponse, LoginRequest, PasswordChange, Principal, ProfileUpdate, RegisterRequest,
    UserEnvelope,
};
use crate::client::ScribeClient;
use crate::error::Result;

/// High-level auth flows built on the coordinator
///
/// Login and register persist the returned session as a group write;
/// logout is purely local, the backend keeps no session state.
#[derive(Clone)]
pub struct AuthService {
    client: ScribeClient,
}

impl AuthService {
    pub fn new(client: ScribeClient) -> Self {
        Self { client }
    }

    /// Register a new account and establish its session
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let response: AuthResponse = self
            .client
            .send_json(self.client.post("/auth/register").json(request))
            .await?;
        self.client.auth().store_session(&response.session())?;
        tracing::info!(username = %response.user.username, "Registered new account");
        Ok(response)
    }

    /// Log in and establish a session
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        let response: AuthResponse = self
            .client
            .send_json(self.client.post("/auth/login").json(request))
            .await?;
        self.client.auth().store_session(&response.session())?;
        tracing::info!(username = %response.user.username, "Logged in");
        Ok(response)
    }

    /// Drop the local session; the backend holds no server-side session
    pub fn logout(&self) -> Result<()> {
        self.client.auth().clear_session()?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Cached user record, if any
    pub fn current_user(&self) -> Option<Principal> {
        self.client.auth().current_user()
    }

    /// True when an access token is present
    pub fn is_authenticated(&self) -> bool {
        self.client.auth().is_authenticated()
    }

    /// Fetch the authenticated user and refresh the cached copy
    pub async fn me(&self) -> Result<Principal> {
        let envelope: UserEnvelope = self.client.send_json(self.client.get("/auth/me")).await?;
        self.client.auth().store().set_user(&envelope.user)?;
        Ok(envelope.user)
    }

    /// Update profile fields and refresh the cached copy
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Principal> {
        let envelope: UserEnvelope = self
            .client
            .send_json(self.client.put("/auth/profile").json(update))
            .await?;
        self.client.auth().store().set_user(&envelope.user)?;
        Ok(envelope.user)
    }

    /// Change the account password
    pub async fn change_password(&self, change: &PasswordChange) -> Result<()> {
        self.client
            .send(self.client.put("/auth/password").json(change))
            .await?;
        Ok(())
    }
}
