use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use std::time::Duration;
use tokio::sync::Mutex;

use super::refresh::{self, RefreshError};
use super::types::{Principal, Session};
use crate::store::{SessionStore, StoreError};

type SharedRefresh = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

/// Authentication manager
/// Owns the session store and the single-flight refresh exchange
pub struct AuthManager {
    /// Persistent session store
    store: SessionStore,

    /// Dedicated HTTP client for the refresh exchange; refresh calls
    /// must never pass through the authenticated client themselves
    http: Client,

    /// Backend base URL, no trailing slash
    base_url: String,

    /// In-flight refresh exchange; concurrent authorization failures
    /// all await this same future instead of racing their own
    refresh_in_flight: Mutex<Option<SharedRefresh>>,
}

impl AuthManager {
    /// Create a new AuthManager around a session store
    pub fn new(store: SessionStore, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            store,
            http,
            base_url: base_url.into(),
            refresh_in_flight: Mutex::new(None),
        })
    }

    /// The underlying session store
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Current access token, if a session exists
    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.store.access_token()
    }

    /// True when an access token is present
    pub fn is_authenticated(&self) -> bool {
        matches!(self.store.access_token(), Ok(Some(_)))
    }

    /// Cached user record; None when absent or unreadable
    pub fn current_user(&self) -> Option<Principal> {
        self.store.user().ok().flatten()
    }

    /// Persist a freshly established session as a group write
    pub fn store_session(&self, session: &Session) -> Result<(), StoreError> {
        self.store.store_session(session)
    }

    /// Drop the session entirely
    pub fn clear_session(&self) -> Result<(), StoreError> {
        self.store.clear()
    }

    /// Run the refresh exchange and return the new access token
    ///
    /// Single-flight: if an exchange is already pending, the caller
    /// attaches to it instead of starting another. The new token is
    /// persisted (or the session cleared, on failure) inside the shared
    /// future, so those side effects happen exactly once no matter how
    /// many callers attached.
    pub async fn refresh_access_token(&self) -> Result<String, RefreshError> {
        let fut = {
            let mut slot = self.refresh_in_flight.lock().await;
            match slot.as_ref() {
                Some(pending) => {
                    tracing::debug!("Refresh already in flight, attaching to it");
                    pending.clone()
                }
                None => {
                    let fut = self.make_refresh_future();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        let result = fut.clone().await;

        // Retire the settled exchange so the next failure starts fresh.
        // A newer exchange may already occupy the slot; leave it alone.
        {
            let mut slot = self.refresh_in_flight.lock().await;
            if let Some(current) = slot.as_ref() {
                if Shared::ptr_eq(current, &fut) {
                    *slot = None;
                }
            }
        }

        result
    }

    fn make_refresh_future(&self) -> SharedRefresh {
        let store = self.store.clone();
        let http = self.http.clone();
        let base_url = self.base_url.clone();

        async move {
            let refresh_token = match store.refresh_token() {
                Ok(Some(token)) => token,
                Ok(None) => {
                    // Nothing to exchange; drop whatever partial state remains
                    if let Err(e) = store.clear() {
                        tracing::error!(error = %e, "Failed to clear session");
                    }
                    return Err(RefreshError::MissingToken);
                }
                Err(e) => return Err(RefreshError::Store(e.to_string())),
            };

            match refresh::exchange_refresh_token(&http, &base_url, &refresh_token).await {
                Ok(access_token) => {
                    store
                        .set_access_token(&access_token)
                        .map_err(|e| RefreshError::Store(e.to_string()))?;
                    tracing::info!("Access token refreshed");
                    Ok(access_token)
                }
                Err(e) => {
                    // An unusable refresh token means the session is over;
                    // clear it so the UI routes back to login.
                    tracing::warn!(error = %e, "Refresh exchange failed, clearing session");
                    if let Err(clear_err) = store.clear() {
                        tracing::error!(error = %clear_err, "Failed to clear session after refresh failure");
                    }
                    Err(e)
                }
            }
        }
        .boxed()
        .shared()
    }
}
