// Token refresh exchange

use reqwest::Client;
use thiserror::Error;

use super::types::RefreshResponse;

/// Failure modes of the refresh exchange
///
/// Clone + owned strings so every caller awaiting the shared exchange
/// can observe the same outcome.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RefreshError {
    /// No refresh token in the store; nothing to exchange
    #[error("no refresh token available")]
    MissingToken,

    /// The backend rejected the refresh token
    #[error("refresh rejected: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// Transport failure during the exchange
    #[error("refresh transport error: {0}")]
    Network(String),

    /// The session store failed while reading or writing tokens
    #[error("session store error during refresh: {0}")]
    Store(String),
}

/// Exchange a refresh token for a fresh access token
///
/// POSTs to /auth/refresh with the refresh token itself as the bearer
/// credential, per the backend contract.
pub async fn exchange_refresh_token(
    client: &Client,
    base_url: &str,
    refresh_token: &str,
) -> Result<String, RefreshError> {
    let url = format!("{}/auth/refresh", base_url);
    tracing::debug!(url = %url, "Exchanging refresh token");

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", refresh_token))
        .send()
        .await
        .map_err(|e| RefreshError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "Refresh exchange rejected");
        return Err(RefreshError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    let data: RefreshResponse = response
        .json()
        .await
        .map_err(|e| RefreshError::Network(e.to_string()))?;

    if data.access_token.is_empty() {
        return Err(RefreshError::Rejected {
            status: status.as_u16(),
            message: "refresh response did not contain an access token".to_string(),
        });
    }

    Ok(data.access_token)
}
