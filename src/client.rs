// Authenticated request coordinator
//
// Wraps reqwest with bearer credential attachment, 401 detection, a
// single-flight refresh exchange, and a one-shot replay of the failed
// request. Callers never handle tokens themselves.

use anyhow::Result;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthManager, RefreshError};
use crate::error::ApiError;

/// HTTP client for the Scribe backend
#[derive(Clone)]
pub struct ScribeClient {
    /// Shared HTTP client with connection pooling
    http: Client,

    /// Authentication manager
    auth: Arc<AuthManager>,

    /// Backend base URL, no trailing slash
    base_url: String,
}

impl ScribeClient {
    /// Create a new client
    pub fn new(
        auth: Arc<AuthManager>,
        base_url: impl Into<String>,
        connect_timeout: u64,
        request_timeout: u64,
    ) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http,
            auth,
            base_url: base_url.into(),
        })
    }

    /// The authentication manager behind this client
    pub fn auth(&self) -> &Arc<AuthManager> {
        &self.auth
    }

    /// Build a request for `path` relative to the base URL
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http.request(method, url)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.request(Method::PUT, path)
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.request(Method::DELETE, path)
    }

    /// Send a request with the bearer credential attached
    ///
    /// A 401 response triggers one refresh exchange (shared with any
    /// other request failing at the same time) followed by one replay
    /// with the new token. The replay's outcome is returned as-is; a
    /// second 401 surfaces as a plain backend error rather than another
    /// refresh. Non-401 failures pass through untouched.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

        let mut request = builder.build().map_err(ApiError::Network)?;
        if let Some(token) = self.auth.access_token()? {
            request.headers_mut().insert(AUTHORIZATION, bearer(&token)?);
        }

        // Clone up front so the request can be replayed after a refresh
        let replay = request
            .try_clone()
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Request body is not cloneable")))?;

        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(
            request_id = %request_id,
            method = %method,
            url = %url,
            "Sending HTTP request"
        );

        let response = self.http.execute(request).await.map_err(log_transport_error)?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return finalize(response).await;
        }

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            url = %url,
            "Received 401, refreshing credential"
        );

        let token = match self.auth.refresh_access_token().await {
            Ok(token) => token,
            Err(RefreshError::MissingToken) => {
                return Err(ApiError::Unauthenticated(
                    "request was rejected and no refresh token is available".to_string(),
                ));
            }
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Session refresh failed");
                return Err(ApiError::SessionExpired);
            }
        };

        let mut replay = replay;
        replay.headers_mut().insert(AUTHORIZATION, bearer(&token)?);

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            url = %url,
            "Replaying request with refreshed credential"
        );

        let response = self.http.execute(replay).await.map_err(log_transport_error)?;
        finalize(response).await
    }

    /// Send a request and decode the JSON response body
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        response.json().await.map_err(|e| {
            ApiError::Internal(anyhow::anyhow!("Failed to parse response body: {}", e))
        })
    }
}

/// Convert any non-success response into a Backend error
async fn finalize(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = parse_error_message(&body);
    tracing::warn!(
        status = status.as_u16(),
        message = %message,
        "Backend returned an error response"
    );
    Err(ApiError::Backend {
        status: status.as_u16(),
        message,
    })
}

/// Backend failures arrive as `{"error": "..."}`; fall back to the raw body
fn parse_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

fn bearer(token: &str) -> Result<HeaderValue, ApiError> {
    format!("Bearer {}", token)
        .parse()
        .map_err(|_| ApiError::Internal(anyhow::anyhow!("Token is not a valid header value")))
}

fn log_transport_error(e: reqwest::Error) -> ApiError {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    };

    tracing::warn!(error_kind = error_kind, error = %e, "HTTP transport error");
    ApiError::Network(e)
}
