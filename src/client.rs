//! HTTP client for the tracking backend.
//!
//! Every request goes through [`ApiClient::send`], which:
//! 1. refuses to send when the stored token has expired (and signs out),
//! 2. attaches `Authorization: Bearer <token>` when signed in,
//! 3. maps the response status onto [`ApiError`].
//!
//! Server and transport details are logged, never returned, so the caller
//! only ever shows the fixed operator-facing messages.

use std::time::Duration;

use anyhow::Context;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};
use validator::Validate;

use floortrack_common::Credentials;

use crate::errors::ApiError;
use crate::session::{Session, is_expired};

/// Response of `POST /token`.
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[allow(dead_code)]
    token_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, session: Session) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("floortrack/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send an authenticated request and map failure statuses.
    async fn send(
        &self,
        method: Method,
        path: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response, ApiError> {
        let mut request = self.http.request(method.clone(), self.url(path));
        if let Some(token) = self.session.token()? {
            if is_expired(&token) {
                self.session.force_sign_out("token expired");
                return Err(ApiError::SessionExpired);
            }
            request = request.bearer_auth(token);
        }

        debug!(%method, path, "request");
        let response = build(request).send().await.map_err(|e| {
            error!(%method, path, error = %e, "request failed");
            ApiError::Unexpected
        })?;
        self.check_status(&method, path, response).await
    }

    async fn check_status(
        &self,
        method: &Method,
        path: &str,
        response: Response,
    ) -> Result<Response, ApiError> {
        let status = response.status();
        debug!(%method, path, status = status.as_u16(), "response");
        if status.is_success() {
            return Ok(response);
        }
        match status {
            StatusCode::UNAUTHORIZED => {
                self.session.force_sign_out("server rejected the token");
                Err(ApiError::Unauthorized)
            }
            StatusCode::TOO_MANY_REQUESTS => {
                warn!(%method, path, "rate limited");
                Err(ApiError::RateLimited)
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                error!(%method, path, status = status.as_u16(), body = %body, "request rejected");
                Err(ApiError::Unexpected)
            }
        }
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ApiError> {
        response.json::<T>().await.map_err(|e| {
            warn!(path, error = %e, "response did not match the expected shape");
            ApiError::invalid("body", format!("Unexpected response from {}", path))
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(Method::GET, path, |r| r).await?;
        Self::decode(path, response).await
    }

    /// GET and validate every field constraint of the decoded value.
    pub async fn get_validated<T: DeserializeOwned + Validate>(
        &self,
        path: &str,
    ) -> Result<T, ApiError> {
        let value: T = self.get(path).await?;
        value.validate().inspect_err(|e| {
            warn!(path, errors = %e, "response failed validation");
        })?;
        Ok(value)
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::POST, path, |r| r.json(body)).await?;
        Self::decode(path, response).await
    }

    /// POST with an empty JSON body and the arguments in the query string.
    pub async fn post_query<Q: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ApiError> {
        let response = self
            .send(Method::POST, path, |r| {
                r.query(query).json(&serde_json::json!({}))
            })
            .await?;
        Self::decode(path, response).await
    }

    /// POST whose response body is ignored.
    pub async fn post_discard<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        self.send(Method::POST, path, |r| r.json(body)).await?;
        Ok(())
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::PUT, path, |r| r.json(body)).await?;
        Self::decode(path, response).await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::PATCH, path, |r| r.json(body)).await?;
        Self::decode(path, response).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, |r| r).await?;
        Ok(())
    }

    /// Exchange credentials for a bearer token and store it.
    ///
    /// Sent without the stored token, so an expired session does not block
    /// signing in again.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<(), ApiError> {
        credentials.validate()?;

        let path = "/token";
        debug!(path, username = %credentials.username, "request");
        let response = self
            .http
            .post(self.url(path))
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                error!(path, error = %e, "sign-in request failed");
                ApiError::Unexpected
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                warn!(username = %credentials.username, "sign-in rejected");
                return Err(ApiError::InvalidCredentials);
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(ApiError::RateLimited),
            status if !status.is_success() => {
                error!(path, status = status.as_u16(), "sign-in failed");
                return Err(ApiError::Unexpected);
            }
            _ => {}
        }

        let body: TokenResponse = Self::decode(path, response).await?;
        let token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::invalid("access_token", "No token received"))?;
        self.session.set_token(&token)?;
        info!(username = %credentials.username, "Signed in");
        Ok(())
    }
}

/// Validate every element of a decoded list.
pub fn validate_all<T: Validate>(path: &str, items: &[T]) -> Result<(), ApiError> {
    for item in items {
        item.validate().inspect_err(|e| {
            warn!(path, errors = %e, "list entry failed validation");
        })?;
    }
    Ok(())
}
