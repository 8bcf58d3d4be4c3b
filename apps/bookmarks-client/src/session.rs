//! The authenticated context threaded through every client component.

use reqwest::StatusCode;

use bookmarks_common::CurrentUser;

use crate::error::{ErrorEnvelope, FetchError};

/// An established session: API location, bearer token and the user behind it.
#[derive(Debug, Clone)]
pub struct Session {
    http: reqwest::Client,
    base_url: String,
    token: String,
    user: CurrentUser,
}

impl Session {
    /// Look up the user behind `token`.
    ///
    /// Returns `Ok(None)` when the server does not recognise the session, so
    /// the caller can fall back to the signed-out view.
    pub async fn connect(base_url: &str, token: &str) -> Result<Option<Self>, FetchError> {
        let http = reqwest::Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();

        let resp = http
            .get(format!("{base_url}/api/v1/users/@me"))
            .bearer_auth(token)
            .send()
            .await?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => {
                tracing::debug!("session token rejected");
                return Ok(None);
            }
            status if !status.is_success() => {
                let detail = ErrorEnvelope::read(resp).await;
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    message: detail.message,
                });
            }
            _ => {}
        }

        let user: CurrentUser = resp.json().await?;
        tracing::debug!(user_id = %user.id, "session established");

        Ok(Some(Self {
            http,
            base_url,
            token: token.to_string(),
            user,
        }))
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    /// Absolute URL for an `/api/v1` path.
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    /// End the session on the server. The value is consumed either way.
    pub async fn sign_out(self) -> Result<(), FetchError> {
        let resp = self
            .http
            .post(self.api_url("/auth/logout"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let detail = ErrorEnvelope::read(resp).await;
            return Err(FetchError::Status {
                status,
                message: detail.message,
            });
        }
        tracing::debug!(user_id = %self.user.id, "signed out");
        Ok(())
    }
}
