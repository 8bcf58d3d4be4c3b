//! Authorization-code exchange against the external OpenID Connect provider.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::OidcConfig;
use crate::error::ApiError;

/// Identity established by a successful code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityClaims {
    /// The provider's stable subject identifier.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// The identity provider seen from this service: where to send the browser,
/// and how to turn the one-time code it sends back into an identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL of the provider's login page for the given callback.
    fn authorize_url(&self, redirect_uri: &str) -> Result<String, ApiError>;

    /// Exchange a one-time authorization code for the user's identity.
    async fn exchange_code(&self, code: &str, redirect_uri: &str)
        -> Result<IdentityClaims, ApiError>;
}

/// Standard OIDC provider reached over HTTP.
pub struct OidcProvider {
    config: OidcConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl OidcProvider {
    pub fn new(config: OidcConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl IdentityProvider for OidcProvider {
    fn authorize_url(&self, redirect_uri: &str) -> Result<String, ApiError> {
        let url = reqwest::Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", "openid email profile"),
            ],
        )
        .map_err(|e| {
            tracing::error!(?e, url = %self.config.authorize_url, "invalid authorize URL");
            ApiError::internal("Identity provider is misconfigured")
        })?;
        Ok(url.into())
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<IdentityClaims, ApiError> {
        let token: TokenResponse = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::warn!(?e, "authorization code exchange failed");
                ApiError::bad_gateway("Code exchange failed")
            })?
            .json()
            .await
            .map_err(|e| {
                tracing::warn!(?e, "token response parse failed");
                ApiError::bad_gateway("Invalid token response")
            })?;

        let claims: IdentityClaims = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::warn!(?e, "userinfo request failed");
                ApiError::bad_gateway("Userinfo request failed")
            })?
            .json()
            .await
            .map_err(|e| {
                tracing::warn!(?e, "userinfo parse failed");
                ApiError::bad_gateway("Invalid userinfo response")
            })?;

        tracing::debug!(sub = %claims.sub, issuer = %self.config.issuer_url, "identity established");

        Ok(claims)
    }
}
