//! Client-credentials token acquisition against the identity provider.
//!
//! One form-encoded POST per call to `{authority}/{tenant}/oauth2/v2.0/token`.
//! Tokens are returned to the caller and never cached.

use std::fmt;

use serde::Deserialize;
use zeroize::Zeroizing;

use crate::config::Credentials;
use crate::errors::{AppError, Stage};
use crate::upstream::UpstreamBody;

/// Opaque bearer token; lives for a single request.
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn secret(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Subset of the token endpoint response we read.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Clone)]
pub struct TokenAcquirer {
    client: reqwest::Client,
    authority_host: String,
}

impl TokenAcquirer {
    pub fn new(client: reqwest::Client, authority_host: impl Into<String>) -> Self {
        Self {
            client,
            authority_host: authority_host.into().trim_end_matches('/').to_string(),
        }
    }

    /// Exchange `credentials` for a bearer token valid for `scope`.
    #[tracing::instrument(skip_all, fields(tenant = %credentials.tenant_id, client_id = %credentials.client_id))]
    pub async fn acquire(
        &self,
        credentials: &Credentials,
        scope: &str,
    ) -> Result<AccessToken, AppError> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host, credentials.tenant_id
        );
        let params = [
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("scope", scope),
        ];

        let resp = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("token request failed: {}", e);
                AppError::transport(Stage::Identity, e)
            })?;

        let body = UpstreamBody::read(Stage::Identity, resp).await?;
        if !body.is_success() {
            return Err(AppError::Authentication {
                status: body.status,
                body: body.text,
            });
        }

        let token: TokenResponse = body.json(Stage::Identity)?;
        if token.access_token.trim().is_empty() {
            return Err(AppError::Serialization {
                stage: Stage::Identity,
                source: <serde_json::Error as serde::de::Error>::custom("access_token is empty"),
            });
        }
        tracing::debug!(
            token_type = token.token_type.as_deref().unwrap_or("Bearer"),
            expires_in = token.expires_in,
            "acquired access token"
        );
        Ok(AccessToken::new(token.access_token))
    }
}
