//! OpenID Connect token endpoint client.
//!
//! Exchanges form-encoded grants for access tokens. Two grants are used:
//! `client_credentials` for the service's own admin calls and `password` for
//! end users logging in.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, error, warn};

use super::{Error, KeycloakConfig, Result};

/// Token endpoint response.
///
/// Keycloak sends more fields (refresh token, scope, ...); only these are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds, kept as text. Keycloak sends a number.
    #[serde(deserialize_with = "string_or_number")]
    pub expires_in: String,
    pub token_type: String,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

/// Source of access tokens.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Token for the service itself (`client_credentials` grant).
    async fn service_token(&self) -> Result<TokenResponse>;

    /// Token for an end user (`password` grant).
    async fn user_token(&self, username: &str, password: &str) -> Result<TokenResponse>;
}

/// Form body for the `client_credentials` grant.
pub fn client_credentials_form(config: &KeycloakConfig) -> Vec<(&'static str, String)> {
    vec![
        ("client_id", config.client_id.clone()),
        ("client_secret", config.client_secret.clone()),
        ("grant_type", "client_credentials".to_string()),
    ]
}

/// Form body for the `password` grant.
pub fn password_form(
    config: &KeycloakConfig,
    username: &str,
    password: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("username", username.to_string()),
        ("password", password.to_string()),
        ("grant_type", "password".to_string()),
        ("client_id", config.client_id.clone()),
        ("client_secret", config.client_secret.clone()),
    ]
}

/// Client for the realm's token endpoint
#[derive(Debug, Clone)]
pub struct TokenClient {
    client: Client,
    config: KeycloakConfig,
    token_url: String,
}

impl TokenClient {
    /// Creates a new token client, rejecting incomplete configuration.
    pub fn new(client: Client, config: KeycloakConfig) -> Result<Self> {
        config.validate()?;
        let token_url = config.token_endpoint();

        debug!(
            url = %token_url,
            client_id = %config.client_id,
            "Creating token client"
        );

        Ok(Self {
            client,
            config,
            token_url,
        })
    }

    /// Posts `form` to the token endpoint.
    ///
    /// Any non-2xx reply becomes [`Error::AuthenticationFailed`] carrying the
    /// status and Keycloak's body untouched.
    pub async fn fetch_token(&self, form: &[(&'static str, String)]) -> Result<TokenResponse> {
        let grant_type = form
            .iter()
            .find(|(key, _)| *key == "grant_type")
            .map(|(_, value)| value.as_str())
            .unwrap_or("unknown");

        debug!(url = %self.token_url, grant_type, "Requesting access token");

        let response = self
            .client
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, grant_type, "Failed to send token request");
                Error::ProviderUnreachable(e)
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = %status, grant_type, "Token request rejected");
            return Err(Error::AuthenticationFailed {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "Failed to parse token response");
            Error::InvalidResponse(e)
        })?;

        debug!(
            grant_type,
            token_length = token.access_token.len(),
            "Obtained access token"
        );
        Ok(token)
    }
}

#[async_trait]
impl TokenProvider for TokenClient {
    async fn service_token(&self) -> Result<TokenResponse> {
        self.fetch_token(&client_credentials_form(&self.config)).await
    }

    async fn user_token(&self, username: &str, password: &str) -> Result<TokenResponse> {
        self.fetch_token(&password_form(&self.config, username, password))
            .await
    }
}
