//! Keycloak admin REST API client.

use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{Error, KeycloakConfig, RequestAuthenticator, Result, TokenProvider};

/// User payload accepted by `POST /admin/realms/{realm}/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRepresentation {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub enabled: bool,
    pub email_verified: bool,
    pub credentials: Vec<CredentialRepresentation>,
}

/// Credential attached to a new user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRepresentation {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub temporary: bool,
}

impl CredentialRepresentation {
    /// Non-temporary password credential.
    pub fn password(value: impl Into<String>) -> Self {
        Self {
            kind: "password".to_string(),
            value: value.into(),
            temporary: false,
        }
    }
}

/// Unvalidated admin API reply. The caller decides what the status means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// `Location` header, if Keycloak sent one
    pub location: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn is_created(&self) -> bool {
        self.status == 201
    }

    /// Last path segment of `Location`, which Keycloak sets to the new user's id.
    pub fn created_id(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(|location| location.trim_end_matches('/'))
            .and_then(|location| location.rsplit('/').next())
            .filter(|id| !id.is_empty())
    }
}

/// User management operations on the identity provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Creates `user`. Non-2xx statuses are returned, not raised.
    async fn create_user(&self, user: &UserRepresentation) -> Result<RawResponse>;
}

/// Admin API client. Every request passes through the authenticator.
#[derive(Debug, Clone)]
pub struct AdminClient<T> {
    client: Client,
    users_url: String,
    authenticator: RequestAuthenticator<T>,
}

impl<T: TokenProvider> AdminClient<T> {
    pub fn new(
        client: Client,
        config: KeycloakConfig,
        authenticator: RequestAuthenticator<T>,
    ) -> Self {
        Self {
            client,
            users_url: config.users_endpoint(),
            authenticator,
        }
    }
}

#[async_trait]
impl<T: TokenProvider> UserDirectory for AdminClient<T> {
    async fn create_user(&self, user: &UserRepresentation) -> Result<RawResponse> {
        info!(username = %user.username, "Creating user in Keycloak");

        let request = self.client.post(&self.users_url).json(user);
        let request = self.authenticator.authorize(request).await?;

        let response = request.send().await.map_err(|e| {
            error!(error = %e, url = %self.users_url, "Failed to send create user request");
            Error::ProviderUnreachable(e)
        })?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await?;

        debug!(status, location = ?location, "Create user response received");

        Ok(RawResponse {
            status,
            location,
            body,
        })
    }
}
