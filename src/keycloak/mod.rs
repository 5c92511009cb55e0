//! Keycloak integration.
//!
//! Clients for the two Keycloak surfaces this service talks to: the realm's
//! OpenID Connect token endpoint and the admin REST API used to create users.

pub mod admin;
pub mod authenticator;
pub mod token;

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

pub use admin::{
    AdminClient, CredentialRepresentation, RawResponse, UserDirectory, UserRepresentation,
};
pub use authenticator::RequestAuthenticator;
pub use token::{TokenClient, TokenProvider, TokenResponse};

/// Keycloak error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level failure talking to Keycloak
    #[error("Identity provider unreachable: {0}")]
    ProviderUnreachable(#[from] reqwest::Error),
    /// Token endpoint answered with a non-2xx status
    #[error("Authentication failed with status {status}: {body}")]
    AuthenticationFailed { status: u16, body: String },
    /// User creation answered with anything but 201
    #[error("Failed to create user: {body}")]
    RegistrationFailed { status: u16, body: String },
    /// Keycloak replied with a body we could not decode
    #[error("Invalid response from identity provider: {0}")]
    InvalidResponse(#[from] serde_json::Error),
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for Keycloak operations
pub type Result<T> = std::result::Result<T, Error>;

/// Keycloak connection settings.
///
/// Loaded once at startup and handed by value to each client.
#[derive(Clone, Deserialize)]
pub struct KeycloakConfig {
    /// Base URL of the Keycloak server, e.g. `https://sso.example.com`
    pub server_url: String,
    /// Realm users are created in and authenticate against
    pub realm: String,
    /// Confidential client used for both grants
    pub client_id: String,
    /// Secret of `client_id`
    pub client_secret: String,
}

impl KeycloakConfig {
    /// Name of the first field that is empty or only whitespace.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("server_url", &self.server_url),
            ("realm", &self.realm),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }

    /// Checks that every field is set.
    pub fn validate(&self) -> Result<()> {
        match self.missing_field() {
            Some(field) => Err(Error::ConfigError(format!("{} is required", field))),
            None => Ok(()),
        }
    }

    /// `{server}/realms/{realm}/protocol/openid-connect/token`
    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.base_url(),
            urlencoding::encode(&self.realm)
        )
    }

    /// `{server}/admin/realms/{realm}/users`
    pub fn users_endpoint(&self) -> String {
        format!(
            "{}/admin/realms/{}/users",
            self.base_url(),
            urlencoding::encode(&self.realm)
        )
    }

    fn base_url(&self) -> &str {
        self.server_url.trim().trim_end_matches('/')
    }
}

impl fmt::Debug for KeycloakConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeycloakConfig")
            .field("server_url", &self.server_url)
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Builds the HTTP client shared by the token and admin clients.
pub fn http_client(connect_timeout: Duration, timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(timeout)
        .build()
        .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))
}
