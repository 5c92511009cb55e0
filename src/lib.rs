//! Keycloak Registration Service Library
//!
//! Registers users and logs them in by delegating to Keycloak. User creation
//! goes through the admin REST API using a service token obtained with the
//! client credentials grant; login is a password grant against the realm's
//! token endpoint.
//!
//! # Modules
//! - `keycloak`: token endpoint and admin API clients
//! - `service`: registration and login orchestration
//! - `api`: HTTP routes
//! - `config`: Configuration management
//! - `models`: inbound request payloads
//!
//! # Example
//! ```no_run
//! use keycloak_registration::{build_service, config::Config};
//!
//! async fn login_alice() {
//!     let config = Config::new().expect("Failed to load configuration");
//!     let service = build_service(&config).expect("Failed to create clients");
//!     let token = service.login("alice", "p1").await.expect("Login failed");
//!     println!("{}", token.token_type);
//! }
//! ```
//!
//! # License
//! Licensed under the AGPLv3 license.

pub mod api;
pub mod config;
pub mod keycloak;
pub mod models;
pub mod service;

use crate::config::Config;
use crate::keycloak::{AdminClient, RequestAuthenticator, TokenClient};
use crate::service::AuthService;

/// Service wired to the real Keycloak clients
pub type KeycloakAuthService = AuthService<AdminClient<TokenClient>, TokenClient>;

/// Wires the Keycloak clients behind an [`AuthService`].
///
/// The token client is shared between login and the admin request
/// authenticator; both use one connection pool.
pub fn build_service(config: &Config) -> keycloak::Result<KeycloakAuthService> {
    let http = keycloak::http_client(config.http.connect_timeout(), config.http.timeout())?;
    let tokens = TokenClient::new(http.clone(), config.keycloak.clone())?;
    let admin = AdminClient::new(
        http,
        config.keycloak.clone(),
        RequestAuthenticator::new(tokens.clone()),
    );

    Ok(AuthService::new(admin, tokens))
}
