//! HTTP API.
//!
//! `POST /auth/register`, `POST /auth/login` and `GET /health`, all JSON.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::{error, warn};

use crate::keycloak::{Error, TokenProvider, TokenResponse, UserDirectory};
use crate::models::{LoginRequest, UserRegistration};
use crate::service::AuthService;

/// Builds the router for `service`.
pub fn router<D, T>(service: Arc<AuthService<D, T>>) -> Router
where
    D: UserDirectory + 'static,
    T: TokenProvider + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register::<D, T>))
        .route("/auth/login", post(login::<D, T>))
        .with_state(service)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn register<D, T>(
    State(service): State<Arc<AuthService<D, T>>>,
    Json(registration): Json<UserRegistration>,
) -> Result<(StatusCode, Json<TokenResponse>), Error>
where
    D: UserDirectory + 'static,
    T: TokenProvider + 'static,
{
    let token = service.register(&registration).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

async fn login<D, T>(
    State(service): State<Arc<AuthService<D, T>>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, Error>
where
    D: UserDirectory + 'static,
    T: TokenProvider + 'static,
{
    let token = service.login(&request.username, &request.password).await?;
    Ok(Json(token))
}

/// Maps Keycloak failures to HTTP statuses
impl From<&Error> for StatusCode {
    fn from(error: &Error) -> Self {
        match error {
            Error::RegistrationFailed { status, .. } => {
                client_error(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Error::AuthenticationFailed { status: 400 | 401, .. } => StatusCode::UNAUTHORIZED,
            Error::AuthenticationFailed { status, .. } => {
                client_error(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Error::ProviderUnreachable(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Error::ProviderUnreachable(_) | Error::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            Error::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn client_error(status: u16) -> Option<StatusCode> {
    StatusCode::from_u16(status)
        .ok()
        .filter(StatusCode::is_client_error)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        let kind = match &self {
            Error::ProviderUnreachable(_) => "provider_unreachable",
            Error::AuthenticationFailed { .. } => "authentication_failed",
            Error::RegistrationFailed { .. } => "registration_failed",
            Error::InvalidResponse(_) => "invalid_provider_response",
            Error::ConfigError(_) => "configuration_error",
        };

        if status.is_client_error() {
            warn!(status = %status, error = %self, "Request rejected");
        } else {
            error!(status = %status, error = %self, "Request failed");
        }

        (
            status,
            Json(json!({ "error": kind, "message": self.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn registration_conflict_keeps_status() {
        let error = Error::RegistrationFailed {
            status: 409,
            body: r#"{"errorMessage":"User exists"}"#.into(),
        };
        assert_eq!(StatusCode::from(&error), StatusCode::CONFLICT);
    }

    #[test]
    fn provider_server_errors_become_bad_gateway() {
        let registration = Error::RegistrationFailed {
            status: 500,
            body: String::new(),
        };
        let token = Error::AuthenticationFailed {
            status: 503,
            body: String::new(),
        };

        assert_eq!(StatusCode::from(&registration), StatusCode::BAD_GATEWAY);
        assert_eq!(StatusCode::from(&token), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn rejected_credentials_are_unauthorized() {
        for status in [400, 401] {
            let error = Error::AuthenticationFailed {
                status,
                body: String::new(),
            };
            assert_eq!(StatusCode::from(&error), StatusCode::UNAUTHORIZED);
        }

        let forbidden = Error::AuthenticationFailed {
            status: 403,
            body: String::new(),
        };
        assert_eq!(StatusCode::from(&forbidden), StatusCode::FORBIDDEN);
    }

    #[traced_test]
    #[test]
    fn client_errors_log_at_warn() {
        let response = Error::RegistrationFailed {
            status: 409,
            body: "exists".into(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(logs_contain("WARN"));
        assert!(logs_contain("Request rejected"));
        assert!(!logs_contain("Request failed"));
    }

    #[traced_test]
    #[test]
    fn gateway_errors_log_at_error() {
        let response = Error::AuthenticationFailed {
            status: 503,
            body: String::new(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(logs_contain("ERROR"));
        assert!(logs_contain("Request failed"));
        assert!(!logs_contain("Request rejected"));
    }
}
