//! Registration and login orchestration.
//!
//! # Flow
//! 1. `register` creates the user through the admin API
//! 2. Anything other than 201 aborts with the provider's body
//! 3. The new user is logged in with the password they registered with
//!
//! There is no rollback: if the login in step 3 fails the account stays
//! created in Keycloak.

use tracing::{info, warn};

use crate::keycloak::{Error, Result, TokenProvider, TokenResponse, UserDirectory};
use crate::models::UserRegistration;

/// Registration and login on top of Keycloak
#[derive(Debug)]
pub struct AuthService<D, T> {
    directory: D,
    tokens: T,
}

impl<D, T> AuthService<D, T>
where
    D: UserDirectory,
    T: TokenProvider,
{
    pub fn new(directory: D, tokens: T) -> Self {
        Self { directory, tokens }
    }

    /// Creates the account and returns a token for it.
    pub async fn register(&self, registration: &UserRegistration) -> Result<TokenResponse> {
        info!(username = %registration.username, "Registering user");

        let response = self
            .directory
            .create_user(&registration.to_representation())
            .await?;

        if !response.is_created() {
            warn!(
                username = %registration.username,
                status = response.status,
                "Keycloak refused to create user"
            );
            return Err(Error::RegistrationFailed {
                status: response.status,
                body: response.body,
            });
        }

        match response.created_id() {
            Some(user_id) => info!(
                username = %registration.username,
                user_id,
                "User created"
            ),
            None => warn!(
                username = %registration.username,
                "User created but Keycloak sent no Location header"
            ),
        }

        self.login(&registration.username, &registration.password)
            .await
    }

    /// Exchanges the user's credentials for a token.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse> {
        info!(username = %username, "Logging in user");
        self.tokens.user_token(username, password).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keycloak::admin::MockUserDirectory;
    use crate::keycloak::token::MockTokenProvider;
    use crate::keycloak::RawResponse;
    use mockall::Sequence;
    use tracing_test::traced_test;

    fn alice() -> UserRegistration {
        UserRegistration {
            username: "alice".into(),
            email: "a@x.com".into(),
            first_name: "A".into(),
            last_name: "L".into(),
            password: "p1".into(),
        }
    }

    fn tok1() -> TokenResponse {
        TokenResponse {
            access_token: "tok1".into(),
            expires_in: "300".into(),
            token_type: "Bearer".into(),
        }
    }

    #[traced_test]
    #[tokio::test]
    async fn register_creates_then_logs_in() {
        let mut seq = Sequence::new();
        let mut directory = MockUserDirectory::new();
        let mut tokens = MockTokenProvider::new();

        directory
            .expect_create_user()
            .withf(|user| {
                user.username == "alice"
                    && user.email == "a@x.com"
                    && user.first_name == "A"
                    && user.last_name == "L"
                    && user.credentials[0].value == "p1"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(RawResponse {
                    status: 201,
                    location: Some("http://kc/admin/realms/r/users/abc-123".into()),
                    body: String::new(),
                })
            });
        tokens
            .expect_user_token()
            .withf(|username, password| username == "alice" && password == "p1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(tok1()));
        tokens.expect_service_token().never();

        let service = AuthService::new(directory, tokens);
        let token = service.register(&alice()).await.unwrap();

        assert_eq!(token, tok1());
        assert!(logs_contain("abc-123"));
    }

    #[tokio::test]
    async fn register_conflict_skips_login() {
        let mut directory = MockUserDirectory::new();
        let mut tokens = MockTokenProvider::new();

        directory.expect_create_user().times(1).returning(|_| {
            Ok(RawResponse {
                status: 409,
                location: None,
                body: r#"{"errorMessage":"User exists"}"#.into(),
            })
        });
        tokens.expect_user_token().never();

        let service = AuthService::new(directory, tokens);
        let err = service.register(&alice()).await.unwrap_err();

        match err {
            Error::RegistrationFailed { status, body } => {
                assert_eq!(status, 409);
                assert_eq!(body, r#"{"errorMessage":"User exists"}"#);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[traced_test]
    #[tokio::test]
    async fn register_without_location_still_logs_in() {
        let mut directory = MockUserDirectory::new();
        let mut tokens = MockTokenProvider::new();

        directory.expect_create_user().times(1).returning(|_| {
            Ok(RawResponse {
                status: 201,
                location: None,
                body: String::new(),
            })
        });
        tokens
            .expect_user_token()
            .times(1)
            .returning(|_, _| Ok(tok1()));

        let service = AuthService::new(directory, tokens);

        assert_eq!(service.register(&alice()).await.unwrap(), tok1());
        assert!(logs_contain("no Location header"));
    }

    #[tokio::test]
    async fn register_keeps_user_when_login_fails() {
        let mut directory = MockUserDirectory::new();
        let mut tokens = MockTokenProvider::new();

        directory.expect_create_user().times(1).returning(|_| {
            Ok(RawResponse {
                status: 201,
                location: Some("http://kc/admin/realms/r/users/abc-123".into()),
                body: String::new(),
            })
        });
        tokens.expect_user_token().times(1).returning(|_, _| {
            Err(Error::AuthenticationFailed {
                status: 400,
                body: r#"{"error":"invalid_grant"}"#.into(),
            })
        });

        let service = AuthService::new(directory, tokens);
        let err = service.register(&alice()).await.unwrap_err();

        assert!(matches!(err, Error::AuthenticationFailed { status: 400, .. }));
    }

    #[tokio::test]
    async fn register_propagates_directory_error() {
        let mut directory = MockUserDirectory::new();
        let mut tokens = MockTokenProvider::new();

        directory.expect_create_user().times(1).returning(|_| {
            Err(Error::AuthenticationFailed {
                status: 401,
                body: "unauthorized_client".into(),
            })
        });
        tokens.expect_user_token().never();

        let service = AuthService::new(directory, tokens);

        assert!(service.register(&alice()).await.is_err());
    }

    #[tokio::test]
    async fn login_surfaces_rejection() {
        let directory = MockUserDirectory::new();
        let mut tokens = MockTokenProvider::new();

        tokens
            .expect_user_token()
            .withf(|username, password| username == "alice" && password == "wrong")
            .times(1)
            .returning(|_, _| {
                Err(Error::AuthenticationFailed {
                    status: 401,
                    body: r#"{"error":"invalid_grant"}"#.into(),
                })
            });

        let service = AuthService::new(directory, tokens);
        let result = service.login("alice", "wrong").await;

        assert!(matches!(
            result,
            Err(Error::AuthenticationFailed { status: 401, .. })
        ));
    }
}
