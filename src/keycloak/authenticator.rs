//! Bearer authentication for admin API calls.

use reqwest::RequestBuilder;
use tracing::{debug, error};

use super::{Result, TokenProvider};

/// Attaches a freshly fetched service token to outbound requests.
///
/// A token is requested on every call and never cached. If the token fetch
/// fails the request is not sent and the fetch error is returned.
#[derive(Debug, Clone)]
pub struct RequestAuthenticator<T> {
    tokens: T,
}

impl<T: TokenProvider> RequestAuthenticator<T> {
    pub fn new(tokens: T) -> Self {
        Self { tokens }
    }

    /// Sets `Authorization: Bearer <token>` on `request`.
    pub async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.tokens.service_token().await.map_err(|e| {
            error!(error = %e, "Failed to obtain service token");
            e
        })?;

        debug!(token_length = token.access_token.len(), "Authorizing admin request");
        Ok(request.bearer_auth(token.access_token))
    }
}
