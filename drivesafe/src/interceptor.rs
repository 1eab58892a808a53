//! Attaches the stored bearer token to outgoing requests.

use crate::token::TokenStore;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Request;
use std::sync::Arc;

/// Formats an `Authorization` header value for `token`.
#[must_use]
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Request transform that reads the token store on every call.
///
/// The header value is never cached, so a token saved between two requests
/// is used by the second one. A request that already carries an
/// `Authorization` header is passed through untouched.
#[derive(Clone)]
pub struct AuthInterceptor {
    store: Arc<dyn TokenStore>,
}

impl AuthInterceptor {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Returns `request` with `Authorization: Bearer <token>` attached when
    /// the store holds a non-empty token, otherwise unchanged.
    #[must_use]
    pub fn apply(&self, mut request: Request) -> Request {
        if request.headers().contains_key(AUTHORIZATION) {
            return request;
        }
        let Some(token) = self.store.get().filter(|token| !token.is_empty()) else {
            return request;
        };
        match HeaderValue::from_str(&bearer(&token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::warn!("stored token is not a valid header value; sending without it");
            }
        }
        request
    }
}

impl std::fmt::Debug for AuthInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthInterceptor").finish_non_exhaustive()
    }
}
