//! Cached construction of API clients keyed by base URL.

use crate::interceptor::AuthInterceptor;
use crate::token::TokenStore;
use crate::{DriveSafeClient, Error};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Appends `/` to `url` unless it already ends with one.
#[must_use]
pub fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Transport settings baked into every client the factory builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportPolicy {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// reqwest has no per-write timeout. This budget is added to
    /// `read_timeout` and the sum caps the whole request, see
    /// [`TransportPolicy::request_deadline`].
    pub write_timeout: Duration,
    /// Log request and response bodies at `debug`
    pub log_bodies: bool,
}

impl Default for TransportPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            read_timeout: Duration::from_secs(20),
            write_timeout: Duration::from_secs(20),
            log_bodies: true,
        }
    }
}

impl TransportPolicy {
    /// Sets whether bodies are logged.
    #[must_use]
    pub const fn with_log_bodies(mut self, log_bodies: bool) -> Self {
        self.log_bodies = log_bodies;
        self
    }

    /// Total time allowed for one request, from connect to the last body byte.
    ///
    /// This is stricter than a pure per-read policy: a slow response that
    /// keeps making progress still fails once the deadline passes.
    #[must_use]
    pub fn request_deadline(&self) -> Duration {
        self.read_timeout + self.write_timeout
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client, Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout)
            .timeout(self.request_deadline())
            .build()?;
        Ok(client)
    }
}

/// Which of the two cached clients to hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientKind {
    /// Sends requests as built
    Plain,
    /// Runs every request through an [`AuthInterceptor`] over the factory's
    /// token store
    Authenticated,
}

#[derive(Debug)]
struct Slot {
    base_url: String,
    client: Arc<DriveSafeClient>,
}

/// Owns at most one live client per [`ClientKind`].
///
/// A slot is rebuilt only when the requested base URL differs from the one it
/// was built for (exact string comparison). The check, build and store happen
/// under the slot's lock, so concurrent first use builds a single client.
pub struct ClientFactory {
    token_store: Arc<dyn TokenStore>,
    policy: TransportPolicy,
    plain: Mutex<Option<Slot>>,
    authenticated: Mutex<Option<Slot>>,
}

impl ClientFactory {
    #[must_use]
    pub fn new(token_store: Arc<dyn TokenStore>) -> Self {
        Self {
            token_store,
            policy: TransportPolicy::default(),
            plain: Mutex::new(None),
            authenticated: Mutex::new(None),
        }
    }

    /// Replaces the transport policy for clients built from now on.
    #[must_use]
    pub const fn with_policy(mut self, policy: TransportPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.token_store
    }

    /// Returns the cached client of `kind` for `base_url`, building it first
    /// if the slot is empty or was built for another URL.
    ///
    /// # Errors
    /// Returns an error if the base URL cannot be parsed or the HTTP client
    /// cannot be constructed. The slot keeps its previous client in that case.
    pub fn client(&self, base_url: &str, kind: ClientKind) -> Result<Arc<DriveSafeClient>, Error> {
        let slot = match kind {
            ClientKind::Plain => &self.plain,
            ClientKind::Authenticated => &self.authenticated,
        };
        let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = slot.as_ref().filter(|cached| cached.base_url == base_url) {
            return Ok(Arc::clone(&cached.client));
        }

        tracing::debug!(
            ?kind,
            base_url,
            previous = slot.as_ref().map(|cached| cached.base_url.as_str()),
            "building API client"
        );
        let interceptor = match kind {
            ClientKind::Plain => None,
            ClientKind::Authenticated => Some(AuthInterceptor::new(Arc::clone(&self.token_store))),
        };
        let client = Arc::new(DriveSafeClient::build(base_url, &self.policy, interceptor)?);
        *slot = Some(Slot {
            base_url: base_url.to_string(),
            client: Arc::clone(&client),
        });
        Ok(client)
    }

    /// Shorthand for [`ClientKind::Plain`].
    ///
    /// # Errors
    /// See [`ClientFactory::client`].
    pub fn plain(&self, base_url: &str) -> Result<Arc<DriveSafeClient>, Error> {
        self.client(base_url, ClientKind::Plain)
    }

    /// Shorthand for [`ClientKind::Authenticated`].
    ///
    /// # Errors
    /// See [`ClientFactory::client`].
    pub fn authenticated(&self, base_url: &str) -> Result<Arc<DriveSafeClient>, Error> {
        self.client(base_url, ClientKind::Authenticated)
    }
}

impl std::fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFactory")
            .field("policy", &self.policy)
            .field("plain", &self.plain)
            .field("authenticated", &self.authenticated)
            .finish_non_exhaustive()
    }
}
