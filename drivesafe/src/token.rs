//! Bearer token persistence.

use std::sync::{PoisonError, RwLock};

/// Single-value store for the bearer token.
///
/// Implementations serialize their own access; callers on different threads
/// must observe a `save` from one thread in a later `get` on another.
/// Storage failures are the implementation's concern and are not reported.
pub trait TokenStore: Send + Sync {
    /// Replaces any previously saved token.
    fn save(&self, token: &str);

    /// The last saved token, or `None` if nothing was saved or it was cleared.
    fn get(&self) -> Option<String>;

    fn clear(&self);
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&self, token: &str) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
    }

    fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
