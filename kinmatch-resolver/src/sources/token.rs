//! Cached provider access tokens

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Tokens are treated as expired this long before their real expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Provider-local token cache with expiry and explicit invalidation
#[derive(Debug, Default)]
pub struct TokenCache {
    state: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token if one is cached and not about to expire
    pub async fn get(&self) -> Option<String> {
        let state = self.state.lock().await;
        state
            .as_ref()
            .filter(|t| Instant::now() < t.expires_at)
            .map(|t| t.value.clone())
    }

    /// Cache a token valid for `ttl`
    pub async fn store(&self, value: String, ttl: Duration) {
        let expires_at = Instant::now() + ttl.saturating_sub(EXPIRY_MARGIN);
        *self.state.lock().await = Some(CachedToken { value, expires_at });
    }

    /// Drop the cached token (e.g. after a 401)
    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_invalidate() {
        let cache = TokenCache::new();
        assert!(cache.get().await.is_none());

        cache.store("abc".to_string(), Duration::from_secs(3600)).await;
        assert_eq!(cache.get().await.as_deref(), Some("abc"));

        cache.invalidate().await;
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn test_short_lived_token_is_expired() {
        let cache = TokenCache::new();
        cache.store("abc".to_string(), Duration::from_secs(30)).await;
        assert!(cache.get().await.is_none());
    }
}
