//! Bearer token cache.

use std::time::Duration;

use tokio::{sync::Mutex, time::Instant};

#[derive(Clone, Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Holds the current access token until shortly before it expires.
#[derive(Debug)]
pub(crate) struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
    safety_margin: Duration,
}

impl TokenCache {
    pub(crate) fn new(safety_margin: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            safety_margin,
        }
    }

    /// Returns the cached token, or fetches one with `login` and caches it.
    ///
    /// The mutex is held across the login so concurrent callers share a
    /// single request.
    pub(crate) async fn get_or_refresh<F, Fut, E>(&self, login: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(String, Duration), E>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(token) = slot.as_ref()
            && Instant::now() < token.expires_at
        {
            return Ok(token.value.clone());
        }

        let (value, lifetime) = login().await?;
        let usable = lifetime.saturating_sub(self.safety_margin);
        *slot = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + usable,
        });
        tracing::debug!(valid_for_secs = usable.as_secs(), "gateway token refreshed");
        Ok(value)
    }

    /// Drops the cached token, e.g. after the provider answered 401.
    pub(crate) async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn token_is_reused_until_margin() {
        let cache = TokenCache::new(Duration::from_secs(60));
        let counter = AtomicUsize::new(0);
        let logins = &counter;
        let login = move || async move {
            logins.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(("tok".to_string(), Duration::from_secs(300)))
        };

        assert_eq!(cache.get_or_refresh(login).await, Ok("tok".to_string()));
        assert_eq!(cache.get_or_refresh(login).await, Ok("tok".to_string()));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        cache.invalidate().await;
        cache.get_or_refresh(login).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn short_lived_token_is_not_cached() {
        let cache = TokenCache::new(Duration::from_secs(60));
        let counter = AtomicUsize::new(0);
        let logins = &counter;
        let login = move || async move {
            logins.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(("tok".to_string(), Duration::from_secs(30)))
        };

        cache.get_or_refresh(login).await.unwrap();
        cache.get_or_refresh(login).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn login_error_is_propagated_and_not_cached() {
        let cache = TokenCache::new(Duration::from_secs(60));
        let result = cache
            .get_or_refresh(|| async { Err::<(String, Duration), _>("denied") })
            .await;
        assert_eq!(result, Err("denied"));
        assert!(cache.slot.lock().await.is_none());
    }
}
