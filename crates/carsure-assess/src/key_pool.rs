//! Round-robin rotation over the configured LLM API keys.
//!
//! A key that hits a quota error is benched for a cooldown period; the pool
//! skips benched keys until the cooldown lapses. All state sits behind one
//! mutex, so concurrent requests never observe a torn rotation index.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeasedKey {
    pub index: usize,
    pub key: String,
}

#[derive(Debug)]
struct PoolState {
    next: usize,
    cooling_until: Vec<Option<Instant>>,
}

#[derive(Debug)]
pub struct ApiKeyPool {
    keys: Vec<String>,
    cooldown: Duration,
    state: Mutex<PoolState>,
}

impl ApiKeyPool {
    #[must_use]
    pub fn new(keys: Vec<String>) -> Self {
        Self::with_cooldown(keys, DEFAULT_COOLDOWN)
    }

    #[must_use]
    pub fn with_cooldown(keys: Vec<String>, cooldown: Duration) -> Self {
        let state = PoolState {
            next: 0,
            cooling_until: vec![None; keys.len()],
        };
        Self {
            keys,
            cooldown,
            state: Mutex::new(state),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Next key in rotation that is not cooling down, or `None` if every key
    /// is benched.
    pub async fn next_key(&self) -> Option<LeasedKey> {
        if self.keys.is_empty() {
            return None;
        }
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let total = self.keys.len();

        for offset in 0..total {
            let index = (state.next + offset) % total;
            let available = match state.cooling_until[index] {
                Some(until) if until > now => false,
                Some(_) => {
                    state.cooling_until[index] = None;
                    true
                }
                None => true,
            };
            if available {
                state.next = (index + 1) % total;
                tracing::debug!(key_index = index, "leased API key");
                return Some(LeasedKey {
                    index,
                    key: self.keys[index].clone(),
                });
            }
        }

        tracing::warn!(keys = total, "all API keys are cooling down");
        None
    }

    pub async fn mark_quota_exceeded(&self, index: usize) {
        let mut state = self.state.lock().await;
        if let Some(slot) = state.cooling_until.get_mut(index) {
            *slot = Some(Instant::now() + self.cooldown);
            tracing::warn!(
                key_index = index,
                cooldown_secs = self.cooldown.as_secs(),
                "API key hit its quota; cooling down"
            );
        }
    }

    pub async fn mark_success(&self, index: usize) {
        let mut state = self.state.lock().await;
        if let Some(slot) = state.cooling_until.get_mut(index) {
            *slot = None;
        }
    }

    /// Number of keys not currently cooling down.
    pub async fn available(&self) -> usize {
        let state = self.state.lock().await;
        let now = Instant::now();
        state
            .cooling_until
            .iter()
            .filter(|until| until.is_none_or(|t| t <= now))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(keys: &[&str]) -> ApiKeyPool {
        ApiKeyPool::new(keys.iter().map(|k| (*k).to_string()).collect())
    }

    #[tokio::test]
    async fn rotates_round_robin() {
        let pool = pool(&["a", "b", "c"]);
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(pool.next_key().await.expect("key").key);
        }
        assert_eq!(seen, vec!["a", "b", "c", "a"]);
    }

    #[tokio::test]
    async fn cooling_key_is_skipped() {
        let pool = pool(&["a", "b"]);
        pool.mark_quota_exceeded(0).await;
        assert_eq!(pool.available().await, 1);
        assert_eq!(pool.next_key().await.expect("key").key, "b");
        assert_eq!(pool.next_key().await.expect("key").key, "b");
    }

    #[tokio::test]
    async fn all_cooling_yields_none() {
        let pool = pool(&["a", "b"]);
        pool.mark_quota_exceeded(0).await;
        pool.mark_quota_exceeded(1).await;
        assert!(pool.next_key().await.is_none());
    }

    #[tokio::test]
    async fn cooldown_expires() {
        let pool = ApiKeyPool::with_cooldown(vec!["a".to_string()], Duration::ZERO);
        pool.mark_quota_exceeded(0).await;
        assert_eq!(pool.next_key().await.expect("key").index, 0);
    }

    #[tokio::test]
    async fn success_clears_cooldown() {
        let pool = pool(&["a"]);
        pool.mark_quota_exceeded(0).await;
        pool.mark_success(0).await;
        assert_eq!(pool.available().await, 1);
    }

    #[tokio::test]
    async fn empty_pool_has_no_keys() {
        let pool = pool(&[]);
        assert!(pool.is_empty());
        assert!(pool.next_key().await.is_none());
    }
}
