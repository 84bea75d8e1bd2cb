//! In-memory backends for testing the gateway without a server or disk.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use levelup_core::model::{ProgressKey, ProgressSnapshot, QuizResult, TimerResumeToken};

use crate::backend::{ProgressCache, RemoteProgressApi};
use crate::error::{StoreError, StoreResult};

/// A remote API that keeps everything in memory.
///
/// Can be switched offline (every call fails with a network error) or slowed
/// down to exercise the gateway's timeout.
#[derive(Default)]
pub struct MockRemoteApi {
    progress: Mutex<HashMap<String, ProgressSnapshot>>,
    results: Mutex<Vec<QuizResult>>,
    offline: AtomicBool,
    delay: Mutex<Option<Duration>>,
    call_count: AtomicU32,
}

impl MockRemoteApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that fails every call.
    pub fn offline() -> Self {
        let api = Self::default();
        api.set_offline(true);
        api
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn insert(&self, quiz_id: &str, snapshot: ProgressSnapshot) {
        self.progress
            .lock()
            .unwrap()
            .insert(quiz_id.to_string(), snapshot);
    }

    pub fn stored(&self, quiz_id: &str) -> Option<ProgressSnapshot> {
        self.progress.lock().unwrap().get(quiz_id).cloned()
    }

    pub fn results(&self) -> Vec<QuizResult> {
        self.results.lock().unwrap().clone()
    }

    /// Number of calls made to this API.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    async fn enter(&self) -> StoreResult<()> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Network("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteProgressApi for MockRemoteApi {
    async fn fetch_progress(&self, quiz_id: &str) -> StoreResult<Option<ProgressSnapshot>> {
        self.enter().await?;
        Ok(self.stored(quiz_id))
    }

    async fn store_progress(&self, quiz_id: &str, snapshot: &ProgressSnapshot) -> StoreResult<()> {
        self.enter().await?;
        self.insert(quiz_id, snapshot.clone());
        Ok(())
    }

    async fn submit_result(&self, result: &QuizResult) -> StoreResult<()> {
        self.enter().await?;
        self.results.lock().unwrap().push(result.clone());
        Ok(())
    }
}

/// A local cache that keeps entries in memory.
#[derive(Default)]
pub struct MemoryCache {
    progress: Mutex<HashMap<String, ProgressSnapshot>>,
    timers: Mutex<HashMap<String, TimerResumeToken>>,
    fail_writes: AtomicBool,
    write_count: AtomicU32,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn insert(&self, key: &ProgressKey, snapshot: ProgressSnapshot) {
        self.progress
            .lock()
            .unwrap()
            .insert(key.storage_key(), snapshot);
    }

    pub fn stored(&self, key: &ProgressKey) -> Option<ProgressSnapshot> {
        self.progress.lock().unwrap().get(&key.storage_key()).cloned()
    }

    /// Number of successful progress writes.
    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::Relaxed)
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("read-only cache")));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressCache for MemoryCache {
    async fn read_progress(&self, key: &ProgressKey) -> StoreResult<Option<ProgressSnapshot>> {
        Ok(self.stored(key))
    }

    async fn write_progress(
        &self,
        key: &ProgressKey,
        snapshot: &ProgressSnapshot,
    ) -> StoreResult<()> {
        self.check_writable()?;
        self.insert(key, snapshot.clone());
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn remove_progress(&self, key: &ProgressKey) -> StoreResult<bool> {
        Ok(self
            .progress
            .lock()
            .unwrap()
            .remove(&key.storage_key())
            .is_some())
    }

    async fn read_timer(&self, key: &ProgressKey) -> StoreResult<Option<TimerResumeToken>> {
        Ok(self.timers.lock().unwrap().get(&key.timer_key()).cloned())
    }

    async fn write_timer(&self, key: &ProgressKey, token: &TimerResumeToken) -> StoreResult<()> {
        self.check_writable()?;
        self.timers
            .lock()
            .unwrap()
            .insert(key.timer_key(), token.clone());
        Ok(())
    }

    async fn remove_timer(&self, key: &ProgressKey) -> StoreResult<bool> {
        Ok(self
            .timers
            .lock()
            .unwrap()
            .remove(&key.timer_key())
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_remote_fails_and_counts() {
        let api = MockRemoteApi::offline();
        let err = api.fetch_progress("phishing").await.unwrap_err();
        assert!(matches!(err, StoreError::Network(_)));
        assert_eq!(api.call_count(), 1);

        api.set_offline(false);
        api.store_progress("phishing", &ProgressSnapshot::empty())
            .await
            .unwrap();
        assert!(api.stored("phishing").is_some());
        assert_eq!(api.call_count(), 2);
    }

    #[tokio::test]
    async fn failing_cache_rejects_writes() {
        let cache = MemoryCache::new();
        let key = ProgressKey::new("alice", "phishing");
        cache.set_fail_writes(true);

        let err = cache
            .write_progress(&key, &ProgressSnapshot::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(cache.write_count(), 0);
        assert!(cache.stored(&key).is_none());
    }
}
