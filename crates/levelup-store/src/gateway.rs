//! Dual-tier progress gateway.
//!
//! The remote API is authoritative when reachable; the local cache is always
//! written and serves as the fallback. Remote failures are logged and never
//! reach the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tracing::instrument;

use levelup_core::model::{ProgressKey, ProgressSnapshot, QuizResult, TimerResumeToken};
use levelup_core::traits::ProgressGateway;

use crate::backend::{ProgressCache, RemoteProgressApi};
use crate::error::{StoreError, StoreResult};
use crate::http::DEFAULT_TIMEOUT_MS;

/// Progress gateway over an optional remote API and a local cache.
pub struct DualPathGateway {
    remote: Option<Arc<dyn RemoteProgressApi>>,
    cache: Arc<dyn ProgressCache>,
    remote_timeout: Duration,
}

impl DualPathGateway {
    /// A local-only gateway.
    pub fn new(cache: Arc<dyn ProgressCache>) -> Self {
        Self {
            remote: None,
            cache,
            remote_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Add a remote tier. Each remote call is abandoned after `timeout`.
    pub fn with_remote(mut self, remote: Arc<dyn RemoteProgressApi>, timeout: Duration) -> Self {
        self.remote = Some(remote);
        self.remote_timeout = timeout;
        self
    }

    pub fn is_local_only(&self) -> bool {
        self.remote.is_none()
    }

    pub fn cache(&self) -> &Arc<dyn ProgressCache> {
        &self.cache
    }

    /// Remove local progress and the countdown token for `key`.
    ///
    /// The remote API has no delete; a restarted quiz overwrites it on the
    /// next save. Returns whether any progress was removed.
    pub async fn reset(&self, key: &ProgressKey) -> StoreResult<bool> {
        let removed = self.cache.remove_progress(key).await?;
        self.cache.remove_timer(key).await?;
        tracing::info!(%key, removed, "local progress reset");
        Ok(removed)
    }

    async fn bounded<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        tokio::time::timeout(self.remote_timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.remote_timeout.as_millis() as u64))?
    }

    /// Apply the stale-terminal repair and store the repaired copy locally.
    async fn repaired(&self, key: &ProgressKey, mut snapshot: ProgressSnapshot) -> ProgressSnapshot {
        if snapshot.repair_stale_terminal() {
            tracing::debug!(%key, "downgraded terminal status with no answers behind it");
            if let Err(e) = self.cache.write_progress(key, &snapshot).await {
                tracing::warn!(%key, "failed to store repaired progress: {e}");
            }
        }
        snapshot
    }

    async fn load_local(&self, key: &ProgressKey) -> Option<ProgressSnapshot> {
        match self.cache.read_progress(key).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(%key, "unreadable local progress ignored: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl ProgressGateway for DualPathGateway {
    #[instrument(skip(self, key, snapshot), fields(%key, answered = snapshot.questions_answered))]
    async fn save(&self, key: &ProgressKey, snapshot: &ProgressSnapshot) -> anyhow::Result<()> {
        let remote = async {
            match &self.remote {
                Some(api) => Some(
                    self.bounded(api.store_progress(&key.quiz_id, snapshot))
                        .await,
                ),
                None => None,
            }
        };
        let local = self.cache.write_progress(key, snapshot);

        let (remote, local) = tokio::join!(remote, local);

        if let Some(Err(e)) = remote {
            tracing::warn!("remote save failed, kept local copy: {e}");
        }
        local.context("failed to write local progress")
    }

    #[instrument(skip(self, key), fields(%key))]
    async fn load(&self, key: &ProgressKey) -> Option<ProgressSnapshot> {
        if let Some(api) = &self.remote {
            match self.bounded(api.fetch_progress(&key.quiz_id)).await {
                Ok(Some(snapshot)) => {
                    if let Err(e) = self.cache.write_progress(key, &snapshot).await {
                        tracing::warn!("failed to cache remote progress: {e}");
                    }
                    return Some(self.repaired(key, snapshot).await);
                }
                Ok(None) => tracing::debug!("no remote progress, checking local cache"),
                Err(e) => tracing::warn!("remote load failed, falling back to local cache: {e}"),
            }
        }

        let snapshot = self.load_local(key).await?;
        Some(self.repaired(key, snapshot).await)
    }

    #[instrument(skip(self, key, result), fields(%key, score = result.score))]
    async fn submit_result(&self, key: &ProgressKey, result: &QuizResult) {
        let Some(api) = &self.remote else {
            tracing::debug!("no API configured, result not submitted");
            return;
        };
        match self.bounded(api.submit_result(result)).await {
            Ok(()) => tracing::info!(status = %result.status, "quiz result submitted"),
            Err(e) => tracing::warn!("failed to submit quiz result: {e}"),
        }
    }

    async fn save_timer(&self, key: &ProgressKey, token: &TimerResumeToken) {
        if let Err(e) = self.cache.write_timer(key, token).await {
            tracing::warn!(%key, "failed to save countdown: {e}");
        }
    }

    async fn load_timer(&self, key: &ProgressKey) -> Option<TimerResumeToken> {
        match self.cache.read_timer(key).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(%key, "unreadable countdown ignored: {e}");
                None
            }
        }
    }

    async fn clear_timer(&self, key: &ProgressKey) {
        if let Err(e) = self.cache.remove_timer(key).await {
            tracing::warn!(%key, "failed to clear countdown: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpProgressApi;
    use crate::local::LocalFileStore;
    use crate::mock::{MemoryCache, MockRemoteApi};
    use chrono::Utc;
    use levelup_core::model::QuizStatus;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn key() -> ProgressKey {
        ProgressKey::new("alice", "phishing")
    }

    fn snapshot(experience: u32) -> ProgressSnapshot {
        let mut snapshot = ProgressSnapshot::empty();
        snapshot.experience = experience;
        snapshot
    }

    fn gateway(remote: &Arc<MockRemoteApi>, cache: &Arc<MemoryCache>) -> DualPathGateway {
        DualPathGateway::new(cache.clone()).with_remote(remote.clone(), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn save_writes_both_tiers() {
        let remote = Arc::new(MockRemoteApi::new());
        let cache = Arc::new(MemoryCache::new());
        let gateway = gateway(&remote, &cache);

        gateway.save(&key(), &snapshot(30)).await.unwrap();

        assert_eq!(remote.stored("phishing").unwrap().experience, 30);
        assert_eq!(cache.stored(&key()).unwrap().experience, 30);
    }

    #[tokio::test]
    async fn remote_down_still_saves_and_loads_locally() {
        let remote = Arc::new(MockRemoteApi::offline());
        let cache = Arc::new(MemoryCache::new());
        let gateway = gateway(&remote, &cache);

        gateway.save(&key(), &snapshot(55)).await.unwrap();
        let loaded = gateway.load(&key()).await.unwrap();

        assert_eq!(loaded.experience, 55);
        assert_eq!(remote.call_count(), 2);
    }

    #[tokio::test]
    async fn save_fails_only_when_local_fails() {
        let remote = Arc::new(MockRemoteApi::new());
        let cache = Arc::new(MemoryCache::new());
        cache.set_fail_writes(true);
        let gateway = gateway(&remote, &cache);

        let err = gateway.save(&key(), &snapshot(10)).await.unwrap_err();
        assert!(format!("{err:#}").contains("local progress"));
        assert!(remote.stored("phishing").is_some());
    }

    #[tokio::test]
    async fn remote_wins_and_is_written_through() {
        let remote = Arc::new(MockRemoteApi::new());
        let cache = Arc::new(MemoryCache::new());
        remote.insert("phishing", snapshot(120));
        cache.insert(&key(), snapshot(10));
        let gateway = gateway(&remote, &cache);

        let loaded = gateway.load(&key()).await.unwrap();
        assert_eq!(loaded.experience, 120);
        assert_eq!(cache.stored(&key()).unwrap().experience, 120);
    }

    #[tokio::test]
    async fn remote_empty_falls_back_to_local() {
        let remote = Arc::new(MockRemoteApi::new());
        let cache = Arc::new(MemoryCache::new());
        cache.insert(&key(), snapshot(10));
        let gateway = gateway(&remote, &cache);

        assert_eq!(gateway.load(&key()).await.unwrap().experience, 10);
    }

    #[tokio::test]
    async fn nothing_stored_anywhere() {
        let remote = Arc::new(MockRemoteApi::new());
        let cache = Arc::new(MemoryCache::new());
        assert!(gateway(&remote, &cache).load(&key()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_remote_is_abandoned() {
        let remote = Arc::new(MockRemoteApi::new());
        remote.insert("phishing", snapshot(999));
        remote.set_delay(Duration::from_secs(30));
        let cache = Arc::new(MemoryCache::new());
        cache.insert(&key(), snapshot(40));
        let gateway = gateway(&remote, &cache);

        let loaded = gateway.load(&key()).await.unwrap();
        assert_eq!(loaded.experience, 40);
        gateway.save(&key(), &snapshot(45)).await.unwrap();
        assert_eq!(cache.stored(&key()).unwrap().experience, 45);
    }

    #[tokio::test]
    async fn stale_terminal_status_is_repaired() {
        let remote = Arc::new(MockRemoteApi::new());
        let cache = Arc::new(MemoryCache::new());
        let mut stale = snapshot(0);
        stale.status = QuizStatus::Passed;
        cache.insert(&key(), stale);
        let gateway = DualPathGateway::new(cache.clone());

        let loaded = gateway.load(&key()).await.unwrap();
        assert_eq!(loaded.status, QuizStatus::InProgress);
        assert_eq!(cache.stored(&key()).unwrap().status, QuizStatus::InProgress);
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn stale_terminal_status_from_remote_is_repaired() {
        let remote = Arc::new(MockRemoteApi::new());
        let cache = Arc::new(MemoryCache::new());
        let mut stale = snapshot(0);
        stale.status = QuizStatus::Passed;
        remote.insert("phishing", stale);
        let gateway = gateway(&remote, &cache);

        let loaded = gateway.load(&key()).await.unwrap();
        assert_eq!(loaded.status, QuizStatus::InProgress);
        assert_eq!(cache.stored(&key()).unwrap().status, QuizStatus::InProgress);
    }

    #[tokio::test]
    async fn user_id_with_separator_saves_locally() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = DualPathGateway::new(Arc::new(LocalFileStore::new(dir.path())));
        let key = ProgressKey::new("team/alice", "phishing");

        gateway.save(&key, &snapshot(35)).await.unwrap();
        assert_eq!(gateway.load(&key).await.unwrap().experience, 35);
        assert!(gateway.reset(&key).await.unwrap());
    }

    #[tokio::test]
    async fn save_load_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = DualPathGateway::new(Arc::new(LocalFileStore::new(dir.path())));

        let mut original = snapshot(80);
        original.tools.insert("Password Manager".into());
        gateway.save(&key(), &original).await.unwrap();
        let first = gateway.load(&key()).await.unwrap();
        gateway.save(&key(), &first).await.unwrap();
        let second = gateway.load(&key()).await.unwrap();

        assert_eq!(first, original);
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn result_goes_to_remote_only() {
        let remote = Arc::new(MockRemoteApi::new());
        let cache = Arc::new(MemoryCache::new());
        let result = QuizResult {
            quiz_name: "Phishing Awareness".into(),
            score: 73,
            experience: 180,
            tools: Default::default(),
            question_history: vec![],
            questions_answered: 15,
            status: QuizStatus::Passed,
        };

        gateway(&remote, &cache).submit_result(&key(), &result).await;
        assert_eq!(remote.results(), vec![result.clone()]);

        // Local-only mode swallows it.
        DualPathGateway::new(cache.clone())
            .submit_result(&key(), &result)
            .await;
    }

    #[tokio::test]
    async fn reset_clears_progress_and_countdown() {
        let cache = Arc::new(MemoryCache::new());
        cache.insert(&key(), snapshot(10));
        let gateway = DualPathGateway::new(cache.clone());
        gateway
            .save_timer(
                &key(),
                &TimerResumeToken {
                    question_index: 0,
                    remaining_secs: 9,
                    saved_at: Utc::now(),
                },
            )
            .await;

        assert!(gateway.reset(&key()).await.unwrap());
        assert!(gateway.load(&key()).await.is_none());
        assert!(gateway.load_timer(&key()).await.is_none());
        assert!(!gateway.reset(&key()).await.unwrap());
    }

    #[tokio::test]
    async fn http_outage_degrades_to_local() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/quizzes/phishing/progress"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/quizzes/phishing/progress"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let api = HttpProgressApi::new(&server.uri(), None, Duration::from_secs(2)).unwrap();
        let gateway = DualPathGateway::new(Arc::new(LocalFileStore::new(dir.path())))
            .with_remote(Arc::new(api), Duration::from_secs(2));

        gateway.save(&key(), &snapshot(65)).await.unwrap();
        assert_eq!(gateway.load(&key()).await.unwrap().experience, 65);
    }
}
