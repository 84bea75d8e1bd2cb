//! The two storage tiers behind `DualPathGateway`.

use async_trait::async_trait;

use levelup_core::model::{ProgressKey, ProgressSnapshot, QuizResult, TimerResumeToken};

use crate::error::StoreResult;

/// Authoritative, network-backed progress store.
///
/// The caller's identity travels in the credentials, so only the quiz id
/// addresses a record.
#[async_trait]
pub trait RemoteProgressApi: Send + Sync {
    /// Fetch stored progress. `Ok(None)` when nothing is stored.
    async fn fetch_progress(&self, quiz_id: &str) -> StoreResult<Option<ProgressSnapshot>>;

    async fn store_progress(&self, quiz_id: &str, snapshot: &ProgressSnapshot) -> StoreResult<()>;

    /// Post a finished quiz to the user profile service.
    async fn submit_result(&self, result: &QuizResult) -> StoreResult<()>;
}

/// Device-local fallback store.
#[async_trait]
pub trait ProgressCache: Send + Sync {
    async fn read_progress(&self, key: &ProgressKey) -> StoreResult<Option<ProgressSnapshot>>;

    async fn write_progress(&self, key: &ProgressKey, snapshot: &ProgressSnapshot)
        -> StoreResult<()>;

    /// Returns whether anything was removed.
    async fn remove_progress(&self, key: &ProgressKey) -> StoreResult<bool>;

    async fn read_timer(&self, key: &ProgressKey) -> StoreResult<Option<TimerResumeToken>>;

    async fn write_timer(&self, key: &ProgressKey, token: &TimerResumeToken) -> StoreResult<()>;

    async fn remove_timer(&self, key: &ProgressKey) -> StoreResult<bool>;
}
