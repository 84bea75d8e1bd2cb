//! Core trait definitions for persistence and rendering.
//!
//! `ProgressGateway` is implemented by the `levelup-store` crate;
//! `QuizRenderer` by whatever front end drives the quiz (the CLI ships a
//! terminal one).

use async_trait::async_trait;

use crate::model::{
    AnswerRecord, PresentedOption, ProgressKey, ProgressSnapshot, Question, QuizResult, Tier,
    TimerResumeToken,
};

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Durable storage for quiz progress.
///
/// Implementations must not let transport failures escape: `load` degrades
/// to `None`, and `save` only fails when nothing could be stored at all.
#[async_trait]
pub trait ProgressGateway: Send + Sync {
    /// Persist a snapshot for `key`.
    async fn save(&self, key: &ProgressKey, snapshot: &ProgressSnapshot) -> anyhow::Result<()>;

    /// Load the most recent snapshot for `key`, if any.
    async fn load(&self, key: &ProgressKey) -> Option<ProgressSnapshot>;

    /// Report a finished quiz to the user profile service.
    async fn submit_result(&self, key: &ProgressKey, result: &QuizResult);

    /// Persist the countdown state of the current question.
    async fn save_timer(&self, _key: &ProgressKey, _token: &TimerResumeToken) {}

    /// Load the countdown state saved by `save_timer`.
    async fn load_timer(&self, _key: &ProgressKey) -> Option<TimerResumeToken> {
        None
    }

    /// Forget any saved countdown state.
    async fn clear_timer(&self, _key: &ProgressKey) {}
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Callbacks the controller invokes at well-defined points of the flow.
pub trait QuizRenderer: Send + Sync {
    /// A question is ready to be answered.
    fn render_question(&self, question: &Question, options: &[PresentedOption]);

    /// An answer was recorded (manually or by timeout).
    fn render_outcome(&self, record: &AnswerRecord);

    /// The quiz reached a terminal state.
    fn render_completion(&self, snapshot: &ProgressSnapshot);

    /// The player moved into a new tier.
    fn render_level_transition(&self, tier: Tier);

    /// A recoverable problem the player should retry after.
    fn render_notice(&self, _message: &str) {}
}

/// Renderer that ignores every callback.
pub struct NoopRenderer;

impl QuizRenderer for NoopRenderer {
    fn render_question(&self, _: &Question, _: &[PresentedOption]) {}
    fn render_outcome(&self, _: &AnswerRecord) {}
    fn render_completion(&self, _: &ProgressSnapshot) {}
    fn render_level_transition(&self, _: Tier) {}
}
