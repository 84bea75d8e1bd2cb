//! Per-quiz composition root.
//!
//! The controller wires an engine to a renderer, owns the per-question
//! countdown and serializes answer submission. It is shared behind `Arc`
//! between the UI event handlers and the timer task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::bank::present_options;
use crate::engine::{EngineState, NextQuestion, ProgressionEngine, StartOutcome, SubmitOutcome};
use crate::error::QuizError;
use crate::model::{PresentedOption, ProgressKey, ProgressSnapshot, Question, TimerResumeToken};
use crate::traits::{ProgressGateway, QuizRenderer};

/// Notice shown for recoverable input and data errors.
pub const RETRY_NOTICE: &str = "Something went wrong with that answer. Please try again.";

/// How often an expired countdown retries while a submission is in flight.
const BUSY_RETRY: Duration = Duration::from_millis(50);

/// Resume tokens older than this are ignored.
const TIMER_TOKEN_MAX_AGE_SECS: i64 = 60 * 60;

/// Presentation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// Seconds allowed per question. Zero disables the countdown.
    #[serde(default = "default_timer_secs")]
    pub timer_secs: u64,
    /// Present options in random order.
    #[serde(default = "default_true")]
    pub shuffle_options: bool,
}

fn default_timer_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            timer_secs: default_timer_secs(),
            shuffle_options: true,
        }
    }
}

/// What `present_next` put on screen.
#[derive(Debug, Clone, PartialEq)]
pub enum Presentation {
    Question {
        question: Question,
        options: Vec<PresentedOption>,
        /// Countdown length, when the timer is enabled.
        remaining: Option<Duration>,
    },
    Finished(ProgressSnapshot),
}

struct PresentedQuestion {
    question_index: usize,
    question: Question,
    options: Vec<PresentedOption>,
    shown_at: Instant,
}

struct ActiveTimer {
    question_index: usize,
    started_at: Instant,
    duration: Duration,
    handle: JoinHandle<()>,
}

/// Clears the busy flag when dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Inner {
    engine: Mutex<ProgressionEngine>,
    gateway: Arc<dyn ProgressGateway>,
    key: ProgressKey,
    renderer: Arc<dyn QuizRenderer>,
    settings: ControllerSettings,
    busy: AtomicBool,
    presented: Mutex<Option<PresentedQuestion>>,
    timer: Mutex<Option<ActiveTimer>>,
}

/// Drives one quiz instance for one player.
#[derive(Clone)]
pub struct QuizController {
    inner: Arc<Inner>,
}

impl QuizController {
    pub fn new(
        engine: ProgressionEngine,
        renderer: Arc<dyn QuizRenderer>,
        settings: ControllerSettings,
    ) -> Self {
        let gateway = Arc::clone(engine.gateway());
        let key = engine.key().clone();
        Self {
            inner: Arc::new(Inner {
                engine: Mutex::new(engine),
                gateway,
                key,
                renderer,
                settings,
                busy: AtomicBool::new(false),
                presented: Mutex::new(None),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Restore saved progress and begin the quiz.
    pub async fn start(&self) -> StartOutcome {
        let mut engine = self.inner.engine.lock().await;
        engine.start_from_gateway().await
    }

    /// Show the next question, or the completion screen once finished.
    ///
    /// Presenting the question that is already on screen re-renders it
    /// without touching its countdown.
    pub async fn present_next(&self) -> Result<Presentation, QuizError> {
        let (question, question_index) = {
            let engine = self.inner.engine.lock().await;
            match engine.next_question() {
                Ok(NextQuestion::Question(q)) => (q.clone(), engine.scores().answered()),
                Ok(NextQuestion::Terminal(_)) => {
                    let snapshot = engine.snapshot();
                    drop(engine);
                    self.inner.renderer.render_completion(&snapshot);
                    return Ok(Presentation::Finished(snapshot));
                }
                Err(e) => {
                    drop(engine);
                    self.inner.report(&e);
                    return Err(e);
                }
            }
        };

        let mut presented = self.inner.presented.lock().await;
        if let Some(current) = presented
            .as_ref()
            .filter(|p| p.question_index == question_index)
        {
            self.inner
                .renderer
                .render_question(&current.question, &current.options);
            let remaining = self.inner.remaining_for(question_index).await;
            return Ok(Presentation::Question {
                question: current.question.clone(),
                options: current.options.clone(),
                remaining,
            });
        }

        let options = present_options(&question, self.inner.settings.shuffle_options);
        *presented = Some(PresentedQuestion {
            question_index,
            question: question.clone(),
            options: options.clone(),
            shown_at: Instant::now(),
        });
        drop(presented);

        self.inner.renderer.render_question(&question, &options);

        let remaining = if self.inner.settings.timer_secs > 0 {
            let duration = self.inner.resume_duration(question_index).await;
            self.inner.start_timer(question_index, duration).await;
            self.inner
                .gateway
                .save_timer(
                    &self.inner.key,
                    &TimerResumeToken {
                        question_index,
                        remaining_secs: duration.as_secs(),
                        saved_at: Utc::now(),
                    },
                )
                .await;
            Some(duration)
        } else {
            None
        };

        Ok(Presentation::Question {
            question,
            options,
            remaining,
        })
    }

    /// Answer the presented question with the option at `displayed_index`
    /// (position in the presented, possibly shuffled, order).
    ///
    /// Rejected with `SubmissionInFlight` while another answer is still being
    /// recorded and persisted.
    pub async fn submit_answer(&self, displayed_index: usize) -> Result<SubmitOutcome, QuizError> {
        let Some(_guard) = BusyGuard::acquire(&self.inner.busy) else {
            tracing::debug!(quiz = %self.inner.key, "duplicate submission rejected");
            return Err(QuizError::SubmissionInFlight);
        };

        let result = self.inner.submit_presented(Some(displayed_index)).await;
        if let Err(e) = &result {
            self.inner.report(e);
        }
        result
    }

    /// Discard progress and begin again.
    pub async fn restart(&self) -> Result<(), QuizError> {
        let Some(_guard) = BusyGuard::acquire(&self.inner.busy) else {
            return Err(QuizError::SubmissionInFlight);
        };

        self.inner.cancel_timer().await;
        *self.inner.presented.lock().await = None;
        self.inner.gateway.clear_timer(&self.inner.key).await;

        let mut engine = self.inner.engine.lock().await;
        if !engine.restart().await {
            tracing::warn!(quiz = %self.inner.key, "restart was not persisted");
        }
        Ok(())
    }

    /// Persist the remaining countdown of the presented question.
    pub async fn checkpoint_timer(&self) {
        let token = {
            let timer = self.inner.timer.lock().await;
            timer.as_ref().map(|t| TimerResumeToken {
                question_index: t.question_index,
                remaining_secs: t.duration.saturating_sub(t.started_at.elapsed()).as_secs(),
                saved_at: Utc::now(),
            })
        };
        if let Some(token) = token {
            self.inner.gateway.save_timer(&self.inner.key, &token).await;
        }
    }

    /// Stop the countdown and keep its remaining time for the next session.
    pub async fn teardown(&self) {
        self.checkpoint_timer().await;
        self.inner.cancel_timer().await;
        *self.inner.presented.lock().await = None;
    }

    /// Whether an answer is currently being recorded.
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    pub async fn snapshot(&self) -> ProgressSnapshot {
        self.inner.engine.lock().await.snapshot()
    }

    pub async fn state(&self) -> EngineState {
        self.inner.engine.lock().await.state()
    }

    pub fn key(&self) -> &ProgressKey {
        &self.inner.key
    }
}

impl Inner {
    /// Record an answer for the presented question. `None` means the
    /// countdown expired and a random option is recorded as timed out.
    async fn submit_presented(
        &self,
        displayed_index: Option<usize>,
    ) -> Result<SubmitOutcome, QuizError> {
        let (question_index, original_index, shown_at) = {
            let presented = self.presented.lock().await;
            let current = presented.as_ref().ok_or(QuizError::NoActiveQuestion)?;
            let count = current.options.len();
            let index = match displayed_index {
                Some(index) => index,
                None => random_index(count),
            };
            let option = current
                .options
                .get(index)
                .ok_or(QuizError::InvalidOption { index, count })?;
            (current.question_index, option.original_index, current.shown_at)
        };
        let timed_out = displayed_index.is_none();

        if !timed_out {
            self.cancel_timer().await;
        }

        let outcome = {
            let mut engine = self.engine.lock().await;
            engine
                .submit_answer(
                    original_index,
                    timed_out,
                    Some(shown_at.elapsed().as_secs()),
                )
                .await?
        };

        {
            let mut presented = self.presented.lock().await;
            if presented
                .as_ref()
                .is_some_and(|p| p.question_index == question_index)
            {
                *presented = None;
            }
        }
        self.gateway.clear_timer(&self.key).await;

        self.renderer.render_outcome(&outcome.record);
        if let Some(tier) = outcome.level_transition {
            self.renderer.render_level_transition(tier);
        }
        if let Some(snapshot) = &outcome.finished {
            self.renderer.render_completion(snapshot);
        }
        Ok(outcome)
    }

    /// Countdown fired for `question_index`.
    ///
    /// Waits out a submission in flight. A successful one cancels this task;
    /// a rejected one leaves the question to time out here.
    async fn expire(self: Arc<Self>, question_index: usize) {
        let mut waited = false;
        let _guard = loop {
            if let Some(guard) = BusyGuard::acquire(&self.busy) {
                break guard;
            }
            if !waited {
                tracing::debug!(quiz = %self.key, "countdown fired during a submission");
                waited = true;
            }
            tokio::time::sleep(BUSY_RETRY).await;
        };

        {
            let mut timer = self.timer.lock().await;
            match timer.as_ref() {
                Some(active) if active.question_index == question_index => {
                    // Dropping our own handle detaches the running task.
                    timer.take();
                }
                _ => return,
            }
        }

        let still_presented = self
            .presented
            .lock()
            .await
            .as_ref()
            .is_some_and(|p| p.question_index == question_index);
        if !still_presented {
            tracing::debug!(quiz = %self.key, question_index, "ignoring stale countdown");
            return;
        }

        tracing::info!(quiz = %self.key, question_index, "question timed out");
        if let Err(e) = self.submit_presented(None).await {
            self.report(&e);
        }
    }

    async fn start_timer(self: &Arc<Self>, question_index: usize, duration: Duration) {
        let weak: Weak<Inner> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(inner) = weak.upgrade() {
                inner.expire(question_index).await;
            }
        });

        let mut timer = self.timer.lock().await;
        if let Some(previous) = timer.replace(ActiveTimer {
            question_index,
            started_at: Instant::now(),
            duration,
            handle,
        }) {
            previous.handle.abort();
        }
    }

    async fn cancel_timer(&self) {
        if let Some(active) = self.timer.lock().await.take() {
            active.handle.abort();
        }
    }

    async fn remaining_for(&self, question_index: usize) -> Option<Duration> {
        let timer = self.timer.lock().await;
        timer
            .as_ref()
            .filter(|t| t.question_index == question_index)
            .map(|t| t.duration.saturating_sub(t.started_at.elapsed()))
    }

    /// Countdown length for a freshly shown question: the saved remaining
    /// time when the token belongs to this question and is recent, else the
    /// full duration.
    async fn resume_duration(&self, question_index: usize) -> Duration {
        let full = self.settings.timer_secs;
        let Some(token) = self.gateway.load_timer(&self.key).await else {
            return Duration::from_secs(full);
        };

        let age = Utc::now().signed_duration_since(token.saved_at).num_seconds();
        if token.question_index != question_index {
            tracing::debug!(
                quiz = %self.key,
                token_index = token.question_index,
                question_index,
                "countdown token belongs to another question"
            );
            Duration::from_secs(full)
        } else if token.remaining_secs == 0
            || token.remaining_secs > full
            || !(0..=TIMER_TOKEN_MAX_AGE_SECS).contains(&age)
        {
            Duration::from_secs(full)
        } else {
            Duration::from_secs(token.remaining_secs)
        }
    }

    fn report(&self, error: &QuizError) {
        if error.is_retryable() {
            tracing::warn!(quiz = %self.key, "recoverable quiz error: {error}");
            self.renderer.render_notice(RETRY_NOTICE);
        } else {
            tracing::debug!(quiz = %self.key, "rejected: {error}");
        }
    }
}

fn random_index(count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    rand::rng().random_range(0..count)
}
