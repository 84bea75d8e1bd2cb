//! Shared test fixtures: a small bank and an in-memory gateway.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::bank::ScenarioBank;
use crate::model::{
    ProgressKey, ProgressSnapshot, Question, QuizOption, QuizResult, Tier, TimerResumeToken,
};
use crate::traits::ProgressGateway;

/// Index of the highest-experience option.
pub const CORRECT: usize = 0;
/// Index of a low-experience option.
pub const WRONG: usize = 1;
/// Index of a negative-experience option.
pub const PENALTY: usize = 2;
/// Tool granted by the correct option.
pub const TOOL: &str = "Report Button";

pub fn question(id: u32, level: Tier) -> Question {
    Question {
        id,
        level,
        title: format!("Scenario {id}"),
        description: "An unexpected message arrives.".into(),
        options: vec![
            QuizOption {
                text: "Report it".into(),
                outcome: "Security team notified.".into(),
                experience: 20,
                is_correct: None,
                tool: Some(TOOL.into()),
            },
            QuizOption {
                text: "Ignore it".into(),
                outcome: "Nothing happens, this time.".into(),
                experience: 5,
                is_correct: None,
                tool: None,
            },
            QuizOption {
                text: "Click the link".into(),
                outcome: "Credentials harvested.".into(),
                experience: -30,
                is_correct: None,
                tool: None,
            },
        ],
    }
}

/// Fifteen questions, ids 1..=15, five per tier.
pub fn bank() -> ScenarioBank {
    let questions = (1..=15)
        .map(|id| {
            let level = Tier::for_index(id as usize - 1, 5);
            question(id, level)
        })
        .collect();
    ScenarioBank::new("phishing", "Phishing Awareness", questions, 5)
}

/// Gateway holding a single snapshot in memory.
#[derive(Default)]
pub struct MemoryGateway {
    stored: Mutex<Option<ProgressSnapshot>>,
    results: Mutex<Vec<QuizResult>>,
    timer: Mutex<Option<TimerResumeToken>>,
    save_count: AtomicU32,
    fail_saves: AtomicBool,
    save_delay: Mutex<Option<Duration>>,
}

impl MemoryGateway {
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_save_delay(&self, delay: Duration) {
        *self.save_delay.lock().unwrap() = Some(delay);
    }

    pub fn stored(&self) -> Option<ProgressSnapshot> {
        self.stored.lock().unwrap().clone()
    }

    pub fn results(&self) -> Vec<QuizResult> {
        self.results.lock().unwrap().clone()
    }

    pub fn timer(&self) -> Option<TimerResumeToken> {
        self.timer.lock().unwrap().clone()
    }

    pub fn set_timer(&self, token: TimerResumeToken) {
        *self.timer.lock().unwrap() = Some(token);
    }

    pub fn save_count(&self) -> u32 {
        self.save_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgressGateway for MemoryGateway {
    async fn save(&self, _key: &ProgressKey, snapshot: &ProgressSnapshot) -> anyhow::Result<()> {
        let delay = *self.save_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.save_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        *self.stored.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }

    async fn load(&self, _key: &ProgressKey) -> Option<ProgressSnapshot> {
        self.stored()
    }

    async fn submit_result(&self, _key: &ProgressKey, result: &QuizResult) {
        self.results.lock().unwrap().push(result.clone());
    }

    async fn save_timer(&self, _key: &ProgressKey, token: &TimerResumeToken) {
        self.set_timer(token.clone());
    }

    async fn load_timer(&self, _key: &ProgressKey) -> Option<TimerResumeToken> {
        self.timer()
    }

    async fn clear_timer(&self, _key: &ProgressKey) {
        *self.timer.lock().unwrap() = None;
    }
}
