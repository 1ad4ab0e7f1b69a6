//! Badge definitions and unlock rules.

use serde::{Deserialize, Serialize};

use crate::entities::Learner;

/// Unique identifier for badges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BadgeId(pub String);

impl BadgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for BadgeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for BadgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unlock predicate over learner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "threshold", rename_all = "snake_case")]
pub enum BadgeRule {
    /// At least N completed modules.
    Completions(u32),
    /// At least N modules with a score of 100.
    PerfectScores(u32),
    /// A daily streak of at least N days.
    Streak(u32),
    /// At least N modules first completed on the same day.
    CompletionsInOneDay(u32),
    /// At least N correct flashcard reviews.
    CorrectReviews(u32),
    /// Reached level N.
    Level(u8),
}

impl BadgeRule {
    /// Pure check against the learner's current state.
    pub fn is_satisfied(&self, learner: &Learner) -> bool {
        match *self {
            BadgeRule::Completions(n) => learner.completion_count() >= n as usize,
            BadgeRule::PerfectScores(n) => learner.perfect_score_count() >= n as usize,
            BadgeRule::Streak(n) => learner.streak >= n,
            BadgeRule::CompletionsInOneDay(n) => learner.max_completions_per_day() >= n as usize,
            BadgeRule::CorrectReviews(n) => learner.review_stats.correct >= n,
            BadgeRule::Level(n) => learner.level.get() >= n,
        }
    }
}

/// A badge that can be unlocked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    pub description: String,
    pub rule: BadgeRule,
    pub xp_reward: u64,
}

impl Badge {
    pub fn new(id: impl Into<String>, name: impl Into<String>, rule: BadgeRule) -> Self {
        Self {
            id: BadgeId::new(id),
            name: name.into(),
            description: String::new(),
            rule,
            xp_reward: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_xp_reward(mut self, xp: u64) -> Self {
        self.xp_reward = xp;
        self
    }
}

/// The set of badges learners can earn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeCatalog {
    badges: Vec<Badge>,
}

impl BadgeCatalog {
    pub fn new(badges: Vec<Badge>) -> Self {
        Self { badges }
    }

    pub fn empty() -> Self {
        Self { badges: Vec::new() }
    }

    pub fn badges(&self) -> &[Badge] {
        &self.badges
    }

    pub fn get(&self, id: &BadgeId) -> Option<&Badge> {
        self.badges.iter().find(|b| &b.id == id)
    }

    /// Badges whose rule holds but which the learner does not have yet.
    pub fn newly_satisfied<'a>(&'a self, learner: &Learner) -> Vec<&'a Badge> {
        self.badges
            .iter()
            .filter(|badge| !learner.has_badge(&badge.id) && badge.rule.is_satisfied(learner))
            .collect()
    }
}

impl Default for BadgeCatalog {
    fn default() -> Self {
        Self::new(vec![
            Badge::new("first_steps", "First Steps", BadgeRule::Completions(1))
                .with_description("Complete your first module")
                .with_xp_reward(50),
            Badge::new("bookworm", "Bookworm", BadgeRule::Completions(10))
                .with_description("Complete 10 learning modules")
                .with_xp_reward(100),
            Badge::new("perfectionist", "Perfectionist", BadgeRule::PerfectScores(5))
                .with_description("Score 100% on 5 different modules")
                .with_xp_reward(150),
            Badge::new("streak_master", "Streak Master", BadgeRule::Streak(7))
                .with_description("Maintain a 7-day learning streak")
                .with_xp_reward(100),
            Badge::new("speed_demon", "Speed Demon", BadgeRule::CompletionsInOneDay(10))
                .with_description("Complete 10 modules in one day")
                .with_xp_reward(100),
            Badge::new("memory_keeper", "Memory Keeper", BadgeRule::CorrectReviews(50))
                .with_description("Answer 50 flashcards correctly")
                .with_xp_reward(75),
            Badge::new("rising_star", "Rising Star", BadgeRule::Level(3))
                .with_description("Reach level 3"),
        ])
    }
}
