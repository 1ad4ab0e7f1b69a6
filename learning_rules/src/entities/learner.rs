//! Learner profile: experience, streak, completions and earned badges.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

use super::{ActivityId, CardId, LearnerId, NodeId};
use crate::mechanics::{BadgeId, Level};

/// A recorded module completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Latest score, 0-100.
    pub score: u8,
    pub completed_at: DateTime<Utc>,
    pub last_attempt_at: DateTime<Utc>,
    pub attempts: u32,
}

/// Quiz history for one unit, passed or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizRecord {
    pub attempts: u32,
    pub best_score: u8,
    pub last_score: u8,
    pub last_attempt_at: DateTime<Utc>,
}

/// Running review counters across all cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReviewStats {
    pub reviews: u32,
    pub correct: u32,
}

/// What happened in a learner activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActivityKind {
    ModuleCompleted { node: NodeId, score: u8 },
    QuizAttempted { node: NodeId, score: u8, passed: bool },
    PathCompleted { path: String },
    CardReviewed { card: CardId, correct: bool },
    XpAwarded { amount: u64 },
    BadgeUnlocked { badge: BadgeId },
}

/// Entry in a learner's bounded activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: ActivityId,
    pub at: DateTime<Utc>,
    pub kind: ActivityKind,
    pub xp: u64,
}

/// A learner and everything the gamification layer tracks about them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learner {
    pub id: LearnerId,
    pub xp: u64,
    /// Derived from `xp`; recomputed on every award.
    pub level: Level,
    /// Consecutive UTC days with activity.
    pub streak: u32,
    pub last_active_on: Option<NaiveDate>,
    pub last_active_at: Option<DateTime<Utc>>,
    pub completions: BTreeMap<NodeId, Completion>,
    #[serde(default)]
    pub quiz_attempts: BTreeMap<NodeId, QuizRecord>,
    /// Badge -> unlock time.
    pub badges: BTreeMap<BadgeId, DateTime<Utc>>,
    pub review_stats: ReviewStats,
    /// Learning path id -> enrollment time.
    pub enrolled_paths: BTreeMap<String, DateTime<Utc>>,
    /// Learning path id -> time its completion bonus was credited.
    #[serde(default)]
    pub completed_paths: BTreeMap<String, DateTime<Utc>>,
    pub activity: VecDeque<ActivityRecord>,

    /// Profile data owned by outer layers (display name, avatar, ...).
    #[serde(default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Learner {
    /// Create a fresh learner at level 1 with no history.
    pub fn new(id: LearnerId) -> Self {
        Self {
            id,
            xp: 0,
            level: Level::default(),
            streak: 0,
            last_active_on: None,
            last_active_at: None,
            completions: BTreeMap::new(),
            quiz_attempts: BTreeMap::new(),
            badges: BTreeMap::new(),
            review_stats: ReviewStats::default(),
            enrolled_paths: BTreeMap::new(),
            completed_paths: BTreeMap::new(),
            activity: VecDeque::new(),
            extra: HashMap::new(),
        }
    }

    pub fn has_completed(&self, node: &NodeId) -> bool {
        self.completions.contains_key(node)
    }

    pub fn has_completed_path(&self, path_id: &str) -> bool {
        self.completed_paths.contains_key(path_id)
    }

    /// Record a quiz attempt and return the attempt number.
    pub fn record_quiz_attempt(&mut self, node: &NodeId, score: u8, now: DateTime<Utc>) -> u32 {
        let record = self.quiz_attempts.entry(node.clone()).or_insert(QuizRecord {
            attempts: 0,
            best_score: 0,
            last_score: 0,
            last_attempt_at: now,
        });
        record.attempts += 1;
        record.best_score = record.best_score.max(score);
        record.last_score = score;
        record.last_attempt_at = now;
        record.attempts
    }

    pub fn has_badge(&self, badge: &BadgeId) -> bool {
        self.badges.contains_key(badge)
    }

    pub fn completion_count(&self) -> usize {
        self.completions.len()
    }

    /// Number of modules whose latest score is 100.
    pub fn perfect_score_count(&self) -> usize {
        self.completions.values().filter(|c| c.score == 100).count()
    }

    /// Largest number of first completions that fall on the same UTC day.
    pub fn max_completions_per_day(&self) -> usize {
        let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
        for completion in self.completions.values() {
            *per_day.entry(completion.completed_at.date_naive()).or_default() += 1;
        }
        per_day.values().copied().max().unwrap_or(0)
    }

    /// Mean of latest scores, 0.0 with no completions.
    pub fn average_score(&self) -> f64 {
        if self.completions.is_empty() {
            return 0.0;
        }
        let total: u64 = self.completions.values().map(|c| u64::from(c.score)).sum();
        total as f64 / self.completions.len() as f64
    }

    /// Update the daily streak for activity at `now`.
    ///
    /// Same day keeps the streak, the next day extends it, any gap restarts at 1.
    /// Timestamps older than the last active day are ignored.
    pub fn register_activity_day(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        match self.last_active_on {
            Some(last) if last == today => {}
            Some(last) if last > today => return,
            Some(last) if last.succ_opt() == Some(today) => self.streak += 1,
            _ => self.streak = 1,
        }
        self.last_active_on = Some(today);
        self.last_active_at = Some(self.last_active_at.map_or(now, |at| at.max(now)));
    }

    /// Append to the activity log, dropping the oldest entries beyond `capacity`.
    pub fn push_activity(&mut self, record: ActivityRecord, capacity: usize) {
        self.activity.push_back(record);
        while self.activity.len() > capacity {
            self.activity.pop_front();
        }
    }

    /// Whether the learner did anything at or after `since`.
    pub fn active_since(&self, since: DateTime<Utc>) -> bool {
        self.last_active_at.map_or(false, |at| at >= since)
    }
}
