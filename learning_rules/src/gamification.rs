//! Gamification engine: experience, levels, streaks and badges.
//!
//! All mutations go through [`LearnerLedger::try_update`], so an award, the level
//! recomputation and the badge evaluation that follows it land together.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::sync::Arc;
use tracing::info;

use crate::entities::{ActivityId, ActivityKind, ActivityRecord, CardId, Completion, LearnerId, NodeId};
use crate::error::{RulesError, RulesResult};
use crate::ledger::{LearnerLedger, LearnerState};
use crate::mechanics::{Badge, BadgeCatalog, BadgeId, Level, LevelProgress};

/// Gamification tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GamificationConfig {
    /// Learners active within this many days appear on the weekly board.
    pub leaderboard_window_days: i64,
    /// Entries kept in each learner's activity log.
    pub activity_log_capacity: usize,
}

impl Default for GamificationConfig {
    fn default() -> Self {
        Self {
            leaderboard_window_days: 7,
            activity_log_capacity: 100,
        }
    }
}

/// Result of crediting XP to a learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpAward {
    pub activity: ActivityId,
    /// XP from the event itself, excluding badge rewards.
    pub amount: u64,
    pub badge_xp: u64,
    pub total_xp: u64,
    pub previous_level: Level,
    pub level: Level,
    pub new_badges: Vec<Badge>,
}

impl XpAward {
    pub fn leveled_up(&self) -> bool {
        self.level > self.previous_level
    }
}

/// Result of a module completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub node: NodeId,
    pub score: u8,
    pub first_completion: bool,
    pub award: XpAward,
    /// Learning paths this completion finished.
    #[serde(default)]
    pub path_bonuses: Vec<PathBonus>,
}

impl CompletionOutcome {
    /// XP from the completion, its badges and any path bonuses.
    pub fn xp_gained(&self) -> u64 {
        self.award.amount
            + self.award.badge_xp
            + self
                .path_bonuses
                .iter()
                .map(|bonus| bonus.award.amount + bonus.award.badge_xp)
                .sum::<u64>()
    }
}

/// Completion bonus credited for finishing a learning path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathBonus {
    pub path: String,
    pub award: XpAward,
}

/// Answers to a unit's quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSubmission {
    pub correct: u32,
    pub total: u32,
}

impl QuizSubmission {
    pub fn new(correct: u32, total: u32) -> Self {
        Self { correct, total }
    }

    /// Share of correct answers in percent, rounded.
    pub fn score(self) -> RulesResult<u8> {
        if self.total == 0 {
            return Err(RulesError::validation("quiz has no questions"));
        }
        if self.correct > self.total {
            return Err(RulesError::validation(format!(
                "{} correct answers out of {} questions",
                self.correct, self.total
            )));
        }
        Ok((f64::from(self.correct) * 100.0 / f64::from(self.total)).round() as u8)
    }

    /// Compares the exact ratio, so rounding never lifts a score over the bar.
    pub fn passes(self, passing_score: u8) -> bool {
        u64::from(self.correct) * 100 >= u64::from(passing_score) * u64::from(self.total)
    }
}

/// Result of a graded quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizOutcome {
    pub node: NodeId,
    pub score: u8,
    pub passed: bool,
    /// Attempt number for this unit, starting at 1.
    pub attempt: u32,
    /// Present when the quiz passed and counted as a module completion.
    pub completion: Option<CompletionOutcome>,
    /// XP credited for the attempt. On a pass this is the completion's award.
    pub award: XpAward,
}

impl QuizOutcome {
    pub fn xp_gained(&self) -> u64 {
        match &self.completion {
            Some(completion) => completion.xp_gained(),
            None => self.award.amount + self.award.badge_xp,
        }
    }
}

/// A badge the learner holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarnedBadge {
    pub id: BadgeId,
    pub name: String,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamificationStats {
    pub learner: LearnerId,
    pub xp: u64,
    pub level: Level,
    pub level_progress: LevelProgress,
    pub streak: u32,
    pub badges: Vec<EarnedBadge>,
    pub completed_modules: usize,
}

/// Learning analytics for one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerSummary {
    pub learner: LearnerId,
    pub total_completed: usize,
    /// Rounded mean of latest module scores.
    pub average_score: u8,
    pub reviews: u32,
    /// Correct reviews over all reviews, 0.0 without reviews.
    pub review_accuracy: f64,
    pub xp: u64,
    pub level: Level,
    pub streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardPeriod {
    AllTime,
    Weekly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub learner: LearnerId,
    pub xp: u64,
    pub level: Level,
}

pub struct GamificationEngine {
    ledger: Arc<LearnerLedger>,
    catalog: BadgeCatalog,
    config: GamificationConfig,
}

impl GamificationEngine {
    pub fn new(ledger: Arc<LearnerLedger>, catalog: BadgeCatalog, config: GamificationConfig) -> Self {
        Self {
            ledger,
            catalog,
            config,
        }
    }

    pub fn catalog(&self) -> &BadgeCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &GamificationConfig {
        &self.config
    }

    /// Credit `amount` XP to a learner and re-evaluate badges.
    pub fn award_xp(
        &self,
        learner: &LearnerId,
        amount: u64,
        now: DateTime<Utc>,
    ) -> RulesResult<XpAward> {
        self.ledger.try_update(learner, |state| {
            self.apply_xp(state, amount, ActivityKind::XpAwarded { amount }, now)
        })
    }

    /// Record a module completion worth `xp_reward * score / 100` XP (rounded).
    pub fn complete_module(
        &self,
        learner: &LearnerId,
        node: &NodeId,
        xp_reward: u32,
        score: u32,
        now: DateTime<Utc>,
    ) -> RulesResult<CompletionOutcome> {
        self.ledger.try_update(learner, |state| {
            self.apply_completion(state, node, xp_reward, score, now)
        })
    }

    /// Grade a quiz and credit `xp_reward * score / 100` XP. Reaching
    /// `passing_score` also records the unit as completed.
    pub fn submit_quiz(
        &self,
        learner: &LearnerId,
        node: &NodeId,
        xp_reward: u32,
        passing_score: u8,
        submission: QuizSubmission,
        now: DateTime<Utc>,
    ) -> RulesResult<QuizOutcome> {
        self.ledger.try_update(learner, |state| {
            self.apply_quiz(state, node, xp_reward, passing_score, submission, now)
        })
    }

    /// Enroll a learner in a learning path. Returns `false` if already enrolled.
    pub fn enroll(&self, learner: &LearnerId, path_id: &str, now: DateTime<Utc>) -> bool {
        self.ledger
            .update(learner, |state| Self::apply_enrollment(state, path_id, now))
    }

    pub fn apply_enrollment(state: &mut LearnerState, path_id: &str, now: DateTime<Utc>) -> bool {
        match state.learner.enrolled_paths.entry(path_id.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Add XP, recompute the level and unlock any newly earned badges.
    pub fn apply_xp(
        &self,
        state: &mut LearnerState,
        amount: u64,
        kind: ActivityKind,
        now: DateTime<Utc>,
    ) -> RulesResult<XpAward> {
        let previous_level = state.learner.level;
        let activity = ActivityId::new();

        self.credit(state, amount)?;
        state.learner.push_activity(
            ActivityRecord {
                id: activity,
                at: now,
                kind,
                xp: amount,
            },
            self.config.activity_log_capacity,
        );

        let (new_badges, badge_xp) = self.evaluate_badges(state, now)?;
        let award = XpAward {
            activity,
            amount,
            badge_xp,
            total_xp: state.learner.xp,
            previous_level,
            level: state.learner.level,
            new_badges,
        };

        if award.leveled_up() {
            info!(
                learner = %state.learner.id,
                from = %previous_level,
                to = %award.level,
                "Learner leveled up"
            );
        }
        Ok(award)
    }

    /// Record a completion on a locked learner state.
    pub fn apply_completion(
        &self,
        state: &mut LearnerState,
        node: &NodeId,
        xp_reward: u32,
        score: u32,
        now: DateTime<Utc>,
    ) -> RulesResult<CompletionOutcome> {
        if score > 100 {
            return Err(RulesError::InvalidScore { score });
        }
        let score = score as u8;

        state.learner.register_activity_day(now);
        let first_completion = match state.learner.completions.entry(node.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(Completion {
                    score,
                    completed_at: now,
                    last_attempt_at: now,
                    attempts: 1,
                });
                true
            }
            Entry::Occupied(mut slot) => {
                let completion = slot.get_mut();
                completion.score = score;
                completion.last_attempt_at = now;
                completion.attempts += 1;
                false
            }
        };

        let xp = module_xp(xp_reward, score);
        let award = self.apply_xp(
            state,
            xp,
            ActivityKind::ModuleCompleted {
                node: node.clone(),
                score,
            },
            now,
        )?;

        info!(
            learner = %state.learner.id,
            node = %node,
            score,
            xp,
            first_completion,
            "Module completed"
        );

        Ok(CompletionOutcome {
            node: node.clone(),
            score,
            first_completion,
            award,
            path_bonuses: Vec::new(),
        })
    }

    /// Grade a quiz on a locked learner state. A pass goes through
    /// [`apply_completion`](Self::apply_completion); a fail only records the
    /// attempt and its partial XP.
    pub fn apply_quiz(
        &self,
        state: &mut LearnerState,
        node: &NodeId,
        xp_reward: u32,
        passing_score: u8,
        submission: QuizSubmission,
        now: DateTime<Utc>,
    ) -> RulesResult<QuizOutcome> {
        let score = submission.score()?;
        let passed = submission.passes(passing_score);
        let attempt = state.learner.record_quiz_attempt(node, score, now);

        let (completion, award) = if passed {
            let completion = self.apply_completion(state, node, xp_reward, u32::from(score), now)?;
            let award = completion.award.clone();
            (Some(completion), award)
        } else {
            state.learner.register_activity_day(now);
            let award = self.apply_xp(
                state,
                module_xp(xp_reward, score),
                ActivityKind::QuizAttempted {
                    node: node.clone(),
                    score,
                    passed,
                },
                now,
            )?;
            (None, award)
        };

        info!(
            learner = %state.learner.id,
            node = %node,
            score,
            passed,
            attempt,
            "Quiz submitted"
        );

        Ok(QuizOutcome {
            node: node.clone(),
            score,
            passed,
            attempt,
            completion,
            award,
        })
    }

    /// Credit a learning path's completion bonus once per learner.
    /// Returns `None` when the bonus was already paid.
    pub fn apply_path_bonus(
        &self,
        state: &mut LearnerState,
        path_id: &str,
        xp_reward: u32,
        now: DateTime<Utc>,
    ) -> RulesResult<Option<PathBonus>> {
        if state.learner.has_completed_path(path_id) {
            return Ok(None);
        }
        state.learner.completed_paths.insert(path_id.to_string(), now);
        let award = self.apply_xp(
            state,
            u64::from(xp_reward),
            ActivityKind::PathCompleted {
                path: path_id.to_string(),
            },
            now,
        )?;
        info!(learner = %state.learner.id, path = path_id, xp = xp_reward, "Learning path completed");
        Ok(Some(PathBonus {
            path: path_id.to_string(),
            award,
        }))
    }

    /// Count a review toward the streak and credit its XP.
    pub fn apply_review_reward(
        &self,
        state: &mut LearnerState,
        card: &CardId,
        correct: bool,
        xp: u64,
        now: DateTime<Utc>,
    ) -> RulesResult<XpAward> {
        state.learner.register_activity_day(now);
        self.apply_xp(
            state,
            xp,
            ActivityKind::CardReviewed {
                card: card.clone(),
                correct,
            },
            now,
        )
    }

    /// Unlock every badge whose rule now holds, repeating until none remain,
    /// since badge XP can satisfy further rules.
    fn evaluate_badges(
        &self,
        state: &mut LearnerState,
        now: DateTime<Utc>,
    ) -> RulesResult<(Vec<Badge>, u64)> {
        let mut unlocked = Vec::new();
        let mut badge_xp = 0;

        loop {
            let fresh: Vec<Badge> = self
                .catalog
                .newly_satisfied(&state.learner)
                .into_iter()
                .cloned()
                .collect();
            if fresh.is_empty() {
                break;
            }

            for badge in fresh {
                state.learner.badges.insert(badge.id.clone(), now);
                self.credit(state, badge.xp_reward)?;
                badge_xp += badge.xp_reward;
                state.learner.push_activity(
                    ActivityRecord {
                        id: ActivityId::new(),
                        at: now,
                        kind: ActivityKind::BadgeUnlocked {
                            badge: badge.id.clone(),
                        },
                        xp: badge.xp_reward,
                    },
                    self.config.activity_log_capacity,
                );
                info!(learner = %state.learner.id, badge = %badge.id, "Badge unlocked");
                unlocked.push(badge);
            }
        }

        Ok((unlocked, badge_xp))
    }

    fn credit(&self, state: &mut LearnerState, amount: u64) -> RulesResult<()> {
        let learner = &mut state.learner;
        let level = Level::from_xp(learner.xp.saturating_add(amount));
        if level < learner.level {
            return Err(RulesError::invariant(format!(
                "learner {} stored at level {} with only {} xp",
                learner.id, learner.level, learner.xp
            )));
        }
        learner.xp = learner.xp.saturating_add(amount);
        learner.level = level;
        Ok(())
    }

    pub fn stats(&self, learner: &LearnerId) -> GamificationStats {
        self.ledger.read(learner, |state| {
            let learner = &state.learner;
            GamificationStats {
                learner: learner.id.clone(),
                xp: learner.xp,
                level: learner.level,
                level_progress: LevelProgress::for_xp(learner.xp),
                streak: learner.streak,
                badges: learner
                    .badges
                    .iter()
                    .map(|(id, earned_at)| EarnedBadge {
                        id: id.clone(),
                        name: self
                            .catalog
                            .get(id)
                            .map(|b| b.name.clone())
                            .unwrap_or_else(|| id.to_string()),
                        earned_at: *earned_at,
                    })
                    .collect(),
                completed_modules: learner.completion_count(),
            }
        })
    }

    pub fn summary(&self, learner: &LearnerId) -> LearnerSummary {
        self.ledger.read(learner, |state| {
            let learner = &state.learner;
            let stats = learner.review_stats;
            LearnerSummary {
                learner: learner.id.clone(),
                total_completed: learner.completion_count(),
                average_score: learner.average_score().round() as u8,
                reviews: stats.reviews,
                review_accuracy: if stats.reviews == 0 {
                    0.0
                } else {
                    f64::from(stats.correct) / f64::from(stats.reviews)
                },
                xp: learner.xp,
                level: learner.level,
                streak: learner.streak,
            }
        })
    }

    /// Learners ordered by XP (desc), then id.
    pub fn leaderboard(
        &self,
        period: LeaderboardPeriod,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<LeaderboardEntry> {
        let since = now - Duration::days(self.config.leaderboard_window_days);
        let mut learners: Vec<_> = self
            .ledger
            .learners()
            .into_iter()
            .filter(|learner| match period {
                LeaderboardPeriod::AllTime => true,
                LeaderboardPeriod::Weekly => learner.active_since(since),
            })
            .collect();

        learners.sort_by(|a, b| b.xp.cmp(&a.xp).then_with(|| a.id.cmp(&b.id)));
        learners
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, learner)| LeaderboardEntry {
                rank: index + 1,
                learner: learner.id,
                xp: learner.xp,
                level: learner.level,
            })
            .collect()
    }
}

/// XP for a module completion: `xp_reward * score / 100`, rounded.
pub fn module_xp(xp_reward: u32, score: u8) -> u64 {
    (f64::from(xp_reward) * f64::from(score) / 100.0).round() as u64
}
