//! Spaced repetition scheduler built on the Leitner system.
//!
//! The scheduler owns the shared flashcard deck and reads/writes per-learner
//! review records through the [`LearnerLedger`]. A correct review reports an XP
//! delta; crediting it to the learner is left to the caller so that review and
//! reward can share one critical section.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use crate::entities::{CardId, Flashcard, LearnerId, LeitnerBox, ReviewRecord};
use crate::error::{RulesError, RulesResult};
use crate::ledger::{LearnerLedger, LearnerState};
use crate::mechanics::{self, ReviewGrade};

/// Scheduler tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// XP reported for each correct review.
    pub review_xp: u64,
    /// Cap on due cards when the caller gives none.
    pub default_due_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            review_xp: 5,
            default_due_limit: 20,
        }
    }
}

/// A card due for review together with its current position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueCard {
    pub card: Flashcard,
    pub leitner_box: LeitnerBox,
    pub next_review_at: Option<DateTime<Utc>>,
    pub is_new: bool,
}

/// Result of a single review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub record: ReviewRecord,
    pub grade: ReviewGrade,
    pub xp_delta: u64,
}

/// Per-box card counts for one learner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeckSummary {
    pub total_cards: usize,
    pub new_cards: usize,
    /// Reviewed cards per box, box 1 first.
    pub boxes: [usize; 5],
    pub due_now: usize,
}

pub struct SpacedRepetitionScheduler {
    config: SchedulerConfig,
    deck: RwLock<BTreeMap<CardId, Flashcard>>,
    ledger: Arc<LearnerLedger>,
}

impl SpacedRepetitionScheduler {
    pub fn new(ledger: Arc<LearnerLedger>, config: SchedulerConfig) -> Self {
        Self {
            config,
            deck: RwLock::new(BTreeMap::new()),
            ledger,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Add a card to the shared deck.
    pub fn register_card(&self, card: Flashcard) -> RulesResult<()> {
        let mut deck = self.deck.write().unwrap_or_else(PoisonError::into_inner);
        if deck.contains_key(&card.id) {
            return Err(RulesError::DuplicateCard(card.id));
        }
        debug!(card = %card.id, "Registered flashcard");
        deck.insert(card.id.clone(), card);
        Ok(())
    }

    /// Add several cards at once. Either every card lands or none does.
    pub fn register_cards(&self, cards: Vec<Flashcard>) -> RulesResult<usize> {
        let mut deck = self.deck.write().unwrap_or_else(PoisonError::into_inner);
        let mut seen = BTreeSet::new();
        for card in &cards {
            if deck.contains_key(&card.id) || !seen.insert(&card.id) {
                return Err(RulesError::DuplicateCard(card.id.clone()));
            }
        }
        let count = cards.len();
        for card in cards {
            deck.insert(card.id.clone(), card);
        }
        debug!(cards = count, "Registered flashcards");
        Ok(count)
    }

    /// Take cards out of the deck. Review records for them are left alone.
    pub fn remove_cards<'a>(&self, ids: impl IntoIterator<Item = &'a CardId>) -> usize {
        let mut deck = self.deck.write().unwrap_or_else(PoisonError::into_inner);
        ids.into_iter().filter(|id| deck.remove(*id).is_some()).count()
    }

    pub fn card(&self, id: &CardId) -> Option<Flashcard> {
        self.deck
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn has_card(&self, id: &CardId) -> bool {
        self.deck
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// The whole deck in card id order.
    pub fn cards(&self) -> Vec<Flashcard> {
        self.deck
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn card_count(&self) -> usize {
        self.deck.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Cards due for `learner` at `now`.
    ///
    /// Never-reviewed cards come first (by card id), then reviewed cards by
    /// `next_review_at` ascending. At most `limit` cards, defaulting to
    /// `default_due_limit`.
    pub fn due_cards(
        &self,
        learner: &LearnerId,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Vec<DueCard> {
        let limit = limit.unwrap_or(self.config.default_due_limit);
        self.ledger
            .read(learner, |state| self.collect_due(state, limit, now))
    }

    /// Due-card selection over an already locked learner state.
    pub fn collect_due(&self, state: &LearnerState, limit: usize, now: DateTime<Utc>) -> Vec<DueCard> {
        let deck = self.deck.read().unwrap_or_else(PoisonError::into_inner);

        let mut due: Vec<DueCard> = deck
            .values()
            .filter_map(|card| match state.review_record(&card.id) {
                Some(record) if !record.is_new() => record.is_due(now).then(|| DueCard {
                    card: card.clone(),
                    leitner_box: record.leitner_box,
                    next_review_at: record.next_review_at,
                    is_new: false,
                }),
                _ => Some(DueCard {
                    card: card.clone(),
                    leitner_box: LeitnerBox::FIRST,
                    next_review_at: None,
                    is_new: true,
                }),
            })
            .collect();

        // `None` sorts before `Some`, which puts never-reviewed cards first.
        due.sort_by(|a, b| {
            a.next_review_at
                .cmp(&b.next_review_at)
                .then_with(|| a.card.id.cmp(&b.card.id))
        });
        due.truncate(limit);
        due
    }

    /// Two-outcome review: correct promotes, incorrect resets to box 1.
    pub fn review(
        &self,
        learner: &LearnerId,
        card: &CardId,
        correct: bool,
        now: DateTime<Utc>,
    ) -> RulesResult<ReviewOutcome> {
        self.review_with_grade(learner, card, ReviewGrade::from_correct(correct), now)
    }

    pub fn review_with_grade(
        &self,
        learner: &LearnerId,
        card: &CardId,
        grade: ReviewGrade,
        now: DateTime<Utc>,
    ) -> RulesResult<ReviewOutcome> {
        self.ledger
            .try_update(learner, |state| self.apply_review(state, card, grade, now))
    }

    /// Apply a review to a locked learner state.
    pub fn apply_review(
        &self,
        state: &mut LearnerState,
        card: &CardId,
        grade: ReviewGrade,
        now: DateTime<Utc>,
    ) -> RulesResult<ReviewOutcome> {
        if !self.has_card(card) {
            return Err(RulesError::UnknownCard(card.clone()));
        }

        let record = state
            .reviews
            .entry(card.clone())
            .or_insert_with(|| ReviewRecord::new(card.clone()));
        mechanics::apply_review(record, grade, now);
        let record = record.clone();

        let stats = &mut state.learner.review_stats;
        stats.reviews += 1;
        if grade.is_correct() {
            stats.correct += 1;
        }

        let xp_delta = if grade.is_correct() {
            self.config.review_xp
        } else {
            0
        };

        debug!(
            learner = %state.learner.id,
            card = %card,
            ?grade,
            leitner_box = record.leitner_box.get(),
            interval_days = record.interval.days(),
            "Card reviewed"
        );

        Ok(ReviewOutcome {
            record,
            grade,
            xp_delta,
        })
    }

    /// Box distribution of the deck for `learner`.
    pub fn deck_summary(&self, learner: &LearnerId, now: DateTime<Utc>) -> DeckSummary {
        // Deck lock is released before the learner lock is taken (lock order: learner, deck).
        let card_ids: Vec<CardId> = self
            .deck
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        self.ledger.read(learner, |state| {
            let mut summary = DeckSummary {
                total_cards: card_ids.len(),
                ..DeckSummary::default()
            };
            for id in &card_ids {
                match state.review_record(id) {
                    Some(record) if !record.is_new() => {
                        summary.boxes[usize::from(record.leitner_box.get() - 1)] += 1;
                        if record.is_due(now) {
                            summary.due_now += 1;
                        }
                    }
                    _ => {
                        summary.new_cards += 1;
                        summary.due_now += 1;
                    }
                }
            }
            summary
        })
    }
}
