//! Learner ledger - the per-learner state store.
//!
//! Every learner owns one [`LearnerState`] behind its own mutex. Updates for the
//! same learner are serialized; different learners never contend.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::entities::{CardId, Learner, LearnerId, ReviewRecord};

/// Everything mutable the engine tracks for one learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerState {
    pub learner: Learner,
    /// Review records, created on first review of a card.
    pub reviews: BTreeMap<CardId, ReviewRecord>,
}

impl LearnerState {
    pub fn new(id: LearnerId) -> Self {
        Self {
            learner: Learner::new(id),
            reviews: BTreeMap::new(),
        }
    }

    pub fn review_record(&self, card: &CardId) -> Option<&ReviewRecord> {
        self.reviews.get(card)
    }
}

type Slot = Arc<Mutex<LearnerState>>;

/// Thread-safe map of learner states, created lazily on first interaction.
#[derive(Debug, Default)]
pub struct LearnerLedger {
    learners: DashMap<LearnerId, Slot>,
}

impl LearnerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: &LearnerId) -> Slot {
        self.learners
            .entry(id.clone())
            .or_insert_with(|| {
                debug!(learner = %id, "Creating learner state");
                Arc::new(Mutex::new(LearnerState::new(id.clone())))
            })
            .clone()
    }

    /// Apply `f` atomically to a learner's state.
    ///
    /// `f` works on a draft copy which replaces the stored state only when it
    /// returns `Ok`, so a failed event leaves nothing behind.
    pub fn try_update<T, E>(
        &self,
        id: &LearnerId,
        f: impl FnOnce(&mut LearnerState) -> Result<T, E>,
    ) -> Result<T, E> {
        let slot = self.slot(id);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let mut draft = guard.clone();
        let output = f(&mut draft)?;
        *guard = draft;
        Ok(output)
    }

    /// Apply an infallible mutation to a learner's state.
    pub fn update<T>(&self, id: &LearnerId, f: impl FnOnce(&mut LearnerState) -> T) -> T {
        let slot = self.slot(id);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Read a learner's state under its lock.
    pub fn read<T>(&self, id: &LearnerId, f: impl FnOnce(&LearnerState) -> T) -> T {
        let slot = self.slot(id);
        let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Point-in-time copy of a learner's state.
    pub fn snapshot(&self, id: &LearnerId) -> LearnerState {
        self.read(id, LearnerState::clone)
    }

    pub fn contains(&self, id: &LearnerId) -> bool {
        self.learners.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.learners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.learners.is_empty()
    }

    /// Copies of every learner profile, in no particular order.
    pub fn learners(&self) -> Vec<Learner> {
        // Collect handles first so no shard lock is held while taking learner locks.
        let slots: Vec<Slot> = self.learners.iter().map(|e| e.value().clone()).collect();
        slots
            .iter()
            .map(|slot| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .learner
                    .clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_creation() {
        let ledger = LearnerLedger::new();
        let id = LearnerId::from("u1");
        assert!(!ledger.contains(&id));

        let xp = ledger.read(&id, |state| state.learner.xp);
        assert_eq!(xp, 0);
        assert!(ledger.contains(&id));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_failed_update_leaves_state_untouched() {
        let ledger = LearnerLedger::new();
        let id = LearnerId::from("u1");

        let result: Result<(), &str> = ledger.try_update(&id, |state| {
            state.learner.xp = 500;
            Err("rejected")
        });
        assert!(result.is_err());
        assert_eq!(ledger.snapshot(&id).learner.xp, 0);

        let result: Result<u64, &str> = ledger.try_update(&id, |state| {
            state.learner.xp = 42;
            Ok(state.learner.xp)
        });
        assert_eq!(result, Ok(42));
        assert_eq!(ledger.snapshot(&id).learner.xp, 42);
    }

    #[test]
    fn test_concurrent_updates_same_learner() {
        let ledger = LearnerLedger::new();
        let id = LearnerId::from("u1");

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..250 {
                        let _: Result<(), ()> = ledger.try_update(&id, |state| {
                            state.learner.xp += 1;
                            Ok(())
                        });
                    }
                });
            }
        });

        assert_eq!(ledger.snapshot(&id).learner.xp, 2000);
    }

    #[test]
    fn test_learners_listing() {
        let ledger = LearnerLedger::new();
        ledger.read(&LearnerId::from("a"), |_| ());
        ledger.read(&LearnerId::from("b"), |_| ());
        let mut ids: Vec<_> = ledger.learners().into_iter().map(|l| l.id).collect();
        ids.sort();
        assert_eq!(ids, vec![LearnerId::from("a"), LearnerId::from("b")]);
    }
}
