//! Learning events - what outer layers report to the engine.

use learning_rules::{
    CardId, CompletionOutcome, LearnerId, NodeId, QuizOutcome, ReviewGrade, ReviewOutcome, XpAward,
};
use serde::{Deserialize, Serialize};

/// A learner-side event, applied atomically per learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LearningEvent {
    CardReviewed {
        learner: LearnerId,
        card: CardId,
        grade: ReviewGrade,
    },
    ModuleCompleted {
        learner: LearnerId,
        node: NodeId,
        /// 0-100.
        score: u32,
    },
    QuizSubmitted {
        learner: LearnerId,
        node: NodeId,
        correct: u32,
        total: u32,
    },
    XpAwarded {
        learner: LearnerId,
        amount: u64,
    },
}

impl LearningEvent {
    pub fn card_reviewed(learner: impl Into<LearnerId>, card: impl Into<CardId>, correct: bool) -> Self {
        Self::CardReviewed {
            learner: learner.into(),
            card: card.into(),
            grade: ReviewGrade::from_correct(correct),
        }
    }

    pub fn module_completed(learner: impl Into<LearnerId>, node: impl Into<NodeId>, score: u32) -> Self {
        Self::ModuleCompleted {
            learner: learner.into(),
            node: node.into(),
            score,
        }
    }

    pub fn quiz_submitted(
        learner: impl Into<LearnerId>,
        node: impl Into<NodeId>,
        correct: u32,
        total: u32,
    ) -> Self {
        Self::QuizSubmitted {
            learner: learner.into(),
            node: node.into(),
            correct,
            total,
        }
    }

    pub fn learner(&self) -> &LearnerId {
        match self {
            LearningEvent::CardReviewed { learner, .. }
            | LearningEvent::ModuleCompleted { learner, .. }
            | LearningEvent::QuizSubmitted { learner, .. }
            | LearningEvent::XpAwarded { learner, .. } => learner,
        }
    }
}

/// A review together with the XP it earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub review: ReviewOutcome,
    pub award: XpAward,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventOutcome {
    Reviewed(ReviewResult),
    Completed(CompletionOutcome),
    Quiz(QuizOutcome),
    Awarded(XpAward),
}

impl EventOutcome {
    /// XP credited by the event, badge rewards and path bonuses included.
    pub fn xp_gained(&self) -> u64 {
        match self {
            EventOutcome::Reviewed(ReviewResult { award, .. }) | EventOutcome::Awarded(award) => {
                award.amount + award.badge_xp
            }
            EventOutcome::Completed(outcome) => outcome.xp_gained(),
            EventOutcome::Quiz(outcome) => outcome.xp_gained(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = LearningEvent::module_completed("u1", "sgd", 90);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "module_completed");
        assert_eq!(json["node"], "sgd");

        let parsed: LearningEvent =
            serde_json::from_str(r#"{"type":"card_reviewed","learner":"u1","card":"c1","grade":"hard"}"#).unwrap();
        assert_eq!(parsed.learner(), &LearnerId::from("u1"));
        assert!(matches!(parsed, LearningEvent::CardReviewed { grade: ReviewGrade::Hard, .. }));

        let parsed: LearningEvent = serde_json::from_str(
            r#"{"type":"quiz_submitted","learner":"u1","node":"sgd","correct":3,"total":4}"#,
        )
        .unwrap();
        assert_eq!(parsed, LearningEvent::quiz_submitted("u1", "sgd", 3, 4));
    }
}
