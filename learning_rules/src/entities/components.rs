//! Review components: Leitner boxes, intervals, review records and flashcards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CardId, NodeId};
use crate::error::{RulesError, RulesResult};

/// Leitner box number, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct LeitnerBox(u8);

impl LeitnerBox {
    pub const FIRST: LeitnerBox = LeitnerBox(1);
    pub const LAST: LeitnerBox = LeitnerBox(5);

    pub fn new(value: u8) -> RulesResult<Self> {
        if (Self::FIRST.0..=Self::LAST.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RulesError::invariant(format!(
                "leitner box {} outside 1..=5",
                value
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Move up one box, saturating at the last box.
    pub fn promote(self) -> Self {
        Self((self.0 + 1).min(Self::LAST.0))
    }
}

impl Default for LeitnerBox {
    fn default() -> Self {
        Self::FIRST
    }
}

impl TryFrom<u8> for LeitnerBox {
    type Error = RulesError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LeitnerBox> for u8 {
    fn from(value: LeitnerBox) -> Self {
        value.0
    }
}

/// Review interval in whole days, always within `1..=30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ReviewInterval(u32);

impl ReviewInterval {
    pub const MIN: ReviewInterval = ReviewInterval(1);
    pub const MAX: ReviewInterval = ReviewInterval(30);

    pub fn new(days: u32) -> RulesResult<Self> {
        if (Self::MIN.0..=Self::MAX.0).contains(&days) {
            Ok(Self(days))
        } else {
            Err(RulesError::invariant(format!(
                "review interval {} days outside 1..=30",
                days
            )))
        }
    }

    pub fn days(self) -> u32 {
        self.0
    }

    /// Double the interval, saturating at the maximum.
    pub fn doubled(self) -> Self {
        Self((self.0 * 2).min(Self::MAX.0))
    }

    pub fn as_duration(self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.0))
    }
}

impl Default for ReviewInterval {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u32> for ReviewInterval {
    type Error = RulesError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReviewInterval> for u32 {
    fn from(value: ReviewInterval) -> Self {
        value.0
    }
}

/// Review state for one learner and one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub card_id: CardId,
    pub leitner_box: LeitnerBox,
    pub interval: ReviewInterval,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// `None` until the first review.
    pub next_review_at: Option<DateTime<Utc>>,
    pub review_count: u32,
    pub correct_count: u32,
}

impl ReviewRecord {
    /// A never-reviewed record: box 1, one-day interval.
    pub fn new(card_id: CardId) -> Self {
        Self {
            card_id,
            leitner_box: LeitnerBox::FIRST,
            interval: ReviewInterval::MIN,
            last_reviewed_at: None,
            next_review_at: None,
            review_count: 0,
            correct_count: 0,
        }
    }

    pub fn is_new(&self) -> bool {
        self.review_count == 0
    }

    /// Due when never reviewed or when the scheduled time has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at.map_or(true, |next| next <= now)
    }

    /// Fraction of correct reviews, 0.0 when never reviewed.
    pub fn accuracy(&self) -> f64 {
        if self.review_count == 0 {
            0.0
        } else {
            f64::from(self.correct_count) / f64::from(self.review_count)
        }
    }
}

/// A flashcard in the shared deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: CardId,
    /// Concept this card drills, if any.
    pub node: Option<NodeId>,
    pub front: String,
    pub back: String,
    pub explanation: Option<String>,
}

impl Flashcard {
    pub fn new(id: impl Into<String>, front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            id: CardId::new(id),
            node: None,
            front: front.into(),
            back: back.into(),
            explanation: None,
        }
    }

    pub fn for_node(mut self, node: impl Into<NodeId>) -> Self {
        self.node = Some(node.into());
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leitner_box_bounds() {
        assert!(LeitnerBox::new(0).is_err());
        assert!(LeitnerBox::new(6).is_err());
        assert_eq!(LeitnerBox::new(3).unwrap().get(), 3);
        assert_eq!(LeitnerBox::LAST.promote(), LeitnerBox::LAST);
        assert_eq!(LeitnerBox::FIRST.promote().get(), 2);
    }

    #[test]
    fn test_interval_doubling_saturates() {
        let interval = ReviewInterval::new(16).unwrap();
        assert_eq!(interval.doubled().days(), 30);
        assert_eq!(ReviewInterval::MIN.doubled().days(), 2);
        assert!(ReviewInterval::new(31).is_err());
        assert!(ReviewInterval::new(0).is_err());
    }

    #[test]
    fn test_deserialize_rejects_out_of_range_box() {
        let json = r#"{
            "card_id": "c1",
            "leitner_box": 9,
            "interval": 1,
            "last_reviewed_at": null,
            "next_review_at": null,
            "review_count": 0,
            "correct_count": 0
        }"#;
        let parsed: Result<ReviewRecord, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_new_record_is_due() {
        let record = ReviewRecord::new(CardId::from("c1"));
        assert!(record.is_new());
        assert!(record.is_due(Utc::now()));
        assert_eq!(record.accuracy(), 0.0);
    }

    #[test]
    fn test_flashcard_builder() {
        let card = Flashcard::new("c1", "What is SGD?", "Stochastic gradient descent")
            .for_node("sgd")
            .with_explanation("Updates on mini-batches");
        assert_eq!(card.node, Some(NodeId::from("sgd")));
        assert!(card.explanation.is_some());
    }
}
