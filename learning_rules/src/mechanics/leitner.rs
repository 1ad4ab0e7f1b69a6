//! Leitner box transitions.

use chrono::{DateTime, Utc};

use super::ReviewGrade;
use crate::entities::{LeitnerBox, ReviewInterval, ReviewRecord};

/// Box and interval produced by a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeitnerStep {
    pub leitner_box: LeitnerBox,
    pub interval: ReviewInterval,
}

impl LeitnerStep {
    fn promoted(self, from_first_box: bool) -> Self {
        Self {
            leitner_box: self.leitner_box.promote(),
            // Leaving box 1 starts the one-day interval instead of doubling it.
            interval: if from_first_box {
                ReviewInterval::MIN
            } else {
                self.interval.doubled()
            },
        }
    }
}

/// Compute the next box and interval for a record under `grade`.
pub fn next_step(record: &ReviewRecord, grade: ReviewGrade) -> LeitnerStep {
    let current = LeitnerStep {
        leitner_box: record.leitner_box,
        interval: record.interval,
    };
    let from_first_box = record.leitner_box == LeitnerBox::FIRST;

    match grade {
        ReviewGrade::Again => LeitnerStep {
            leitner_box: LeitnerBox::FIRST,
            interval: ReviewInterval::MIN,
        },
        ReviewGrade::Hard => current,
        ReviewGrade::Good => current.promoted(from_first_box),
        ReviewGrade::Easy => current.promoted(from_first_box).promoted(false),
    }
}

/// Apply a review to `record` in place.
pub fn apply_review(record: &mut ReviewRecord, grade: ReviewGrade, now: DateTime<Utc>) {
    let step = next_step(record, grade);
    record.leitner_box = step.leitner_box;
    record.interval = step.interval;
    record.last_reviewed_at = Some(now);
    record.next_review_at = Some(now + step.interval.as_duration());
    record.review_count += 1;
    if grade.is_correct() {
        record.correct_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::CardId;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_first_two_correct_reviews() {
        let mut record = ReviewRecord::new(CardId::from("c1"));

        apply_review(&mut record, ReviewGrade::Good, now());
        assert_eq!(record.leitner_box.get(), 2);
        assert_eq!(record.interval.days(), 1);
        assert_eq!(record.next_review_at, Some(now() + Duration::days(1)));

        apply_review(&mut record, ReviewGrade::Good, now());
        assert_eq!(record.leitner_box.get(), 3);
        assert_eq!(record.interval.days(), 2);
        assert_eq!(record.review_count, 2);
        assert_eq!(record.correct_count, 2);
    }

    #[test]
    fn test_incorrect_resets() {
        let mut record = ReviewRecord::new(CardId::from("c1"));
        apply_review(&mut record, ReviewGrade::Good, now());
        apply_review(&mut record, ReviewGrade::Good, now());
        apply_review(&mut record, ReviewGrade::Again, now());

        assert_eq!(record.leitner_box, LeitnerBox::FIRST);
        assert_eq!(record.interval, ReviewInterval::MIN);
        assert_eq!(record.review_count, 3);
        assert_eq!(record.correct_count, 2);
    }

    #[test]
    fn test_bounds_hold_for_long_sequences() {
        let grades = [
            ReviewGrade::Good,
            ReviewGrade::Easy,
            ReviewGrade::Good,
            ReviewGrade::Hard,
            ReviewGrade::Again,
            ReviewGrade::Easy,
        ];
        let mut record = ReviewRecord::new(CardId::from("c1"));
        for i in 0..200 {
            apply_review(&mut record, grades[i % grades.len()], now());
            assert!((1..=5).contains(&record.leitner_box.get()));
            assert!((1..=30).contains(&record.interval.days()));
        }

        let mut record = ReviewRecord::new(CardId::from("c2"));
        for _ in 0..20 {
            apply_review(&mut record, ReviewGrade::Good, now());
        }
        assert_eq!(record.leitner_box, LeitnerBox::LAST);
        assert_eq!(record.interval, ReviewInterval::MAX);
    }

    #[test]
    fn test_hard_keeps_position() {
        let mut record = ReviewRecord::new(CardId::from("c1"));
        apply_review(&mut record, ReviewGrade::Good, now());
        apply_review(&mut record, ReviewGrade::Good, now());
        let before = (record.leitner_box, record.interval);

        apply_review(&mut record, ReviewGrade::Hard, now());
        assert_eq!((record.leitner_box, record.interval), before);
        assert_eq!(record.correct_count, 3);
    }

    #[test]
    fn test_easy_promotes_twice() {
        let record = ReviewRecord::new(CardId::from("c1"));
        let step = next_step(&record, ReviewGrade::Easy);
        assert_eq!(step.leitner_box.get(), 3);
        assert_eq!(step.interval.days(), 2);
    }

    #[test]
    fn test_correct_after_reset_restarts_at_one_day() {
        let mut record = ReviewRecord::new(CardId::from("c1"));
        apply_review(&mut record, ReviewGrade::Again, now());
        assert_eq!(record.leitner_box, LeitnerBox::FIRST);

        apply_review(&mut record, ReviewGrade::Good, now());
        assert_eq!(record.leitner_box.get(), 2);
        assert_eq!(record.interval.days(), 1);

        // Same after falling back from a higher box.
        apply_review(&mut record, ReviewGrade::Good, now());
        apply_review(&mut record, ReviewGrade::Good, now());
        assert_eq!(record.interval.days(), 4);
        apply_review(&mut record, ReviewGrade::Again, now());
        apply_review(&mut record, ReviewGrade::Good, now());
        assert_eq!(record.leitner_box.get(), 2);
        assert_eq!(record.interval.days(), 1);
        assert_eq!(record.next_review_at, Some(now() + Duration::days(1)));
    }
}
