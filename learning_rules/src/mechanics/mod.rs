//! Learning mechanics: levels, review grades, Leitner transitions and badges.

mod badges;
mod leitner;

pub use badges::*;
pub use leitner::*;

use serde::{Deserialize, Serialize};

/// Minimum total XP for each level, level 1 first. Level 6 is open-ended.
pub const LEVEL_THRESHOLDS: [u64; 6] = [0, 100, 300, 700, 1500, 3000];

/// Learner level, a pure function of total XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(u8);

impl Level {
    pub const MAX: Level = Level(LEVEL_THRESHOLDS.len() as u8);

    /// Look up the level for a total XP amount.
    pub fn from_xp(xp: u64) -> Self {
        let index = LEVEL_THRESHOLDS
            .iter()
            .rposition(|threshold| xp >= *threshold)
            .unwrap_or(0);
        Level(index as u8 + 1)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// XP at which this level starts.
    pub fn floor_xp(self) -> u64 {
        LEVEL_THRESHOLDS[usize::from(self.0 - 1)]
    }

    /// XP at which the next level starts, `None` at the top level.
    pub fn ceiling_xp(self) -> Option<u64> {
        LEVEL_THRESHOLDS.get(usize::from(self.0)).copied()
    }
}

impl Default for Level {
    fn default() -> Self {
        Level(1)
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position inside the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: Level,
    /// 0-100; always 100 at the top level.
    pub percentage: u8,
    /// XP still needed to reach the next level; 0 at the top level.
    pub xp_to_next_level: u64,
}

impl LevelProgress {
    pub fn for_xp(xp: u64) -> Self {
        let level = Level::from_xp(xp);
        match level.ceiling_xp() {
            Some(ceiling) => {
                let floor = level.floor_xp();
                let span = ceiling - floor;
                let percentage = ((xp - floor) as f64 / span as f64 * 100.0).round() as u8;
                Self {
                    level,
                    percentage: percentage.min(100),
                    xp_to_next_level: ceiling - xp,
                }
            }
            None => Self {
                level,
                percentage: 100,
                xp_to_next_level: 0,
            },
        }
    }
}

/// Outcome of a flashcard review.
///
/// `Again` and `Good` are the two-outcome contract (incorrect / correct).
/// `Hard` keeps the card where it is, `Easy` promotes it twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewGrade {
    Again,
    Hard,
    Good,
    Easy,
}

impl ReviewGrade {
    pub fn from_correct(correct: bool) -> Self {
        if correct {
            ReviewGrade::Good
        } else {
            ReviewGrade::Again
        }
    }

    /// Whether the grade counts as a correct recall.
    pub fn is_correct(self) -> bool {
        !matches!(self, ReviewGrade::Again)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(Level::from_xp(0).get(), 1);
        assert_eq!(Level::from_xp(99).get(), 1);
        assert_eq!(Level::from_xp(100).get(), 2);
        assert_eq!(Level::from_xp(299).get(), 2);
        assert_eq!(Level::from_xp(300).get(), 3);
        assert_eq!(Level::from_xp(700).get(), 4);
        assert_eq!(Level::from_xp(1500).get(), 5);
        assert_eq!(Level::from_xp(2999).get(), 5);
        assert_eq!(Level::from_xp(3000).get(), 6);
        assert_eq!(Level::from_xp(u64::MAX), Level::MAX);
    }

    #[test]
    fn test_level_is_monotonic() {
        let mut previous = Level::from_xp(0);
        for xp in (0..4000).step_by(7) {
            let level = Level::from_xp(xp);
            assert!(level >= previous);
            previous = level;
        }
    }

    #[test]
    fn test_level_progress() {
        let progress = LevelProgress::for_xp(200);
        assert_eq!(progress.level.get(), 2);
        assert_eq!(progress.percentage, 50);
        assert_eq!(progress.xp_to_next_level, 100);

        let top = LevelProgress::for_xp(5000);
        assert_eq!(top.level, Level::MAX);
        assert_eq!(top.percentage, 100);
        assert_eq!(top.xp_to_next_level, 0);
    }

    #[test]
    fn test_review_grade_correctness() {
        assert!(!ReviewGrade::Again.is_correct());
        assert!(ReviewGrade::Hard.is_correct());
        assert_eq!(ReviewGrade::from_correct(true), ReviewGrade::Good);
        assert_eq!(ReviewGrade::from_correct(false), ReviewGrade::Again);
    }
}
