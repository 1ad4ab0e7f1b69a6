//! Engine configuration, parsed from TOML.
//!
//! ```toml
//! [analytics]
//! damping = 0.85
//! max_iterations = 50
//!
//! [scheduler]
//! review_xp = 5
//! ```
//!
//! Every section and field is optional and falls back to its default.

use learning_rules::{GamificationConfig, SchedulerConfig};
use serde::{Deserialize, Serialize};

use crate::analytics::AnalyticsConfig;
use crate::error::{KnowledgeError, KnowledgeResult};
use crate::recommendation::RecommendationConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub analytics: AnalyticsConfig,
    pub scheduler: SchedulerConfig,
    pub recommendation: RecommendationConfig,
    pub gamification: GamificationConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> KnowledgeResult<Self> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> KnowledgeResult<()> {
        self.analytics.validate()?;
        if self.scheduler.default_due_limit == 0 {
            return Err(KnowledgeError::validation(
                "scheduler.default_due_limit must be at least 1",
            ));
        }
        if self.recommendation.default_limit == 0 {
            return Err(KnowledgeError::validation(
                "recommendation.default_limit must be at least 1",
            ));
        }
        if self.gamification.leaderboard_window_days < 1 {
            return Err(KnowledgeError::validation(
                "gamification.leaderboard_window_days must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.analytics.damping, 0.85);
        assert_eq!(config.analytics.max_iterations, 50);
        assert_eq!(config.scheduler.review_xp, 5);
        assert_eq!(config.scheduler.default_due_limit, 20);
        assert_eq!(config.recommendation.default_limit, 5);
        assert_eq!(config.gamification.leaderboard_window_days, 7);
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_toml_str(
            r#"
            [analytics]
            damping = 0.9

            [scheduler]
            review_xp = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.analytics.damping, 0.9);
        assert_eq!(config.analytics.tolerance, 1e-6);
        assert_eq!(config.scheduler.review_xp, 10);
        assert_eq!(config.scheduler.default_due_limit, 20);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_toml_str("[analytics]\ndamping = 1.5").unwrap_err();
        assert!(matches!(err, KnowledgeError::Validation { .. }));

        let err = EngineConfig::from_toml_str("[analytics]\ndamping = \"high\"").unwrap_err();
        assert!(matches!(err, KnowledgeError::Config(_)));
    }
}
