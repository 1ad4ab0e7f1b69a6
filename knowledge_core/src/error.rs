//! Error types for the knowledge core.

use learning_rules::{NodeId, RulesError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("node already exists: {0}")]
    DuplicateId(NodeId),
    /// An edge or prerequisite refers to a node that is not in the graph.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("prerequisite {from} -> {to} would create a cycle")]
    CycleDetected { from: NodeId, to: NodeId },
    /// A query named a node that is not in the graph.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("unknown learning path: {0}")]
    UnknownPath(String),
    /// Enrollment before the modules of a prerequisite path are completed.
    #[error("learning path {path} requires completing {prerequisite} first")]
    PathLocked { path: String, prerequisite: String },
    #[error("no eligible learning unit for learner {learner}")]
    NoCandidates { learner: String },
    #[error("validation error: {message}")]
    Validation { message: String },
    #[error(transparent)]
    Rules(#[from] RulesError),
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KnowledgeError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Whether this error came from graph mutation validation.
    pub fn is_graph_rejection(&self) -> bool {
        matches!(
            self,
            Self::DuplicateId(_) | Self::UnknownNode(_) | Self::CycleDetected { .. }
        )
    }
}

pub type KnowledgeResult<T> = Result<T, KnowledgeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use learning_rules::CardId;

    #[test]
    fn test_display_messages() {
        let err = KnowledgeError::CycleDetected {
            from: NodeId::from("b"),
            to: NodeId::from("a"),
        };
        assert_eq!(err.to_string(), "prerequisite b -> a would create a cycle");

        let err = KnowledgeError::NodeNotFound(NodeId::from("zz"));
        assert_eq!(err.to_string(), "node not found: zz");
    }

    #[test]
    fn test_rules_errors_convert() {
        let err: KnowledgeError = RulesError::UnknownCard(CardId::from("c1")).into();
        assert!(matches!(err, KnowledgeError::Rules(RulesError::UnknownCard(_))));
        assert_eq!(err.to_string(), "unknown flashcard: c1");
    }

    #[test]
    fn test_graph_rejection_classification() {
        assert!(KnowledgeError::DuplicateId(NodeId::from("a")).is_graph_rejection());
        assert!(!KnowledgeError::validation("bad").is_graph_rejection());
    }
}
