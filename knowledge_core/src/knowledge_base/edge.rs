//! Typed, weighted, directed edges between concepts.

use learning_rules::NodeId;
use serde::{Deserialize, Serialize};

use crate::error::{KnowledgeError, KnowledgeResult};

/// Relationship carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// `from` must be learned before `to`. Must stay acyclic.
    Prerequisite,
    EvolvesTo,
    Combines,
    Contradiction,
    Supplementary,
    AssessmentFlow,
    Unlocks,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 7] = [
        EdgeKind::Prerequisite,
        EdgeKind::EvolvesTo,
        EdgeKind::Combines,
        EdgeKind::Contradiction,
        EdgeKind::Supplementary,
        EdgeKind::AssessmentFlow,
        EdgeKind::Unlocks,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Prerequisite => "prerequisite",
            EdgeKind::EvolvesTo => "evolves_to",
            EdgeKind::Combines => "combines",
            EdgeKind::Contradiction => "contradiction",
            EdgeKind::Supplementary => "supplementary",
            EdgeKind::AssessmentFlow => "assessment_flow",
            EdgeKind::Unlocks => "unlocks",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EdgeKind {
    type Err = KnowledgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EdgeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| KnowledgeError::validation(format!("unknown edge type '{}'", s)))
    }
}

fn default_weight() -> f64 {
    1.0
}

/// A directed edge. At most one edge exists per `(from, to, kind)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Edge {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>, kind: EdgeKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
            weight: default_weight(),
        }
    }

    pub fn prerequisite(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self::new(from, to, EdgeKind::Prerequisite)
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Identity of the edge within the graph.
    pub fn key(&self) -> (&NodeId, &NodeId, EdgeKind) {
        (&self.from, &self.to, self.kind)
    }

    pub(crate) fn validate(&self) -> KnowledgeResult<()> {
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(KnowledgeError::validation(format!(
                "edge {} -> {} has invalid weight {}",
                self.from, self.to, self.weight
            )));
        }
        Ok(())
    }
}
