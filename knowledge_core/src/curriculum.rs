//! Curriculum documents - nodes, edges, learning paths and flashcards in one
//! JSON or TOML file.

use chrono::{DateTime, Utc};
use learning_rules::{Flashcard, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{KnowledgeError, KnowledgeResult};
use crate::knowledge_base::{ConceptNode, Edge, KnowledgeGraph};
use crate::recommendation::LearningPath;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurriculumMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub exported_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    #[serde(default)]
    pub metadata: CurriculumMetadata,
    #[serde(default)]
    pub nodes: Vec<ConceptNode>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub paths: Vec<LearningPath>,
    #[serde(default)]
    pub cards: Vec<Flashcard>,
}

/// Counts of what a curriculum added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub nodes: usize,
    pub edges: usize,
    pub paths: usize,
    pub cards: usize,
}

impl Curriculum {
    pub fn from_json_str(source: &str) -> KnowledgeResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_toml_str(source: &str) -> KnowledgeResult<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn to_json_string(&self) -> KnowledgeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Snapshot a graph, with the given paths and cards, as a document.
    pub fn export(
        graph: &KnowledgeGraph,
        paths: Vec<LearningPath>,
        cards: Vec<Flashcard>,
        exported_at: DateTime<Utc>,
    ) -> Self {
        Self {
            metadata: CurriculumMetadata {
                name: String::new(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                exported_at: Some(exported_at),
            },
            nodes: graph.nodes().cloned().collect(),
            edges: graph.edges().cloned().collect(),
            paths,
            cards,
        }
    }

    /// Nodes ordered so that every prerequisite precedes its dependents.
    ///
    /// Prerequisites may also be satisfied by nodes already in `graph`. Ties
    /// keep document order.
    pub fn ordered_nodes(&self, graph: &KnowledgeGraph) -> KnowledgeResult<Vec<&ConceptNode>> {
        let mut placed: BTreeSet<&NodeId> = BTreeSet::new();
        let mut pending: Vec<&ConceptNode> = self.nodes.iter().collect();
        let mut ordered = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            let before = pending.len();
            pending.retain(|node| {
                let ready = node
                    .prerequisites
                    .iter()
                    .all(|p| placed.contains(p) || graph.contains(p));
                if ready {
                    placed.insert(&node.id);
                    ordered.push(*node);
                }
                !ready
            });

            if pending.len() == before {
                return Err(Self::blocked(&pending, graph));
            }
        }
        Ok(ordered)
    }

    /// Explain why none of `pending` can be placed.
    fn blocked(pending: &[&ConceptNode], graph: &KnowledgeGraph) -> KnowledgeError {
        let waiting: BTreeSet<&NodeId> = pending.iter().map(|n| &n.id).collect();
        for node in pending {
            for prerequisite in &node.prerequisites {
                if !waiting.contains(prerequisite) && !graph.contains(prerequisite) {
                    return KnowledgeError::UnknownNode(prerequisite.clone());
                }
            }
        }
        match pending.first().and_then(|n| n.prerequisites.iter().next().map(|p| (p, &n.id))) {
            Some((from, to)) => KnowledgeError::CycleDetected {
                from: from.clone(),
                to: to.clone(),
            },
            None => KnowledgeError::validation("curriculum nodes could not be ordered"),
        }
    }

    /// Add the nodes and edges to `graph`, nodes in dependency order.
    ///
    /// Stops at the first rejected item; callers that need all-or-nothing run
    /// this inside [`GraphStore::transaction`](crate::knowledge_base::GraphStore::transaction).
    pub fn apply_to(&self, graph: &mut KnowledgeGraph) -> KnowledgeResult<ImportSummary> {
        let mut summary = ImportSummary::default();
        let ordered: Vec<ConceptNode> = self.ordered_nodes(graph)?.into_iter().cloned().collect();
        for node in ordered {
            graph.add_node(node)?;
            summary.nodes += 1;
        }
        let edges_before = graph.edge_count();
        for edge in &self.edges {
            graph.add_edge(edge.clone())?;
        }
        summary.edges = graph.edge_count() - edges_before;
        Ok(summary)
    }
}
