//! Recommendation Engine - picks the next learning unit for a learner.
//!
//! Selection works as follows:
//! 1. **Eligibility**: Uncompleted units whose prerequisites are all completed
//! 2. **Ability**: Mean difficulty of the units the learner has completed
//! 3. **Matching**: Candidates closest to that ability come first
//! 4. **Tie-break**: Lower Bloom level, then node id

mod paths;

pub use paths::*;

use learning_rules::{LearnerId, LearnerLedger, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{KnowledgeError, KnowledgeResult};
use crate::knowledge_base::{ConceptNode, GraphStore, KnowledgeGraph};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Number of recommendations when the caller gives no limit.
    pub default_limit: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self { default_limit: 5 }
    }
}

/// A recommended unit together with the numbers that ranked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub node: ConceptNode,
    /// `|difficulty - average_difficulty|`; smaller is a better fit.
    pub challenge_gap: f64,
    pub average_difficulty: f64,
}

/// Mean difficulty of the completed units present in the graph, 0 if none.
pub fn average_difficulty(graph: &KnowledgeGraph, completed: &BTreeSet<NodeId>) -> f64 {
    let difficulties: Vec<f64> = completed
        .iter()
        .filter_map(|id| graph.node(id))
        .map(|node| node.difficulty.value())
        .collect();
    if difficulties.is_empty() {
        0.0
    } else {
        difficulties.iter().sum::<f64>() / difficulties.len() as f64
    }
}

/// Every eligible unit, best fit first.
pub fn rank_candidates(graph: &KnowledgeGraph, completed: &BTreeSet<NodeId>) -> Vec<Recommendation> {
    let average = average_difficulty(graph, completed);

    let mut candidates: Vec<Recommendation> = graph
        .nodes()
        .filter(|node| !completed.contains(&node.id))
        .filter(|node| node.prerequisites.is_subset(completed))
        .map(|node| Recommendation {
            node: node.clone(),
            challenge_gap: (node.difficulty.value() - average).abs(),
            average_difficulty: average,
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.challenge_gap
            .total_cmp(&b.challenge_gap)
            .then_with(|| a.node.bloom_level.cmp(&b.node.bloom_level))
            .then_with(|| a.node.id.cmp(&b.node.id))
    });
    candidates
}

pub struct RecommendationEngine {
    store: Arc<GraphStore>,
    ledger: Arc<LearnerLedger>,
    paths: PathCatalog,
    config: RecommendationConfig,
}

impl RecommendationEngine {
    pub fn new(store: Arc<GraphStore>, ledger: Arc<LearnerLedger>, config: RecommendationConfig) -> Self {
        Self {
            store,
            ledger,
            paths: PathCatalog::new(),
            config,
        }
    }

    pub fn paths(&self) -> &PathCatalog {
        &self.paths
    }

    /// Completed unit ids for a learner. Completions of units missing from
    /// the graph are reported and skipped.
    fn completed(&self, graph: &KnowledgeGraph, learner: &LearnerId) -> BTreeSet<NodeId> {
        let completed: BTreeSet<NodeId> = self
            .ledger
            .read(learner, |state| state.learner.completions.keys().cloned().collect());
        completed
            .into_iter()
            .filter(|id| {
                let known = graph.contains(id);
                if !known {
                    warn!(learner = %learner, node = %id, "Completion refers to a node missing from the graph");
                }
                known
            })
            .collect()
    }

    /// The single best next unit.
    pub fn recommend_next(&self, learner: &LearnerId) -> KnowledgeResult<Recommendation> {
        let mut top = self.recommend(learner, Some(1))?;
        top.pop()
            .ok_or_else(|| KnowledgeError::NoCandidates { learner: learner.to_string() })
    }

    /// Up to `limit` next units, best first. Fails with `NoCandidates` rather
    /// than returning an empty list, and rejects a zero limit.
    pub fn recommend(&self, learner: &LearnerId, limit: Option<usize>) -> KnowledgeResult<Vec<Recommendation>> {
        let limit = limit.unwrap_or(self.config.default_limit);
        if limit == 0 {
            return Err(KnowledgeError::validation("recommendation limit must be at least 1"));
        }
        let graph = self.store.snapshot();
        let completed = self.completed(&graph, learner);
        let mut ranked = rank_candidates(&graph, &completed);

        if ranked.is_empty() {
            return Err(KnowledgeError::NoCandidates {
                learner: learner.to_string(),
            });
        }
        ranked.truncate(limit);

        debug!(
            learner = %learner,
            completed = completed.len(),
            top = %ranked[0].node.id,
            "Ranked recommendations"
        );
        Ok(ranked)
    }

    /// Progress through a learning path.
    pub fn path_progress(&self, learner: &LearnerId, path_id: &str) -> KnowledgeResult<PathProgress> {
        let path = self.paths.require(path_id)?;
        let graph = self.store.snapshot();
        Ok(self
            .ledger
            .read(learner, |state| path.progress(&graph, &state.learner)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::{BloomLevel, Difficulty};
    use chrono::Utc;
    use learning_rules::{Completion, LearnerState};

    fn node(id: &str, difficulty: f64, prerequisites: &[&str]) -> ConceptNode {
        let mut node = ConceptNode::new(id, id.to_uppercase()).with_difficulty(Difficulty::new(difficulty).unwrap());
        for p in prerequisites {
            node = node.with_prerequisite(*p);
        }
        node
    }

    fn completed(ids: &[&str]) -> BTreeSet<NodeId> {
        ids.iter().map(|id| NodeId::from(*id)).collect()
    }

    fn abc() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(node("A", 0.2, &[])).unwrap();
        graph.add_node(node("B", 0.5, &["A"])).unwrap();
        graph.add_node(node("C", 0.9, &["A"])).unwrap();
        graph
    }

    fn complete(ledger: &LearnerLedger, learner: &LearnerId, node: &str) {
        let _: Result<(), ()> = ledger.try_update(learner, |state: &mut LearnerState| {
            let now = Utc::now();
            state.learner.completions.insert(
                NodeId::from(node),
                Completion {
                    score: 100,
                    completed_at: now,
                    last_attempt_at: now,
                    attempts: 1,
                },
            );
            Ok(())
        });
    }

    #[test]
    fn test_closest_difficulty_wins() {
        let ranked = rank_candidates(&abc(), &completed(&["A"]));
        let ids: Vec<_> = ranked.iter().map(|r| r.node.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "C"]);
        assert!((ranked[0].challenge_gap - 0.3).abs() < 1e-12);
        assert!((ranked[0].average_difficulty - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_only_roots_before_any_completion() {
        let ranked = rank_candidates(&abc(), &BTreeSet::new());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].node.id, NodeId::from("A"));
    }

    #[test]
    fn test_ties_break_on_bloom_then_id() {
        let mut graph = KnowledgeGraph::new();
        graph
            .add_node(node("z", 0.0, &[]).with_bloom_level(BloomLevel::new(1).unwrap()))
            .unwrap();
        graph
            .add_node(node("a", 0.0, &[]).with_bloom_level(BloomLevel::new(3).unwrap()))
            .unwrap();
        graph.add_node(node("m", 0.0, &[])).unwrap();

        let ids: Vec<_> = rank_candidates(&graph, &BTreeSet::new())
            .into_iter()
            .map(|r| r.node.id.0)
            .collect();
        assert_eq!(ids, vec!["m", "z", "a"]);
    }

    #[test]
    fn test_engine_reports_no_candidates() {
        let store = Arc::new(GraphStore::from_graph(abc()));
        let ledger = Arc::new(LearnerLedger::new());
        let engine = RecommendationEngine::new(store, ledger.clone(), RecommendationConfig::default());
        let learner = LearnerId::from("u1");

        assert_eq!(engine.recommend_next(&learner).unwrap().node.id, NodeId::from("A"));

        complete(&ledger, &learner, "A");
        assert_eq!(engine.recommend_next(&learner).unwrap().node.id, NodeId::from("B"));
        assert_eq!(engine.recommend(&learner, None).unwrap().len(), 2);

        for id in ["B", "C"] {
            complete(&ledger, &learner, id);
        }
        assert!(matches!(
            engine.recommend_next(&learner),
            Err(KnowledgeError::NoCandidates { .. })
        ));
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let store = Arc::new(GraphStore::from_graph(abc()));
        let engine = RecommendationEngine::new(store, Arc::new(LearnerLedger::new()), RecommendationConfig::default());
        let learner = LearnerId::from("u1");

        assert!(matches!(
            engine.recommend(&learner, Some(0)),
            Err(KnowledgeError::Validation { .. })
        ));
        assert_eq!(engine.recommend(&learner, Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_completions_are_ignored() {
        let store = Arc::new(GraphStore::from_graph(abc()));
        let ledger = Arc::new(LearnerLedger::new());
        let engine = RecommendationEngine::new(store, ledger.clone(), RecommendationConfig::default());
        let learner = LearnerId::from("u1");

        complete(&ledger, &learner, "retired");
        let top = engine.recommend_next(&learner).unwrap();
        assert_eq!(top.node.id, NodeId::from("A"));
        assert_eq!(top.average_difficulty, 0.0);
    }
}
