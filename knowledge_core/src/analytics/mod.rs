//! Analytics Engine - structural analysis of the concept graph.
//!
//! Every query takes its own snapshot from the [`GraphStore`] and runs a
//! bounded, deterministic algorithm on it:
//! 1. **PageRank**: Power iteration with dangling-mass redistribution
//! 2. **Centrality**: Degree and Brandes betweenness
//! 3. **Communities**: Louvain modularity optimization
//! 4. **Shortest path**: BFS with lexicographic tie-breaking
//! 5. **Statistics**: Density, degree distribution, influence

mod centrality;
mod community;
mod pagerank;
mod path;
mod statistics;

pub use centrality::*;
pub use community::*;
pub use pagerank::*;
pub use path::*;
pub use statistics::*;

use learning_rules::NodeId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::{KnowledgeError, KnowledgeResult};
use crate::knowledge_base::GraphStore;

/// Configuration for the analytics algorithms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// PageRank damping factor, in (0, 1).
    pub damping: f64,

    /// PageRank stops once the L1 change between iterations is below this.
    pub tolerance: f64,

    /// Hard cap on PageRank iterations.
    pub max_iterations: usize,

    /// Top-K size when the caller gives none.
    pub default_limit: usize,

    /// Minimum modularity gain for a Louvain move.
    pub louvain_epsilon: f64,

    /// Hard cap on local-moving passes per Louvain level.
    pub louvain_max_passes: usize,

    /// Hard cap on Louvain coarsening levels.
    pub louvain_max_levels: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            tolerance: 1e-6,
            max_iterations: 50,
            default_limit: 20,
            louvain_epsilon: 1e-7,
            louvain_max_passes: 64,
            louvain_max_levels: 16,
        }
    }
}

impl AnalyticsConfig {
    pub fn validate(&self) -> KnowledgeResult<()> {
        if !(self.damping > 0.0 && self.damping < 1.0) {
            return Err(KnowledgeError::validation(format!(
                "analytics.damping {} must be in (0, 1)",
                self.damping
            )));
        }
        if !(self.tolerance > 0.0) {
            return Err(KnowledgeError::validation(
                "analytics.tolerance must be positive",
            ));
        }
        if self.max_iterations == 0 || self.louvain_max_passes == 0 || self.louvain_max_levels == 0 {
            return Err(KnowledgeError::validation(
                "analytics iteration caps must be at least 1",
            ));
        }
        if self.louvain_epsilon < 0.0 {
            return Err(KnowledgeError::validation(
                "analytics.louvain_epsilon must not be negative",
            ));
        }
        Ok(())
    }
}

/// A node with a score, as returned by ranking queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedNode {
    pub node: NodeId,
    pub score: f64,
}

/// Sort by score descending, then node id ascending, and keep `limit`.
pub(crate) fn top_k(mut ranked: Vec<RankedNode>, limit: usize) -> Vec<RankedNode> {
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.node.cmp(&b.node)));
    ranked.truncate(limit);
    ranked
}

/// Runs analytics over snapshots of a shared graph store.
pub struct AnalyticsEngine {
    store: Arc<GraphStore>,
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    pub fn new(store: Arc<GraphStore>, config: AnalyticsConfig) -> Self {
        Self { store, config }
    }

    pub fn with_defaults(store: Arc<GraphStore>) -> Self {
        Self::new(store, AnalyticsConfig::default())
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    fn limit(&self, limit: Option<usize>) -> usize {
        limit.unwrap_or(self.config.default_limit)
    }

    /// Top-K nodes by PageRank.
    pub fn page_rank(&self, limit: Option<usize>) -> Vec<RankedNode> {
        let graph = self.store.snapshot();
        let run = compute_page_rank(&graph, &self.config);
        top_k(run.ranked(), self.limit(limit))
    }

    /// Full PageRank run, including convergence details.
    pub fn page_rank_run(&self) -> PageRankRun {
        compute_page_rank(&self.store.snapshot(), &self.config)
    }

    pub fn centrality(&self, kind: CentralityKind, limit: Option<usize>) -> Vec<RankedNode> {
        let graph = self.store.snapshot();
        let scores = match kind {
            CentralityKind::Degree => degree_centrality(&graph),
            CentralityKind::Betweenness => betweenness_centrality(&graph),
        };
        debug!(kind = %kind, nodes = scores.len(), "Computed centrality");
        top_k(scores, self.limit(limit))
    }

    pub fn communities(&self) -> CommunityResult {
        detect_communities(&self.store.snapshot(), &self.config)
    }

    /// Shortest path, ignoring edge direction.
    pub fn shortest_path(&self, from: &NodeId, to: &NodeId) -> KnowledgeResult<PathResult> {
        self.shortest_path_with_mode(from, to, PathMode::Undirected)
    }

    pub fn shortest_path_with_mode(
        &self,
        from: &NodeId,
        to: &NodeId,
        mode: PathMode,
    ) -> KnowledgeResult<PathResult> {
        shortest_path(&self.store.snapshot(), from, to, mode)
    }

    pub fn graph_statistics(&self) -> GraphStatistics {
        graph_statistics(&self.store.snapshot())
    }

    pub fn degree_distribution(&self) -> Vec<DegreeBucket> {
        degree_distribution(&self.store.snapshot())
    }

    pub fn influence(&self, id: &NodeId) -> KnowledgeResult<Influence> {
        influence(&self.store.snapshot(), id)
    }

    /// Top-K nodes by influence score.
    pub fn most_influential(&self, limit: Option<usize>) -> Vec<RankedNode> {
        let graph = self.store.snapshot();
        let ranked = graph
            .node_ids()
            .filter_map(|id| influence(&graph, id).ok())
            .map(|i| RankedNode {
                node: i.node,
                score: i.score,
            })
            .collect();
        top_k(ranked, self.limit(limit))
    }
}
