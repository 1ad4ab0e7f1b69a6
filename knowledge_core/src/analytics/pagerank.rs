//! PageRank by power iteration.

use learning_rules::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use super::{AnalyticsConfig, RankedNode};
use crate::knowledge_base::KnowledgeGraph;

/// Outcome of a PageRank computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRankRun {
    pub scores: BTreeMap<NodeId, f64>,
    pub iterations: usize,
    /// L1 change of the last iteration.
    pub delta: f64,
    pub converged: bool,
}

impl PageRankRun {
    pub fn ranked(&self) -> Vec<RankedNode> {
        self.scores
            .iter()
            .map(|(node, score)| RankedNode {
                node: node.clone(),
                score: *score,
            })
            .collect()
    }
}

/// Compute PageRank for every node.
///
/// Each edge is one link, so parallel edges of different types weigh in
/// proportionally. Nodes without outgoing edges spread their score uniformly
/// over all nodes, which keeps the total at 1.
pub fn compute_page_rank(graph: &KnowledgeGraph, config: &AnalyticsConfig) -> PageRankRun {
    let ids: Vec<&NodeId> = graph.node_ids().collect();
    let n = ids.len();
    if n == 0 {
        return PageRankRun {
            scores: BTreeMap::new(),
            iterations: 0,
            delta: 0.0,
            converged: true,
        };
    }

    let index: HashMap<&NodeId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let targets: Vec<Vec<usize>> = ids
        .iter()
        .map(|id| graph.outgoing(id).iter().map(|e| index[&e.to]).collect())
        .collect();

    let size = n as f64;
    let d = config.damping;
    let mut scores = vec![1.0 / size; n];
    let mut iterations = 0;
    let mut delta = f64::INFINITY;

    while iterations < config.max_iterations {
        iterations += 1;

        let dangling: f64 = targets
            .iter()
            .zip(&scores)
            .filter(|(out, _)| out.is_empty())
            .map(|(_, score)| score)
            .sum();
        let base = (1.0 - d) / size + d * dangling / size;

        let mut next = vec![base; n];
        for (source, out) in targets.iter().enumerate() {
            if out.is_empty() {
                continue;
            }
            let share = d * scores[source] / out.len() as f64;
            for &target in out {
                next[target] += share;
            }
        }

        delta = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
        scores = next;
        if delta < config.tolerance {
            break;
        }
    }

    let converged = delta < config.tolerance;
    if converged {
        debug!(nodes = n, iterations, delta, "PageRank converged");
    } else {
        warn!(nodes = n, iterations, delta, "PageRank stopped at iteration cap");
    }

    PageRankRun {
        scores: ids.into_iter().cloned().zip(scores).collect(),
        iterations,
        delta,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::{ConceptNode, Edge, EdgeKind};

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        for id in nodes {
            graph.add_node(ConceptNode::new(*id, *id)).unwrap();
        }
        for (from, to) in edges {
            graph.add_edge(Edge::new(*from, *to, EdgeKind::EvolvesTo)).unwrap();
        }
        graph
    }

    fn total(run: &PageRankRun) -> f64 {
        run.scores.values().sum()
    }

    #[test]
    fn test_symmetric_pair() {
        let run = compute_page_rank(&graph(&["a", "b"], &[("a", "b"), ("b", "a")]), &AnalyticsConfig::default());
        assert!(run.converged);
        assert!((run.scores[&NodeId::from("a")] - 0.5).abs() < 1e-9);
        assert!((run.scores[&NodeId::from("b")] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_scores_sum_to_one() {
        let cases = [
            graph(&["a"], &[]),
            graph(&["a", "b", "c"], &[("a", "b"), ("a", "c")]),
            graph(
                &["a", "b", "c", "d", "e"],
                &[("a", "b"), ("b", "c"), ("c", "a"), ("d", "a"), ("e", "e"), ("d", "e")],
            ),
        ];
        for g in &cases {
            let run = compute_page_rank(g, &AnalyticsConfig::default());
            assert!((total(&run) - 1.0).abs() < 1e-4, "sum was {}", total(&run));
        }
    }

    #[test]
    fn test_sink_ranks_highest() {
        let g = graph(&["a", "b", "c"], &[("a", "c"), ("b", "c")]);
        let run = compute_page_rank(&g, &AnalyticsConfig::default());
        let top = super::super::top_k(run.ranked(), 1);
        assert_eq!(top[0].node, NodeId::from("c"));
    }

    #[test]
    fn test_iteration_cap_is_respected() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let config = AnalyticsConfig {
            max_iterations: 1,
            tolerance: 1e-15,
            ..AnalyticsConfig::default()
        };
        let run = compute_page_rank(&g, &config);
        assert_eq!(run.iterations, 1);
        assert!(!run.converged);
        assert!((total(&run) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_graph() {
        let run = compute_page_rank(&KnowledgeGraph::new(), &AnalyticsConfig::default());
        assert!(run.scores.is_empty());
        assert!(run.converged);
    }
}
