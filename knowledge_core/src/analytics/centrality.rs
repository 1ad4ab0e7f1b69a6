//! Degree and betweenness centrality.

use learning_rules::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};

use super::RankedNode;
use crate::error::KnowledgeError;
use crate::knowledge_base::KnowledgeGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralityKind {
    /// In + out edge count.
    Degree,
    /// Normalized Brandes betweenness over unweighted directed paths.
    Betweenness,
}

impl CentralityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CentralityKind::Degree => "degree",
            CentralityKind::Betweenness => "betweenness",
        }
    }
}

impl std::fmt::Display for CentralityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CentralityKind {
    type Err = KnowledgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "degree" => Ok(CentralityKind::Degree),
            "betweenness" => Ok(CentralityKind::Betweenness),
            other => Err(KnowledgeError::validation(format!(
                "unknown centrality metric '{}'",
                other
            ))),
        }
    }
}

/// Degree centrality for every node, in id order.
pub fn degree_centrality(graph: &KnowledgeGraph) -> Vec<RankedNode> {
    graph
        .node_ids()
        .map(|id| RankedNode {
            node: id.clone(),
            score: graph.degree(id) as f64,
        })
        .collect()
}

/// Betweenness centrality for every node, in id order.
///
/// Parallel edges count once. Scores are normalized by `(n-1)(n-2)`, the
/// number of ordered pairs that exclude the node itself; graphs with fewer
/// than three nodes score zero everywhere.
pub fn betweenness_centrality(graph: &KnowledgeGraph) -> Vec<RankedNode> {
    let ids: Vec<&NodeId> = graph.node_ids().collect();
    let n = ids.len();
    let index: HashMap<&NodeId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let adjacency: Vec<Vec<usize>> = ids
        .iter()
        .map(|id| {
            graph
                .outgoing(id)
                .iter()
                .map(|e| index[&e.to])
                .filter(|t| *t != index[*id])
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        })
        .collect();

    let mut centrality = vec![0.0; n];
    for source in 0..n {
        accumulate_from(source, &adjacency, &mut centrality);
    }

    let scale = if n > 2 {
        1.0 / ((n - 1) * (n - 2)) as f64
    } else {
        0.0
    };

    ids.into_iter()
        .zip(centrality)
        .map(|(id, value)| RankedNode {
            node: id.clone(),
            score: value * scale,
        })
        .collect()
}

/// One Brandes single-source pass: BFS counting shortest paths, then
/// dependency accumulation in reverse BFS order.
fn accumulate_from(source: usize, adjacency: &[Vec<usize>], centrality: &mut [f64]) {
    let n = adjacency.len();
    let mut order = Vec::with_capacity(n);
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0_f64; n];
    let mut distance: Vec<Option<usize>> = vec![None; n];

    sigma[source] = 1.0;
    distance[source] = Some(0);
    let mut queue = VecDeque::from([source]);

    while let Some(v) = queue.pop_front() {
        order.push(v);
        let next_distance = distance[v].map_or(0, |d| d + 1);
        for &w in &adjacency[v] {
            if distance[w].is_none() {
                distance[w] = Some(next_distance);
                queue.push_back(w);
            }
            if distance[w] == Some(next_distance) {
                sigma[w] += sigma[v];
                predecessors[w].push(v);
            }
        }
    }

    let mut delta = vec![0.0_f64; n];
    for &w in order.iter().rev() {
        for &v in &predecessors[w] {
            delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
        }
        if w != source {
            centrality[w] += delta[w];
        }
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
            graph.add_edge(Edge::new(*from, *to, EdgeKind::Unlocks)).unwrap();
        }
        graph
    }

    fn score(scores: &[RankedNode], id: &str) -> f64 {
        scores
            .iter()
            .find(|r| r.node.as_str() == id)
            .map(|r| r.score)
            .unwrap()
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Betweenness".parse::<CentralityKind>().unwrap(), CentralityKind::Betweenness);
        assert!("closeness".parse::<CentralityKind>().is_err());
    }

    #[test]
    fn test_degree_counts_parallel_edges() {
        let mut g = graph(&["a", "b"], &[("a", "b")]);
        g.add_edge(Edge::new("a", "b", EdgeKind::Combines)).unwrap();
        let scores = degree_centrality(&g);
        assert_eq!(score(&scores, "a"), 2.0);
        assert_eq!(score(&scores, "b"), 2.0);
    }

    #[test]
    fn test_betweenness_on_a_directed_chain() {
        // a -> b -> c: only b lies between a pair (a, c)
        let scores = betweenness_centrality(&graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]));
        assert_eq!(score(&scores, "a"), 0.0);
        assert!((score(&scores, "b") - 0.5).abs() < 1e-12);
        assert_eq!(score(&scores, "c"), 0.0);
    }

    #[test]
    fn test_betweenness_splits_over_equal_paths() {
        // s -> x -> t and s -> y -> t: x and y each carry half of (s, t)
        let g = graph(
            &["s", "t", "x", "y"],
            &[("s", "x"), ("s", "y"), ("x", "t"), ("y", "t")],
        );
        let scores = betweenness_centrality(&g);
        let expected = 0.5 / 6.0;
        assert!((score(&scores, "x") - expected).abs() < 1e-12);
        assert!((score(&scores, "y") - expected).abs() < 1e-12);
        assert_eq!(score(&scores, "s"), 0.0);
    }

    #[test]
    fn test_small_graphs_score_zero() {
        let scores = betweenness_centrality(&graph(&["a", "b"], &[("a", "b"), ("b", "a")]));
        assert!(scores.iter().all(|r| r.score == 0.0));
    }
}
