//! Louvain community detection.
//!
//! Runs on the undirected weighted projection of the graph: the weight between
//! two nodes is the sum of all edge weights between them in either direction.
//! Nodes are visited in id order and ties keep the lower community index, so the
//! partition is deterministic.

use learning_rules::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::AnalyticsConfig;
use crate::knowledge_base::KnowledgeGraph;

/// A detected community. Ids are assigned in order of each community's
/// smallest member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub id: usize,
    pub members: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityResult {
    /// Node -> community id.
    pub partition: BTreeMap<NodeId, usize>,
    pub communities: Vec<Community>,
    /// Modularity of the final partition on the original graph.
    pub modularity: f64,
    /// Coarsening levels that improved the partition.
    pub levels: usize,
}

/// Undirected weighted graph over dense indices.
struct WeightedGraph {
    /// Neighbor -> weight, self-loops excluded.
    links: Vec<BTreeMap<usize, f64>>,
    /// Self-loop weight per node.
    loops: Vec<f64>,
}

impl WeightedGraph {
    fn from_knowledge_graph(graph: &KnowledgeGraph, index: &HashMap<&NodeId, usize>) -> Self {
        let n = index.len();
        let mut links = vec![BTreeMap::new(); n];
        let mut loops = vec![0.0; n];
        for edge in graph.edges() {
            let (u, v) = (index[&edge.from], index[&edge.to]);
            if u == v {
                loops[u] += edge.weight;
            } else {
                *links[u].entry(v).or_insert(0.0) += edge.weight;
                *links[v].entry(u).or_insert(0.0) += edge.weight;
            }
        }
        Self { links, loops }
    }

    fn len(&self) -> usize {
        self.loops.len()
    }

    /// Weighted degree, with self-loops counted twice.
    fn degree(&self, node: usize) -> f64 {
        self.links[node].values().sum::<f64>() + 2.0 * self.loops[node]
    }

    /// Sum of all degrees, i.e. twice the total edge weight.
    fn total_degree(&self) -> f64 {
        (0..self.len()).map(|i| self.degree(i)).sum()
    }

    /// Collapse each community into a single node.
    fn aggregate(&self, membership: &[usize], communities: usize) -> Self {
        let mut links = vec![BTreeMap::new(); communities];
        let mut loops = vec![0.0; communities];
        for (u, neighbors) in self.links.iter().enumerate() {
            let cu = membership[u];
            loops[cu] += self.loops[u];
            for (&v, &weight) in neighbors {
                let cv = membership[v];
                if cu == cv {
                    // Each internal link is seen from both ends.
                    if u < v {
                        loops[cu] += weight;
                    }
                } else {
                    *links[cu].entry(cv).or_insert(0.0) += weight;
                }
            }
        }
        Self { links, loops }
    }

    fn modularity(&self, membership: &[usize]) -> f64 {
        let m2 = self.total_degree();
        if m2 == 0.0 {
            return 0.0;
        }
        // Indexed by label and summed in label order, so repeated calls agree bit for bit.
        let communities = membership.iter().max().map_or(0, |&c| c + 1);
        let mut internal = vec![0.0; communities];
        let mut totals = vec![0.0; communities];
        for u in 0..self.len() {
            let c = membership[u];
            totals[c] += self.degree(u);
            internal[c] += 2.0 * self.loops[u];
            for (&v, &weight) in &self.links[u] {
                if membership[v] == c {
                    internal[c] += weight;
                }
            }
        }
        totals
            .iter()
            .zip(&internal)
            .map(|(total, inner)| inner / m2 - (total / m2).powi(2))
            .sum()
    }
}

/// Local moving phase. Returns the membership and whether any node moved.
fn move_nodes(graph: &WeightedGraph, config: &AnalyticsConfig) -> (Vec<usize>, bool) {
    let n = graph.len();
    let m2 = graph.total_degree();
    let mut membership: Vec<usize> = (0..n).collect();
    let degrees: Vec<f64> = (0..n).map(|i| graph.degree(i)).collect();
    let mut totals = degrees.clone();
    let mut moved_any = false;

    if m2 == 0.0 {
        return (membership, false);
    }

    for _ in 0..config.louvain_max_passes {
        let mut moved = false;
        for node in 0..n {
            let current = membership[node];
            let k = degrees[node];
            totals[current] -= k;

            let mut weight_to: BTreeMap<usize, f64> = BTreeMap::new();
            for (&neighbor, &weight) in &graph.links[node] {
                *weight_to.entry(membership[neighbor]).or_insert(0.0) += weight;
            }

            // Gain of joining `c`, scaled by m: k_in(c) - tot(c) * k / 2m.
            let gain = |c: usize| weight_to.get(&c).copied().unwrap_or(0.0) - totals[c] * k / m2;

            let mut best = current;
            let mut best_gain = gain(current);
            for &candidate in weight_to.keys() {
                let candidate_gain = gain(candidate);
                if candidate_gain > best_gain + config.louvain_epsilon {
                    best = candidate;
                    best_gain = candidate_gain;
                }
            }

            totals[best] += k;
            if best != current {
                membership[node] = best;
                moved = true;
                moved_any = true;
            }
        }
        if !moved {
            break;
        }
    }

    (membership, moved_any)
}

/// Renumber community labels densely, in order of first appearance.
fn compact(membership: &mut [usize]) -> usize {
    let mut labels: Vec<Option<usize>> = vec![None; membership.iter().max().map_or(0, |&c| c + 1)];
    let mut count = 0;
    for label in membership.iter_mut() {
        let slot = &mut labels[*label];
        *label = *slot.get_or_insert_with(|| {
            count += 1;
            count - 1
        });
    }
    count
}

/// Partition the graph with the Louvain method.
pub fn detect_communities(graph: &KnowledgeGraph, config: &AnalyticsConfig) -> CommunityResult {
    let ids: Vec<&NodeId> = graph.node_ids().collect();
    let index: HashMap<&NodeId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let original = WeightedGraph::from_knowledge_graph(graph, &index);

    // Community of each original node.
    let mut assignment: Vec<usize> = (0..ids.len()).collect();
    let mut current = WeightedGraph::from_knowledge_graph(graph, &index);
    let mut levels = 0;

    while levels < config.louvain_max_levels {
        let (mut membership, moved) = move_nodes(&current, config);
        if !moved {
            break;
        }
        let count = compact(&mut membership);
        for community in assignment.iter_mut() {
            *community = membership[*community];
        }
        current = current.aggregate(&membership, count);
        levels += 1;
    }

    // Original node indices follow id order, so first appearance is the smallest member.
    compact(&mut assignment);
    let modularity = original.modularity(&assignment);

    let mut communities: Vec<Community> = Vec::new();
    let mut partition = BTreeMap::new();
    for (id, &community) in ids.iter().zip(&assignment) {
        if community == communities.len() {
            communities.push(Community {
                id: community,
                members: Vec::new(),
            });
        }
        communities[community].members.push((*id).clone());
        partition.insert((*id).clone(), community);
    }

    debug!(
        nodes = ids.len(),
        communities = communities.len(),
        levels,
        modularity,
        "Detected communities"
    );

    CommunityResult {
        partition,
        communities,
        modularity,
        levels,
    }
}
