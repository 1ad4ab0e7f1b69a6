//! Whole-graph statistics and per-node influence.

use learning_rules::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::KnowledgeResult;
use crate::knowledge_base::KnowledgeGraph;

/// Outgoing edges weigh more than incoming ones in the influence score.
const OUT_DEGREE_WEIGHT: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    /// `E / (N(N-1))`, 0 below two nodes.
    pub density: f64,
    pub average_degree: f64,
    pub max_degree: usize,
    pub min_degree: usize,
    /// Node count per category name.
    pub categories: BTreeMap<String, usize>,
    /// Edge count per edge type.
    pub edge_kinds: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeBucket {
    pub degree: usize,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Influence {
    pub node: NodeId,
    pub in_degree: usize,
    pub out_degree: usize,
    /// `1.5 * out_degree + in_degree`.
    pub score: f64,
}

pub fn graph_statistics(graph: &KnowledgeGraph) -> GraphStatistics {
    let n = graph.node_count();
    let e = graph.edge_count();
    let degrees: Vec<usize> = graph.node_ids().map(|id| graph.degree(id)).collect();

    let mut categories = BTreeMap::new();
    for node in graph.nodes() {
        *categories.entry(node.category.to_string()).or_insert(0) += 1;
    }
    let mut edge_kinds = BTreeMap::new();
    for edge in graph.edges() {
        *edge_kinds.entry(edge.kind.to_string()).or_insert(0) += 1;
    }

    GraphStatistics {
        node_count: n,
        edge_count: e,
        density: if n > 1 {
            e as f64 / (n * (n - 1)) as f64
        } else {
            0.0
        },
        average_degree: if n > 0 {
            degrees.iter().sum::<usize>() as f64 / n as f64
        } else {
            0.0
        },
        max_degree: degrees.iter().copied().max().unwrap_or(0),
        min_degree: degrees.iter().copied().min().unwrap_or(0),
        categories,
        edge_kinds,
    }
}

/// Number of nodes per total degree, ascending by degree.
pub fn degree_distribution(graph: &KnowledgeGraph) -> Vec<DegreeBucket> {
    let mut buckets: BTreeMap<usize, usize> = BTreeMap::new();
    for id in graph.node_ids() {
        *buckets.entry(graph.degree(id)).or_insert(0) += 1;
    }
    buckets
        .into_iter()
        .map(|(degree, count)| DegreeBucket { degree, count })
        .collect()
}

pub fn influence(graph: &KnowledgeGraph, id: &NodeId) -> KnowledgeResult<Influence> {
    let node = graph.require(id)?;
    let in_degree = graph.in_degree(id);
    let out_degree = graph.out_degree(id);
    Ok(Influence {
        node: node.id.clone(),
        in_degree,
        out_degree,
        score: OUT_DEGREE_WEIGHT * out_degree as f64 + in_degree as f64,
    })
}
