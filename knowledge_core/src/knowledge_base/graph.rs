//! Knowledge Graph - the concept graph and its read-side queries.
//!
//! A [`KnowledgeGraph`] value is what analytics run on: the [`GraphStore`](super::GraphStore)
//! hands out immutable `Arc<KnowledgeGraph>` snapshots and only mutates a private
//! copy under its write lock.

use learning_rules::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::{Category, ConceptNode, Edge, EdgeKind, NodePatch};
use crate::error::{KnowledgeError, KnowledgeResult};

/// A node reached during neighbourhood expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub node: ConceptNode,
    /// Hops from the origin, ignoring edge direction.
    pub distance: usize,
}

/// Result of [`KnowledgeGraph::neighbors`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    pub origin: NodeId,
    /// Reached nodes ordered by distance, then id. Excludes the origin.
    pub nodes: Vec<Neighbor>,
    /// Every edge whose endpoints are both the origin or a reached node.
    pub edges: Vec<Edge>,
}

/// The concept graph.
///
/// Nodes are kept in id order and every adjacency list in insertion order, so all
/// traversals are deterministic.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    nodes: BTreeMap<NodeId, ConceptNode>,

    /// Outgoing edges per node. Every node has an entry.
    outgoing: BTreeMap<NodeId, Vec<Edge>>,

    /// Reverse index: incoming edges per node.
    incoming: BTreeMap<NodeId, Vec<Edge>>,

    edge_count: usize,
}

impl KnowledgeGraph {
    /// Create a new empty knowledge graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&ConceptNode> {
        self.nodes.get(id)
    }

    /// Look up a node or fail with `NodeNotFound`.
    pub fn require(&self, id: &NodeId) -> KnowledgeResult<&ConceptNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| KnowledgeError::NodeNotFound(id.clone()))
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &ConceptNode> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// All edges, grouped by source in id order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.outgoing.values().flatten()
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> {
        self.edges().filter(move |e| e.kind == kind)
    }

    pub fn outgoing(&self, id: &NodeId) -> &[Edge] {
        self.outgoing.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn incoming(&self, id: &NodeId) -> &[Edge] {
        self.incoming.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn out_degree(&self, id: &NodeId) -> usize {
        self.outgoing(id).len()
    }

    pub fn in_degree(&self, id: &NodeId) -> usize {
        self.incoming(id).len()
    }

    /// In + out edge count.
    pub fn degree(&self, id: &NodeId) -> usize {
        self.in_degree(id) + self.out_degree(id)
    }

    /// Distinct nodes adjacent to `id` in either direction, in id order.
    pub fn undirected_neighbors(&self, id: &NodeId) -> BTreeSet<&NodeId> {
        self.outgoing(id)
            .iter()
            .map(|e| &e.to)
            .chain(self.incoming(id).iter().map(|e| &e.from))
            .filter(|n| *n != id)
            .collect()
    }

    /// Breadth-first expansion up to `depth` hops, ignoring edge direction.
    pub fn neighbors(&self, id: &NodeId, depth: usize) -> KnowledgeResult<Neighborhood> {
        self.require(id)?;

        let mut distances: BTreeMap<&NodeId, usize> = BTreeMap::new();
        distances.insert(id, 0);
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            let distance = distances[current];
            if distance == depth {
                continue;
            }
            for next in self.undirected_neighbors(current) {
                if !distances.contains_key(next) {
                    distances.insert(next, distance + 1);
                    queue.push_back(next);
                }
            }
        }

        let edges = distances
            .keys()
            .flat_map(|n| self.outgoing(n))
            .filter(|e| distances.contains_key(&e.to))
            .cloned()
            .collect();

        let mut nodes: Vec<Neighbor> = distances
            .iter()
            .filter(|(n, _)| **n != id)
            .filter_map(|(n, distance)| {
                self.nodes.get(*n).map(|node| Neighbor {
                    node: node.clone(),
                    distance: *distance,
                })
            })
            .collect();
        nodes.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.node.id.cmp(&b.node.id)));

        Ok(Neighborhood {
            origin: id.clone(),
            nodes,
            edges,
        })
    }

    /// Whether `to` is reachable from `from` along prerequisite edges.
    pub fn has_prerequisite_path(&self, from: &NodeId, to: &NodeId) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            stack.extend(
                self.outgoing(current)
                    .iter()
                    .filter(|e| e.kind == EdgeKind::Prerequisite)
                    .map(|e| &e.to),
            );
        }
        false
    }

    /// Case-insensitive substring search over id, label and description.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&ConceptNode> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.nodes
            .values()
            .filter(|node| node.matches(&needle))
            .take(limit)
            .collect()
    }

    /// Nodes of one category, in id order.
    pub fn nodes_in_category<'a>(&'a self, category: &'a Category) -> impl Iterator<Item = &'a ConceptNode> + 'a {
        self.nodes.values().filter(move |node| &node.category == category)
    }

    /// The graph induced by one category: its nodes and the edges between them.
    ///
    /// Prerequisites outside the category are dropped from the copied nodes,
    /// so the result keeps node prerequisites and prerequisite edges in sync.
    pub fn subgraph(&self, category: &Category) -> KnowledgeGraph {
        let mut sub = KnowledgeGraph::new();
        for node in self.nodes_in_category(category) {
            let mut node = node.clone();
            node.prerequisites.clear();
            sub.insert_node(node);
        }
        for edge in self.edges() {
            if sub.contains(&edge.from) && sub.contains(&edge.to) {
                sub.insert_edge(edge.clone());
            }
        }
        sub
    }

    /// Check that `node` can be inserted, without changing anything.
    pub fn validate_node(&self, node: &ConceptNode) -> KnowledgeResult<()> {
        if self.contains(&node.id) {
            return Err(KnowledgeError::DuplicateId(node.id.clone()));
        }
        if node.passing_score > 100 {
            return Err(KnowledgeError::validation(format!(
                "node {} has passing score {} above 100",
                node.id, node.passing_score
            )));
        }
        if node.prerequisites.contains(&node.id) {
            return Err(KnowledgeError::CycleDetected {
                from: node.id.clone(),
                to: node.id.clone(),
            });
        }
        if let Some(missing) = node.prerequisites.iter().find(|p| !self.contains(p)) {
            return Err(KnowledgeError::UnknownNode(missing.clone()));
        }
        Ok(())
    }

    /// Check that `edge` can be inserted, without changing anything.
    pub fn validate_edge(&self, edge: &Edge) -> KnowledgeResult<()> {
        edge.validate()?;
        for endpoint in [&edge.from, &edge.to] {
            if !self.contains(endpoint) {
                return Err(KnowledgeError::UnknownNode(endpoint.clone()));
            }
        }
        if edge.kind == EdgeKind::Prerequisite
            && (edge.from == edge.to || self.has_prerequisite_path(&edge.to, &edge.from))
        {
            return Err(KnowledgeError::CycleDetected {
                from: edge.from.clone(),
                to: edge.to.clone(),
            });
        }
        Ok(())
    }

    /// Validate and insert a node together with its prerequisite edges.
    pub fn add_node(&mut self, node: ConceptNode) -> KnowledgeResult<()> {
        self.validate_node(&node)?;
        self.insert_node(node);
        Ok(())
    }

    /// Validate and insert an edge. Returns `false` when an identical edge
    /// already existed and only its weight was replaced.
    pub fn add_edge(&mut self, edge: Edge) -> KnowledgeResult<bool> {
        self.validate_edge(&edge)?;
        Ok(self.insert_edge(edge))
    }

    /// Edit analytics-irrelevant metadata.
    pub fn update_metadata(&mut self, id: &NodeId, patch: NodePatch) -> KnowledgeResult<&ConceptNode> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| KnowledgeError::NodeNotFound(id.clone()))?;
        patch.apply(node);
        Ok(node)
    }

    /// Insert a node that already passed [`validate_node`](Self::validate_node).
    pub(crate) fn insert_node(&mut self, node: ConceptNode) {
        let id = node.id.clone();
        let prerequisites: Vec<NodeId> = node.prerequisites.iter().cloned().collect();

        self.outgoing.insert(id.clone(), Vec::new());
        self.incoming.insert(id.clone(), Vec::new());
        self.nodes.insert(id.clone(), node);

        for prerequisite in prerequisites {
            self.insert_edge(Edge::prerequisite(prerequisite, id.clone()));
        }
    }

    /// Insert an edge that already passed [`validate_edge`](Self::validate_edge).
    pub(crate) fn insert_edge(&mut self, edge: Edge) -> bool {
        if edge.kind == EdgeKind::Prerequisite {
            if let Some(target) = self.nodes.get_mut(&edge.to) {
                target.prerequisites.insert(edge.from.clone());
            }
        }

        let outgoing = self.outgoing.entry(edge.from.clone()).or_default();
        if let Some(existing) = outgoing.iter_mut().find(|e| e.key() == edge.key()) {
            existing.weight = edge.weight;
            if let Some(reverse) = self
                .incoming
                .get_mut(&edge.to)
                .and_then(|list| list.iter_mut().find(|e| e.key() == edge.key()))
            {
                reverse.weight = edge.weight;
            }
            return false;
        }

        outgoing.push(edge.clone());
        self.incoming.entry(edge.to.clone()).or_default().push(edge);
        self.edge_count += 1;
        true
    }
}
