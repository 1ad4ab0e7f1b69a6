//! Graph store - single-writer, snapshot-reader ownership of the concept graph.

use learning_rules::NodeId;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

use super::{Category, ConceptNode, Edge, EdgeKind, KnowledgeGraph, Neighborhood, NodePatch};
use crate::error::KnowledgeResult;

/// Owns the concept graph.
///
/// Writers are serialized by the write lock and validate against the current
/// graph before touching it, so a rejected write changes nothing. Readers clone
/// the current `Arc` and work on that snapshot without holding any lock.
#[derive(Debug, Default)]
pub struct GraphStore {
    graph: RwLock<Arc<KnowledgeGraph>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_graph(graph: KnowledgeGraph) -> Self {
        Self {
            graph: RwLock::new(Arc::new(graph)),
        }
    }

    /// Immutable point-in-time view of the graph.
    pub fn snapshot(&self) -> Arc<KnowledgeGraph> {
        self.graph
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn add_node(&self, node: ConceptNode) -> KnowledgeResult<()> {
        let mut guard = self.graph.write().unwrap_or_else(PoisonError::into_inner);
        guard.validate_node(&node)?;

        let id = node.id.clone();
        let prerequisites = node.prerequisites.len();
        // Copies the graph only while snapshots of the old version are alive.
        Arc::make_mut(&mut guard).insert_node(node);
        info!(node = %id, prerequisites, "Added concept node");
        Ok(())
    }

    /// Add an edge. Returns `false` if an identical edge existed and only its
    /// weight changed.
    pub fn add_edge(&self, edge: Edge) -> KnowledgeResult<bool> {
        let mut guard = self.graph.write().unwrap_or_else(PoisonError::into_inner);
        guard.validate_edge(&edge)?;

        let (from, to, kind) = (edge.from.clone(), edge.to.clone(), edge.kind);
        let added = Arc::make_mut(&mut guard).insert_edge(edge);
        info!(from = %from, to = %to, kind = %kind, added, "Added edge");
        Ok(added)
    }

    /// Apply several mutations as one unit.
    ///
    /// `f` works on a private copy of the graph that replaces the current one
    /// only when `f` succeeds.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&mut KnowledgeGraph) -> KnowledgeResult<T>,
    ) -> KnowledgeResult<T> {
        let mut guard = self.graph.write().unwrap_or_else(PoisonError::into_inner);
        let mut draft = KnowledgeGraph::clone(&guard);
        let output = f(&mut draft)?;
        info!(
            nodes = draft.node_count(),
            edges = draft.edge_count(),
            "Committed graph transaction"
        );
        *guard = Arc::new(draft);
        Ok(output)
    }

    pub fn update_metadata(&self, id: &NodeId, patch: NodePatch) -> KnowledgeResult<ConceptNode> {
        let mut guard = self.graph.write().unwrap_or_else(PoisonError::into_inner);
        guard.require(id)?;
        let node = Arc::make_mut(&mut guard).update_metadata(id, patch)?.clone();
        info!(node = %id, "Updated node metadata");
        Ok(node)
    }

    pub fn get_node(&self, id: &NodeId) -> Option<ConceptNode> {
        self.snapshot().node(id).cloned()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.snapshot().contains(id)
    }

    pub fn neighbors(&self, id: &NodeId, depth: usize) -> KnowledgeResult<Neighborhood> {
        self.snapshot().neighbors(id, depth)
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<ConceptNode> {
        self.snapshot()
            .search(query, limit)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn nodes_in_category(&self, category: &Category) -> Vec<ConceptNode> {
        self.snapshot().nodes_in_category(category).cloned().collect()
    }

    /// Category subgraph built from the current snapshot.
    pub fn subgraph(&self, category: &Category) -> KnowledgeGraph {
        self.snapshot().subgraph(category)
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> Vec<Edge> {
        self.snapshot().edges_of_kind(kind).cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.snapshot().node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.snapshot().edge_count()
    }
}
