//! Shortest paths over the unweighted graph.

use learning_rules::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::error::KnowledgeResult;
use crate::knowledge_base::KnowledgeGraph;

/// Whether edge direction matters when searching for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathMode {
    Directed,
    #[default]
    Undirected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathResult {
    pub found: bool,
    /// Node ids from source to target, empty when not found.
    pub path: Vec<NodeId>,
    /// Hop count, 0 when not found.
    pub distance: usize,
}

impl PathResult {
    fn not_found() -> Self {
        Self {
            found: false,
            path: Vec::new(),
            distance: 0,
        }
    }
}

fn successors<'a>(graph: &'a KnowledgeGraph, id: &NodeId, mode: PathMode) -> BTreeSet<&'a NodeId> {
    match mode {
        PathMode::Directed => graph.outgoing(id).iter().map(|e| &e.to).collect(),
        PathMode::Undirected => graph.undirected_neighbors(id),
    }
}

fn predecessors<'a>(graph: &'a KnowledgeGraph, id: &NodeId, mode: PathMode) -> BTreeSet<&'a NodeId> {
    match mode {
        PathMode::Directed => graph.incoming(id).iter().map(|e| &e.from).collect(),
        PathMode::Undirected => graph.undirected_neighbors(id),
    }
}

/// Shortest path from `from` to `to`.
///
/// Among equally short paths the lexicographically smallest sequence of node
/// ids wins: distances to the target are computed first, then the path is
/// walked forward taking the smallest neighbor one step closer each time.
pub fn shortest_path(
    graph: &KnowledgeGraph,
    from: &NodeId,
    to: &NodeId,
    mode: PathMode,
) -> KnowledgeResult<PathResult> {
    let source = &graph.require(from)?.id;
    let target = &graph.require(to)?.id;

    // Reverse BFS from the target.
    let mut remaining: HashMap<&NodeId, usize> = HashMap::from([(target, 0)]);
    let mut queue = VecDeque::from([target]);
    while let Some(current) = queue.pop_front() {
        if current == source {
            break;
        }
        let distance = remaining[current];
        for previous in predecessors(graph, current, mode) {
            if !remaining.contains_key(previous) {
                remaining.insert(previous, distance + 1);
                queue.push_back(previous);
            }
        }
    }

    let Some(&distance) = remaining.get(source) else {
        return Ok(PathResult::not_found());
    };

    let mut path = vec![source.clone()];
    let mut current = source;
    for step in (0..distance).rev() {
        let next = successors(graph, current, mode)
            .into_iter()
            .find(|candidate| remaining.get(candidate) == Some(&step));
        match next {
            Some(next) => {
                path.push(next.clone());
                current = next;
            }
            None => return Ok(PathResult::not_found()),
        }
    }

    Ok(PathResult {
        found: true,
        path,
        distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KnowledgeError;
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

    fn ids(result: &PathResult) -> Vec<&str> {
        result.path.iter().map(|n| n.as_str()).collect()
    }

    #[test]
    fn test_lexicographic_tie_break() {
        // Two paths of length 2: s-b-t and s-a-t
        let g = graph(&["s", "a", "b", "t"], &[("s", "b"), ("s", "a"), ("b", "t"), ("a", "t")]);
        let result = shortest_path(&g, &NodeId::from("s"), &NodeId::from("t"), PathMode::Directed).unwrap();
        assert!(result.found);
        assert_eq!(ids(&result), vec!["s", "a", "t"]);
        assert_eq!(result.distance, 2);
    }

    #[test]
    fn test_direction_matters_only_in_directed_mode() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("c", "b")]);
        let (a, c) = (NodeId::from("a"), NodeId::from("c"));

        let directed = shortest_path(&g, &a, &c, PathMode::Directed).unwrap();
        assert!(!directed.found);
        assert!(directed.path.is_empty());

        let undirected = shortest_path(&g, &a, &c, PathMode::Undirected).unwrap();
        assert_eq!(ids(&undirected), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_same_node_and_disconnected() {
        let g = graph(&["a", "b"], &[]);
        let same = shortest_path(&g, &NodeId::from("a"), &NodeId::from("a"), PathMode::Undirected).unwrap();
        assert!(same.found);
        assert_eq!(same.distance, 0);
        assert_eq!(ids(&same), vec!["a"]);

        let apart = shortest_path(&g, &NodeId::from("a"), &NodeId::from("b"), PathMode::Undirected).unwrap();
        assert!(!apart.found);
    }

    #[test]
    fn test_unknown_node() {
        let g = graph(&["a"], &[]);
        let err = shortest_path(&g, &NodeId::from("a"), &NodeId::from("zz"), PathMode::Directed).unwrap_err();
        assert!(matches!(err, KnowledgeError::NodeNotFound(id) if id == NodeId::from("zz")));
    }
}
