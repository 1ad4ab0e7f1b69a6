//! Graph store and analytics behaviour through the public engine surface.

use knowledge_core::learning_rules::NodeId;
use knowledge_core::{
    CentralityKind, ConceptNode, Edge, EdgeKind, KnowledgeError, LearningEngine, PathMode,
};

fn id(value: &str) -> NodeId {
    NodeId::from(value)
}

/// opt -> sgd -> adam, opt -> game, plus one supplementary link.
fn small_curriculum() -> LearningEngine {
    let engine = LearningEngine::with_defaults();
    engine.add_node(ConceptNode::new("opt", "Optimization Theory")).unwrap();
    engine.add_node(ConceptNode::new("game", "Game Theory")).unwrap();
    engine
        .add_node(ConceptNode::new("sgd", "Stochastic Gradient Descent").with_prerequisite("opt"))
        .unwrap();
    engine
        .add_node(ConceptNode::new("adam", "Adam").with_prerequisite("sgd"))
        .unwrap();
    engine.add_edge(Edge::prerequisite("opt", "game")).unwrap();
    engine
        .add_edge(Edge::new("game", "adam", EdgeKind::Supplementary).with_weight(0.4))
        .unwrap();
    engine
}

#[test]
fn test_cycle_rejection_leaves_graph_unchanged() {
    let engine = small_curriculum();
    let before = engine.store().snapshot();

    let err = engine.add_edge(Edge::prerequisite("adam", "opt")).unwrap_err();
    assert!(matches!(err, KnowledgeError::CycleDetected { .. }));
    assert!(err.is_graph_rejection());

    let err = engine.add_edge(Edge::prerequisite("sgd", "sgd")).unwrap_err();
    assert!(matches!(err, KnowledgeError::CycleDetected { .. }));

    let after = engine.store().snapshot();
    assert_eq!(after.edge_count(), before.edge_count());
    assert_eq!(after.node_count(), before.node_count());
    assert!(engine.get_node(&id("opt")).unwrap().prerequisites.is_empty());

    // Non-prerequisite edges may point backwards.
    engine
        .add_edge(Edge::new("adam", "opt", EdgeKind::EvolvesTo))
        .unwrap();
    assert_eq!(engine.store().edge_count(), before.edge_count() + 1);
}

#[test]
fn test_rejected_nodes() {
    let engine = small_curriculum();
    assert!(matches!(
        engine.add_node(ConceptNode::new("opt", "Again")),
        Err(KnowledgeError::DuplicateId(_))
    ));
    assert!(matches!(
        engine.add_node(ConceptNode::new("x", "X").with_prerequisite("ghost")),
        Err(KnowledgeError::UnknownNode(_))
    ));
    assert!(matches!(
        engine.add_edge(Edge::new("opt", "ghost", EdgeKind::Unlocks)),
        Err(KnowledgeError::UnknownNode(_))
    ));
    assert_eq!(engine.store().node_count(), 4);
}

#[test]
fn test_symmetric_pair_page_rank() {
    let engine = LearningEngine::with_defaults();
    engine.add_node(ConceptNode::new("A", "A")).unwrap();
    engine.add_node(ConceptNode::new("B", "B")).unwrap();
    engine.add_edge(Edge::new("A", "B", EdgeKind::Combines)).unwrap();
    engine.add_edge(Edge::new("B", "A", EdgeKind::Combines)).unwrap();

    let ranked = engine.page_rank(None);
    assert_eq!(ranked.len(), 2);
    for entry in &ranked {
        assert!((entry.score - 0.5).abs() < 1e-6);
    }
    // Equal scores fall back to id order.
    assert_eq!(ranked[0].node, id("A"));
}

#[test]
fn test_page_rank_sums_to_one() {
    let engine = small_curriculum();
    let run = engine.analytics().page_rank_run();
    let total: f64 = run.scores.values().sum();
    assert!((total - 1.0).abs() < 1e-4);

    let top = engine.page_rank(Some(1));
    assert_eq!(top.len(), 1);
    // adam collects rank from both sgd and game
    assert_eq!(top[0].node, id("adam"));
}

#[test]
fn test_empty_graph_yields_empty_results() {
    let engine = LearningEngine::with_defaults();
    assert!(engine.page_rank(None).is_empty());
    assert!(engine.centrality(CentralityKind::Betweenness, None).is_empty());
    assert!(engine.communities().communities.is_empty());
    assert_eq!(engine.graph_statistics().node_count, 0);
}

#[test]
fn test_betweenness_splits_between_parallel_routes() {
    let engine = small_curriculum();
    let ranked = engine.centrality(CentralityKind::Betweenness, None);
    let score = |node: &str| ranked.iter().find(|r| r.node == id(node)).unwrap().score;
    // opt reaches adam through sgd or game, half of the pair each, over 3 * 2 pairs.
    assert!((score("sgd") - 0.5 / 6.0).abs() < 1e-12);
    assert!((score("game") - 0.5 / 6.0).abs() < 1e-12);
    assert_eq!(score("opt"), 0.0);
    assert_eq!(score("adam"), 0.0);
}

#[test]
fn test_shortest_path_modes() {
    let engine = small_curriculum();

    let path = engine.shortest_path(&id("adam"), &id("opt")).unwrap();
    assert!(path.found);
    assert_eq!(path.distance, 2);
    assert_eq!(path.path.first(), Some(&id("adam")));
    assert_eq!(path.path.last(), Some(&id("opt")));

    let directed = engine
        .shortest_path_with_mode(&id("adam"), &id("opt"), PathMode::Directed)
        .unwrap();
    assert!(!directed.found);
    assert!(directed.path.is_empty());

    assert!(matches!(
        engine.shortest_path(&id("adam"), &id("ghost")),
        Err(KnowledgeError::NodeNotFound(_))
    ));
}

#[test]
fn test_communities_cover_every_node() {
    let engine = small_curriculum();
    let result = engine.communities();
    let members: usize = result.communities.iter().map(|c| c.members.len()).sum();
    assert_eq!(members, 4);
    assert_eq!(result.partition.len(), 4);
}

#[test]
fn test_neighbors_and_search() {
    let engine = small_curriculum();
    let neighborhood = engine.neighbors(&id("opt"), 1).unwrap();
    let mut ids: Vec<_> = neighborhood.nodes.iter().map(|n| n.node.id.clone()).collect();
    ids.sort();
    assert_eq!(ids, vec![id("game"), id("sgd")]);

    let hits = engine.search("theory", 10);
    assert_eq!(hits.len(), 2);
}
