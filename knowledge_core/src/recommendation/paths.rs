//! Learning paths - curated, ordered sequences of units.

use learning_rules::{Learner, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use tracing::info;

use crate::error::{KnowledgeError, KnowledgeResult};
use crate::knowledge_base::KnowledgeGraph;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Units in the order they are meant to be taken.
    pub modules: Vec<NodeId>,
    /// Paths whose modules must all be completed before enrolling.
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Bonus XP credited once, when an enrolled learner completes every module.
    #[serde(default)]
    pub xp_reward: u32,
}

impl LearningPath {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            modules: Vec::new(),
            prerequisites: Vec::new(),
            xp_reward: 0,
        }
    }

    pub fn with_module(mut self, module: impl Into<NodeId>) -> Self {
        self.modules.push(module.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_prerequisite(mut self, path_id: impl Into<String>) -> Self {
        self.prerequisites.push(path_id.into());
        self
    }

    pub fn with_xp_reward(mut self, xp_reward: u32) -> Self {
        self.xp_reward = xp_reward;
        self
    }

    /// Whether `learner` has completed every module on the path.
    pub fn is_finished_by(&self, learner: &Learner) -> bool {
        self.modules.iter().all(|m| learner.has_completed(m))
    }

    /// Where `learner` stands on this path.
    pub fn progress(&self, graph: &KnowledgeGraph, learner: &Learner) -> PathProgress {
        let completed: Vec<NodeId> = self
            .modules
            .iter()
            .filter(|m| learner.has_completed(m))
            .cloned()
            .collect();

        let percentage = if self.modules.is_empty() {
            100
        } else {
            (completed.len() as f64 / self.modules.len() as f64 * 100.0).round() as u8
        };

        let next_module = self
            .modules
            .iter()
            .filter(|m| !learner.has_completed(m))
            .find(|m| {
                graph.node(m).map_or(false, |node| {
                    node.prerequisites.iter().all(|p| learner.has_completed(p))
                })
            })
            .cloned();

        PathProgress {
            path_id: self.id.clone(),
            enrolled: learner.enrolled_paths.contains_key(&self.id),
            percentage,
            completed,
            next_module,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathProgress {
    pub path_id: String,
    pub enrolled: bool,
    /// Share of the path's modules completed, rounded, 0-100.
    pub percentage: u8,
    pub completed: Vec<NodeId>,
    /// First uncompleted module whose prerequisites are met.
    pub next_module: Option<NodeId>,
}

/// Registered learning paths, keyed by id.
#[derive(Debug, Default)]
pub struct PathCatalog {
    paths: RwLock<BTreeMap<String, LearningPath>>,
}

impl PathCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a path whose modules and prerequisite paths already exist.
    pub fn register(&self, path: LearningPath, graph: &KnowledgeGraph) -> KnowledgeResult<()> {
        let mut paths = self.paths.write().unwrap_or_else(PoisonError::into_inner);
        check_path(&paths, &path, graph)?;
        info!(path = %path.id, modules = path.modules.len(), "Registered learning path");
        paths.insert(path.id.clone(), path);
        Ok(())
    }

    /// Register several paths under one lock. A path may depend on paths listed
    /// before it. Either every path lands or none does.
    pub fn register_all(&self, batch: &[LearningPath], graph: &KnowledgeGraph) -> KnowledgeResult<usize> {
        let mut paths = self.paths.write().unwrap_or_else(PoisonError::into_inner);
        let mut staged = paths.clone();
        for path in batch {
            check_path(&staged, path, graph)?;
            staged.insert(path.id.clone(), path.clone());
        }
        *paths = staged;
        info!(paths = batch.len(), "Registered learning paths");
        Ok(batch.len())
    }

    pub fn get(&self, id: &str) -> Option<LearningPath> {
        self.paths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn require(&self, id: &str) -> KnowledgeResult<LearningPath> {
        self.get(id)
            .ok_or_else(|| KnowledgeError::UnknownPath(id.to_string()))
    }

    /// All paths in id order.
    pub fn list(&self) -> Vec<LearningPath> {
        self.paths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.paths.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_path(
    paths: &BTreeMap<String, LearningPath>,
    path: &LearningPath,
    graph: &KnowledgeGraph,
) -> KnowledgeResult<()> {
    if let Some(missing) = path.modules.iter().find(|m| !graph.contains(m)) {
        return Err(KnowledgeError::UnknownNode(missing.clone()));
    }
    if paths.contains_key(&path.id) {
        return Err(KnowledgeError::validation(format!(
            "learning path already exists: {}",
            path.id
        )));
    }
    if let Some(missing) = path.prerequisites.iter().find(|p| !paths.contains_key(*p)) {
        return Err(KnowledgeError::UnknownPath(missing.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::ConceptNode;
    use chrono::Utc;
    use learning_rules::{Completion, LearnerId};

    fn graph() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(ConceptNode::new("1", "Optimization")).unwrap();
        graph.add_node(ConceptNode::new("2", "Game Theory")).unwrap();
        graph.add_node(ConceptNode::new("10", "SGD").with_prerequisite("1")).unwrap();
        graph
    }

    fn fundamentals() -> LearningPath {
        LearningPath::new("fundamentals", "Fundamentals of ML")
            .with_module("1")
            .with_module("10")
            .with_module("2")
            .with_xp_reward(500)
    }

    #[test]
    fn test_register_validates_references() {
        let catalog = PathCatalog::new();
        let graph = graph();

        let err = catalog
            .register(LearningPath::new("x", "X").with_module("99"), &graph)
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::UnknownNode(_)));

        let err = catalog
            .register(LearningPath::new("x", "X").with_prerequisite("fundamentals"), &graph)
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::UnknownPath(_)));

        catalog.register(fundamentals(), &graph).unwrap();
        assert!(catalog.register(fundamentals(), &graph).is_err());
        assert_eq!(catalog.len(), 1);
        assert!(catalog.require("nope").is_err());
    }

    #[test]
    fn test_register_all_is_all_or_nothing() {
        let catalog = PathCatalog::new();
        let graph = graph();
        let advanced = LearningPath::new("advanced", "Advanced")
            .with_module("10")
            .with_prerequisite("fundamentals");

        // A prerequisite must come earlier in the batch.
        let err = catalog
            .register_all(&[advanced.clone(), fundamentals()], &graph)
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::UnknownPath(ref p) if p == "fundamentals"));
        assert!(catalog.is_empty());

        let err = catalog
            .register_all(&[fundamentals(), LearningPath::new("x", "X").with_module("99")], &graph)
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::UnknownNode(_)));
        assert!(catalog.is_empty());

        assert_eq!(catalog.register_all(&[fundamentals(), advanced], &graph).unwrap(), 2);
        assert_eq!(catalog.len(), 2);
        assert!(catalog.register_all(&[fundamentals()], &graph).is_err());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_progress() {
        let graph = graph();
        let path = fundamentals();
        let mut learner = Learner::new(LearnerId::from("u1"));

        let progress = path.progress(&graph, &learner);
        assert_eq!(progress.percentage, 0);
        assert!(!progress.enrolled);
        // "10" needs "1", so "1" comes first
        assert_eq!(progress.next_module, Some(NodeId::from("1")));

        let now = Utc::now();
        learner.completions.insert(
            NodeId::from("1"),
            Completion {
                score: 90,
                completed_at: now,
                last_attempt_at: now,
                attempts: 1,
            },
        );
        learner.enrolled_paths.insert("fundamentals".to_string(), now);

        let progress = path.progress(&graph, &learner);
        assert!(!path.is_finished_by(&learner));
        assert_eq!(progress.percentage, 33);
        assert!(progress.enrolled);
        assert_eq!(progress.completed, vec![NodeId::from("1")]);
        assert_eq!(progress.next_module, Some(NodeId::from("10")));
    }
}
