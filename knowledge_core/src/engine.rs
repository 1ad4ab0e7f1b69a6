//! Learning engine - the composition root.
//!
//! Owns one graph store and one learner ledger and wires every component to
//! them. This is the operation surface outer layers (HTTP handlers, bots)
//! call into.

use chrono::{DateTime, Utc};
use learning_rules::{
    BadgeCatalog, CardId, CompletionOutcome, DeckSummary, DueCard, Flashcard, GamificationEngine,
    GamificationStats, LeaderboardEntry, LeaderboardPeriod, LearnerId, LearnerLedger, LearnerState,
    LearnerSummary, LevelProgress, NodeId, PathBonus, QuizOutcome, QuizSubmission, ReviewGrade,
    RulesError, SpacedRepetitionScheduler, XpAward,
};
use std::sync::Arc;
use tracing::info;

use crate::analytics::{
    AnalyticsEngine, CentralityKind, CommunityResult, DegreeBucket, GraphStatistics, Influence,
    PathMode, PathResult, RankedNode,
};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::curriculum::{Curriculum, ImportSummary};
use crate::error::{KnowledgeError, KnowledgeResult};
use crate::events::{EventOutcome, LearningEvent, ReviewResult};
use crate::knowledge_base::{
    Category, ConceptNode, Edge, GraphStore, KnowledgeGraph, Neighborhood, NodePatch,
};
use crate::recommendation::{LearningPath, PathProgress, Recommendation, RecommendationEngine};

pub struct LearningEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    store: Arc<GraphStore>,
    ledger: Arc<LearnerLedger>,
    analytics: AnalyticsEngine,
    scheduler: SpacedRepetitionScheduler,
    recommendations: RecommendationEngine,
    gamification: GamificationEngine,
}

impl LearningEngine {
    /// Create an engine on the system clock.
    pub fn new(config: EngineConfig) -> KnowledgeResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::build(EngineConfig::default(), Arc::new(SystemClock))
    }

    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> KnowledgeResult<Self> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(GraphStore::new());
        let ledger = Arc::new(LearnerLedger::new());
        Self {
            analytics: AnalyticsEngine::new(store.clone(), config.analytics.clone()),
            scheduler: SpacedRepetitionScheduler::new(ledger.clone(), config.scheduler.clone()),
            recommendations: RecommendationEngine::new(
                store.clone(),
                ledger.clone(),
                config.recommendation.clone(),
            ),
            gamification: GamificationEngine::new(
                ledger.clone(),
                BadgeCatalog::default(),
                config.gamification.clone(),
            ),
            config,
            clock,
            store,
            ledger,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    pub fn ledger(&self) -> &Arc<LearnerLedger> {
        &self.ledger
    }

    pub fn analytics(&self) -> &AnalyticsEngine {
        &self.analytics
    }

    pub fn scheduler(&self) -> &SpacedRepetitionScheduler {
        &self.scheduler
    }

    pub fn recommendations(&self) -> &RecommendationEngine {
        &self.recommendations
    }

    pub fn gamification(&self) -> &GamificationEngine {
        &self.gamification
    }

    // Graph

    pub fn add_node(&self, node: ConceptNode) -> KnowledgeResult<()> {
        self.store.add_node(node)
    }

    pub fn add_edge(&self, edge: Edge) -> KnowledgeResult<bool> {
        self.store.add_edge(edge)
    }

    pub fn update_node(&self, id: &NodeId, patch: NodePatch) -> KnowledgeResult<ConceptNode> {
        self.store.update_metadata(id, patch)
    }

    pub fn get_node(&self, id: &NodeId) -> KnowledgeResult<ConceptNode> {
        self.store
            .get_node(id)
            .ok_or_else(|| KnowledgeError::NodeNotFound(id.clone()))
    }

    pub fn neighbors(&self, id: &NodeId, depth: usize) -> KnowledgeResult<Neighborhood> {
        self.store.neighbors(id, depth)
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<ConceptNode> {
        self.store.search(query, limit)
    }

    pub fn nodes_in_category(&self, category: &Category) -> Vec<ConceptNode> {
        self.store.nodes_in_category(category)
    }

    /// The nodes of one category and the edges between them.
    pub fn subgraph(&self, category: &Category) -> KnowledgeGraph {
        self.store.subgraph(category)
    }

    // Analytics

    pub fn page_rank(&self, limit: Option<usize>) -> Vec<RankedNode> {
        self.analytics.page_rank(limit)
    }

    pub fn centrality(&self, kind: CentralityKind, limit: Option<usize>) -> Vec<RankedNode> {
        self.analytics.centrality(kind, limit)
    }

    pub fn communities(&self) -> CommunityResult {
        self.analytics.communities()
    }

    pub fn shortest_path(&self, from: &NodeId, to: &NodeId) -> KnowledgeResult<PathResult> {
        self.analytics.shortest_path(from, to)
    }

    pub fn shortest_path_with_mode(
        &self,
        from: &NodeId,
        to: &NodeId,
        mode: PathMode,
    ) -> KnowledgeResult<PathResult> {
        self.analytics.shortest_path_with_mode(from, to, mode)
    }

    pub fn graph_statistics(&self) -> GraphStatistics {
        self.analytics.graph_statistics()
    }

    pub fn degree_distribution(&self) -> Vec<DegreeBucket> {
        self.analytics.degree_distribution()
    }

    pub fn influence(&self, id: &NodeId) -> KnowledgeResult<Influence> {
        self.analytics.influence(id)
    }

    // Spaced repetition

    /// Add a flashcard. A card tied to a node requires that node to exist.
    pub fn register_card(&self, card: Flashcard) -> KnowledgeResult<()> {
        if let Some(node) = &card.node {
            if !self.store.contains(node) {
                return Err(KnowledgeError::UnknownNode(node.clone()));
            }
        }
        Ok(self.scheduler.register_card(card)?)
    }

    pub fn due_cards(&self, learner: &LearnerId, limit: Option<usize>) -> Vec<DueCard> {
        self.scheduler.due_cards(learner, limit, self.clock.now())
    }

    pub fn review_card(&self, learner: &LearnerId, card: &CardId, correct: bool) -> KnowledgeResult<ReviewResult> {
        self.review_card_with_grade(learner, card, ReviewGrade::from_correct(correct))
    }

    /// Review a card and credit its XP in one step for the learner.
    pub fn review_card_with_grade(
        &self,
        learner: &LearnerId,
        card: &CardId,
        grade: ReviewGrade,
    ) -> KnowledgeResult<ReviewResult> {
        let now = self.clock.now();
        let result = self.ledger.try_update(learner, |state| {
            let review = self.scheduler.apply_review(state, card, grade, now)?;
            let award = self.gamification.apply_review_reward(
                state,
                card,
                grade.is_correct(),
                review.xp_delta,
                now,
            )?;
            Ok::<_, RulesError>(ReviewResult { review, award })
        })?;
        Ok(result)
    }

    pub fn deck_summary(&self, learner: &LearnerId) -> DeckSummary {
        self.scheduler.deck_summary(learner, self.clock.now())
    }

    // Recommendations and paths

    pub fn recommend_next(&self, learner: &LearnerId) -> KnowledgeResult<Recommendation> {
        self.recommendations.recommend_next(learner)
    }

    pub fn recommend(&self, learner: &LearnerId, limit: Option<usize>) -> KnowledgeResult<Vec<Recommendation>> {
        self.recommendations.recommend(learner, limit)
    }

    pub fn register_path(&self, path: LearningPath) -> KnowledgeResult<()> {
        self.recommendations.paths().register(path, &self.store.snapshot())
    }

    pub fn learning_paths(&self) -> Vec<LearningPath> {
        self.recommendations.paths().list()
    }

    /// Enroll a learner. Returns `false` if already enrolled.
    ///
    /// Every prerequisite path must be finished first. Enrolling in a path
    /// whose modules are already completed credits its bonus right away.
    pub fn enroll_in_path(&self, learner: &LearnerId, path_id: &str) -> KnowledgeResult<bool> {
        let catalog = self.recommendations.paths();
        let path = catalog.require(path_id)?;
        let prerequisites = path
            .prerequisites
            .iter()
            .map(|id| catalog.require(id))
            .collect::<KnowledgeResult<Vec<_>>>()?;
        let now = self.clock.now();

        let enrolled = self.ledger.try_update(learner, |state| {
            if let Some(locked) = prerequisites.iter().find(|p| !p.is_finished_by(&state.learner)) {
                return Err(KnowledgeError::PathLocked {
                    path: path.id.clone(),
                    prerequisite: locked.id.clone(),
                });
            }
            if !GamificationEngine::apply_enrollment(state, &path.id, now) {
                return Ok(false);
            }
            self.credit_finished_paths(state, std::slice::from_ref(&path), now)?;
            Ok(true)
        })?;
        if enrolled {
            info!(learner = %learner, path = %path.id, "Enrolled in learning path");
        }
        Ok(enrolled)
    }

    pub fn path_progress(&self, learner: &LearnerId, path_id: &str) -> KnowledgeResult<PathProgress> {
        self.recommendations.path_progress(learner, path_id)
    }

    // Gamification

    /// Record a module completion; the XP reward comes from the node.
    pub fn complete_module(&self, learner: &LearnerId, node: &NodeId, score: u32) -> KnowledgeResult<CompletionOutcome> {
        let xp_reward = self.get_node(node)?.xp_reward;
        let paths = self.learning_paths();
        let now = self.clock.now();
        self.ledger.try_update(learner, |state| {
            let mut outcome = self
                .gamification
                .apply_completion(state, node, xp_reward, score, now)?;
            outcome.path_bonuses = self.credit_finished_paths(state, &paths, now)?;
            Ok::<_, KnowledgeError>(outcome)
        })
    }

    /// Grade a quiz on `node` with `correct` of `total` answers right.
    ///
    /// Reaching the node's passing score completes the module; below it the
    /// attempt and its partial XP are recorded without a completion.
    pub fn submit_quiz(
        &self,
        learner: &LearnerId,
        node: &NodeId,
        correct: u32,
        total: u32,
    ) -> KnowledgeResult<QuizOutcome> {
        let unit = self.get_node(node)?;
        let paths = self.learning_paths();
        let now = self.clock.now();
        self.ledger.try_update(learner, |state| {
            let mut outcome = self.gamification.apply_quiz(
                state,
                node,
                unit.xp_reward,
                unit.passing_score,
                QuizSubmission::new(correct, total),
                now,
            )?;
            if let Some(completion) = outcome.completion.as_mut() {
                completion.path_bonuses = self.credit_finished_paths(state, &paths, now)?;
            }
            Ok::<_, KnowledgeError>(outcome)
        })
    }

    /// Pay the bonus of every enrolled path in `paths` the learner has now finished.
    fn credit_finished_paths(
        &self,
        state: &mut LearnerState,
        paths: &[LearningPath],
        now: DateTime<Utc>,
    ) -> KnowledgeResult<Vec<PathBonus>> {
        let mut bonuses = Vec::new();
        for path in paths {
            let learner = &state.learner;
            if !learner.enrolled_paths.contains_key(&path.id)
                || learner.has_completed_path(&path.id)
                || !path.is_finished_by(learner)
            {
                continue;
            }
            if let Some(bonus) = self
                .gamification
                .apply_path_bonus(state, &path.id, path.xp_reward, now)?
            {
                bonuses.push(bonus);
            }
        }
        Ok(bonuses)
    }

    pub fn award_xp(&self, learner: &LearnerId, amount: u64) -> KnowledgeResult<XpAward> {
        Ok(self.gamification.award_xp(learner, amount, self.clock.now())?)
    }

    pub fn gamification_stats(&self, learner: &LearnerId) -> GamificationStats {
        self.gamification.stats(learner)
    }

    pub fn learner_summary(&self, learner: &LearnerId) -> LearnerSummary {
        self.gamification.summary(learner)
    }

    pub fn leaderboard(&self, period: LeaderboardPeriod, limit: usize) -> Vec<LeaderboardEntry> {
        self.gamification.leaderboard(period, limit, self.clock.now())
    }

    pub fn level_progress(&self, xp: u64) -> LevelProgress {
        LevelProgress::for_xp(xp)
    }

    // Events

    pub fn apply_event(&self, event: LearningEvent) -> KnowledgeResult<EventOutcome> {
        match event {
            LearningEvent::CardReviewed { learner, card, grade } => self
                .review_card_with_grade(&learner, &card, grade)
                .map(EventOutcome::Reviewed),
            LearningEvent::ModuleCompleted { learner, node, score } => self
                .complete_module(&learner, &node, score)
                .map(EventOutcome::Completed),
            LearningEvent::QuizSubmitted {
                learner,
                node,
                correct,
                total,
            } => self
                .submit_quiz(&learner, &node, correct, total)
                .map(EventOutcome::Quiz),
            LearningEvent::XpAwarded { learner, amount } => {
                self.award_xp(&learner, amount).map(EventOutcome::Awarded)
            }
        }
    }

    // Curriculum

    /// Load a curriculum document.
    ///
    /// Nodes, edges, paths and cards land together or not at all. Paths and
    /// cards are registered while the graph write lock is held, and the graph
    /// draft commits only after both batches are in.
    pub fn load_curriculum(&self, curriculum: &Curriculum) -> KnowledgeResult<ImportSummary> {
        let summary = self.store.transaction(|graph| {
            let mut summary = curriculum.apply_to(graph)?;
            if let Some(missing) = curriculum
                .cards
                .iter()
                .filter_map(|c| c.node.as_ref())
                .find(|node| !graph.contains(node))
            {
                return Err(KnowledgeError::UnknownNode(missing.clone()));
            }

            summary.cards = self.scheduler.register_cards(curriculum.cards.clone())?;
            summary.paths = match self.recommendations.paths().register_all(&curriculum.paths, graph) {
                Ok(count) => count,
                Err(err) => {
                    self.scheduler
                        .remove_cards(curriculum.cards.iter().map(|c| &c.id));
                    return Err(err);
                }
            };
            Ok(summary)
        })?;

        info!(
            nodes = summary.nodes,
            edges = summary.edges,
            paths = summary.paths,
            cards = summary.cards,
            "Loaded curriculum"
        );
        Ok(summary)
    }

    pub fn export_curriculum(&self) -> Curriculum {
        let cards = self.scheduler.cards();
        Curriculum::export(&self.store.snapshot(), self.learning_paths(), cards, self.clock.now())
    }
}

impl Default for LearningEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}
