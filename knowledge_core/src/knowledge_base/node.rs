//! Concept nodes - the learning units of the curriculum graph.

use learning_rules::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{KnowledgeError, KnowledgeResult};

/// Subject area of a concept.
///
/// Unknown names are kept verbatim in [`Category::Other`] so curricula with
/// their own groupings load without loss.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Foundation,
    Algorithm,
    Method,
    Tool,
    Project,
    Assessment,
    Resource,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Foundation => "foundation",
            Category::Algorithm => "algorithm",
            Category::Method => "method",
            Category::Tool => "tool",
            Category::Project => "project",
            Category::Assessment => "assessment",
            Category::Resource => "resource",
            Category::Other(name) => name,
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "foundation" => Category::Foundation,
            "algorithm" => Category::Algorithm,
            "method" => Category::Method,
            "tool" => Category::Tool,
            "project" => Category::Project,
            "assessment" => Category::Assessment,
            "resource" => Category::Resource,
            _ => Category::Other(value),
        }
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Named difficulty tiers, mapped evenly onto `0.0..=1.0`.
const DIFFICULTY_LABELS: [&str; 4] = ["beginner", "intermediate", "advanced", "expert"];

/// Continuous difficulty in `0.0..=1.0`.
///
/// Deserializes from a number or from one of the tier labels.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "DifficultyRepr", into = "f64")]
pub struct Difficulty(f64);

/// Wire form of [`Difficulty`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DifficultyRepr {
    Value(f64),
    Label(String),
}

impl Difficulty {
    pub fn new(value: f64) -> KnowledgeResult<Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(KnowledgeError::validation(format!(
                "difficulty {} outside 0.0..=1.0",
                value
            )))
        }
    }

    /// Ordinal tier 1-4 mapped to 0.0, 1/3, 2/3, 1.0.
    pub fn from_level(level: u8) -> KnowledgeResult<Self> {
        if !(1..=4).contains(&level) {
            return Err(KnowledgeError::validation(format!(
                "difficulty level {} outside 1..=4",
                level
            )));
        }
        Ok(Self(f64::from(level - 1) / 3.0))
    }

    pub fn from_label(label: &str) -> KnowledgeResult<Self> {
        DIFFICULTY_LABELS
            .iter()
            .position(|l| l.eq_ignore_ascii_case(label))
            .map(|index| Self(index as f64 / 3.0))
            .ok_or_else(|| KnowledgeError::validation(format!("unknown difficulty '{}'", label)))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Nearest tier label.
    pub fn label(self) -> &'static str {
        DIFFICULTY_LABELS[(self.0 * 3.0).round() as usize]
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self(0.0)
    }
}

impl TryFrom<DifficultyRepr> for Difficulty {
    type Error = KnowledgeError;

    fn try_from(value: DifficultyRepr) -> Result<Self, Self::Error> {
        match value {
            DifficultyRepr::Value(v) => Self::new(v),
            DifficultyRepr::Label(label) => Self::from_label(&label),
        }
    }
}

impl From<Difficulty> for f64 {
    fn from(value: Difficulty) -> Self {
        value.0
    }
}

/// Stage in Bloom's taxonomy, 1 (remember) to 6 (create).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BloomLevel(u8);

impl BloomLevel {
    pub const REMEMBER: BloomLevel = BloomLevel(1);
    pub const CREATE: BloomLevel = BloomLevel(6);

    pub fn new(level: u8) -> KnowledgeResult<Self> {
        if (1..=6).contains(&level) {
            Ok(Self(level))
        } else {
            Err(KnowledgeError::validation(format!(
                "bloom level {} outside 1..=6",
                level
            )))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            1 => "remember",
            2 => "understand",
            3 => "apply",
            4 => "analyze",
            5 => "evaluate",
            _ => "create",
        }
    }
}

impl Default for BloomLevel {
    fn default() -> Self {
        Self::REMEMBER
    }
}

impl TryFrom<u8> for BloomLevel {
    type Error = KnowledgeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BloomLevel> for u8 {
    fn from(value: BloomLevel) -> Self {
        value.0
    }
}

/// Quiz score, in percent, a unit needs unless the curriculum sets its own.
pub const DEFAULT_PASSING_SCORE: u8 = 70;

fn default_passing_score() -> u8 {
    DEFAULT_PASSING_SCORE
}

/// A learning unit in the curriculum graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
    pub id: NodeId,

    pub label: String,

    #[serde(default)]
    pub description: String,

    pub category: Category,

    #[serde(default)]
    pub difficulty: Difficulty,

    #[serde(default)]
    pub bloom_level: BloomLevel,

    /// XP granted for completing this unit with a perfect score.
    #[serde(default)]
    pub xp_reward: u32,

    /// Minimum quiz score (percent) that counts as completing this unit.
    #[serde(default = "default_passing_score")]
    pub passing_score: u8,

    /// Units that must be completed first. Kept in sync with prerequisite edges.
    #[serde(default)]
    pub prerequisites: BTreeSet<NodeId>,
}

impl ConceptNode {
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            category: Category::Foundation,
            difficulty: Difficulty::default(),
            bloom_level: BloomLevel::default(),
            xp_reward: 0,
            passing_score: DEFAULT_PASSING_SCORE,
            prerequisites: BTreeSet::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_bloom_level(mut self, bloom_level: BloomLevel) -> Self {
        self.bloom_level = bloom_level;
        self
    }

    pub fn with_xp_reward(mut self, xp_reward: u32) -> Self {
        self.xp_reward = xp_reward;
        self
    }

    pub fn with_passing_score(mut self, passing_score: u8) -> Self {
        self.passing_score = passing_score;
        self
    }

    pub fn with_prerequisite(mut self, prerequisite: impl Into<NodeId>) -> Self {
        self.prerequisites.insert(prerequisite.into());
        self
    }

    /// Case-insensitive substring match on id, label and description.
    /// `needle` must already be lowercase.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.id.as_str().to_lowercase().contains(needle)
            || self.label.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

/// Metadata edit. Only fields that do not influence analytics can change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    pub label: Option<String>,
    pub description: Option<String>,
}

impl NodePatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.description.is_none()
    }

    pub(crate) fn apply(self, node: &mut ConceptNode) {
        if let Some(label) = self.label {
            node.label = label;
        }
        if let Some(description) = self.description {
            node.description = description;
        }
    }
}
