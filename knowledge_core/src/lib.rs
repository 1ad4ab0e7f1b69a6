//! # Knowledge Core
//!
//! The analytics and adaptive learning engine. This crate holds the curriculum
//! as a concept graph, analyses its structure, and drives learners through it
//! using the rules in `learning_rules`.
//!
//! ## Core Components
//!
//! - **knowledge_base**: Concept nodes and typed edges behind a snapshotting store
//! - **analytics**: PageRank, centrality, Louvain communities and shortest paths
//! - **recommendation**: Next-unit selection and learning paths
//! - **engine**: The composition root every outer layer talks to
//! - **curriculum**: JSON/TOML import and export of whole curricula
//! - **events**: Learner events for event-driven callers
//!
//! ## Design Philosophy
//!
//! - **Snapshot reads**: Analytics never observe a half-applied write
//! - **Per-learner atomicity**: A review and its reward land together or not at all
//! - **Deterministic**: Every ranking has a total order, ties broken by node id

pub mod analytics;
pub mod clock;
pub mod config;
pub mod curriculum;
pub mod engine;
pub mod error;
pub mod events;
pub mod knowledge_base;
pub mod recommendation;

pub use analytics::*;
pub use clock::*;
pub use config::*;
pub use curriculum::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use knowledge_base::*;
pub use recommendation::*;

pub use learning_rules;
