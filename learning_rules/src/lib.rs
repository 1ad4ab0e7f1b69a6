//! # Learning Rules
//!
//! The "Rulebook" crate - learner state and the rules that move it: Leitner
//! spaced repetition, experience levels, streaks and badges. This crate knows
//! nothing about the concept graph; `knowledge_core` builds on top of it.
//!
//! ## Core Components
//!
//! - **ledger**: Per-learner state behind per-learner locks
//! - **scheduler**: Shared flashcard deck and Leitner reviews
//! - **gamification**: XP, levels, badges and leaderboards

pub mod entities;
pub mod error;
pub mod gamification;
pub mod ledger;
pub mod mechanics;
pub mod scheduler;

pub use entities::*;
pub use error::*;
pub use gamification::*;
pub use ledger::*;
pub use mechanics::*;
pub use scheduler::*;
