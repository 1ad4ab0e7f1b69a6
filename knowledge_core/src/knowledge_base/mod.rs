//! Knowledge Base module - the curriculum as a concept graph.
//!
//! The knowledge graph consists of:
//! - **Concept nodes**: Learning units with difficulty, Bloom level and XP reward
//! - **Edges**: Typed, weighted, directed relationships between units
//! - **Store**: Serialized writes and snapshot reads over the graph

mod edge;
mod graph;
mod node;
mod store;

pub use edge::*;
pub use graph::*;
pub use node::*;
pub use store::*;
