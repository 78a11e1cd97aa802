//! # Fact KB
//!
//! Entity-indexed facts on top of `kb_store`. A fact is stored as a context
//! of the underlying knowledge base and every entity mention as one of its
//! spans, with the entity name as that span's answer.
//!
//! ## Core Components
//!
//! - **entity_index**: Entity vocabulary and per-dataset mention lists
//! - **fact_base**: `FactKnowledgeBase`, the store plus its entity index
//! - **shared**: `SharedFactKnowledgeBase` for parallel loaders

pub mod entity_index;
pub mod fact_base;
pub mod shared;

pub use entity_index::*;
pub use fact_base::*;
pub use shared::*;
