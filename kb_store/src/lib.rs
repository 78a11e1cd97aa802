//! # KB Store
//!
//! Memory-dense, append-only store for tokenized contexts. Every context lives
//! as a slice of one flat `u32` array per dataset partition, and its spans of
//! interest and answers live in parallel flat arrays indexed the same way.
//!
//! ## Core Components
//!
//! - **vocab**: Symbol <-> id mapping with frequency counts
//! - **partition**: Packed context arrays and span/answer arrays for one dataset
//! - **store**: The `KnowledgeBase` value type, frequency reordering, and the
//!   lock-guarded `SharedKnowledgeBase` used by parallel loaders
//! - **snapshot**: Versioned binary save/load
//!
//! ## Lifecycle
//!
//! Loading and training are sequential phases. Loaders append through
//! `SharedKnowledgeBase::add` from any number of threads; once loading is
//! done the store is optionally reordered by frequency and then only read.

pub mod config;
pub mod error;
pub mod partition;
pub mod snapshot;
pub mod store;
pub mod vocab;

pub use config::*;
pub use error::*;
pub use partition::*;
pub use store::*;
pub use vocab::*;

/// Dense id of a symbol in a vocabulary.
pub type SymbolId = u32;

/// Half-open `(start, end)` token range inside a context.
pub type Span = (u32, u32);
