//! Per-user content graph with lightweight search.
//!
//! A [`ContentGraph`] stores knowledge nodes (notes, pages, documents),
//! links between them, and a hashed bag-of-words vector per node:
//!
//! - **Linking**: bidirectional by default, kept both as an ordered
//!   adjacency list and as each node's `connections` list
//! - **Traversal**: breadth-first, bounded by hop count
//! - **Search**: term-overlap similarity plus a recency/connectivity
//!   relevance score, with optional embedding-based similarity
//! - **Persistence**: the whole graph is written to a [`GraphStore`] after
//!   every mutation, off the caller's path when a tokio runtime is
//!   available, and restored on open
//!
//! ## Example
//!
//! ```rust,ignore
//! use rk_core::knowledge::{ContentGraph, SqliteGraphStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(SqliteGraphStore::open("knowledge.db")?);
//! let graph = ContentGraph::new("user-1", store)?;
//!
//! let gpu = graph.add_node("GPU", "GPU acceleration improves battery life", "note")?;
//! let saver = graph.add_node("Saver", "Battery saver reduces GPU usage", "note")?;
//! graph.connect(&gpu, &saver)?;
//!
//! let hits = graph.semantic_search("GPU battery", 10)?;
//! let related = graph.find_related_nodes(&gpu, 2)?;
//! ```

mod config;
mod embedding;
mod graph;
mod schema;
mod search;
mod store;
mod types;
mod writer;

pub use config::{GraphConfig, SearchMode};
pub use embedding::{cosine_similarity, simple_text_to_vector, token_hash, EMBEDDING_DIMS};
pub use graph::ContentGraph;
pub use schema::{get_schema_version, initialize_schema, is_initialized, SCHEMA_VERSION};
pub use search::{
    connectivity_factor, extract_snippet, lexical_similarity, query_terms, recency_factor,
    relevance_score,
};
pub use store::{GraphSnapshot, GraphStore, InMemoryGraphStore, SqliteGraphStore};
pub use types::{GraphStats, KnowledgeNode, NodeId, SearchResult};
