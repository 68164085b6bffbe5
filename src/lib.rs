//! # rk-core
//!
//! Resource and knowledge subsystem: tab resource tracking with
//! memory-pressure eviction, and a per-user content graph with traversal
//! and ranked search.
//!
//! ## Core Components
//!
//! - **Resource**: process and tab registry, LRU suspension under memory
//!   pressure, background workers
//! - **Knowledge**: content graph, hashed bag-of-words vectors, ranked
//!   search, per-owner persistence
//! - **Hardware**: read-only compute-target probe
//! - **Clock**: injectable time source
//!
//! ## Example
//!
//! ```rust,ignore
//! use rk_core::{ContentGraph, InMemoryGraphStore, ResourceConfig, ResourceManager};
//! use std::sync::Arc;
//!
//! let manager = ResourceManager::new(ResourceConfig::default())?;
//! manager.create_tab_process("1", "https://example.com")?;
//! manager.suspend_tab("1");
//!
//! let graph = ContentGraph::new("user-1", Arc::new(InMemoryGraphStore::new()))?;
//! let id = graph.add_node("Title", "Some content", "note")?;
//! ```

pub mod clock;
pub mod error;
pub mod hardware;
pub mod knowledge;
pub mod resource;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use hardware::{ComputeTarget, HardwareCapabilities, HardwareProbe, StaticProbe, SystemProbe};
pub use knowledge::{
    simple_text_to_vector, ContentGraph, GraphConfig, GraphSnapshot, GraphStats, GraphStore,
    InMemoryGraphStore, KnowledgeNode, NodeId, SearchMode, SearchResult, SqliteGraphStore,
    EMBEDDING_DIMS,
};
pub use resource::{
    MemoryMonitor, MemorySnapshot, MemoryTelemetry, MonitorHandle, ProcessKind, ProcessRecord,
    ProcessStats, ProcessStatus, ResourceConfig, ResourceManager, TabPriority, TabRecord,
};
