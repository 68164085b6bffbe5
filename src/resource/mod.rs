//! Process and tab resource tracking with memory-pressure eviction.
//!
//! [`ResourceManager`] owns every process and tab record. A
//! [`MemoryMonitor`] periodically compares host memory usage against a
//! threshold and suspends the least recently used tabs:
//!
//! - At most `max_suspensions_per_cycle` tabs are suspended per tick
//! - Suspended tabs are never reselected
//! - Nothing is resumed automatically
//!
//! ## Example
//!
//! ```rust,ignore
//! use rk_core::resource::{MemoryMonitor, ResourceConfig, ResourceManager};
//! use std::sync::Arc;
//!
//! let manager = Arc::new(ResourceManager::new(ResourceConfig::from_env())?);
//! manager.create_tab_process("42", "https://example.com")?;
//!
//! let monitor = MemoryMonitor::start(manager.clone())?;
//! let stats = manager.get_process_stats();
//! monitor.stop();
//! ```

mod config;
mod manager;
mod monitor;
mod telemetry;
mod types;
mod worker;

pub use config::ResourceConfig;
pub use manager::ResourceManager;
pub use monitor::{MemoryMonitor, MonitorHandle};
pub use telemetry::{FixedTelemetry, HeapReading, MemoryTelemetry, NoTelemetry, SysinfoTelemetry};
pub use types::{
    tab_process_id, worker_process_id, MemorySnapshot, OptimizationLevel, ProcessKind,
    ProcessRecord, ProcessStats, ProcessStatus, TabPriority, TabRecord, MAIN_PROCESS_ID,
};
pub use worker::WorkerHandle;
