//! Record types owned by the resource manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hardware::ComputeTarget;

/// Id of the process record that exists for the manager's whole lifetime.
pub const MAIN_PROCESS_ID: &str = "main";

/// Process id derived from a tab id.
pub fn tab_process_id(tab_id: &str) -> String {
    format!("tab-{}", tab_id)
}

/// Process id derived from a worker name.
pub fn worker_process_id(name: &str) -> String {
    format!("worker-{}", name)
}

/// Kind of logical process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    Main,
    Renderer,
    Worker,
    Ai,
    Storage,
}

impl std::fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Main => write!(f, "main"),
            Self::Renderer => write!(f, "renderer"),
            Self::Worker => write!(f, "worker"),
            Self::Ai => write!(f, "ai"),
            Self::Storage => write!(f, "storage"),
        }
    }
}

/// Lifecycle state of a process record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Active,
    Suspended,
    Terminated,
}

/// A logical process tracked by the manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub id: String,
    pub kind: ProcessKind,
    pub status: ProcessStatus,
    /// Tracked footprint in bytes
    pub memory_usage: u64,
    /// CPU share in percent
    pub cpu_usage: f64,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl ProcessRecord {
    pub fn new(id: impl Into<String>, kind: ProcessKind, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            kind,
            status: ProcessStatus::Active,
            memory_usage: 0,
            cpu_usage: 0.0,
            created_at: now,
            last_activity: now,
        }
    }
}

/// Scheduling priority of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabPriority {
    High,
    Medium,
    Low,
}

/// Resource footprint and lifecycle state of one browsing context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabRecord {
    pub tab_id: String,
    /// Always `tab-<tab_id>`
    pub process_id: String,
    pub url: String,
    pub title: String,
    /// Tracked footprint in bytes
    pub memory_usage: u64,
    pub suspended: bool,
    pub last_accessed: DateTime<Utc>,
    pub priority: TabPriority,
}

impl TabRecord {
    pub fn new(tab_id: impl Into<String>, url: impl Into<String>, now: DateTime<Utc>) -> Self {
        let tab_id = tab_id.into();
        let url = url.into();
        Self {
            process_id: tab_process_id(&tab_id),
            tab_id,
            title: url.clone(),
            url,
            memory_usage: 0,
            suspended: false,
            last_accessed: now,
            priority: TabPriority::Medium,
        }
    }
}

/// How aggressively the manager reclaims memory.
///
/// Reported for display only; the eviction policy does not adapt to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationLevel {
    #[default]
    Balanced,
}

/// Point-in-time view of memory and registry counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub total_memory: u64,
    pub used_memory: u64,
    pub available_memory: u64,
    pub suspended_tab_count: usize,
    pub active_process_count: usize,
    pub monitor_interval_ms: u64,
    pub optimization_level: OptimizationLevel,
    /// False when the host reported no memory figures
    pub telemetry_available: bool,
}

impl MemorySnapshot {
    /// Used / total, or 0.0 when the total is unknown.
    pub fn pressure(&self) -> f64 {
        if self.total_memory == 0 {
            0.0
        } else {
            self.used_memory as f64 / self.total_memory as f64
        }
    }
}

/// Aggregate registry counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStats {
    pub total_processes: usize,
    pub active_tabs: usize,
    pub suspended_tabs: usize,
    pub background_workers: usize,
    pub compute_target: ComputeTarget,
    pub memory: MemorySnapshot,
}
