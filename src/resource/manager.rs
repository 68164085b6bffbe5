//! Process and tab registry with memory-pressure eviction.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::hardware::{HardwareProbe, SystemProbe};
use crate::resource::config::ResourceConfig;
use crate::resource::telemetry::{HeapReading, MemoryTelemetry, SysinfoTelemetry};
use crate::resource::types::*;
use crate::resource::worker::WorkerHandle;

#[derive(Default)]
struct Registry {
    processes: HashMap<String, ProcessRecord>,
    tabs: HashMap<String, TabRecord>,
    workers: HashMap<String, WorkerHandle>,
}

impl Registry {
    fn suspend(&mut self, tab_id: &str, ratio: f64, now: DateTime<Utc>) -> bool {
        let Some(tab) = self.tabs.get_mut(tab_id) else {
            return false;
        };
        if tab.suspended {
            return false;
        }

        tab.suspended = true;
        tab.priority = TabPriority::Low;
        // Model the reclaimed footprint
        tab.memory_usage = shrink_footprint(tab.memory_usage, ratio);

        if let Some(process) = self.processes.get_mut(&tab.process_id) {
            process.status = ProcessStatus::Suspended;
            process.memory_usage = tab.memory_usage;
            process.last_activity = now;
        }
        true
    }

    fn resume(&mut self, tab_id: &str, now: DateTime<Utc>) -> bool {
        let Some(tab) = self.tabs.get_mut(tab_id) else {
            return false;
        };
        if !tab.suspended {
            return false;
        }

        tab.suspended = false;
        tab.priority = TabPriority::High;
        tab.last_accessed = now;

        if let Some(process) = self.processes.get_mut(&tab.process_id) {
            process.status = ProcessStatus::Active;
            process.last_activity = now;
        }
        true
    }

    fn suspended_tab_count(&self) -> usize {
        self.tabs.values().filter(|t| t.suspended).count()
    }

    fn active_process_count(&self) -> usize {
        self.processes
            .values()
            .filter(|p| p.status == ProcessStatus::Active)
            .count()
    }
}

/// Footprint kept after suspension: at most `ratio` of the original, but
/// never zero for a non-empty footprint.
fn shrink_footprint(bytes: u64, ratio: f64) -> u64 {
    if bytes == 0 {
        return 0;
    }
    ((bytes as f64 * ratio).floor() as u64).max(1)
}

/// Owns every process and tab record and decides which tabs to suspend
/// under memory pressure.
///
/// All registry mutations go through one mutex, so a manager can be
/// shared behind an `Arc` between callers and the memory monitor.
pub struct ResourceManager {
    config: ResourceConfig,
    registry: Mutex<Registry>,
    telemetry: Arc<dyn MemoryTelemetry>,
    probe: Arc<dyn HardwareProbe>,
    clock: Arc<dyn Clock>,
}

impl ResourceManager {
    /// Create a manager that reads host memory through `sysinfo`.
    pub fn new(config: ResourceConfig) -> Result<Self> {
        Self::with_parts(
            config,
            Arc::new(SysinfoTelemetry::new()),
            Arc::new(SystemProbe::cpu_only()),
            Arc::new(SystemClock),
        )
    }

    /// Create a manager from explicit collaborators.
    pub fn with_parts(
        config: ResourceConfig,
        telemetry: Arc<dyn MemoryTelemetry>,
        probe: Arc<dyn HardwareProbe>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        // The main process exists for the manager's whole lifetime
        let mut registry = Registry::default();
        registry.processes.insert(
            MAIN_PROCESS_ID.to_string(),
            ProcessRecord::new(MAIN_PROCESS_ID, ProcessKind::Main, clock.now()),
        );

        Ok(Self {
            config,
            registry: Mutex::new(registry),
            telemetry,
            probe,
            clock,
        })
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Tab Operations ====================

    /// Register a tab and its renderer process.
    ///
    /// An existing record with the same id is overwritten unless
    /// `reject_duplicate_tabs` is set.
    pub fn create_tab_process(
        &self,
        tab_id: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<TabRecord> {
        let tab_id = tab_id.into();
        let now = self.clock.now();
        let mut registry = self.registry();

        if registry.tabs.contains_key(&tab_id) {
            if self.config.reject_duplicate_tabs {
                return Err(Error::DuplicateTab { tab_id });
            }
            warn!(tab_id = %tab_id, "overwriting existing tab record");
        }

        // Every tab gets its own renderer process record
        let tab = TabRecord::new(tab_id.clone(), url, now);
        registry.processes.insert(
            tab.process_id.clone(),
            ProcessRecord::new(tab.process_id.clone(), ProcessKind::Renderer, now),
        );
        registry.tabs.insert(tab_id, tab.clone());

        debug!(tab_id = %tab.tab_id, url = %tab.url, "tab registered");
        Ok(tab)
    }

    /// Suspend a tab. Returns false if it is unknown or already suspended.
    pub fn suspend_tab(&self, tab_id: &str) -> bool {
        let now = self.clock.now();
        let suspended = self
            .registry()
            .suspend(tab_id, self.config.suspended_memory_ratio, now);
        if suspended {
            debug!(tab_id, "tab suspended");
        }
        suspended
    }

    /// Resume a tab. Returns false if it is unknown or already active.
    pub fn resume_tab(&self, tab_id: &str) -> bool {
        let now = self.clock.now();
        let resumed = self.registry().resume(tab_id, now);
        if resumed {
            debug!(tab_id, "tab resumed");
        }
        resumed
    }

    /// Record an access to a tab, refreshing its LRU position.
    pub fn touch_tab(&self, tab_id: &str) -> Result<()> {
        let now = self.clock.now();
        let mut registry = self.registry();
        let tab = registry
            .tabs
            .get_mut(tab_id)
            .ok_or_else(|| Error::tab_not_found(tab_id))?;
        tab.last_accessed = now;
        let process_id = tab.process_id.clone();

        if let Some(process) = registry.processes.get_mut(&process_id) {
            process.last_activity = now;
        }
        Ok(())
    }

    /// Update the footprint reported for a tab.
    pub fn set_tab_memory(&self, tab_id: &str, bytes: u64) -> Result<()> {
        let mut registry = self.registry();
        let tab = registry
            .tabs
            .get_mut(tab_id)
            .ok_or_else(|| Error::tab_not_found(tab_id))?;
        tab.memory_usage = bytes;
        let process_id = tab.process_id.clone();

        if let Some(process) = registry.processes.get_mut(&process_id) {
            process.memory_usage = bytes;
        }
        Ok(())
    }

    /// Update the title shown for a tab.
    pub fn set_tab_title(&self, tab_id: &str, title: impl Into<String>) -> Result<()> {
        let mut registry = self.registry();
        let tab = registry
            .tabs
            .get_mut(tab_id)
            .ok_or_else(|| Error::tab_not_found(tab_id))?;
        tab.title = title.into();
        Ok(())
    }

    pub fn get_tab(&self, tab_id: &str) -> Option<TabRecord> {
        self.registry().tabs.get(tab_id).cloned()
    }

    /// All tabs, least recently accessed first.
    pub fn list_tabs(&self) -> Vec<TabRecord> {
        let mut tabs: Vec<TabRecord> = self.registry().tabs.values().cloned().collect();
        tabs.sort_by(|a, b| {
            a.last_accessed
                .cmp(&b.last_accessed)
                .then_with(|| a.tab_id.cmp(&b.tab_id))
        });
        tabs
    }

    pub fn get_process(&self, process_id: &str) -> Option<ProcessRecord> {
        self.registry().processes.get(process_id).cloned()
    }

    // ==================== Workers ====================

    /// Register a background worker and start its message loop.
    ///
    /// Must be called from within a tokio runtime. Returns the worker's
    /// process id.
    pub fn create_worker(&self, name: &str, script: &str) -> Result<String> {
        let handle = WorkerHandle::spawn(name, script)?;
        let process_id = worker_process_id(name);
        let now = self.clock.now();

        let mut registry = self.registry();
        // Dropping the previous handle stops the old task
        if registry.workers.insert(process_id.clone(), handle).is_some() {
            warn!(worker = name, "replacing existing worker");
        }
        registry.processes.insert(
            process_id.clone(),
            ProcessRecord::new(process_id.clone(), ProcessKind::Worker, now),
        );

        info!(worker = name, script, "worker started");
        Ok(process_id)
    }

    /// Send a message to a named worker.
    pub fn post_to_worker(&self, name: &str, message: Value) -> Result<()> {
        let process_id = worker_process_id(name);
        let now = self.clock.now();
        let mut registry = self.registry();

        registry
            .workers
            .get(&process_id)
            .ok_or_else(|| Error::process_not_found(&process_id))?
            .post(message)?;

        if let Some(process) = registry.processes.get_mut(&process_id) {
            process.last_activity = now;
        }
        Ok(())
    }

    // ==================== Processes ====================

    /// Remove a process and every tab that belongs to it.
    ///
    /// The main process cannot be terminated. Returns false if the process
    /// is unknown or protected.
    pub fn terminate_process(&self, process_id: &str) -> bool {
        if process_id == MAIN_PROCESS_ID {
            warn!("refusing to terminate the main process");
            return false;
        }

        let mut registry = self.registry();
        if registry.processes.remove(process_id).is_none() {
            return false;
        }

        // Cascade to tabs hosted by this process
        let before = registry.tabs.len();
        registry.tabs.retain(|_, tab| tab.process_id != process_id);
        let removed_tabs = before - registry.tabs.len();

        // Dropping the handle closes the worker's channel.
        let stopped_worker = registry.workers.remove(process_id).is_some();

        info!(process_id, removed_tabs, stopped_worker, "process terminated");
        true
    }

    // ==================== Statistics ====================

    /// Host memory figures combined with registry counts.
    pub fn get_memory_usage(&self) -> MemorySnapshot {
        let reading = self.telemetry.read();
        let registry = self.registry();
        self.snapshot(reading, &registry)
    }

    fn snapshot(
        &self,
        reading: Option<HeapReading>,
        registry: &Registry,
    ) -> MemorySnapshot {
        let (total, used, available) = reading
            .map(|r| (r.total, r.used, r.available()))
            .unwrap_or((0, 0, 0));

        MemorySnapshot {
            total_memory: total,
            used_memory: used,
            available_memory: available,
            suspended_tab_count: registry.suspended_tab_count(),
            active_process_count: registry.active_process_count(),
            monitor_interval_ms: self.config.monitor_interval_ms,
            optimization_level: OptimizationLevel::Balanced,
            telemetry_available: reading.is_some(),
        }
    }

    /// Aggregate process counts plus a memory snapshot.
    pub fn get_process_stats(&self) -> ProcessStats {
        let reading = self.telemetry.read();
        let registry = self.registry();
        let suspended_tabs = registry.suspended_tab_count();

        ProcessStats {
            total_processes: registry.processes.len(),
            active_tabs: registry.tabs.len() - suspended_tabs,
            suspended_tabs,
            background_workers: registry
                .workers
                .values()
                .filter(|worker| worker.is_running())
                .count(),
            compute_target: self.probe.preferred_compute_target(),
            memory: self.snapshot(reading, &registry),
        }
    }

    // ==================== Eviction ====================

    /// Run one monitor tick.
    ///
    /// When used/total exceeds the pressure threshold, suspends up to
    /// `max_suspensions_per_cycle` active tabs, least recently accessed
    /// first. Returns the ids of the tabs suspended by this tick. Without
    /// telemetry this never evicts.
    #[instrument(skip(self))]
    pub fn run_eviction_cycle(&self) -> Vec<String> {
        // No readings means eviction is disabled, not an error
        let Some(reading) = self.telemetry.read() else {
            return Vec::new();
        };

        let now = self.clock.now();
        let mut registry = self.registry();

        let pressure = self.snapshot(Some(reading), &registry).pressure();
        if pressure <= self.config.pressure_threshold {
            return Vec::new();
        }

        // Oldest access first; tab id breaks ties
        let mut candidates: Vec<(DateTime<Utc>, String)> = registry
            .tabs
            .values()
            .filter(|tab| !tab.suspended)
            .map(|tab| (tab.last_accessed, tab.tab_id.clone()))
            .collect();
        candidates.sort();
        candidates.truncate(self.config.max_suspensions_per_cycle);

        let mut suspended = Vec::with_capacity(candidates.len());
        for (_, tab_id) in candidates {
            if registry.suspend(&tab_id, self.config.suspended_memory_ratio, now) {
                suspended.push(tab_id);
            }
        }

        if !suspended.is_empty() {
            info!(
                pressure,
                count = suspended.len(),
                tabs = ?suspended,
                "memory pressure: suspended least recently used tabs"
            );
        }
        suspended
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
