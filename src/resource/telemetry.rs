//! Host memory telemetry.
//!
//! Telemetry is optional. A source that cannot report figures returns
//! `None`, which the manager treats as zero usage and the monitor treats
//! as "never evict".

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Total and used memory in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapReading {
    pub total: u64,
    pub used: u64,
}

impl HeapReading {
    pub fn available(&self) -> u64 {
        self.total.saturating_sub(self.used)
    }
}

/// Source of host memory figures.
pub trait MemoryTelemetry: Send + Sync {
    fn read(&self) -> Option<HeapReading>;
}

/// Telemetry source that never reports anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTelemetry;

impl MemoryTelemetry for NoTelemetry {
    fn read(&self) -> Option<HeapReading> {
        None
    }
}

/// Host memory read through `sysinfo`.
pub struct SysinfoTelemetry {
    system: Mutex<sysinfo::System>,
}

impl SysinfoTelemetry {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(sysinfo::System::new()),
        }
    }
}

impl Default for SysinfoTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTelemetry for SysinfoTelemetry {
    fn read(&self) -> Option<HeapReading> {
        let mut system = self.system.lock().ok()?;
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return None;
        }

        Some(HeapReading {
            total,
            used: system.used_memory().min(total),
        })
    }
}

/// Telemetry with values set by the caller.
#[derive(Debug, Default)]
pub struct FixedTelemetry {
    total: AtomicU64,
    used: AtomicU64,
    unavailable: AtomicBool,
}

impl FixedTelemetry {
    pub fn new(total: u64, used: u64) -> Self {
        Self {
            total: AtomicU64::new(total),
            used: AtomicU64::new(used),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Replace the reported figures.
    pub fn set(&self, total: u64, used: u64) {
        self.total.store(total, Ordering::SeqCst);
        self.used.store(used, Ordering::SeqCst);
    }

    /// Toggle whether figures are reported at all.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }
}

impl MemoryTelemetry for FixedTelemetry {
    fn read(&self) -> Option<HeapReading> {
        if self.unavailable.load(Ordering::SeqCst) {
            return None;
        }
        Some(HeapReading {
            total: self.total.load(Ordering::SeqCst),
            used: self.used.load(Ordering::SeqCst),
        })
    }
}
