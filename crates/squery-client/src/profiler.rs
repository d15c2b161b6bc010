//! Accumulated command runtime and memory usage.

use std::ops::{Add, AddAssign, Sub};
use std::time::{Duration, Instant};

/// Process memory in bytes, or a change of it between two snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Resident memory.
    pub physical_mem: i64,
    /// Virtual memory.
    pub virtual_mem: i64,
}

impl MemoryUsage {
    /// Current process memory, or `None` where the platform cannot report
    /// it.
    pub fn current() -> Option<Self> {
        memory_stats::memory_stats().map(|stats| MemoryUsage {
            physical_mem: stats.physical_mem as i64,
            virtual_mem: stats.virtual_mem as i64,
        })
    }
}

impl Add for MemoryUsage {
    type Output = MemoryUsage;

    fn add(self, rhs: MemoryUsage) -> MemoryUsage {
        MemoryUsage {
            physical_mem: self.physical_mem + rhs.physical_mem,
            virtual_mem: self.virtual_mem + rhs.virtual_mem,
        }
    }
}

impl AddAssign for MemoryUsage {
    fn add_assign(&mut self, rhs: MemoryUsage) {
        *self = *self + rhs;
    }
}

impl Sub for MemoryUsage {
    type Output = MemoryUsage;

    fn sub(self, rhs: MemoryUsage) -> MemoryUsage {
        MemoryUsage {
            physical_mem: self.physical_mem - rhs.physical_mem,
            virtual_mem: self.virtual_mem - rhs.virtual_mem,
        }
    }
}

/// Stopwatch that sums the time spent between `start` and `stop` calls,
/// along with the change in process memory over the same runs.
///
/// Starting a running profiler and stopping a stopped one are no-ops.
#[derive(Debug, Clone, Default)]
pub struct Profiler {
    started: Option<Instant>,
    total: Duration,
    mem_started: Option<MemoryUsage>,
    mem_total: MemoryUsage,
    runs: u64,
}

impl Profiler {
    /// A stopped profiler with no accumulated time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin timing a run.
    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
            self.mem_started = MemoryUsage::current();
        }
    }

    /// Finish the current run and return its duration.
    pub fn stop(&mut self) -> Option<Duration> {
        let elapsed = self.started.take()?.elapsed();
        self.total += elapsed;
        if let Some(delta) = Self::mem_delta(self.mem_started.take()) {
            self.mem_total += delta;
        }
        self.runs += 1;
        Some(elapsed)
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Total time across finished runs plus the current one.
    pub fn runtime(&self) -> Duration {
        self.total + self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// Memory change across finished runs plus the current one. Stays zero
    /// on platforms without memory statistics.
    pub fn mem_usage(&self) -> MemoryUsage {
        self.mem_total + Self::mem_delta(self.mem_started).unwrap_or_default()
    }

    /// Number of finished runs.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    fn mem_delta(since: Option<MemoryUsage>) -> Option<MemoryUsage> {
        Some(MemoryUsage::current()? - since?)
    }
}
