//! Per-connector counters and cumulative durations for each operation class.
//!
//! The counters track invocations, not unique simulated objects: two
//! `simulate_index` calls for the same candidate bump the counter twice.
//! State is scoped to one connector instance and discarded with it, so
//! parallel connectors never interfere.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Operation class whose bookkeeping is kept separate from workload execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    IndexSimulation,
    PartitionSimulation,
    CostEstimation,
}

/// Monotone invocation counters and cumulative durations.
///
/// Relaxed atomics: a reporting thread may read while the owning task works,
/// but there is no cross-counter consistency requirement.
#[derive(Debug, Default)]
pub struct Instrumentation {
    index_simulations: AtomicU64,
    partition_simulations: AtomicU64,
    cost_estimations: AtomicU64,
    index_simulation_nanos: AtomicU64,
    partition_simulation_nanos: AtomicU64,
    cost_estimation_nanos: AtomicU64,
}

impl Instrumentation {
    /// Start a timed scope that also counts as one invocation of `op`.
    ///
    /// The counter is bumped up front; the elapsed time is accrued when the
    /// returned guard drops, so failures are still accounted for.
    pub fn invocation(&self, op: OpClass) -> OpTimer<'_> {
        self.counter(op).fetch_add(1, Ordering::Relaxed);
        self.timer(op)
    }

    /// Start a timed scope without bumping the invocation counter (used by
    /// drop/reset entry points, which accrue duration only).
    pub fn timer(&self, op: OpClass) -> OpTimer<'_> {
        OpTimer {
            instrumentation: self,
            op,
            started: Instant::now(),
        }
    }

    pub fn index_simulations(&self) -> u64 {
        self.index_simulations.load(Ordering::Relaxed)
    }

    pub fn partition_simulations(&self) -> u64 {
        self.partition_simulations.load(Ordering::Relaxed)
    }

    pub fn cost_estimations(&self) -> u64 {
        self.cost_estimations.load(Ordering::Relaxed)
    }

    pub fn index_simulation_duration(&self) -> Duration {
        Duration::from_nanos(self.index_simulation_nanos.load(Ordering::Relaxed))
    }

    pub fn partition_simulation_duration(&self) -> Duration {
        Duration::from_nanos(self.partition_simulation_nanos.load(Ordering::Relaxed))
    }

    pub fn cost_estimation_duration(&self) -> Duration {
        Duration::from_nanos(self.cost_estimation_nanos.load(Ordering::Relaxed))
    }

    fn counter(&self, op: OpClass) -> &AtomicU64 {
        match op {
            OpClass::IndexSimulation => &self.index_simulations,
            OpClass::PartitionSimulation => &self.partition_simulations,
            OpClass::CostEstimation => &self.cost_estimations,
        }
    }

    fn accumulator(&self, op: OpClass) -> &AtomicU64 {
        match op {
            OpClass::IndexSimulation => &self.index_simulation_nanos,
            OpClass::PartitionSimulation => &self.partition_simulation_nanos,
            OpClass::CostEstimation => &self.cost_estimation_nanos,
        }
    }
}

/// Scoped timer: accrues elapsed time into the matching accumulator on drop.
#[must_use = "dropping the timer immediately records a near-zero duration"]
pub struct OpTimer<'a> {
    instrumentation: &'a Instrumentation,
    op: OpClass,
    started: Instant,
}

impl Drop for OpTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed().as_nanos() as u64;
        self.instrumentation
            .accumulator(self.op)
            .fetch_add(elapsed, Ordering::Relaxed);
    }
}
