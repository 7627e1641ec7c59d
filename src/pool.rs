//! Engine Instance Pool
//!
//! A fixed array of engine instances handed out round robin.
//!
//! ## Architecture
//!
//! ```text
//! ResourcePool
//! ├── instances: ArcSwapOption<[EngineInstance; N]>   (published once, lock-free reads)
//! ├── next: AtomicU64                                  (assignment sequence, mod N)
//! └── telemetry: Mutex<[InstanceTelemetry; N]>         (reporting only)
//! ```
//!
//! `acquire()` is a single atomic increment plus a lock-free load; it never
//! touches the telemetry lock. Telemetry is recorded separately by callers.

use crate::engine::{Backing, Engine, EngineError, EngineInstance};
use crate::error::PracticeError;
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Pool-level failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("pool size must be at least 1")]
    InvalidSize,

    #[error("pool is already initialized")]
    AlreadyInitialized,

    #[error("pool is not initialized or has been shut down")]
    Unavailable,

    #[error("instance {index} could not be created: {source}")]
    InstanceCreation { index: usize, source: EngineError },

    #[error("instance {index} setup failed: {source}")]
    Setup { index: usize, source: EngineError },
}

impl From<PoolError> for PracticeError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::Unavailable => PracticeError::PoolUnavailable,
            other => PracticeError::PoolInitialization {
                message: other.to_string(),
            },
        }
    }
}

/// Counters for a single instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceTelemetry {
    pub index: usize,
    /// Sessions assigned to this instance
    pub assignments: u64,
    /// Queries that reached this instance's engine
    pub queries_executed: u64,
}

/// Point-in-time telemetry for the whole pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTelemetry {
    pub pool_size: usize,
    pub instances: Vec<InstanceTelemetry>,
    pub total_assignments: u64,
    pub total_queries: u64,
}

type InstanceArray = Vec<Arc<dyn EngineInstance>>;

/// Fixed-size round-robin pool of engine instances.
pub struct ResourcePool {
    size: usize,
    instances: ArcSwapOption<InstanceArray>,
    next: AtomicU64,
    telemetry: Mutex<Vec<InstanceTelemetry>>,
    /// Set by the first successful `initialize`; never cleared
    initialized_once: Mutex<bool>,
}

impl ResourcePool {
    /// Create an unpublished pool of `size` instances.
    pub fn new(size: usize) -> Self {
        let telemetry = (0..size)
            .map(|index| InstanceTelemetry {
                index,
                ..InstanceTelemetry::default()
            })
            .collect();
        Self {
            size,
            instances: ArcSwapOption::empty(),
            next: AtomicU64::new(0),
            telemetry: Mutex::new(telemetry),
            initialized_once: Mutex::new(false),
        }
    }

    /// Create every instance, run `setup` on each, then publish the whole array.
    ///
    /// Any failure discards everything created so far; nothing is published.
    pub fn initialize<F>(
        &self,
        engine: &dyn Engine,
        backing: &Backing,
        mut setup: F,
    ) -> Result<(), PoolError>
    where
        F: FnMut(usize, &dyn EngineInstance) -> Result<(), EngineError>,
    {
        if self.size == 0 {
            return Err(PoolError::InvalidSize);
        }

        let mut initialized = self.initialized_once.lock();
        if *initialized {
            return Err(PoolError::AlreadyInitialized);
        }

        let mut created: InstanceArray = Vec::with_capacity(self.size);
        for index in 0..self.size {
            let location = backing.instance_location(index);
            let instance = engine
                .open_instance(&location)
                .map_err(|source| PoolError::InstanceCreation { index, source })?;
            setup(index, instance.as_ref()).map_err(|source| PoolError::Setup { index, source })?;
            created.push(instance);
        }

        self.instances.store(Some(Arc::new(created)));
        *initialized = true;

        tracing::info!(
            engine = engine.name(),
            size = self.size,
            backing = ?backing,
            "engine_pool_initialized"
        );
        Ok(())
    }

    /// Pick the next instance in round-robin order.
    ///
    /// Lock-free: one atomic increment reduced modulo the pool size.
    pub fn acquire(&self) -> Result<(Arc<dyn EngineInstance>, usize), PoolError> {
        let guard = self.instances.load();
        let instances = guard.as_ref().ok_or(PoolError::Unavailable)?;
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        let index = (seq % instances.len() as u64) as usize;
        Ok((Arc::clone(&instances[index]), index))
    }

    pub fn record_assignment(&self, index: usize) {
        if let Some(slot) = self.telemetry.lock().get_mut(index) {
            slot.assignments += 1;
        }
    }

    pub fn record_query(&self, index: usize) {
        if let Some(slot) = self.telemetry.lock().get_mut(index) {
            slot.queries_executed += 1;
        }
    }

    /// Consistent copy of all counters, taken under the telemetry lock.
    pub fn snapshot_telemetry(&self) -> PoolTelemetry {
        let instances = self.telemetry.lock().clone();
        let total_assignments = instances.iter().map(|t| t.assignments).sum();
        let total_queries = instances.iter().map(|t| t.queries_executed).sum();
        PoolTelemetry {
            pool_size: self.size,
            instances,
            total_assignments,
            total_queries,
        }
    }

    /// Release all instances. Idempotent, and a no-op on a pool that was never
    /// initialized.
    ///
    /// Connections already handed to sessions keep working; they hold their own
    /// handles to the engine.
    pub fn shutdown(&self) {
        if let Some(released) = self.instances.swap(None) {
            tracing::info!(instances = released.len(), "engine_pool_shutdown");
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_initialized(&self) -> bool {
        self.instances.load().is_some()
    }
}

impl std::fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("size", &self.size)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
