//! Temporal state: the per-principal record of confirmed executions.
//!
//! Cooldowns read the single most recent timestamp; the anomaly monitor
//! reuses the same sliding-window primitive over many timestamps. State
//! advances only when the execution backend reports a confirmed action,
//! never on an evaluated-allowed decision.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::error::StateStoreError;
use crate::types::Address;

/// Rolling window of event timestamps. Retains entries within
/// `[cutoff, now]`, evicts the rest, and answers count queries.
#[derive(Clone, Debug, Default)]
pub struct SlidingWindow {
    events: VecDeque<DateTime<Utc>>,
}

impl SlidingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, at: DateTime<Utc>) {
        self.events.push_back(at);
    }

    /// Drop every event strictly older than `cutoff`.
    pub fn evict_before(&mut self, cutoff: DateTime<Utc>) {
        while let Some(front) = self.events.front() {
            if *front < cutoff {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events at or after `cutoff`, without evicting.
    pub fn count_since(&self, cutoff: DateTime<Utc>) -> usize {
        self.events.iter().filter(|t| **t >= cutoff).count()
    }
}

/// One principal's temporal state.
#[derive(Clone, Debug, Default)]
pub struct TemporalState {
    /// Most recent confirmed execution, `None` until the first one.
    pub last_execution_time: Option<DateTime<Utc>>,
    /// Recent confirmed executions, bounded by the store's retention window.
    pub recent: SlidingWindow,
}

impl TemporalState {
    /// Apply one confirmed execution: advance the last-execution marker,
    /// append to the window, evict entries past retention. Runs as a single
    /// unit under the principal's lock.
    fn apply(&mut self, at: DateTime<Utc>, retention: Duration) {
        self.last_execution_time = Some(match self.last_execution_time {
            Some(prev) if prev > at => prev,
            _ => at,
        });
        self.recent.record(at);
        if let Ok(retention) = chrono::Duration::from_std(retention) {
            self.recent.evict_before(at - retention);
        }
    }
}

/// Storage of per-principal temporal state.
///
/// Implementations must serialize `record_execution` per principal and keep
/// the read-evict-write span of one call atomic; `load` must observe either
/// the state before or after a concurrent record, never a partial update.
#[async_trait]
pub trait TemporalStore: Send + Sync {
    /// Snapshot a principal's state, creating the empty state lazily.
    async fn load(&self, principal: Address) -> Result<TemporalState, StateStoreError>;

    /// Record one confirmed execution and return the post-update state.
    async fn record_execution(
        &self,
        principal: Address,
        at: DateTime<Utc>,
    ) -> Result<TemporalState, StateStoreError>;
}

/// In-memory store: a principal-keyed arena with one async mutex per entry,
/// so mutations for a principal are serialized while unrelated principals
/// proceed concurrently.
pub struct InMemoryTemporalStore {
    states: DashMap<Address, Arc<Mutex<TemporalState>>>,
    retention: Duration,
}

/// Default retention for the recent-execution window: one hour.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

impl InMemoryTemporalStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            states: DashMap::new(),
            retention,
        }
    }

    fn entry(&self, principal: Address) -> Arc<Mutex<TemporalState>> {
        self.states
            .entry(principal)
            .or_insert_with(|| Arc::new(Mutex::new(TemporalState::default())))
            .clone()
    }

    /// Number of principals with materialized state.
    pub fn tracked_principals(&self) -> usize {
        self.states.len()
    }
}

impl Default for InMemoryTemporalStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

#[async_trait]
impl TemporalStore for InMemoryTemporalStore {
    async fn load(&self, principal: Address) -> Result<TemporalState, StateStoreError> {
        let entry = self.entry(principal);
        let state = entry.lock().await;
        Ok(state.clone())
    }

    async fn record_execution(
        &self,
        principal: Address,
        at: DateTime<Utc>,
    ) -> Result<TemporalState, StateStoreError> {
        let entry = self.entry(principal);
        let mut state = entry.lock().await;
        state.apply(at, self.retention);
        Ok(state.clone())
    }
}
