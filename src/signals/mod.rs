//! Contextual signals feeding rule evaluation.
//!
//! Each provider exposes one operation: fetch a current snapshot. The
//! registry fans out all fetches concurrently with a per-provider timeout;
//! a slow or failing provider degrades to an unavailable snapshot rather
//! than blocking or failing the evaluation, and each rule then applies its
//! own availability default.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::warn;

use crate::monitor::{MonitorStats, SecurityAlert};

mod gas;
mod telemetry;
mod time;

pub use gas::StaticGasProvider;
#[cfg(feature = "live-signals")]
pub use gas::RpcGasProvider;
pub use telemetry::MonitorTelemetryProvider;
#[cfg(feature = "live-signals")]
pub use telemetry::GraphQlTelemetryProvider;
pub use time::TimeProvider;

/// Current network gas prices, in gwei.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasSnapshot {
    pub standard_gwei: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee_gwei: Option<f64>,
}

/// Wall-clock attributes, all UTC.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSnapshot {
    pub now: DateTime<Utc>,
    pub hour: u8,
    /// 0 = Sunday through 6 = Saturday.
    pub day_of_week: u8,
    pub is_weekend: bool,
}

impl TimeSnapshot {
    pub fn at(now: DateTime<Utc>) -> Self {
        use chrono::{Datelike, Timelike};
        let day_of_week = now.weekday().num_days_from_sunday() as u8;
        Self {
            now,
            hour: now.hour() as u8,
            day_of_week,
            is_weekend: day_of_week == 0 || day_of_week == 6,
        }
    }
}

/// Security monitoring view: active alerts plus aggregate counters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub alerts: Vec<SecurityAlert>,
    pub alert_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<MonitorStats>,
}

/// Provider-specific snapshot payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SignalPayload {
    Gas(GasSnapshot),
    Time(TimeSnapshot),
    Telemetry(TelemetrySnapshot),
}

/// One provider's snapshot: `{timestamp, fields..., error?}`. A populated
/// `error` (or an absent payload) marks the signal unavailable.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalSnapshot {
    pub name: &'static str,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: Option<SignalPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SignalSnapshot {
    pub fn new(name: &'static str, payload: SignalPayload) -> Self {
        Self {
            name,
            timestamp: Utc::now(),
            payload: Some(payload),
            error: None,
        }
    }

    pub fn unavailable(name: &'static str, error: impl Into<String>) -> Self {
        Self {
            name,
            timestamp: Utc::now(),
            payload: None,
            error: Some(error.into()),
        }
    }

    pub fn available(&self) -> bool {
        self.payload.is_some() && self.error.is_none()
    }
}

/// Snapshots keyed by provider name, with typed accessors that collapse
/// "absent" and "errored" into `None`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SignalMap {
    #[serde(flatten)]
    inner: HashMap<&'static str, SignalSnapshot>,
}

impl SignalMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, snapshot: SignalSnapshot) {
        self.inner.insert(snapshot.name, snapshot);
    }

    pub fn get(&self, name: &str) -> Option<&SignalSnapshot> {
        self.inner.get(name)
    }

    pub fn gas(&self) -> Option<&GasSnapshot> {
        match self.get(gas::SIGNAL_NAME)?.payload.as_ref()? {
            SignalPayload::Gas(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn time(&self) -> Option<&TimeSnapshot> {
        match self.get(time::SIGNAL_NAME)?.payload.as_ref()? {
            SignalPayload::Time(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn telemetry(&self) -> Option<&TelemetrySnapshot> {
        match self.get(telemetry::SIGNAL_NAME)?.payload.as_ref()? {
            SignalPayload::Telemetry(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// A single independent signal source.
///
/// `fetch` is infallible by contract: providers map their own failures into
/// an error-carrying snapshot instead of surfacing them.
#[async_trait]
pub trait SignalProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn fetch(&self) -> SignalSnapshot;
}

/// Default bound on a single provider fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(3);

/// The set of providers consulted per evaluation.
pub struct SignalRegistry {
    providers: Vec<Arc<dyn SignalProvider>>,
    timeout: Duration,
}

impl SignalRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            providers: Vec::new(),
            timeout,
        }
    }

    pub fn register(&mut self, provider: Arc<dyn SignalProvider>) {
        self.providers.push(provider);
    }

    pub fn with_provider(mut self, provider: Arc<dyn SignalProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn providers(&self) -> &[Arc<dyn SignalProvider>] {
        &self.providers
    }

    /// Fetch every registered signal concurrently. Timeouts and panics
    /// degrade the affected signal to an unavailable snapshot; the fan-out
    /// itself never fails.
    pub async fn fetch_all(&self) -> SignalMap {
        let mut set = JoinSet::new();
        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let timeout = self.timeout;
            set.spawn(async move {
                let name = provider.name();
                match tokio::time::timeout(timeout, provider.fetch()).await {
                    Ok(snapshot) => snapshot,
                    Err(_) => SignalSnapshot::unavailable(
                        name,
                        format!("fetch timed out after {:?}", timeout),
                    ),
                }
            });
        }

        let mut map = SignalMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(snapshot) => {
                    if let Some(error) = &snapshot.error {
                        warn!(signal = snapshot.name, error = %error, "signal degraded");
                    }
                    map.insert(snapshot);
                }
                Err(e) => warn!(error = %e, "signal fetch task failed"),
            }
        }
        map
    }
}

impl Default for SignalRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}
