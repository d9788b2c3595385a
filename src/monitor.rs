//! Anomaly monitor: sliding-window counters over the stream of confirmed
//! actions, emitting at most one alert per (kind, time bucket).
//!
//! Two counters run side by side: a global one across all principals and a
//! stricter per-principal one. Alert identity is derived from the kind, the
//! subject and the window bucket, so re-crossing a threshold inside the
//! same bucket can never duplicate an alert. Delivery to the sink is
//! fire-and-forget; failures are logged and never reach an evaluation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::SinkError;
use crate::state::SlidingWindow;
use crate::types::Address;

/// Alert severity, ordered from least to most urgent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// What tripped the alert.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertKind {
    /// Confirmed actions across all principals exceeded the global threshold.
    GlobalVolume,
    /// One principal's confirmed actions exceeded the per-principal threshold.
    PrincipalVelocity,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::GlobalVolume => "global-volume",
            AlertKind::PrincipalVelocity => "principal-velocity",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A security alert. `id` is deterministic per (kind, subject, bucket).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAlert {
    pub id: String,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Address>,
    pub trigger_count: usize,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Downstream notification channel for alerts (chat webhook, pager, ...).
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: &SecurityAlert) -> Result<(), SinkError>;
}

/// Sink that only logs. The default when no notifier is wired up.
pub struct TracingAlertSink;

#[async_trait]
impl AlertSink for TracingAlertSink {
    async fn deliver(&self, alert: &SecurityAlert) -> Result<(), SinkError> {
        warn!(
            alert_id = %alert.id,
            severity = %alert.severity,
            "security alert: {}",
            alert.message
        );
        Ok(())
    }
}

/// Sink that forwards alerts over an unbounded channel. Useful for wiring
/// the monitor into an in-process consumer and in tests.
pub struct ChannelAlertSink {
    tx: mpsc::UnboundedSender<SecurityAlert>,
}

impl ChannelAlertSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SecurityAlert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl AlertSink for ChannelAlertSink {
    async fn deliver(&self, alert: &SecurityAlert) -> Result<(), SinkError> {
        self.tx
            .send(alert.clone())
            .map_err(|e| SinkError(e.to_string()))
    }
}

/// Webhook sink posting alerts as JSON.
#[cfg(feature = "live-signals")]
pub struct WebhookAlertSink {
    url: String,
    client: reqwest::Client,
}

#[cfg(feature = "live-signals")]
impl WebhookAlertSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[cfg(feature = "live-signals")]
#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn deliver(&self, alert: &SecurityAlert) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.url)
            .json(alert)
            .send()
            .await
            .map_err(|e| SinkError(e.to_string()))?;
        response
            .error_for_status()
            .map_err(|e| SinkError(e.to_string()))?;
        Ok(())
    }
}

/// Monitor thresholds. The per-principal threshold is lower and carries a
/// stricter severity than the global one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorConfig {
    pub window_seconds: u64,
    pub global_threshold: usize,
    pub principal_threshold: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_seconds: 3600,
            global_threshold: 10,
            principal_threshold: 5,
        }
    }
}

/// Aggregate counters exposed to the telemetry signal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStats {
    pub total_events: u64,
    pub total_alerts: u64,
    pub active_alerts: u64,
}

/// Sliding-window anomaly detector over confirmed actions.
pub struct AnomalyMonitor {
    config: MonitorConfig,
    global: Mutex<SlidingWindow>,
    per_principal: DashMap<Address, SlidingWindow>,
    alerts: DashMap<String, SecurityAlert>,
    sink: Arc<dyn AlertSink>,
    total_events: AtomicU64,
}

impl AnomalyMonitor {
    pub fn new(config: MonitorConfig, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            config,
            global: Mutex::new(SlidingWindow::new()),
            per_principal: DashMap::new(),
            alerts: DashMap::new(),
            sink,
            total_events: AtomicU64::new(0),
        }
    }

    /// Ingest one confirmed action. Called by the engine's
    /// confirmed-execution path; evaluation itself never lands here.
    pub async fn record_event(&self, principal: Address, at: DateTime<Utc>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        let window = chrono::Duration::seconds(self.config.window_seconds as i64);
        let cutoff = at - window;

        let global_count = {
            let mut global = self.global.lock().await;
            global.record(at);
            global.evict_before(cutoff);
            global.len()
        };
        if global_count >= self.config.global_threshold {
            self.raise(
                AlertKind::GlobalVolume,
                AlertSeverity::High,
                None,
                global_count,
                at,
            );
        }

        let principal_count = {
            let mut entry = self.per_principal.entry(principal).or_default();
            entry.record(at);
            entry.evict_before(cutoff);
            entry.len()
        };
        if principal_count >= self.config.principal_threshold {
            self.raise(
                AlertKind::PrincipalVelocity,
                AlertSeverity::Critical,
                Some(principal),
                principal_count,
                at,
            );
        }
    }

    /// Bucket index of `at` within the configured window.
    fn bucket(&self, at: DateTime<Utc>) -> i64 {
        at.timestamp().div_euclid(self.config.window_seconds as i64)
    }

    fn raise(
        &self,
        kind: AlertKind,
        severity: AlertSeverity,
        principal: Option<Address>,
        trigger_count: usize,
        at: DateTime<Utc>,
    ) {
        let bucket = self.bucket(at);
        let id = match principal {
            Some(p) => format!("{}:{}:{}", kind, p, bucket),
            None => format!("{}:{}", kind, bucket),
        };
        if self.alerts.contains_key(&id) {
            debug!(alert_id = %id, "alert already raised for this bucket");
            return;
        }

        let message = match kind {
            AlertKind::GlobalVolume => format!(
                "{} confirmed actions within {}s across all principals",
                trigger_count, self.config.window_seconds
            ),
            AlertKind::PrincipalVelocity => format!(
                "{} confirmed actions within {}s for a single principal",
                trigger_count, self.config.window_seconds
            ),
        };
        let alert = SecurityAlert {
            id: id.clone(),
            kind,
            severity,
            message,
            principal,
            trigger_count,
            created_at: at,
            is_active: true,
        };
        self.alerts.insert(id, alert.clone());

        // At-least-once, fire-and-forget; never blocks or fails the caller.
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.deliver(&alert).await {
                warn!(alert_id = %alert.id, error = %e, "alert delivery failed");
            }
        });
    }

    /// All alerts still flagged active, most recent first.
    pub fn active_alerts(&self) -> Vec<SecurityAlert> {
        let mut alerts: Vec<SecurityAlert> = self
            .alerts
            .iter()
            .filter(|entry| entry.value().is_active)
            .map(|entry| entry.value().clone())
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts
    }

    /// Mark an alert resolved. Returns false when the id is unknown.
    pub fn resolve(&self, id: &str) -> bool {
        match self.alerts.get_mut(id) {
            Some(mut alert) => {
                alert.is_active = false;
                true
            }
            None => false,
        }
    }

    pub fn stats(&self) -> MonitorStats {
        let active = self
            .alerts
            .iter()
            .filter(|entry| entry.value().is_active)
            .count() as u64;
        MonitorStats {
            total_events: self.total_events.load(Ordering::Relaxed),
            total_alerts: self.alerts.len() as u64,
            active_alerts: active,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}
