//! Security telemetry signal providers.
//!
//! The in-process provider reads straight from the anomaly monitor. The
//! GraphQL provider queries an external indexer exposing the same alert
//! shape, for deployments where monitoring runs out of process.

use std::sync::Arc;

use async_trait::async_trait;

use crate::monitor::AnomalyMonitor;
use crate::signals::{SignalPayload, SignalProvider, SignalSnapshot, TelemetrySnapshot};

pub(super) const SIGNAL_NAME: &str = "telemetry";

/// Telemetry sourced from the in-process anomaly monitor.
pub struct MonitorTelemetryProvider {
    monitor: Arc<AnomalyMonitor>,
}

impl MonitorTelemetryProvider {
    pub fn new(monitor: Arc<AnomalyMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl SignalProvider for MonitorTelemetryProvider {
    fn name(&self) -> &'static str {
        SIGNAL_NAME
    }

    fn description(&self) -> &'static str {
        "Active security alerts and monitor counters"
    }

    async fn fetch(&self) -> SignalSnapshot {
        let alerts = self.monitor.active_alerts();
        let snapshot = TelemetrySnapshot {
            alert_count: alerts.len(),
            alerts,
            stats: Some(self.monitor.stats()),
        };
        SignalSnapshot::new(SIGNAL_NAME, SignalPayload::Telemetry(snapshot))
    }
}

/// Telemetry fetched from an external GraphQL indexer.
#[cfg(feature = "live-signals")]
pub struct GraphQlTelemetryProvider {
    endpoint: String,
    client: reqwest::Client,
}

#[cfg(feature = "live-signals")]
const ALERT_QUERY: &str = r#"
query ActiveAlerts {
  SecurityAlert(where: {isActive: {_eq: true}}, order_by: {createdAt: desc}) {
    id
    kind
    severity
    message
    principal
    triggerCount
    createdAt
    isActive
  }
}
"#;

#[cfg(feature = "live-signals")]
impl GraphQlTelemetryProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn active_alerts(&self) -> crate::error::Result<Vec<crate::monitor::SecurityAlert>> {
        let unavailable = |reason: String| crate::error::PolicyError::SignalUnavailable {
            name: SIGNAL_NAME.to_string(),
            reason,
        };

        let response: serde_json::Value = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "query": ALERT_QUERY }))
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let alerts = response
            .get("data")
            .and_then(|d| d.get("SecurityAlert"))
            .cloned()
            .ok_or_else(|| unavailable("missing SecurityAlert data".to_string()))?;
        serde_json::from_value(alerts).map_err(|e| unavailable(e.to_string()))
    }
}

#[cfg(feature = "live-signals")]
#[async_trait]
impl SignalProvider for GraphQlTelemetryProvider {
    fn name(&self) -> &'static str {
        SIGNAL_NAME
    }

    fn description(&self) -> &'static str {
        "Active security alerts from the event indexer"
    }

    async fn fetch(&self) -> SignalSnapshot {
        match self.active_alerts().await {
            Ok(alerts) => SignalSnapshot::new(
                SIGNAL_NAME,
                SignalPayload::Telemetry(TelemetrySnapshot {
                    alert_count: alerts.len(),
                    alerts,
                    stats: None,
                }),
            ),
            Err(e) => SignalSnapshot::unavailable(SIGNAL_NAME, e.to_string()),
        }
    }
}
