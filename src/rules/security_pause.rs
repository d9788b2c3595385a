//! Pause execution while security alerts are active.
//!
//! Fails open when the monitoring signal is unavailable.

use serde_json::json;

use crate::monitor::SecurityAlert;
use crate::rules::{Rule, RuleConfig, RuleKind, SecurityPauseConfig};
use crate::types::{PolicyContext, PolicyResult};

pub struct SecurityPauseRule;

const NAME: &str = "Security Pause";

fn summarize(alerts: &[SecurityAlert]) -> String {
    alerts
        .iter()
        .take(3)
        .map(|a| format!("{}: {}", a.severity, a.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Rule for SecurityPauseRule {
    fn kind(&self) -> RuleKind {
        RuleKind::SecurityPause
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Pause execution when security alerts are active"
    }

    fn default_config(&self) -> RuleConfig {
        RuleConfig::SecurityPause(SecurityPauseConfig::default())
    }

    fn evaluate(&self, ctx: &PolicyContext, config: &RuleConfig) -> PolicyResult {
        let cfg = match config {
            RuleConfig::SecurityPause(cfg) => cfg.clone(),
            _ => SecurityPauseConfig::default(),
        };

        let Some(telemetry) = ctx.signals.telemetry() else {
            return PolicyResult::allow(self.kind(), NAME, "Security monitoring unavailable");
        };

        let active: Vec<&SecurityAlert> =
            telemetry.alerts.iter().filter(|a| a.is_active).collect();

        if active.is_empty() {
            return PolicyResult::allow(self.kind(), NAME, "No active security alerts");
        }

        let relevant: Vec<SecurityAlert> = if cfg.pause_on_any_alert {
            active.into_iter().cloned().collect()
        } else {
            active
                .into_iter()
                .filter(|a| cfg.alert_severities.contains(&a.severity))
                .cloned()
                .collect()
        };

        if relevant.len() > cfg.max_alert_count as usize {
            return PolicyResult::deny(
                self.kind(),
                NAME,
                format!("Security alert active: {}", summarize(&relevant)),
            )
            .with_metadata(json!({
                "alertCount": relevant.len(),
                "alerts": relevant,
            }));
        }

        PolicyResult::allow(self.kind(), NAME, "No blocking security alerts")
    }
}
