//! Minimum spacing between confirmed executions for a principal.

use serde_json::json;

use crate::rules::{CooldownConfig, Rule, RuleConfig, RuleKind};
use crate::types::{PolicyContext, PolicyResult};

pub struct CooldownRule;

const NAME: &str = "Transaction Cooldown";

fn format_time_remaining(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{}s", seconds.ceil() as u64)
    } else if seconds < 3600.0 {
        format!("{}m", (seconds / 60.0).ceil() as u64)
    } else {
        format!("{}h", (seconds / 3600.0).ceil() as u64)
    }
}

impl Rule for CooldownRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Cooldown
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Enforce minimum time between transactions"
    }

    fn default_config(&self) -> RuleConfig {
        RuleConfig::Cooldown(CooldownConfig::default())
    }

    fn evaluate(&self, ctx: &PolicyContext, config: &RuleConfig) -> PolicyResult {
        let cfg = match config {
            RuleConfig::Cooldown(cfg) => cfg.clone(),
            _ => CooldownConfig::default(),
        };

        let Some(last) = ctx.last_execution_time else {
            return PolicyResult::allow(
                self.kind(),
                NAME,
                "First transaction - no cooldown required",
            )
            .with_metadata(json!({
                "minimumSeconds": cfg.minimum_seconds,
                "isFirstTransaction": true,
            }));
        };

        let elapsed = (ctx.timestamp - last).num_milliseconds() as f64 / 1000.0;
        let minimum = cfg.minimum_seconds as f64;

        if elapsed < minimum {
            let remaining = minimum - elapsed;
            return PolicyResult::deny(
                self.kind(),
                NAME,
                format!(
                    "Cooldown active: {} remaining",
                    format_time_remaining(remaining)
                ),
            )
            .with_metadata(json!({
                "minimumSeconds": cfg.minimum_seconds,
                "elapsedSeconds": elapsed.floor() as i64,
                "remainingSeconds": remaining.ceil() as i64,
                "lastExecution": last.to_rfc3339(),
            }));
        }

        PolicyResult::allow(
            self.kind(),
            NAME,
            format!("Cooldown satisfied: {}s elapsed", elapsed.floor() as i64),
        )
        .with_metadata(json!({
            "minimumSeconds": cfg.minimum_seconds,
            "elapsedSeconds": elapsed.floor() as i64,
            "lastExecution": last.to_rfc3339(),
        }))
    }
}
