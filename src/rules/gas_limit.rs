//! Gas price ceiling.
//!
//! Fails open when the gas signal is unavailable.

use serde_json::json;

use crate::rules::{GasLimitConfig, Rule, RuleConfig, RuleKind};
use crate::types::{PolicyContext, PolicyResult};

pub struct GasLimitRule;

const NAME: &str = "Gas Limit";

impl Rule for GasLimitRule {
    fn kind(&self) -> RuleKind {
        RuleKind::GasLimit
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Block transactions when gas price exceeds threshold"
    }

    fn default_config(&self) -> RuleConfig {
        RuleConfig::GasLimit(GasLimitConfig::default())
    }

    fn evaluate(&self, ctx: &PolicyContext, config: &RuleConfig) -> PolicyResult {
        let cfg = match config {
            RuleConfig::GasLimit(cfg) => cfg.clone(),
            _ => GasLimitConfig::default(),
        };

        let Some(gas) = ctx.signals.gas() else {
            return PolicyResult::allow(
                self.kind(),
                NAME,
                "Gas signal unavailable, allowing by default",
            );
        };

        let current_gwei = gas.standard_gwei;

        if current_gwei > cfg.max_gwei {
            return PolicyResult::deny(
                self.kind(),
                NAME,
                format!(
                    "Gas too high: {:.1} gwei exceeds {} gwei limit",
                    current_gwei, cfg.max_gwei
                ),
            )
            .with_metadata(json!({ "currentGwei": current_gwei, "maxGwei": cfg.max_gwei }));
        }

        PolicyResult::allow(self.kind(), NAME, format!("Gas OK: {:.1} gwei", current_gwei))
            .with_metadata(json!({ "currentGwei": current_gwei, "maxGwei": cfg.max_gwei }))
    }
}
