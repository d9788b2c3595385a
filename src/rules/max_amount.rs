//! Per-transaction token amount ceiling.

use serde_json::json;

use crate::rules::{MaxAmountConfig, Rule, RuleConfig, RuleKind};
use crate::types::{PolicyContext, PolicyResult};

pub struct MaxAmountRule;

const NAME: &str = "Max Transaction Amount";

/// Scale a raw on-chain amount into whole token units.
fn scale_amount(raw: u128, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

impl Rule for MaxAmountRule {
    fn kind(&self) -> RuleKind {
        RuleKind::MaxAmount
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Limit the maximum amount per transaction"
    }

    fn default_config(&self) -> RuleConfig {
        RuleConfig::MaxAmount(MaxAmountConfig::default())
    }

    fn evaluate(&self, ctx: &PolicyContext, config: &RuleConfig) -> PolicyResult {
        let cfg = match config {
            RuleConfig::MaxAmount(cfg) => cfg.clone(),
            _ => MaxAmountConfig::default(),
        };

        let Some(raw) = ctx.action.token_amount() else {
            return PolicyResult::allow(self.kind(), NAME, "No token amount in transaction");
        };

        let amount = scale_amount(raw, cfg.decimals);

        if amount > cfg.max_amount {
            return PolicyResult::deny(
                self.kind(),
                NAME,
                format!(
                    "Amount too high: {} exceeds {} limit",
                    amount, cfg.max_amount
                ),
            )
            .with_metadata(json!({ "amount": amount, "maxAmount": cfg.max_amount }));
        }

        PolicyResult::allow(self.kind(), NAME, format!("Amount OK: {}", amount))
            .with_metadata(json!({ "amount": amount, "maxAmount": cfg.max_amount }))
    }
}
