//! Recipient allow/block lists.
//!
//! Fails closed when the recipient cannot be determined.

use serde_json::json;

use crate::rules::{RecipientConfig, Rule, RuleConfig, RuleKind};
use crate::types::{PolicyContext, PolicyResult};

pub struct RecipientWhitelistRule;

const NAME: &str = "Recipient Whitelist";

impl Rule for RecipientWhitelistRule {
    fn kind(&self) -> RuleKind {
        RuleKind::RecipientWhitelist
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Only allow transfers to whitelisted addresses or block specific addresses"
    }

    fn default_config(&self) -> RuleConfig {
        RuleConfig::RecipientWhitelist(RecipientConfig::default())
    }

    fn evaluate(&self, ctx: &PolicyContext, config: &RuleConfig) -> PolicyResult {
        let cfg = match config {
            RuleConfig::RecipientWhitelist(cfg) => cfg.clone(),
            _ => RecipientConfig::default(),
        };

        let Some(recipient) = ctx.action.recipient() else {
            return PolicyResult::deny(
                self.kind(),
                NAME,
                "Unable to determine transaction recipient",
            );
        };

        // Blocklist takes precedence over any whitelist entry.
        if cfg.blocked.contains(&recipient) {
            return PolicyResult::deny(
                self.kind(),
                NAME,
                format!("Recipient {} is in the blocked list", recipient),
            )
            .with_metadata(json!({ "recipient": recipient, "blocked": cfg.blocked }));
        }

        if !cfg.allowed.is_empty() {
            if cfg.allowed.contains(&recipient) {
                return PolicyResult::allow(
                    self.kind(),
                    NAME,
                    format!("Recipient {} is whitelisted", recipient),
                )
                .with_metadata(json!({ "recipient": recipient, "allowed": cfg.allowed }));
            }
            return PolicyResult::deny(
                self.kind(),
                NAME,
                format!("Recipient {} is not in the whitelist", recipient),
            )
            .with_metadata(json!({ "recipient": recipient, "allowed": cfg.allowed }));
        }

        PolicyResult::allow(self.kind(), NAME, "No recipient restrictions configured")
            .with_metadata(json!({ "recipient": recipient }))
    }
}
