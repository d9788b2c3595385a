//! Compilation of policy documents into executable rule lists.
//!
//! Compilation is pure and total over schema-valid documents: no I/O, no
//! live signals, and a fixed canonical rule order so the blocking policy in
//! a denial is reproducible for identical input.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{tokens, PolicyDocument};
use crate::error::ValidationError;
use crate::rules::{
    CooldownConfig, GasLimitConfig, MaxAmountConfig, RecipientConfig, RuleConfig, RuleKind,
    SecurityPauseConfig, TimeWindowConfig,
};
use crate::types::Address;

/// One compiled rule: its type plus the fully default-filled configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleInstance {
    pub kind: RuleKind,
    pub config: RuleConfig,
}

/// The executable form of a policy document: an ordered rule list.
///
/// Canonical order: the limits-derived amount rule first, then declared
/// conditions as timeWindow, signals.gas, signals.security, recipients,
/// cooldown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledPolicy {
    pub name: String,
    rules: Vec<RuleInstance>,
}

impl CompiledPolicy {
    pub fn rules(&self) -> &[RuleInstance] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Validates a document and lowers it into a `CompiledPolicy`.
pub struct PolicyCompiler;

impl PolicyCompiler {
    pub fn new() -> Self {
        Self
    }

    pub fn compile(&self, document: &PolicyDocument) -> Result<CompiledPolicy, ValidationError> {
        document.validate()?;

        let mut rules = Vec::new();

        rules.push(RuleInstance {
            kind: RuleKind::MaxAmount,
            config: RuleConfig::MaxAmount(MaxAmountConfig {
                max_amount: document.limit_amount(),
                decimals: tokens::decimals_for(&document.limits.currency),
            }),
        });

        if let Some(conditions) = &document.conditions {
            if let Some(window) = &conditions.time_window {
                rules.push(RuleInstance {
                    kind: RuleKind::TimeWindow,
                    config: RuleConfig::TimeWindow(TimeWindowConfig {
                        start_hour: window.start_hour,
                        end_hour: window.end_hour,
                        days: window.days.clone(),
                    }),
                });
            }

            if let Some(signals) = &conditions.signals {
                if let Some(gas) = &signals.gas {
                    rules.push(RuleInstance {
                        kind: RuleKind::GasLimit,
                        config: RuleConfig::GasLimit(GasLimitConfig {
                            max_gwei: gas.max_gwei,
                        }),
                    });
                }
                if let Some(security) = &signals.security {
                    let defaults = SecurityPauseConfig::default();
                    rules.push(RuleInstance {
                        kind: RuleKind::SecurityPause,
                        config: RuleConfig::SecurityPause(SecurityPauseConfig {
                            // An explicit severity list narrows the pause to
                            // those severities; otherwise any alert pauses.
                            pause_on_any_alert: security.blocked_severities.is_none(),
                            alert_severities: security
                                .blocked_severities
                                .clone()
                                .unwrap_or(defaults.alert_severities),
                            max_alert_count: security.max_alert_count,
                        }),
                    });
                }
            }

            if let Some(recipients) = &conditions.recipients {
                rules.push(RuleInstance {
                    kind: RuleKind::RecipientWhitelist,
                    config: RuleConfig::RecipientWhitelist(RecipientConfig {
                        allowed: parse_addresses(recipients.allowed.as_deref()),
                        blocked: parse_addresses(recipients.blocked.as_deref()),
                    }),
                });
            }

            if let Some(cooldown) = &conditions.cooldown {
                rules.push(RuleInstance {
                    kind: RuleKind::Cooldown,
                    config: RuleConfig::Cooldown(CooldownConfig {
                        minimum_seconds: cooldown.seconds,
                    }),
                });
            }
        }

        debug!(policy = %document.name, rules = rules.len(), "compiled policy document");

        Ok(CompiledPolicy {
            name: document.name.clone(),
            rules,
        })
    }
}

impl Default for PolicyCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Validation guarantees every entry parses; anything that slipped past is
/// dropped rather than aborting compilation.
fn parse_addresses(list: Option<&[String]>) -> Vec<Address> {
    list.unwrap_or_default()
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect()
}
