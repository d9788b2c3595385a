//! Policy rules: the uniform contract, per-rule configuration and the
//! registry of built-in evaluators.
//!
//! Each rule is pure: `evaluate` takes the evaluation context and a
//! configuration, returns a verdict, and never errors. A config variant of
//! the wrong kind falls back to that rule's defaults instead of failing,
//! so a malformed config can degrade a decision but never abort one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::monitor::AlertSeverity;
use crate::types::{Address, PolicyContext, PolicyResult};

mod cooldown;
mod gas_limit;
mod max_amount;
mod recipient;
mod security_pause;
mod time_window;

pub use cooldown::CooldownRule;
pub use gas_limit::GasLimitRule;
pub use max_amount::MaxAmountRule;
pub use recipient::RecipientWhitelistRule;
pub use security_pause::SecurityPauseRule;
pub use time_window::TimeWindowRule;

/// Identifier of a built-in rule type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    MaxAmount,
    TimeWindow,
    GasLimit,
    SecurityPause,
    RecipientWhitelist,
    Cooldown,
}

impl RuleKind {
    /// All built-in kinds, in no particular order.
    pub const ALL: [RuleKind; 6] = [
        RuleKind::MaxAmount,
        RuleKind::TimeWindow,
        RuleKind::GasLimit,
        RuleKind::SecurityPause,
        RuleKind::RecipientWhitelist,
        RuleKind::Cooldown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::MaxAmount => "max-amount",
            RuleKind::TimeWindow => "time-window",
            RuleKind::GasLimit => "gas-limit",
            RuleKind::SecurityPause => "security-pause",
            RuleKind::RecipientWhitelist => "recipient-whitelist",
            RuleKind::Cooldown => "cooldown",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-transaction amount ceiling, in whole token units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaxAmountConfig {
    pub max_amount: f64,
    /// Token decimals used to scale raw on-chain amounts.
    pub decimals: u8,
}

impl Default for MaxAmountConfig {
    fn default() -> Self {
        Self {
            max_amount: 100.0,
            decimals: 6,
        }
    }
}

/// Allowed UTC hours and weekdays. Hours are `[start, end)`; a window with
/// `start > end` wraps past midnight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeWindowConfig {
    pub start_hour: u8,
    pub end_hour: u8,
    /// Weekdays, 0 = Sunday through 6 = Saturday.
    pub days: Vec<u8>,
}

impl Default for TimeWindowConfig {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 17,
            days: vec![1, 2, 3, 4, 5],
        }
    }
}

/// Gas price ceiling in gwei.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GasLimitConfig {
    pub max_gwei: f64,
}

impl Default for GasLimitConfig {
    fn default() -> Self {
        Self { max_gwei: 50.0 }
    }
}

/// Pause on active security alerts.
///
/// With `pause_on_any_alert` every active alert blocks; otherwise only
/// alerts whose severity is listed count, and more than `max_alert_count`
/// of them blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityPauseConfig {
    pub pause_on_any_alert: bool,
    pub alert_severities: Vec<AlertSeverity>,
    pub max_alert_count: u32,
}

impl Default for SecurityPauseConfig {
    fn default() -> Self {
        Self {
            pause_on_any_alert: true,
            alert_severities: vec![AlertSeverity::High, AlertSeverity::Critical],
            max_alert_count: 0,
        }
    }
}

/// Recipient allow/block lists. The blocklist always wins; an empty config
/// imposes no restriction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipientConfig {
    pub allowed: Vec<Address>,
    pub blocked: Vec<Address>,
}

/// Minimum spacing between confirmed executions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CooldownConfig {
    pub minimum_seconds: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self { minimum_seconds: 60 }
    }
}

/// Tagged configuration, one variant per rule type. Compiled once from the
/// policy document; rules receive it read-only at evaluation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RuleConfig {
    MaxAmount(MaxAmountConfig),
    TimeWindow(TimeWindowConfig),
    GasLimit(GasLimitConfig),
    SecurityPause(SecurityPauseConfig),
    RecipientWhitelist(RecipientConfig),
    Cooldown(CooldownConfig),
}

impl RuleConfig {
    pub fn kind(&self) -> RuleKind {
        match self {
            RuleConfig::MaxAmount(_) => RuleKind::MaxAmount,
            RuleConfig::TimeWindow(_) => RuleKind::TimeWindow,
            RuleConfig::GasLimit(_) => RuleKind::GasLimit,
            RuleConfig::SecurityPause(_) => RuleKind::SecurityPause,
            RuleConfig::RecipientWhitelist(_) => RuleKind::RecipientWhitelist,
            RuleConfig::Cooldown(_) => RuleKind::Cooldown,
        }
    }
}

/// The contract every policy rule implements.
///
/// Evaluation must be side-effect-free and total: malformed or mismatched
/// configs fall back to `default_config`, missing signals trigger the
/// rule's documented availability default.
pub trait Rule: Send + Sync {
    fn kind(&self) -> RuleKind;
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn default_config(&self) -> RuleConfig;
    fn evaluate(&self, ctx: &PolicyContext, config: &RuleConfig) -> PolicyResult;
}

/// Fixed catalog of rule evaluators, built once at startup and passed by
/// reference into the engine. Registering a kind twice replaces the earlier
/// evaluator.
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleRegistry {
    /// Registry containing every built-in rule.
    pub fn builtin() -> Self {
        let mut registry = Self { rules: Vec::new() };
        registry.register(Box::new(MaxAmountRule));
        registry.register(Box::new(TimeWindowRule));
        registry.register(Box::new(GasLimitRule));
        registry.register(Box::new(SecurityPauseRule));
        registry.register(Box::new(RecipientWhitelistRule));
        registry.register(Box::new(CooldownRule));
        registry
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) {
        let kind = rule.kind();
        self.rules.retain(|r| r.kind() != kind);
        self.rules.push(rule);
    }

    pub fn get(&self, kind: RuleKind) -> Option<&dyn Rule> {
        self.rules
            .iter()
            .find(|r| r.kind() == kind)
            .map(|r| r.as_ref())
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
