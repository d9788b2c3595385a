//! Declarative policy documents.
//!
//! The document is the human-authored, JSON-serializable description of a
//! principal's limits and conditions. It is validated against the schema
//! invariants here, then compiled into an executable rule list; evaluation
//! never sees an unvalidated document.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::monitor::AlertSeverity;
use crate::types::Address;

mod compiler;
pub mod templates;
pub mod tokens;

pub use compiler::{CompiledPolicy, PolicyCompiler, RuleInstance};

/// The only document version this engine accepts.
pub const DOCUMENT_VERSION: &str = "2024-01-01";

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;

/// Spending limit period.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

/// Core spending limit: amount is a decimal string in whole token units,
/// exactly as authored in the front end.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    pub amount: String,
    pub currency: String,
    pub period: Period,
}

/// Allowed execution window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindowCondition {
    /// Weekdays, 0 = Sunday through 6 = Saturday.
    pub days: Vec<u8>,
    pub start_hour: u8,
    pub end_hour: u8,
    pub timezone: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasCondition {
    pub max_gwei: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCondition {
    pub max_alert_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_severities: Option<Vec<AlertSeverity>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<GasCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityCondition>,
}

/// Recipient restriction. `allowed` and `blocked` are mutually exclusive;
/// addresses are kept as authored and parsed during compilation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientsCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownCondition {
    pub seconds: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindowCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<SignalConditions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipients: Option<RecipientsCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<CooldownCondition>,
}

/// A versioned policy document, immutable once compiled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    pub version: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub limits: Limits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,
}

impl PolicyDocument {
    /// Parse a JSON document and validate every schema invariant.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let document: PolicyDocument = serde_json::from_str(json)
            .map_err(|e| ValidationError::new("$", e.to_string()))?;
        document.validate()?;
        Ok(document)
    }

    /// Check every invariant, reporting the first violation with its field
    /// path. A document that passes here always compiles.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version != DOCUMENT_VERSION {
            return Err(ValidationError::new(
                "version",
                format!("unsupported version {:?}, expected {:?}", self.version, DOCUMENT_VERSION),
            ));
        }
        if self.name.is_empty() {
            return Err(ValidationError::new("name", "Policy name is required"));
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(ValidationError::new("name", "Policy name too long"));
        }
        if let Some(description) = &self.description {
            if description.len() > MAX_DESCRIPTION_LEN {
                return Err(ValidationError::new("description", "Description too long"));
            }
        }

        self.validate_limits()?;
        if let Some(conditions) = &self.conditions {
            validate_conditions(conditions)?;
        }
        Ok(())
    }

    fn validate_limits(&self) -> Result<(), ValidationError> {
        let amount: f64 = self.limits.amount.trim().parse().map_err(|_| {
            ValidationError::new("limits.amount", "Amount must be a positive number")
        })?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ValidationError::new(
                "limits.amount",
                "Amount must be a positive number",
            ));
        }
        if self.limits.currency.is_empty() {
            return Err(ValidationError::new("limits.currency", "Currency is required"));
        }
        Ok(())
    }

    /// The parsed limit amount. Only meaningful after `validate`.
    pub(crate) fn limit_amount(&self) -> f64 {
        self.limits.amount.trim().parse().unwrap_or(0.0)
    }
}

fn validate_conditions(conditions: &Conditions) -> Result<(), ValidationError> {
    if let Some(window) = &conditions.time_window {
        validate_time_window(window)?;
    }
    if let Some(signals) = &conditions.signals {
        if let Some(gas) = &signals.gas {
            if !gas.max_gwei.is_finite() || gas.max_gwei <= 0.0 {
                return Err(ValidationError::new(
                    "conditions.signals.gas.maxGwei",
                    "Gas limit must be positive",
                ));
            }
        }
    }
    if let Some(recipients) = &conditions.recipients {
        validate_recipients(recipients)?;
    }
    if let Some(cooldown) = &conditions.cooldown {
        if cooldown.seconds == 0 {
            return Err(ValidationError::new(
                "conditions.cooldown.seconds",
                "Cooldown must be positive",
            ));
        }
    }
    Ok(())
}

fn validate_time_window(window: &TimeWindowCondition) -> Result<(), ValidationError> {
    if window.days.is_empty() {
        return Err(ValidationError::new(
            "conditions.timeWindow.days",
            "At least one day must be selected",
        ));
    }
    let mut seen = [false; 7];
    for day in &window.days {
        if *day > 6 {
            return Err(ValidationError::new(
                "conditions.timeWindow.days",
                format!("Invalid weekday {}", day),
            ));
        }
        if seen[*day as usize] {
            return Err(ValidationError::new(
                "conditions.timeWindow.days",
                "Duplicate days are not allowed",
            ));
        }
        seen[*day as usize] = true;
    }
    if window.start_hour > 23 {
        return Err(ValidationError::new(
            "conditions.timeWindow.startHour",
            "Hour must be between 0 and 23",
        ));
    }
    if window.end_hour > 23 {
        return Err(ValidationError::new(
            "conditions.timeWindow.endHour",
            "Hour must be between 0 and 23",
        ));
    }
    if window.end_hour <= window.start_hour {
        return Err(ValidationError::new(
            "conditions.timeWindow.endHour",
            "End hour must be after start hour",
        ));
    }
    if window.timezone.is_empty() {
        return Err(ValidationError::new(
            "conditions.timeWindow.timezone",
            "Timezone is required",
        ));
    }
    Ok(())
}

fn validate_recipients(recipients: &RecipientsCondition) -> Result<(), ValidationError> {
    if recipients.allowed.is_some() && recipients.blocked.is_some() {
        return Err(ValidationError::new(
            "conditions.recipients",
            "Cannot have both allowed and blocked lists",
        ));
    }
    for (field, list) in [
        ("allowed", &recipients.allowed),
        ("blocked", &recipients.blocked),
    ] {
        if let Some(addresses) = list {
            for (i, address) in addresses.iter().enumerate() {
                if address.parse::<Address>().is_err() {
                    return Err(ValidationError::new(
                        format!("conditions.recipients.{}[{}]", field, i),
                        "Invalid Ethereum address",
                    ));
                }
            }
        }
    }
    Ok(())
}
