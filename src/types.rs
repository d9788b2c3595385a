//! Core types shared across the policy engine.
//!
//! Addresses, proposed actions, evaluation context and the decision
//! structures consumed by the execution backend.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use thiserror::Error;

use crate::rules::RuleKind;
use crate::signals::SignalMap;

/// Selector for `transfer(address,uint256)`.
pub const ERC20_TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// A 20-byte account address, stored raw and rendered as `0x`-prefixed
/// lowercase hex. Comparison is byte-wise, so mixed-case inputs collapse
/// to one identity at parse time.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address {input:?}: {reason}")]
pub struct AddressParseError {
    pub input: String,
    pub reason: String,
}

impl Address {
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub const ZERO: Address = Address([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s.strip_prefix("0x").ok_or_else(|| AddressParseError {
            input: s.to_string(),
            reason: "missing 0x prefix".to_string(),
        })?;
        if hex_part.len() != 40 {
            return Err(AddressParseError {
                input: s.to_string(),
                reason: format!("expected 40 hex characters, got {}", hex_part.len()),
            });
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex_part, &mut bytes).map_err(|e| AddressParseError {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Decode an ERC-20 `transfer(address,uint256)` call.
///
/// Returns the recipient and raw token amount, or `None` when the payload
/// is not a well-formed transfer (wrong selector, wrong length, non-zero
/// padding, or an amount wider than 128 bits).
pub fn decode_erc20_transfer(data: &[u8]) -> Option<(Address, u128)> {
    if data.len() != 68 || data[..4] != ERC20_TRANSFER_SELECTOR {
        return None;
    }
    // First ABI word: 12 zero bytes then the 20-byte address.
    if data[4..16].iter().any(|b| *b != 0) {
        return None;
    }
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&data[16..36]);

    // Second ABI word: the amount. Anything above u128 is rejected.
    if data[36..52].iter().any(|b| *b != 0) {
        return None;
    }
    let mut amount = [0u8; 16];
    amount.copy_from_slice(&data[52..68]);

    Some((Address::new(addr), u128::from_be_bytes(amount)))
}

/// Encode an ERC-20 `transfer(address,uint256)` call.
pub fn encode_erc20_transfer(to: Address, amount: u128) -> Vec<u8> {
    let mut data = Vec::with_capacity(68);
    data.extend_from_slice(&ERC20_TRANSFER_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(to.as_bytes());
    data.extend_from_slice(&[0u8; 16]);
    data.extend_from_slice(&amount.to_be_bytes());
    data
}

/// An action proposed by an automation adapter, awaiting authorization.
///
/// `token_amount` and `recipient` are the adapter's decoded view of the
/// payload; rules that need them fall back to decoding `call_data` when the
/// adapter left them unset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedAction {
    pub target: Address,
    pub value: u128,
    #[serde(with = "hex_bytes")]
    pub call_data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_amount: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProposedAction {
    /// SHA3-256 digest of the call data, used in audit metadata.
    pub fn payload_digest(&self) -> [u8; 32] {
        let mut hasher = Sha3_256::new();
        hasher.update(&self.call_data);
        hasher.finalize().into()
    }

    /// Raw token amount, preferring the adapter's decoded value over the
    /// calldata.
    pub fn token_amount(&self) -> Option<u128> {
        self.token_amount
            .or_else(|| decode_erc20_transfer(&self.call_data).map(|(_, amount)| amount))
    }

    /// Transfer recipient, preferring the adapter's decoded value over the
    /// calldata. `None` means the recipient cannot be determined.
    pub fn recipient(&self) -> Option<Address> {
        self.recipient
            .or_else(|| decode_erc20_transfer(&self.call_data).map(|(to, _)| to))
    }
}

/// Hex (`0x`-prefixed) serde representation for binary calldata.
mod hex_bytes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(D::Error::custom)
    }
}

/// Everything a rule may consult while deciding. Built fresh per evaluation;
/// rules never mutate it.
#[derive(Clone, Debug)]
pub struct PolicyContext {
    /// End user on whose behalf the agent acts.
    pub principal: Address,
    /// Automation adapter identifier (e.g. `transfer-bot`).
    pub agent_id: String,
    pub action: ProposedAction,
    /// Snapshots gathered by the signal fan-out, keyed by provider name.
    pub signals: SignalMap,
    /// Evaluation wall-clock instant.
    pub timestamp: DateTime<Utc>,
    /// Most recent confirmed execution for this principal, if any.
    pub last_execution_time: Option<DateTime<Utc>>,
}

/// One rule's verdict. Metadata is audit-only and never drives control flow.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResult {
    #[serde(rename = "policyType")]
    pub rule: RuleKind,
    #[serde(rename = "policyName")]
    pub rule_name: &'static str,
    pub allowed: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl PolicyResult {
    pub fn allow(rule: RuleKind, rule_name: &'static str, reason: impl Into<String>) -> Self {
        Self {
            rule,
            rule_name,
            allowed: true,
            reason: reason.into(),
            metadata: None,
        }
    }

    pub fn deny(rule: RuleKind, rule_name: &'static str, reason: impl Into<String>) -> Self {
        Self {
            rule,
            rule_name,
            allowed: false,
            reason: reason.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Decision taken when a principal has no installed policy.
/// Deny-all is the default.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultDecision {
    #[default]
    DenyAll,
    AllowAll,
}

/// Aggregate outcome of evaluating a compiled policy against one action.
///
/// `allowed` is the logical AND of every decision; `blocking_policy` and
/// `blocking_reason` identify the first denying rule in declaration order.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub allowed: bool,
    pub decisions: Vec<PolicyResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_reason: Option<String>,
}

impl EvaluationResult {
    /// Aggregate an ordered decision list. Every compiled rule must already
    /// be present: no short-circuiting happens here or upstream.
    pub fn from_decisions(decisions: Vec<PolicyResult>) -> Self {
        let blocking = decisions.iter().find(|d| !d.allowed);
        let (blocking_policy, blocking_reason) = match blocking {
            Some(d) => (Some(d.rule.to_string()), Some(d.reason.clone())),
            None => (None, None),
        };
        Self {
            allowed: blocking.is_none(),
            decisions,
            blocking_policy,
            blocking_reason,
        }
    }

    /// A denial issued without running any rule, e.g. when temporal state
    /// cannot be read or no policy is installed under a deny-all default.
    pub fn denied(policy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            decisions: Vec::new(),
            blocking_policy: Some(policy.into()),
            blocking_reason: Some(reason.into()),
        }
    }

    /// An allowance issued without running any rule (allow-all default).
    pub fn allowed_by_default() -> Self {
        Self {
            allowed: true,
            decisions: Vec::new(),
            blocking_policy: None,
            blocking_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_roundtrip_is_case_insensitive() {
        let checksummed: Address = "0x742d35Cc6634C0532925a3b844Bc9e7595f12345"
            .parse()
            .unwrap();
        let lower: Address = "0x742d35cc6634c0532925a3b844bc9e7595f12345"
            .parse()
            .unwrap();
        assert_eq!(checksummed, lower);
        assert_eq!(
            checksummed.to_string(),
            "0x742d35cc6634c0532925a3b844bc9e7595f12345"
        );
    }

    #[test]
    fn address_rejects_malformed_input() {
        assert!("742d35cc6634c0532925a3b844bc9e7595f12345"
            .parse::<Address>()
            .is_err());
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzzzd35cc6634c0532925a3b844bc9e7595f12345"
            .parse::<Address>()
            .is_err());
    }

    #[test]
    fn decodes_erc20_transfer_calldata() {
        let to: Address = "0x1c7d4b196cb0c7b01d743fbc6116a902379c7238"
            .parse()
            .unwrap();
        let data = encode_erc20_transfer(to, 150_000_000);
        assert_eq!(decode_erc20_transfer(&data), Some((to, 150_000_000)));

        // Foreign selector is not a transfer.
        let mut other = data.clone();
        other[0] = 0x23;
        assert_eq!(decode_erc20_transfer(&other), None);

        // Truncated calldata is undecodable.
        assert_eq!(decode_erc20_transfer(&data[..60]), None);
    }

    #[test]
    fn action_falls_back_to_calldata_decoding() {
        let to: Address = "0x0000000000000000000000000000000000000001"
            .parse()
            .unwrap();
        let action = ProposedAction {
            target: Address::ZERO,
            value: 0,
            call_data: encode_erc20_transfer(to, 42),
            token_amount: None,
            recipient: None,
            description: None,
        };
        assert_eq!(action.recipient(), Some(to));
        assert_eq!(action.token_amount(), Some(42));
    }

    #[test]
    fn aggregation_takes_first_denial() {
        let decisions = vec![
            PolicyResult::allow(RuleKind::MaxAmount, "Max Transaction Amount", "ok"),
            PolicyResult::deny(RuleKind::TimeWindow, "Time Window", "outside window"),
            PolicyResult::deny(RuleKind::Cooldown, "Transaction Cooldown", "cooling down"),
        ];
        let result = EvaluationResult::from_decisions(decisions);
        assert!(!result.allowed);
        assert_eq!(result.decisions.len(), 3);
        assert_eq!(result.blocking_policy.as_deref(), Some("time-window"));
        assert_eq!(result.blocking_reason.as_deref(), Some("outside window"));
    }
}
