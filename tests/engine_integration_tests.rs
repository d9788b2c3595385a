use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use visor_policy::monitor::{AnomalyMonitor, MonitorConfig, TracingAlertSink};
use visor_policy::signals::{SignalProvider, SignalRegistry, SignalSnapshot, TimeProvider};
use visor_policy::state::{TemporalState, TemporalStore};
use visor_policy::{
    encode_erc20_transfer, Address, DefaultDecision, EngineConfig, PolicyDocument, PolicyEngine,
    ProposedAction, RuleRegistry, StateStoreError,
};

fn principal(last_byte: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = last_byte;
    Address::new(bytes)
}

fn transfer(raw_amount: u128) -> ProposedAction {
    ProposedAction {
        target: "0x1c7d4b196cb0c7b01d743fbc6116a902379c7238".parse().unwrap(),
        value: 0,
        call_data: encode_erc20_transfer(principal(0x01), raw_amount),
        token_amount: None,
        recipient: None,
        description: Some("scheduled transfer".to_string()),
    }
}

fn document(json: &str) -> PolicyDocument {
    PolicyDocument::from_json(json).unwrap()
}

fn cooldown_policy() -> PolicyDocument {
    document(
        r#"{
            "version": "2024-01-01",
            "name": "Cooldown Policy",
            "limits": { "amount": "100", "currency": "USDC", "period": "daily" },
            "conditions": { "cooldown": { "seconds": 3600 } }
        }"#,
    )
}

#[tokio::test]
async fn evaluates_every_rule_without_short_circuiting() {
    let engine = PolicyEngine::in_memory(EngineConfig::default());
    let user = principal(0xAA);
    engine
        .install_document(
            user,
            &document(
                r#"{
                    "version": "2024-01-01",
                    "name": "Strict",
                    "limits": { "amount": "100", "currency": "USDC", "period": "daily" },
                    "conditions": {
                        "recipients": { "blocked": ["0x0000000000000000000000000000000000000001"] },
                        "cooldown": { "seconds": 60 }
                    }
                }"#,
            ),
        )
        .unwrap();

    // Amount and recipient both violate; all three rules still report.
    let result = engine.evaluate(user, "transfer-bot", transfer(500_000_000)).await;
    assert!(!result.allowed);
    assert_eq!(result.decisions.len(), 3);
    assert_eq!(
        result.allowed,
        result.decisions.iter().all(|d| d.allowed),
    );
    // First denier in canonical order wins the blocking slot.
    assert_eq!(result.blocking_policy.as_deref(), Some("max-amount"));
    let denied: Vec<_> = result.decisions.iter().filter(|d| !d.allowed).collect();
    assert_eq!(denied.len(), 2);
}

#[tokio::test]
async fn cooldown_gates_until_window_elapses() {
    let engine = PolicyEngine::in_memory(EngineConfig::default());
    let user = principal(0xAB);
    engine.install_document(user, &cooldown_policy()).unwrap();

    let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap();
    engine.record_execution(user, t0).await.unwrap();

    let halfway = engine
        .evaluate_at(user, "transfer-bot", transfer(1_000_000), t0 + chrono::Duration::seconds(1800))
        .await;
    assert!(!halfway.allowed);
    assert_eq!(halfway.blocking_policy.as_deref(), Some("cooldown"));

    let after = engine
        .evaluate_at(user, "transfer-bot", transfer(1_000_000), t0 + chrono::Duration::seconds(3601))
        .await;
    assert!(after.allowed, "{:?}", after.blocking_reason);
}

#[tokio::test]
async fn missing_policy_honors_configured_default() {
    let deny = PolicyEngine::in_memory(EngineConfig::default());
    let result = deny.evaluate(principal(0xAC), "transfer-bot", transfer(1)).await;
    assert!(!result.allowed);
    assert_eq!(result.blocking_policy.as_deref(), Some("no-policy"));
    assert!(result.decisions.is_empty());

    let allow = PolicyEngine::in_memory(EngineConfig {
        default_decision: DefaultDecision::AllowAll,
    });
    let result = allow.evaluate(principal(0xAC), "transfer-bot", transfer(1)).await;
    assert!(result.allowed);
}

struct FailingStore;

#[async_trait]
impl TemporalStore for FailingStore {
    async fn load(&self, _principal: Address) -> Result<TemporalState, StateStoreError> {
        Err(StateStoreError("backing store offline".to_string()))
    }

    async fn record_execution(
        &self,
        _principal: Address,
        _at: DateTime<Utc>,
    ) -> Result<TemporalState, StateStoreError> {
        Err(StateStoreError("backing store offline".to_string()))
    }
}

#[tokio::test]
async fn state_store_failure_fails_closed() {
    let monitor = Arc::new(AnomalyMonitor::new(
        MonitorConfig::default(),
        Arc::new(TracingAlertSink),
    ));
    let signals = SignalRegistry::default().with_provider(Arc::new(TimeProvider));
    let engine = PolicyEngine::new(
        Arc::new(RuleRegistry::builtin()),
        Arc::new(signals),
        Arc::new(FailingStore),
        monitor,
        EngineConfig::default(),
    );

    let user = principal(0xAD);
    engine.install_document(user, &cooldown_policy()).unwrap();

    let result = engine.evaluate(user, "transfer-bot", transfer(1_000_000)).await;
    assert!(!result.allowed);
    assert_eq!(result.blocking_policy.as_deref(), Some("temporal-state"));
    assert!(result
        .blocking_reason
        .as_deref()
        .unwrap()
        .contains("backing store offline"));
}

/// Provider that sleeps past the registry timeout.
struct StallingGasProvider;

#[async_trait]
impl SignalProvider for StallingGasProvider {
    fn name(&self) -> &'static str {
        "gas"
    }

    fn description(&self) -> &'static str {
        "never answers in time"
    }

    async fn fetch(&self) -> SignalSnapshot {
        tokio::time::sleep(Duration::from_secs(30)).await;
        SignalSnapshot::unavailable("gas", "unreachable")
    }
}

#[tokio::test]
async fn slow_signal_degrades_instead_of_blocking() {
    let monitor = Arc::new(AnomalyMonitor::new(
        MonitorConfig::default(),
        Arc::new(TracingAlertSink),
    ));
    let signals = SignalRegistry::new(Duration::from_millis(50))
        .with_provider(Arc::new(StallingGasProvider));
    let engine = PolicyEngine::new(
        Arc::new(RuleRegistry::builtin()),
        Arc::new(signals),
        Arc::new(visor_policy::InMemoryTemporalStore::default()),
        monitor,
        EngineConfig::default(),
    );

    let user = principal(0xAE);
    engine
        .install_document(
            user,
            &document(
                r#"{
                    "version": "2024-01-01",
                    "name": "Gas Capped",
                    "limits": { "amount": "100", "currency": "USDC", "period": "daily" },
                    "conditions": { "signals": { "gas": { "maxGwei": 0.001 } } }
                }"#,
            ),
        )
        .unwrap();

    // Gas provider stalls; the rule's availability default (allow) applies,
    // and the whole evaluation stays bounded by the fetch timeout.
    let result = engine.evaluate(user, "transfer-bot", transfer(1_000_000)).await;
    assert!(result.allowed, "{:?}", result.blocking_reason);
    let gas_decision = result
        .decisions
        .iter()
        .find(|d| d.rule == visor_policy::RuleKind::GasLimit)
        .unwrap();
    assert!(gas_decision.reason.contains("unavailable"));
}

#[tokio::test]
async fn concurrent_principals_do_not_interfere() {
    let engine = Arc::new(PolicyEngine::in_memory(EngineConfig::default()));
    let users: Vec<Address> = (1..=8).map(principal).collect();
    for user in &users {
        engine.install_document(*user, &cooldown_policy()).unwrap();
    }

    let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 10, 0, 0).unwrap();
    // Only even principals have a prior execution.
    for user in users.iter().step_by(2) {
        engine.record_execution(*user, t0).await.unwrap();
    }

    let mut handles = Vec::new();
    for (i, user) in users.iter().enumerate() {
        let engine = Arc::clone(&engine);
        let user = *user;
        handles.push(tokio::spawn(async move {
            let result = engine
                .evaluate_at(
                    user,
                    "transfer-bot",
                    transfer(1_000_000),
                    t0 + chrono::Duration::seconds(60),
                )
                .await;
            (i, result)
        }));
    }

    for handle in handles {
        let (i, result) = handle.await.unwrap();
        if i % 2 == 0 {
            assert!(!result.allowed, "principal {} should be cooling down", i);
        } else {
            assert!(result.allowed, "principal {} has no prior execution", i);
        }
    }
}

#[tokio::test]
async fn evaluation_never_mutates_temporal_state() {
    let engine = PolicyEngine::in_memory(EngineConfig::default());
    let user = principal(0xAF);
    engine.install_document(user, &cooldown_policy()).unwrap();

    // Two back-to-back evaluations: the first allowed decision must not
    // start a cooldown by itself.
    let first = engine.evaluate(user, "transfer-bot", transfer(1_000_000)).await;
    let second = engine.evaluate(user, "transfer-bot", transfer(1_000_000)).await;
    assert!(first.allowed);
    assert!(second.allowed);
}

#[tokio::test]
async fn result_serializes_for_the_execution_backend() {
    let engine = PolicyEngine::in_memory(EngineConfig::default());
    let user = principal(0xB0);
    engine.install_document(user, &cooldown_policy()).unwrap();

    let result = engine.evaluate(user, "transfer-bot", transfer(1_000_000)).await;
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["allowed"], true);
    assert!(json["decisions"].as_array().unwrap().len() == 2);
    assert_eq!(json["decisions"][0]["policyType"], "max-amount");
    assert!(json["decisions"][0]["policyName"].is_string());
}
