use visor_policy::document::{PolicyCompiler, PolicyDocument};
use visor_policy::rules::{RuleConfig, RuleKind};

fn compiler() -> PolicyCompiler {
    PolicyCompiler::new()
}

fn full_document() -> PolicyDocument {
    PolicyDocument::from_json(
        r#"{
            "version": "2024-01-01",
            "name": "Everything On",
            "description": "All conditions declared",
            "limits": { "amount": "250", "currency": "USDC", "period": "weekly" },
            "conditions": {
                "cooldown": { "seconds": 600 },
                "recipients": { "allowed": ["0x0000000000000000000000000000000000000001"] },
                "signals": {
                    "security": { "maxAlertCount": 0 },
                    "gas": { "maxGwei": 40 }
                },
                "timeWindow": {
                    "days": [1, 2, 3, 4, 5],
                    "startHour": 9,
                    "endHour": 17,
                    "timezone": "UTC"
                }
            }
        }"#,
    )
    .unwrap()
}

#[test]
fn compiles_in_canonical_order_regardless_of_declaration_order() {
    // The JSON above declares conditions in reverse canonical order.
    let compiled = compiler().compile(&full_document()).unwrap();
    let kinds: Vec<RuleKind> = compiled.rules().iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            RuleKind::MaxAmount,
            RuleKind::TimeWindow,
            RuleKind::GasLimit,
            RuleKind::SecurityPause,
            RuleKind::RecipientWhitelist,
            RuleKind::Cooldown,
        ]
    );
}

#[test]
fn compilation_is_deterministic() {
    let document = full_document();
    let first = compiler().compile(&document).unwrap();
    let second = compiler().compile(&document).unwrap();
    assert_eq!(first, second);
}

#[test]
fn limits_map_to_amount_rule_with_token_decimals() {
    let compiled = compiler().compile(&full_document()).unwrap();
    match &compiled.rules()[0].config {
        RuleConfig::MaxAmount(cfg) => {
            assert_eq!(cfg.max_amount, 250.0);
            assert_eq!(cfg.decimals, 6);
        }
        other => panic!("expected max-amount config, got {:?}", other),
    }
}

#[test]
fn unknown_currency_still_compiles() {
    let document = PolicyDocument::from_json(
        r#"{
            "version": "2024-01-01",
            "name": "Exotic",
            "limits": { "amount": "5", "currency": "FLOOP", "period": "daily" }
        }"#,
    )
    .unwrap();
    let compiled = compiler().compile(&document).unwrap();
    match &compiled.rules()[0].config {
        RuleConfig::MaxAmount(cfg) => assert_eq!(cfg.decimals, 6),
        other => panic!("expected max-amount config, got {:?}", other),
    }
}

#[test]
fn minimal_document_compiles_to_single_rule() {
    let document = PolicyDocument::from_json(
        r#"{
            "version": "2024-01-01",
            "name": "Just Limits",
            "limits": { "amount": "1000", "currency": "USDC", "period": "daily" }
        }"#,
    )
    .unwrap();
    let compiled = compiler().compile(&document).unwrap();
    assert_eq!(compiled.len(), 1);
    assert_eq!(compiled.rules()[0].kind, RuleKind::MaxAmount);
}

#[test]
fn rejects_unsupported_version() {
    let err = PolicyDocument::from_json(
        r#"{
            "version": "2023-06-01",
            "name": "Old",
            "limits": { "amount": "10", "currency": "USDC", "period": "daily" }
        }"#,
    )
    .unwrap_err();
    assert_eq!(err.path, "version");
}

#[test]
fn rejects_non_positive_amount() {
    for amount in ["0", "-5", "abc", ""] {
        let json = format!(
            r#"{{
                "version": "2024-01-01",
                "name": "Bad Amount",
                "limits": {{ "amount": "{}", "currency": "USDC", "period": "daily" }}
            }}"#,
            amount
        );
        let err = PolicyDocument::from_json(&json).unwrap_err();
        assert_eq!(err.path, "limits.amount", "amount {:?}", amount);
    }
}

#[test]
fn rejects_both_recipient_lists() {
    let err = PolicyDocument::from_json(
        r#"{
            "version": "2024-01-01",
            "name": "Conflicting Lists",
            "limits": { "amount": "10", "currency": "USDC", "period": "daily" },
            "conditions": {
                "recipients": {
                    "allowed": ["0x0000000000000000000000000000000000000001"],
                    "blocked": ["0x0000000000000000000000000000000000000002"]
                }
            }
        }"#,
    )
    .unwrap_err();
    assert_eq!(err.path, "conditions.recipients");
}

#[test]
fn rejects_malformed_recipient_address() {
    let err = PolicyDocument::from_json(
        r#"{
            "version": "2024-01-01",
            "name": "Bad Address",
            "limits": { "amount": "10", "currency": "USDC", "period": "daily" },
            "conditions": { "recipients": { "blocked": ["0x1234"] } }
        }"#,
    )
    .unwrap_err();
    assert_eq!(err.path, "conditions.recipients.blocked[0]");
}

#[test]
fn rejects_degenerate_time_windows() {
    // Zero-length window.
    let err = PolicyDocument::from_json(
        r#"{
            "version": "2024-01-01",
            "name": "Zero Window",
            "limits": { "amount": "10", "currency": "USDC", "period": "daily" },
            "conditions": {
                "timeWindow": { "days": [1], "startHour": 9, "endHour": 9, "timezone": "UTC" }
            }
        }"#,
    )
    .unwrap_err();
    assert_eq!(err.path, "conditions.timeWindow.endHour");

    // No days at all.
    let err = PolicyDocument::from_json(
        r#"{
            "version": "2024-01-01",
            "name": "No Days",
            "limits": { "amount": "10", "currency": "USDC", "period": "daily" },
            "conditions": {
                "timeWindow": { "days": [], "startHour": 9, "endHour": 17, "timezone": "UTC" }
            }
        }"#,
    )
    .unwrap_err();
    assert_eq!(err.path, "conditions.timeWindow.days");

    // Duplicate days.
    let err = PolicyDocument::from_json(
        r#"{
            "version": "2024-01-01",
            "name": "Dup Days",
            "limits": { "amount": "10", "currency": "USDC", "period": "daily" },
            "conditions": {
                "timeWindow": { "days": [1, 1], "startHour": 9, "endHour": 17, "timezone": "UTC" }
            }
        }"#,
    )
    .unwrap_err();
    assert_eq!(err.path, "conditions.timeWindow.days");

    // Day out of range.
    let err = PolicyDocument::from_json(
        r#"{
            "version": "2024-01-01",
            "name": "Day Eight",
            "limits": { "amount": "10", "currency": "USDC", "period": "daily" },
            "conditions": {
                "timeWindow": { "days": [7], "startHour": 9, "endHour": 17, "timezone": "UTC" }
            }
        }"#,
    )
    .unwrap_err();
    assert_eq!(err.path, "conditions.timeWindow.days");
}

#[test]
fn rejects_zero_cooldown_and_zero_gas() {
    let err = PolicyDocument::from_json(
        r#"{
            "version": "2024-01-01",
            "name": "Zero Cooldown",
            "limits": { "amount": "10", "currency": "USDC", "period": "daily" },
            "conditions": { "cooldown": { "seconds": 0 } }
        }"#,
    )
    .unwrap_err();
    assert_eq!(err.path, "conditions.cooldown.seconds");

    let err = PolicyDocument::from_json(
        r#"{
            "version": "2024-01-01",
            "name": "Zero Gas",
            "limits": { "amount": "10", "currency": "USDC", "period": "daily" },
            "conditions": { "signals": { "gas": { "maxGwei": 0 } } }
        }"#,
    )
    .unwrap_err();
    assert_eq!(err.path, "conditions.signals.gas.maxGwei");
}

#[test]
fn rejects_oversized_names() {
    let json = format!(
        r#"{{
            "version": "2024-01-01",
            "name": "{}",
            "limits": {{ "amount": "10", "currency": "USDC", "period": "daily" }}
        }}"#,
        "x".repeat(101)
    );
    let err = PolicyDocument::from_json(&json).unwrap_err();
    assert_eq!(err.path, "name");
}
