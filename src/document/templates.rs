//! Built-in policy templates offered to users as starting points.

use crate::document::{
    Conditions, CooldownCondition, GasCondition, Limits, Period, PolicyDocument,
    RecipientsCondition, SignalConditions, TimeWindowCondition, DOCUMENT_VERSION,
};

#[derive(Clone, Debug, PartialEq)]
pub struct PolicyTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: &'static str,
    pub document: PolicyDocument,
}

/// The stock templates. Every document here passes validation; a test
/// enforces that so template drift cannot ship a broken starting point.
pub fn builtin_templates() -> Vec<PolicyTemplate> {
    let documents = vec![
        PolicyDocument {
            version: DOCUMENT_VERSION.to_string(),
            name: "Conservative Daily Transfer".to_string(),
            description: Some(
                "Safe daily transfers with business hours and low gas requirements".to_string(),
            ),
            limits: Limits {
                amount: "50".to_string(),
                currency: "USDC".to_string(),
                period: Period::Daily,
            },
            conditions: Some(Conditions {
                time_window: Some(TimeWindowCondition {
                    days: vec![1, 2, 3, 4, 5],
                    start_hour: 9,
                    end_hour: 17,
                    timezone: "America/New_York".to_string(),
                }),
                signals: Some(SignalConditions {
                    gas: Some(GasCondition { max_gwei: 50.0 }),
                    security: None,
                }),
                recipients: None,
                cooldown: None,
            }),
        },
        PolicyDocument {
            version: DOCUMENT_VERSION.to_string(),
            name: "24/7 Trading Bot".to_string(),
            description: Some(
                "Higher limits for automated trading around the clock".to_string(),
            ),
            limits: Limits {
                amount: "1000".to_string(),
                currency: "USDC".to_string(),
                period: Period::Daily,
            },
            conditions: None,
        },
        PolicyDocument {
            version: DOCUMENT_VERSION.to_string(),
            name: "Whitelist-Only Transfers".to_string(),
            description: Some(
                "Only allow transfers to pre-approved addresses with rate limiting".to_string(),
            ),
            limits: Limits {
                amount: "500".to_string(),
                currency: "USDC".to_string(),
                period: Period::Weekly,
            },
            conditions: Some(Conditions {
                time_window: None,
                signals: None,
                recipients: Some(RecipientsCondition {
                    // Placeholder addresses the user customizes on install.
                    allowed: Some(vec![
                        "0x0000000000000000000000000000000000000001".to_string(),
                        "0x0000000000000000000000000000000000000002".to_string(),
                        "0x0000000000000000000000000000000000000003".to_string(),
                    ]),
                    blocked: None,
                }),
                cooldown: Some(CooldownCondition { seconds: 3600 }),
            }),
        },
        PolicyDocument {
            version: DOCUMENT_VERSION.to_string(),
            name: "Emergency Budget".to_string(),
            description: Some("Minimal spending for emergency situations".to_string()),
            limits: Limits {
                amount: "10".to_string(),
                currency: "USDC".to_string(),
                period: Period::Daily,
            },
            conditions: Some(Conditions {
                time_window: None,
                signals: None,
                recipients: None,
                cooldown: Some(CooldownCondition { seconds: 21600 }),
            }),
        },
    ];

    documents
        .into_iter()
        .enumerate()
        .map(|(i, document)| PolicyTemplate {
            id: format!("template-{}", i + 1),
            name: document.name.clone(),
            description: document.description.clone().unwrap_or_default(),
            category: "transfer-bot",
            document,
        })
        .collect()
}
