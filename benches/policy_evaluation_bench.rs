use std::time::Instant;

use visor_policy::{
    encode_erc20_transfer, EngineConfig, PolicyDocument, PolicyEngine, ProposedAction,
};

fn main() {
    println!("--- Policy Engine Microbenchmarks ---");

    benchmark_evaluation_latency();
}

fn benchmark_evaluation_latency() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let engine = PolicyEngine::in_memory(EngineConfig::default());
    let user = "0x742d35cc6634c0532925a3b844bc9e7595f12345".parse().unwrap();

    let document = PolicyDocument::from_json(
        r#"{
            "version": "2024-01-01",
            "name": "Latency Bench",
            "limits": { "amount": "100", "currency": "USDC", "period": "daily" },
            "conditions": {
                "timeWindow": { "days": [0,1,2,3,4,5,6], "startHour": 0, "endHour": 23, "timezone": "UTC" },
                "signals": { "gas": { "maxGwei": 50 }, "security": { "maxAlertCount": 0 } },
                "recipients": { "allowed": ["0x0000000000000000000000000000000000000001"] },
                "cooldown": { "seconds": 1 }
            }
        }"#,
    )
    .unwrap();
    engine.install_document(user, &document).unwrap();

    let action = ProposedAction {
        target: "0x1c7d4b196cb0c7b01d743fbc6116a902379c7238".parse().unwrap(),
        value: 0,
        call_data: encode_erc20_transfer(
            "0x0000000000000000000000000000000000000001".parse().unwrap(),
            50_000_000,
        ),
        token_amount: None,
        recipient: None,
        description: None,
    };

    let iterations = 1000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = rt.block_on(engine.evaluate(user, "transfer-bot", action.clone()));
    }

    let duration = start.elapsed();
    let per_eval = duration.as_micros() as f64 / iterations as f64;

    println!("Evaluation latency (6 rules): {:.2} µs", per_eval);
}
