//! Gas price signal providers.

use async_trait::async_trait;

use crate::signals::{GasSnapshot, SignalPayload, SignalProvider, SignalSnapshot};

pub(super) const SIGNAL_NAME: &str = "gas";

/// Pinned gas price, for offline deployments and tests.
pub struct StaticGasProvider {
    snapshot: Option<GasSnapshot>,
}

impl StaticGasProvider {
    pub fn new(standard_gwei: f64) -> Self {
        Self {
            snapshot: Some(GasSnapshot {
                standard_gwei,
                base_fee_gwei: None,
            }),
        }
    }

    /// A provider that always reports the signal as unavailable.
    pub fn unavailable() -> Self {
        Self { snapshot: None }
    }
}

#[async_trait]
impl SignalProvider for StaticGasProvider {
    fn name(&self) -> &'static str {
        SIGNAL_NAME
    }

    fn description(&self) -> &'static str {
        "Pinned gas price"
    }

    async fn fetch(&self) -> SignalSnapshot {
        match &self.snapshot {
            Some(snapshot) => {
                SignalSnapshot::new(SIGNAL_NAME, SignalPayload::Gas(snapshot.clone()))
            }
            None => SignalSnapshot::unavailable(SIGNAL_NAME, "no gas source configured"),
        }
    }
}

/// Live gas prices via JSON-RPC `eth_gasPrice`.
#[cfg(feature = "live-signals")]
pub struct RpcGasProvider {
    rpc_url: String,
    client: reqwest::Client,
}

#[cfg(feature = "live-signals")]
impl RpcGasProvider {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn gas_price_gwei(&self) -> crate::error::Result<f64> {
        let unavailable = |reason: String| crate::error::PolicyError::SignalUnavailable {
            name: SIGNAL_NAME.to_string(),
            reason,
        };

        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_gasPrice",
            "params": [],
            "id": 1,
        });
        let response: serde_json::Value = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let result = response
            .get("result")
            .and_then(|v| v.as_str())
            .ok_or_else(|| unavailable("missing result in eth_gasPrice response".to_string()))?;
        let wei = u128::from_str_radix(result.trim_start_matches("0x"), 16)
            .map_err(|e| unavailable(format!("bad gas price {}: {}", result, e)))?;

        Ok(wei as f64 / 1e9)
    }
}

#[cfg(feature = "live-signals")]
#[async_trait]
impl SignalProvider for RpcGasProvider {
    fn name(&self) -> &'static str {
        SIGNAL_NAME
    }

    fn description(&self) -> &'static str {
        "Current gas prices from the network"
    }

    async fn fetch(&self) -> SignalSnapshot {
        match self.gas_price_gwei().await {
            Ok(standard_gwei) => SignalSnapshot::new(
                SIGNAL_NAME,
                SignalPayload::Gas(GasSnapshot {
                    standard_gwei,
                    base_fee_gwei: None,
                }),
            ),
            Err(e) => SignalSnapshot::unavailable(SIGNAL_NAME, e.to_string()),
        }
    }
}
