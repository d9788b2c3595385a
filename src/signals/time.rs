//! Wall-clock signal provider.

use async_trait::async_trait;
use chrono::Utc;

use crate::signals::{SignalPayload, SignalProvider, SignalSnapshot, TimeSnapshot};

pub(super) const SIGNAL_NAME: &str = "time";

/// Current time attributes in UTC. Never fails.
pub struct TimeProvider;

#[async_trait]
impl SignalProvider for TimeProvider {
    fn name(&self) -> &'static str {
        SIGNAL_NAME
    }

    fn description(&self) -> &'static str {
        "Current time information"
    }

    async fn fetch(&self) -> SignalSnapshot {
        SignalSnapshot::new(
            SIGNAL_NAME,
            SignalPayload::Time(TimeSnapshot::at(Utc::now())),
        )
    }
}
