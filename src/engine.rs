//! The evaluation engine.
//!
//! Orchestrates one authorization: resolve the principal's compiled policy,
//! gather signals, read temporal state, run every compiled rule, aggregate.
//! The engine never mutates temporal state during evaluation; state advances
//! only through the confirmed-execution callback.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::{CompiledPolicy, PolicyCompiler, PolicyDocument};
use crate::error::{PolicyError, ValidationError};
use crate::monitor::{AnomalyMonitor, MonitorConfig, TracingAlertSink};
use crate::rules::RuleRegistry;
use crate::signals::{MonitorTelemetryProvider, SignalRegistry, TimeProvider};
use crate::state::{InMemoryTemporalStore, TemporalStore};
use crate::types::{
    Address, DefaultDecision, EvaluationResult, PolicyContext, ProposedAction,
};

/// Engine-level settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Decision for principals without an installed policy.
    pub default_decision: DefaultDecision,
}

/// Evaluates proposed actions against per-principal compiled policies.
pub struct PolicyEngine {
    registry: Arc<RuleRegistry>,
    signals: Arc<SignalRegistry>,
    store: Arc<dyn TemporalStore>,
    monitor: Arc<AnomalyMonitor>,
    policies: DashMap<Address, Arc<CompiledPolicy>>,
    compiler: PolicyCompiler,
    config: EngineConfig,
}

impl PolicyEngine {
    pub fn new(
        registry: Arc<RuleRegistry>,
        signals: Arc<SignalRegistry>,
        store: Arc<dyn TemporalStore>,
        monitor: Arc<AnomalyMonitor>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            signals,
            store,
            monitor,
            policies: DashMap::new(),
            compiler: PolicyCompiler::new(),
            config,
        }
    }

    /// Fully in-memory engine: built-in rules, time + telemetry signals,
    /// in-memory temporal store, log-only alert sink.
    pub fn in_memory(config: EngineConfig) -> Self {
        let monitor = Arc::new(AnomalyMonitor::new(
            MonitorConfig::default(),
            Arc::new(TracingAlertSink),
        ));
        let signals = SignalRegistry::default()
            .with_provider(Arc::new(TimeProvider))
            .with_provider(Arc::new(MonitorTelemetryProvider::new(Arc::clone(&monitor))));
        Self::new(
            Arc::new(RuleRegistry::builtin()),
            Arc::new(signals),
            Arc::new(InMemoryTemporalStore::default()),
            monitor,
            config,
        )
    }

    /// Compile a document and install it as the principal's policy,
    /// replacing any previous one.
    pub fn install_document(
        &self,
        principal: Address,
        document: &PolicyDocument,
    ) -> Result<(), ValidationError> {
        let compiled = self.compiler.compile(document)?;
        info!(%principal, policy = %compiled.name, rules = compiled.len(), "policy installed");
        self.policies.insert(principal, Arc::new(compiled));
        Ok(())
    }

    pub fn install_policy(&self, principal: Address, policy: CompiledPolicy) {
        self.policies.insert(principal, Arc::new(policy));
    }

    pub fn remove_policy(&self, principal: Address) -> bool {
        self.policies.remove(&principal).is_some()
    }

    pub fn policy_for(&self, principal: Address) -> Option<Arc<CompiledPolicy>> {
        self.policies.get(&principal).map(|p| Arc::clone(p.value()))
    }

    pub fn monitor(&self) -> &Arc<AnomalyMonitor> {
        &self.monitor
    }

    /// Authorize one proposed action at the current instant.
    pub async fn evaluate(
        &self,
        principal: Address,
        agent_id: &str,
        action: ProposedAction,
    ) -> EvaluationResult {
        self.evaluate_at(principal, agent_id, action, Utc::now()).await
    }

    /// Authorize one proposed action as of `timestamp`.
    ///
    /// Every compiled rule runs; there is no short-circuiting, so the
    /// decision list is a complete audit trail.
    pub async fn evaluate_at(
        &self,
        principal: Address,
        agent_id: &str,
        action: ProposedAction,
        timestamp: DateTime<Utc>,
    ) -> EvaluationResult {
        let Some(policy) = self.policy_for(principal) else {
            return match self.config.default_decision {
                DefaultDecision::DenyAll => {
                    debug!(%principal, "no policy installed, denying by default");
                    EvaluationResult::denied(
                        "no-policy",
                        format!("No policy installed for {}", principal),
                    )
                }
                DefaultDecision::AllowAll => EvaluationResult::allowed_by_default(),
            };
        };

        let signals = self.signals.fetch_all().await;

        // Uncertain temporal state must never grant an authorization.
        let state = match self.store.load(principal).await {
            Ok(state) => state,
            Err(e) => {
                warn!(%principal, error = %e, "temporal state unavailable, failing closed");
                return EvaluationResult::denied(
                    "temporal-state",
                    format!("Temporal state unavailable: {}", e),
                );
            }
        };

        let ctx = PolicyContext {
            principal,
            agent_id: agent_id.to_string(),
            action,
            signals,
            timestamp,
            last_execution_time: state.last_execution_time,
        };

        let mut decisions = Vec::with_capacity(policy.len());
        for instance in policy.rules() {
            let rule = self
                .registry
                .get(instance.kind)
                .unwrap_or_else(|| panic!("rule kind {} missing from registry", instance.kind));
            decisions.push(rule.evaluate(&ctx, &instance.config));
        }

        let result = EvaluationResult::from_decisions(decisions);
        if !result.allowed {
            debug!(
                %principal,
                agent = agent_id,
                payload = %hex::encode(ctx.action.payload_digest()),
                blocking = result.blocking_policy.as_deref().unwrap_or("unknown"),
                "action denied"
            );
        }
        result
    }

    /// Confirmed-execution callback from the execution backend: the only
    /// state-mutating entry point. Advances the principal's temporal state
    /// and feeds the anomaly monitor.
    pub async fn record_execution(
        &self,
        principal: Address,
        at: DateTime<Utc>,
    ) -> Result<(), PolicyError> {
        self.store.record_execution(principal, at).await?;
        self.monitor.record_event(principal, at).await;
        debug!(%principal, at = %at, "confirmed execution recorded");
        Ok(())
    }
}
