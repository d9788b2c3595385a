//! # Visor Policy
//!
//! Declarative policy engine authorizing autonomous financial actions
//! proposed by automation agents acting under a delegated permission.
//!
//! A human-authored [`PolicyDocument`] is validated and compiled into an
//! ordered rule list; each proposed action is then evaluated against that
//! list plus live contextual signals (gas price, wall clock, security
//! telemetry) and the principal's temporal state (cooldowns, recent
//! activity). The result is a deterministic, auditable allow/deny decision
//! the execution backend gates delegation redemption on.
//!
//! ## Features
//!
//! - **Tagged rule configs**: every rule type carries an explicit,
//!   default-filled configuration validated once at compile time
//! - **Complete audit trail**: every compiled rule runs on every
//!   evaluation, no short-circuiting
//! - **Degraded-signal defaults**: telemetry outages fail open, an
//!   undecodable action fails closed
//! - **Principal-scoped state**: per-principal serialization of temporal
//!   state, safe under concurrent evaluation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use visor_policy::{
//!     Address, EngineConfig, PolicyDocument, PolicyEngine, ProposedAction,
//! };
//!
//! # async fn demo() -> Result<(), visor_policy::PolicyError> {
//! let engine = PolicyEngine::in_memory(EngineConfig::default());
//!
//! let principal: Address = "0x742d35cc6634c0532925a3b844bc9e7595f12345".parse().unwrap();
//! let document = PolicyDocument::from_json(r#"{
//!     "version": "2024-01-01",
//!     "name": "Conservative Daily Transfer",
//!     "limits": { "amount": "50", "currency": "USDC", "period": "daily" },
//!     "conditions": { "cooldown": { "seconds": 3600 } }
//! }"#)?;
//! engine.install_document(principal, &document)?;
//!
//! let action = ProposedAction {
//!     target: "0x1c7d4b196cb0c7b01d743fbc6116a902379c7238".parse().unwrap(),
//!     value: 0,
//!     call_data: visor_policy::encode_erc20_transfer(
//!         "0x0000000000000000000000000000000000000001".parse().unwrap(),
//!         25_000_000,
//!     ),
//!     token_amount: None,
//!     recipient: None,
//!     description: None,
//! };
//!
//! let result = engine.evaluate(principal, "transfer-bot", action).await;
//! if result.allowed {
//!     // hand off to the execution backend, then report back:
//!     engine.record_execution(principal, chrono::Utc::now()).await?;
//! }
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod document;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod rules;
pub mod signals;
pub mod state;
pub mod types;

// Re-export the primary surface
pub use document::{CompiledPolicy, PolicyCompiler, PolicyDocument, RuleInstance};
pub use engine::{EngineConfig, PolicyEngine};
pub use error::{PolicyError, Result, SinkError, StateStoreError, ValidationError};
pub use monitor::{AlertKind, AlertSeverity, AnomalyMonitor, MonitorConfig, SecurityAlert};
pub use rules::{Rule, RuleConfig, RuleKind, RuleRegistry};
pub use signals::{SignalMap, SignalProvider, SignalRegistry, SignalSnapshot};
pub use state::{InMemoryTemporalStore, TemporalState, TemporalStore};
pub use types::{
    decode_erc20_transfer, encode_erc20_transfer, Address, DefaultDecision, EvaluationResult,
    PolicyContext, PolicyResult, ProposedAction,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
