//! # AgentContract - Record, replay and assert agent trajectories
//!
//! AgentContract captures the turn-by-turn behavior of a tool-using agent as
//! a deterministic cassette, replays it without touching any live model or
//! tool, and checks it against declarative contracts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agentcontract_core::prelude::*;
//! use serde_json::json;
//!
//! fn main() -> Result<()> {
//!     // Record a run
//!     let mut recorder = Recorder::new("refund-flow").with_model("openai", "gpt-4o");
//!     recorder.recording(|rec| -> Result<()> {
//!         rec.add_turn(TurnInput::new("user").content("refund ORD-123"))?;
//!         rec.add_turn(TurnInput::new("assistant").tool_call(json!({
//!             "function": "lookup_order",
//!             "arguments": {"order_id": "ORD-123"},
//!             "result": {"status": "delivered"}
//!         })))?;
//!         Ok(())
//!     })?;
//!
//!     let store = CassetteStore::new("tests/scenarios");
//!     store.save(recorder.run())?;
//!
//!     // Check it against a contract
//!     let contract = Contract::new()
//!         .with_assertion(&AssertionSpec::new("called_count", "tool:lookup_order").with_value(1));
//!     let result = AssertionEngine::new().check_contract(&store.load("refund-flow")?, &contract);
//!     assert!(result.passed());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **trajectory**: the run/turn/tool-call data model
//! - **recorder**: the only way turns enter a run
//! - **cassette**: the persisted JSON form and a scenario-keyed store
//! - **replay**: ordered tool-result stubbing and execution diffs
//! - **assertions**: fault-contained assertion and policy evaluation

pub mod assertions;
pub mod cassette;
pub mod config;
pub mod error;
pub mod recorder;
pub mod replay;
pub mod trajectory;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::assertions::{
        Assertion, AssertionEngine, AssertionSpec, CheckResult, Contract, ContractResult,
        ContractSuite, Policy, PolicySpec, Target,
    };
    pub use crate::cassette::CassetteStore;
    pub use crate::config::{CassetteConfig, ContractConfig, RecorderConfig, ReplayConfig};
    pub use crate::error::{ContractError, Result};
    pub use crate::recorder::{ModelResponse, Recorder, ToolRequest, TurnInput, TurnSink};
    pub use crate::replay::{ReplayEngine, ReplayResult, StubError, ToolStub};
    pub use crate::trajectory::{
        ModelInfo, Run, RunMetadata, RunSummary, Timing, TokenUsage, ToolCall, Turn, TurnRole,
    };
}
