//! Deterministic replay of recorded trajectories
//!
//! This module provides the two halves of replay:
//! - [`ToolStub`]: serves recorded tool results in recorded order, so agent
//!   code can run without touching live tools
//! - [`ReplayEngine::finish`]: compares the turns an execution actually
//!   produced against the recorded ones
//!
//! # Example
//!
//! ```rust,no_run
//! use agentcontract_core::cassette::CassetteStore;
//! use agentcontract_core::replay::ReplayEngine;
//! use serde_json::json;
//!
//! let run = CassetteStore::new("tests/scenarios").load("refund-flow")?;
//! let mut engine = ReplayEngine::new(run);
//!
//! // In the agent loop, replace real tool calls:
//! let args = json!({"order_id": "123"});
//! let result = engine.tool_stub_mut().get_result("lookup_order", args.as_object())?;
//!
//! // After replay, check that every recorded call was consumed:
//! let outcome = engine.finish_without_actual();
//! assert!(outcome.ok(), "{:?}", outcome.errors);
//! # Ok::<(), agentcontract_core::error::ContractError>(())
//! ```
//!
//! A stub is mutable, ordered state: drain it from one caller at a time.

mod engine;
mod stub;

pub use engine::{ReplayEngine, ReplayResult};
pub use stub::{StubError, ToolStub};
