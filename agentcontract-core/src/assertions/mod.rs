//! Declarative contracts over recorded runs
//!
//! Assertions check a single resolved value (the final response, a turn, a
//! tool call's arguments) or a function's call history. Policies check rules
//! that span the whole trajectory, such as which tools may be called and
//! which must follow a user confirmation.
//!
//! Specs ([`AssertionSpec`], [`PolicySpec`]) are plain value objects; they
//! are turned into the closed [`Assertion`] and [`Policy`] enums and then
//! evaluated by the [`AssertionEngine`].
//!
//! # Example
//!
//! ```rust,no_run
//! use agentcontract_core::assertions::{AssertionEngine, AssertionSpec, Contract, PolicySpec};
//! # use agentcontract_core::trajectory::Run;
//! # let run = Run::default();
//!
//! let contract = Contract::new()
//!     .with_assertion(&AssertionSpec::new("contains", "final_response").with_value("$79.99"))
//!     .with_assertion(&AssertionSpec::new("not_called", "tool:delete_account"))
//!     .with_policy(&PolicySpec::new("confirm_refund", "requires_confirmation", ["process_refund"]));
//!
//! let result = AssertionEngine::new().check_contract(&run, &contract);
//! for failure in result.failures() {
//!     eprintln!("{}: {}", failure.label, failure.message);
//! }
//! ```

mod engine;
mod spec;
mod target;

pub use engine::{AssertionEngine, CheckResult, ContractResult};
pub use spec::{
    Assertion, AssertionSpec, Contract, ContractSuite, Policy, PolicySpec, ScenarioOverride,
};
pub use target::{InvalidTarget, Target, ToolCallField, text_form};
