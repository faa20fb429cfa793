//! Trajectory recording
//!
//! A [`Recorder`] accumulates a [`Run`](crate::trajectory::Run) during one
//! bounded session: `begin()`, any number of `add_turn()` calls, then
//! `end()`, which finalizes the summary exactly once.
//!
//! Turns enter a run only through the ingestion shape [`TurnInput`].
//! Integration layers that observe a live model or framework implement the
//! translation on their side and hand turns to a [`TurnSink`]; the
//! [`ModelResponse`] helper covers the common "one model reply" case.
//!
//! # Example
//!
//! ```rust,no_run
//! use agentcontract_core::recorder::{Recorder, TurnInput};
//! use serde_json::json;
//!
//! let mut recorder = Recorder::new("refund-flow").with_model("openai", "gpt-4o");
//! recorder.recording(|rec| -> agentcontract_core::error::Result<()> {
//!     rec.add_turn(TurnInput::new("user").content("I want a refund"))?;
//!     rec.add_turn(
//!         TurnInput::new("assistant")
//!             .content("Let me check your order.")
//!             .tool_call(json!({
//!                 "id": "1",
//!                 "function": "lookup_order",
//!                 "arguments": {"order_id": "123"},
//!                 "result": {"status": "delivered"}
//!             })),
//!     )?;
//!     Ok(())
//! })?;
//! recorder.save("tests/scenarios/refund-flow.agentrun.json")?;
//! # Ok::<(), agentcontract_core::error::ContractError>(())
//! ```

mod capture;
mod session;

pub use capture::{ModelResponse, RawArguments, ToolRequest, TurnSink};
pub use session::{Recorder, TurnInput};

#[cfg(test)]
mod tests;
