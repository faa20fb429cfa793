//! Cassette persistence
//!
//! A cassette is the persisted JSON form of a [`Run`](crate::trajectory::Run):
//!
//! ```text
//! {
//!   schema_version, run_id,
//!   source:   { recorded_at, recorder_version, sdk },
//!   model:    { provider, model, temperature, top_p, max_tokens, seed },
//!   metadata: { scenario, tags[], description },
//!   summary:  { total_turns, total_duration_ms,
//!               total_tokens: { prompt, completion, total },
//!               total_tool_calls, estimated_cost_usd },
//!   turns:    [ { index, role, content?, tool_calls?[], timing?, tokens? } ]
//! }
//! ```
//!
//! Encoding never fails. Decoding tolerates null or missing sections and
//! loosely-typed numbers; the only hard failure is a turn whose `role` is
//! missing or outside the closed set.

mod codec;
mod store;

pub use codec::{
    decode, encode, from_json_str, load_run, save_run, set_to_json, to_json_string,
    to_json_value,
};
pub use store::CassetteStore;
