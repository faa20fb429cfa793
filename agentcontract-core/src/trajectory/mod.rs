//! Trajectory data model
//!
//! A [`Run`] is the unit of record, replay and assertion: one complete
//! interaction made of role-tagged [`Turn`]s, each carrying zero or more
//! [`ToolCall`]s.
//!
//! Turns are stored in increasing index order starting at 0. Downstream
//! components rely on the position of a turn in [`Run::turns`], never on the
//! stored `index` value alone.
//!
//! The [`coerce`] helpers normalize loosely-typed JSON input into the typed
//! fields of the model. They are applied once, at every ingestion and decode
//! boundary.

pub mod coerce;
mod compare;
mod model;

pub use compare::{maps_equal, values_equal};
pub use model::{
    ModelInfo, Run, RunMetadata, RunSummary, TokenUsage, Timing, ToolCall, Turn, TurnRole,
    DEFAULT_SCHEMA_VERSION, DEFAULT_SDK,
};
