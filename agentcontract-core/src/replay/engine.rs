//! Replay engine and execution diff

use crate::config::ReplayConfig;
use crate::trajectory::{Run, Turn, maps_equal};

use super::stub::ToolStub;

/// Content shown for an unexpected extra turn
const EXTRA_TURN_PREVIEW_CHARS: usize = 50;

/// Outcome of comparing an execution against its recording
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayResult {
    /// Scenario of the recorded run
    pub scenario: String,

    /// Tool calls that matched by function and arguments
    pub matched_tools: usize,

    /// Tool calls that differed, including every extra or missing call
    pub mismatched_tools: usize,

    /// Recorded calls the execution did not make
    pub missing_tools: usize,

    /// Calls the execution made beyond the recording
    pub extra_tools: usize,

    /// Human-readable diagnostics
    pub errors: Vec<String>,
}

impl ReplayResult {
    /// True iff there are no errors and no mismatched tool calls
    ///
    /// Extra and missing calls are also counted as mismatched, so any
    /// tool-count discrepancy fails the replay.
    pub fn ok(&self) -> bool {
        self.errors.is_empty() && self.mismatched_tools == 0
    }
}

/// Replays a recorded run: serves its tool results and diffs the execution
pub struct ReplayEngine {
    recorded: Run,
    stub: ToolStub,
}

impl ReplayEngine {
    /// Create an engine over a recorded run
    pub fn new(run: Run) -> Self {
        let stub = ToolStub::new(&run);
        Self { recorded: run, stub }
    }

    /// Create an engine with replay settings applied to its stub
    pub fn with_config(run: Run, config: &ReplayConfig) -> Self {
        let stub = ToolStub::new(&run).with_strict_arguments(config.strict_arguments);
        Self { recorded: run, stub }
    }

    /// The recorded run
    pub fn recorded_run(&self) -> &Run {
        &self.recorded
    }

    /// The tool stub
    pub fn tool_stub(&self) -> &ToolStub {
        &self.stub
    }

    /// The tool stub, for serving results
    pub fn tool_stub_mut(&mut self) -> &mut ToolStub {
        &mut self.stub
    }

    fn empty_result(&self) -> ReplayResult {
        ReplayResult {
            scenario: self.recorded.metadata.scenario.clone(),
            ..Default::default()
        }
    }

    /// Report every recorded tool result the stub did not serve
    pub fn finish_without_actual(&self) -> ReplayResult {
        let mut result = self.empty_result();

        for function in self.stub.functions() {
            let remaining = self.stub.remaining(function);
            if remaining > 0 {
                result.missing_tools += remaining;
                result.errors.push(format!(
                    "Tool '{}' was recorded {} times but only called {} times during replay",
                    function,
                    self.stub.recorded_count(function),
                    self.stub.call_count(function)
                ));
            }
        }

        self.log_outcome(&result);
        result
    }

    /// Compare the turns an execution produced against the recorded turns,
    /// position by position
    pub fn finish(&self, actual_turns: &[Turn]) -> ReplayResult {
        let mut result = self.empty_result();
        let recorded_turns = &self.recorded.turns;

        for (i, actual) in actual_turns.iter().enumerate() {
            let Some(expected) = recorded_turns.get(i) else {
                let extra_calls = actual.tool_calls.len();
                result.extra_tools += extra_calls;
                result.mismatched_tools += extra_calls;
                result.errors.push(format!(
                    "Extra turn {}: role={}, content={}...",
                    i,
                    actual.role,
                    preview(actual.content.as_deref())
                ));
                continue;
            };

            if actual.role != expected.role {
                result.errors.push(format!(
                    "Turn {}: expected role={}, got role={}",
                    i, expected.role, actual.role
                ));
            }

            let actual_count = actual.tool_calls.len();
            let expected_count = expected.tool_calls.len();
            if actual_count != expected_count {
                if actual_count > expected_count {
                    result.extra_tools += actual_count - expected_count;
                } else {
                    result.missing_tools += expected_count - actual_count;
                }
                result.mismatched_tools += actual_count.abs_diff(expected_count);
                result.errors.push(format!(
                    "Turn {}: expected {} tool calls, got {}",
                    i, expected_count, actual_count
                ));
                continue;
            }

            for (j, (act, exp)) in actual.tool_calls.iter().zip(&expected.tool_calls).enumerate() {
                if act.function != exp.function {
                    result.mismatched_tools += 1;
                    result.errors.push(format!(
                        "Turn {}, tool {}: expected function='{}', got function='{}'",
                        i, j, exp.function, act.function
                    ));
                } else if !maps_equal(&act.arguments, &exp.arguments) {
                    result.mismatched_tools += 1;
                    result.errors.push(format!(
                        "Turn {}, tool {} ({}): arguments differ",
                        i, j, act.function
                    ));
                } else {
                    result.matched_tools += 1;
                }
            }
        }

        if actual_turns.len() < recorded_turns.len() {
            let missing_turns = &recorded_turns[actual_turns.len()..];
            let missing_calls: usize = missing_turns.iter().map(|t| t.tool_calls.len()).sum();
            result.missing_tools += missing_calls;
            result.mismatched_tools += missing_calls;
            result.errors.push(format!(
                "Missing {} turns (recorded {}, got {})",
                missing_turns.len(),
                recorded_turns.len(),
                actual_turns.len()
            ));
        }

        self.log_outcome(&result);
        result
    }

    fn log_outcome(&self, result: &ReplayResult) {
        if result.ok() {
            tracing::debug!(scenario = %result.scenario, matched = result.matched_tools, "Replay matched recording");
        } else {
            tracing::warn!(
                scenario = %result.scenario,
                mismatched = result.mismatched_tools,
                missing = result.missing_tools,
                extra = result.extra_tools,
                errors = result.errors.len(),
                "Replay diverged from recording"
            );
        }
    }
}

fn preview(content: Option<&str>) -> String {
    match content {
        Some(text) if !text.is_empty() => text.chars().take(EXTRA_TURN_PREVIEW_CHARS).collect(),
        _ => "(none)".to_string(),
    }
}
