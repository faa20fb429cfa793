//! Recorded tool results served in recorded order

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::trajectory::{Run, maps_equal};

/// Why the stub refused to serve a result
///
/// Both cases are caller-actionable: returning a stale or wrong result would
/// defeat deterministic replay.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StubError {
    /// Every recorded call to the function has been consumed
    #[error(
        "No more recorded results for tool '{function}' (called {requested} times, only {recorded} recorded)"
    )]
    Exhausted {
        function: String,
        requested: usize,
        recorded: usize,
    },

    /// Live arguments differ from the next recorded call's arguments
    #[error("Tool '{function}' call {call} argument mismatch: expected {expected}, got {actual}")]
    ArgumentsMismatch {
        function: String,
        call: usize,
        expected: Value,
        actual: Value,
    },
}

#[derive(Debug, Clone)]
struct RecordedCall {
    arguments: Map<String, Value>,
    result: Value,
}

#[derive(Debug, Clone, Default)]
struct CallQueue {
    calls: Vec<RecordedCall>,
    consumed: usize,
}

impl CallQueue {
    fn remaining(&self) -> usize {
        self.calls.len() - self.consumed
    }
}

/// Per-function FIFO queues of recorded tool results
#[derive(Debug, Clone)]
pub struct ToolStub {
    queues: HashMap<String, CallQueue>,
    order: Vec<String>,
    strict_arguments: bool,
}

impl ToolStub {
    /// Index every tool call of `run`, in turn order then call order
    pub fn new(run: &Run) -> Self {
        let mut queues: HashMap<String, CallQueue> = HashMap::new();
        let mut order = Vec::new();

        for call in run.tool_calls() {
            let queue = queues.entry(call.function.clone()).or_insert_with(|| {
                order.push(call.function.clone());
                CallQueue::default()
            });
            queue.calls.push(RecordedCall {
                arguments: call.arguments.clone(),
                result: call.result.clone(),
            });
        }

        Self {
            queues,
            order,
            strict_arguments: true,
        }
    }

    /// Whether supplied arguments are compared against the recording
    pub fn with_strict_arguments(mut self, strict: bool) -> Self {
        self.strict_arguments = strict;
        self
    }

    /// Serve the next recorded result for `function`
    ///
    /// When `arguments` is supplied it must equal the head entry's recorded
    /// arguments. A mismatch does not consume the entry, so a corrected call
    /// can still succeed.
    ///
    /// # Errors
    ///
    /// [`StubError::Exhausted`] when nothing is left for the function,
    /// [`StubError::ArgumentsMismatch`] when the arguments differ.
    pub fn get_result(
        &mut self,
        function: &str,
        arguments: Option<&Map<String, Value>>,
    ) -> Result<Value, StubError> {
        let strict = self.strict_arguments;
        let consumed = self.call_count(function);
        let recorded = self.recorded_count(function);
        let queue = match self.queues.get_mut(function) {
            Some(queue) if consumed < recorded => queue,
            _ => {
                tracing::warn!(function, recorded, "Replay stub exhausted");
                return Err(StubError::Exhausted {
                    function: function.to_string(),
                    requested: consumed + 1,
                    recorded,
                });
            }
        };

        let head = &queue.calls[queue.consumed];
        if let Some(actual) = arguments.filter(|_| strict) {
            if !maps_equal(actual, &head.arguments) {
                tracing::warn!(function, call = queue.consumed + 1, "Replay arguments mismatch");
                return Err(StubError::ArgumentsMismatch {
                    function: function.to_string(),
                    call: queue.consumed + 1,
                    expected: Value::Object(head.arguments.clone()),
                    actual: Value::Object(actual.clone()),
                });
            }
        }

        let result = head.result.clone();
        queue.consumed += 1;
        Ok(result)
    }

    /// Whether the function still has an unconsumed recorded result
    pub fn has_results(&self, function: &str) -> bool {
        self.remaining(function) > 0
    }

    /// Unconsumed recorded results for the function
    pub fn remaining(&self, function: &str) -> usize {
        self.queues.get(function).map(CallQueue::remaining).unwrap_or(0)
    }

    /// Results served so far for the function
    pub fn call_count(&self, function: &str) -> usize {
        self.queues.get(function).map(|q| q.consumed).unwrap_or(0)
    }

    /// Recorded calls for the function
    pub fn recorded_count(&self, function: &str) -> usize {
        self.queues.get(function).map(|q| q.calls.len()).unwrap_or(0)
    }

    /// Function names in order of first appearance in the trajectory
    pub fn functions(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}
