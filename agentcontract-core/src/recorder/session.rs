//! Recording session

use chrono::Utc;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cassette;
use crate::config::RecorderConfig;
use crate::error::Result;
use crate::trajectory::coerce::{coerce_object, coerce_optional_f64, coerce_str};
use crate::trajectory::{
    coerce, ModelInfo, Run, RunSummary, TokenUsage, Timing, ToolCall, Turn, TurnRole,
};

/// Extension appended by [`Recorder::save`] when the path has none
const CASSETTE_EXTENSION: &str = "agentrun.json";

/// One turn as handed over by an integration layer
///
/// This is the single ingestion shape: everything except `role` is
/// optional and loosely typed, and is coerced when the turn is appended.
#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    /// One of `system`, `user`, `assistant`, `tool`
    pub role: String,

    /// Text content; non-string values are stored as their string form
    pub content: Option<Value>,

    /// Raw tool-call entries shaped `{id?, function, arguments?, result?, duration_ms?}`
    pub tool_calls: Vec<Value>,

    /// Turn latency in milliseconds
    pub latency_ms: Option<f64>,

    /// Prompt tokens consumed by the turn
    pub prompt_tokens: u64,

    /// Completion tokens produced by the turn
    pub completion_tokens: u64,
}

impl TurnInput {
    /// Start a turn for the given role
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            ..Default::default()
        }
    }

    /// Set the content
    pub fn content(mut self, content: impl Into<Value>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Append a raw tool-call entry
    pub fn tool_call(mut self, entry: Value) -> Self {
        self.tool_calls.push(entry);
        self
    }

    /// Replace all raw tool-call entries
    pub fn tool_calls(mut self, entries: impl IntoIterator<Item = Value>) -> Self {
        self.tool_calls = entries.into_iter().collect();
        self
    }

    /// Set the latency
    pub fn latency_ms(mut self, latency_ms: f64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    /// Set token counts
    pub fn tokens(mut self, prompt: u64, completion: u64) -> Self {
        self.prompt_tokens = prompt;
        self.completion_tokens = completion;
        self
    }
}

/// Records turns into a [`Run`] and finalizes its summary
#[derive(Debug)]
pub struct Recorder {
    run: Run,
    started_at: Option<Instant>,
    finalized: bool,
    total_tool_calls: usize,
    prompt_tokens: u64,
    completion_tokens: u64,
}

impl Recorder {
    /// Create a recorder for a scenario with a fresh run id and timestamp
    pub fn new(scenario: impl Into<String>) -> Self {
        let mut run = Run::new(scenario);
        run.run_id = uuid::Uuid::new_v4().to_string();
        run.recorded_at = Utc::now().to_rfc3339();
        run.recorder_version = crate::VERSION.to_string();

        Self {
            run,
            started_at: None,
            finalized: false,
            total_tool_calls: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }

    /// Apply SDK tag and recorder version from configuration
    pub fn with_config(mut self, config: &RecorderConfig) -> Self {
        self.run.sdk = config.sdk.clone();
        self.run.recorder_version = config.recorder_version.clone();
        self
    }

    /// Set scenario tags
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.run.metadata.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the scenario description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.run.metadata.description = description.into();
        self
    }

    /// Set the model provider and name
    pub fn with_model(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.run.model.provider = provider.into();
        self.run.model.model = model.into();
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.run.model.temperature = if temperature.is_finite() {
            temperature
        } else {
            ModelInfo::default().temperature
        };
        self
    }

    /// Set the sampling seed
    pub fn with_seed(mut self, seed: i64) -> Self {
        self.run.model.seed = Some(seed);
        self
    }

    /// Start the session timer and reset the running counters
    pub fn begin(&mut self) {
        self.started_at = Some(Instant::now());
        self.total_tool_calls = 0;
        self.prompt_tokens = 0;
        self.completion_tokens = 0;
        tracing::debug!(run_id = %self.run.run_id, scenario = %self.run.metadata.scenario, "Recording started");
    }

    /// Validate and append a turn, returning the stored turn
    ///
    /// # Errors
    ///
    /// Fails only when `role` is outside the closed role set. Every other
    /// field is coerced.
    pub fn add_turn(&mut self, input: TurnInput) -> Result<&Turn> {
        let role = TurnRole::parse(&input.role)?;

        let tool_calls: Vec<ToolCall> = input
            .tool_calls
            .iter()
            .filter_map(|entry| {
                let call = tool_call_from_entry(entry);
                if call.is_none() {
                    tracing::debug!(entry = %entry, "Dropping tool call entry that is not a mapping");
                }
                call
            })
            .collect();
        self.total_tool_calls += tool_calls.len();

        let tokens = if input.prompt_tokens > 0 || input.completion_tokens > 0 {
            self.prompt_tokens = self.prompt_tokens.saturating_add(input.prompt_tokens);
            self.completion_tokens = self.completion_tokens.saturating_add(input.completion_tokens);
            Some(TokenUsage::new(input.prompt_tokens, input.completion_tokens))
        } else {
            None
        };

        let turn = Turn {
            index: self.run.turns.len(),
            role,
            content: coerce::coerce_content(input.content.as_ref()),
            tool_calls,
            timing: input.latency_ms.filter(|ms| ms.is_finite()).map(|latency_ms| Timing {
                latency_ms: Some(latency_ms),
                time_to_first_token_ms: None,
            }),
            tokens,
        };

        self.run.turns.push(turn);
        Ok(&self.run.turns[self.run.turns.len() - 1])
    }

    /// Finalize the summary
    ///
    /// Only the first call has an effect. Without a prior [`begin`](Self::begin)
    /// the recorded duration is zero.
    pub fn end(&mut self) -> &RunSummary {
        if self.finalized {
            return &self.run.summary;
        }

        let total_duration_ms = self
            .started_at
            .map(|start| start.elapsed().as_secs_f64() * 1000.0)
            .unwrap_or(0.0);

        self.run.summary = RunSummary {
            total_turns: self.run.turns.len(),
            total_duration_ms,
            total_tokens: TokenUsage::new(self.prompt_tokens, self.completion_tokens),
            total_tool_calls: self.total_tool_calls,
            estimated_cost_usd: self.run.summary.estimated_cost_usd,
        };
        self.finalized = true;

        tracing::debug!(
            run_id = %self.run.run_id,
            turns = self.run.summary.total_turns,
            tool_calls = self.run.summary.total_tool_calls,
            duration_ms = total_duration_ms,
            "Recording finished"
        );
        &self.run.summary
    }

    /// Run `f` inside a session; the summary is finalized even if `f` panics
    pub fn recording<F, T>(&mut self, f: F) -> T
    where
        F: FnOnce(&mut Recorder) -> T,
    {
        struct EndOnDrop<'a>(&'a mut Recorder);

        impl Drop for EndOnDrop<'_> {
            fn drop(&mut self) {
                self.0.end();
            }
        }

        self.begin();
        let mut guard = EndOnDrop(self);
        f(&mut *guard.0)
    }

    /// Whether the summary has been finalized
    pub fn is_finished(&self) -> bool {
        self.finalized
    }

    /// The run recorded so far
    pub fn run(&self) -> &Run {
        &self.run
    }

    /// Model descriptor, for integration layers that learn it mid-session
    pub fn model_mut(&mut self) -> &mut ModelInfo {
        &mut self.run.model
    }

    /// Consume the recorder, finalizing the summary if needed
    pub fn into_run(mut self) -> Run {
        self.end();
        self.run
    }

    /// Save the run as a cassette
    ///
    /// A path without an extension gets `.agentrun.json` appended. Parent
    /// directories are created.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let path = if path.extension().is_none() {
            path.with_extension(CASSETTE_EXTENSION)
        } else {
            path.to_path_buf()
        };
        cassette::save_run(&self.run, &path, true)?;
        Ok(path)
    }
}

/// Build a tool call from a raw entry; `None` for non-mapping entries
fn tool_call_from_entry(entry: &Value) -> Option<ToolCall> {
    let fields = entry.as_object()?;
    Some(ToolCall {
        id: coerce_str(fields.get("id"), ""),
        function: coerce_str(fields.get("function"), ""),
        arguments: coerce_object(fields.get("arguments")),
        result: fields.get("result").cloned().unwrap_or(Value::Null),
        duration_ms: coerce_optional_f64(fields.get("duration_ms")),
    })
}
