//! Run, turn and tool call types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{ContractError, Result};

/// Schema version written into new cassettes
pub const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";

/// SDK tag used when a run does not name its origin
pub const DEFAULT_SDK: &str = "agentcontract-rust";

/// Role of a turn in a trajectory
///
/// The set is closed. Role drives diffing, the confirmation policy and
/// final-response resolution, so unknown roles are rejected instead of
/// coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
    Tool,
}

impl TurnRole {
    /// Every role, in declaration order
    pub const ALL: [TurnRole; 4] = [
        TurnRole::System,
        TurnRole::User,
        TurnRole::Assistant,
        TurnRole::Tool,
    ];

    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::System => "system",
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::Tool => "tool",
        }
    }

    /// Parse a role name, rejecting anything outside the closed set
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "system" => Ok(TurnRole::System),
            "user" => Ok(TurnRole::User),
            "assistant" => Ok(TurnRole::Assistant),
            "tool" => Ok(TurnRole::Tool),
            "" => Err(ContractError::MissingRole),
            other => Err(ContractError::InvalidRole(other.to_string())),
        }
    }
}

impl FromStr for TurnRole {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self> {
        TurnRole::parse(s)
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single tool/function call recorded inside a turn
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolCall {
    /// Call identifier (may be empty)
    pub id: String,

    /// Function name
    pub function: String,

    /// Arguments, always a string-keyed mapping
    pub arguments: Map<String, Value>,

    /// Recorded result, passed through untouched (`Null` when absent)
    pub result: Value,

    /// Execution duration in milliseconds
    pub duration_ms: Option<f64>,
}

impl ToolCall {
    /// Create a call with no recorded result
    pub fn new(function: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            function: function.into(),
            arguments,
            ..Default::default()
        }
    }

    /// Set the call identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the recorded result
    pub fn with_result(mut self, result: Value) -> Self {
        self.result = result;
        self
    }

    /// Set the execution duration
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// Timing information for a turn
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Timing {
    /// End-to-end latency in milliseconds
    pub latency_ms: Option<f64>,

    /// Time until the first streamed token, if known
    pub time_to_first_token_ms: Option<f64>,
}

/// Token counts for a turn or a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

impl TokenUsage {
    /// Build usage with `total = prompt + completion`
    pub fn new(prompt: u64, completion: u64) -> Self {
        Self {
            prompt,
            completion,
            total: prompt.saturating_add(completion),
        }
    }

    /// Whether no tokens were counted at all
    pub fn is_empty(&self) -> bool {
        self.prompt == 0 && self.completion == 0 && self.total == 0
    }
}

/// One step of a trajectory
///
/// Turns are created once and never mutated after being appended to a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    /// Zero-based position in the trajectory
    pub index: usize,

    /// Who produced the turn
    pub role: TurnRole,

    /// Text content, if any
    pub content: Option<String>,

    /// Tool calls made in this turn, in call order
    pub tool_calls: Vec<ToolCall>,

    /// Timing, if measured
    pub timing: Option<Timing>,

    /// Token usage, if reported
    pub tokens: Option<TokenUsage>,
}

impl Turn {
    /// Create a bare turn with no content or calls
    pub fn new(index: usize, role: TurnRole) -> Self {
        Self {
            index,
            role,
            content: None,
            tool_calls: Vec::new(),
            timing: None,
            tokens: None,
        }
    }

    /// Set the text content
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Append a tool call
    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }
}

/// Model configuration used for the recording
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub provider: String,
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: i64,
    pub seed: Option<i64>,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self {
            provider: String::new(),
            model: String::new(),
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: 4096,
            seed: None,
        }
    }
}

/// Free-form description of the recorded scenario
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunMetadata {
    /// Scenario name, also the key a cassette is stored under
    pub scenario: String,

    /// Tags for categorization
    pub tags: Vec<String>,

    /// Human-readable description
    pub description: String,
}

/// Aggregate statistics, finalized once when a recording session ends
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunSummary {
    pub total_turns: usize,
    pub total_duration_ms: f64,
    pub total_tokens: TokenUsage,
    pub total_tool_calls: usize,
    pub estimated_cost_usd: f64,
}

/// A complete recorded agent trajectory
///
/// Owned by the session that created it; read-only data once the session
/// ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    /// Schema version for forward compatibility
    pub schema_version: String,

    /// Unique run identifier
    pub run_id: String,

    /// RFC 3339 timestamp of the recording
    pub recorded_at: String,

    /// Version of the recorder that produced the run
    pub recorder_version: String,

    /// Originating SDK tag
    pub sdk: String,

    /// Model descriptor
    pub model: ModelInfo,

    /// Scenario metadata
    pub metadata: RunMetadata,

    /// Derived summary
    pub summary: RunSummary,

    /// All turns, in index order
    pub turns: Vec<Turn>,
}

impl Default for Run {
    fn default() -> Self {
        Self {
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            run_id: String::new(),
            recorded_at: String::new(),
            recorder_version: String::new(),
            sdk: DEFAULT_SDK.to_string(),
            model: ModelInfo::default(),
            metadata: RunMetadata::default(),
            summary: RunSummary::default(),
            turns: Vec::new(),
        }
    }
}

impl Run {
    /// Create an empty run for a scenario
    pub fn new(scenario: impl Into<String>) -> Self {
        let mut run = Self::default();
        run.metadata.scenario = scenario.into();
        run
    }

    /// All tool calls in trajectory order (turn order, then call order)
    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCall> {
        self.turns.iter().flat_map(|turn| turn.tool_calls.iter())
    }

    /// All calls to one function, in trajectory order
    pub fn calls_to<'a>(&'a self, function: &'a str) -> impl Iterator<Item = &'a ToolCall> + 'a {
        self.tool_calls().filter(move |call| call.function == function)
    }

    /// Last assistant turn that has content
    pub fn final_response(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == TurnRole::Assistant && turn.content.is_some())
            .and_then(|turn| turn.content.as_deref())
    }
}
