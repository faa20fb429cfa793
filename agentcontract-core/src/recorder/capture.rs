//! Capture interface for integration layers
//!
//! Integration code that observes a live model or agent framework does not
//! reach into the recorder. It translates what it saw into a [`TurnInput`]
//! and hands it to a [`TurnSink`], or describes one model reply as a
//! [`ModelResponse`] and lets [`ModelResponse::record`] do the translation.

use serde_json::{Map, Value, json};

use super::session::{Recorder, TurnInput};
use crate::error::Result;

/// Anything that accepts ingested turns
pub trait TurnSink {
    /// Ingest one turn
    ///
    /// # Errors
    ///
    /// Fails when the turn's role is outside the closed role set.
    fn capture(&mut self, input: TurnInput) -> Result<()>;
}

impl TurnSink for Recorder {
    fn capture(&mut self, input: TurnInput) -> Result<()> {
        self.add_turn(input).map(|_| ())
    }
}

/// Tool arguments as delivered by a model API
#[derive(Debug, Clone, PartialEq)]
pub enum RawArguments {
    /// Already-structured arguments
    Json(Value),
    /// Arguments serialized as a JSON string
    Text(String),
}

impl RawArguments {
    /// Normalize to a mapping
    ///
    /// Non-object JSON is wrapped as `{"_value": v}` and text that is not
    /// valid JSON as `{"_raw": text}`, so nothing the model sent is lost.
    pub fn into_arguments(self) -> Map<String, Value> {
        match self {
            RawArguments::Json(Value::Object(map)) => map,
            RawArguments::Json(Value::Null) => Map::new(),
            RawArguments::Json(other) => wrap("_value", other),
            RawArguments::Text(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                Ok(other) => wrap("_value", other),
                Err(_) => wrap("_raw", Value::String(text)),
            },
        }
    }
}

fn wrap(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    pub id: String,
    pub name: String,
    pub arguments: RawArguments,
}

impl ToolRequest {
    /// Request with structured arguments
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: RawArguments::Json(arguments),
        }
    }

    /// Request whose arguments arrived as a JSON string
    pub fn with_text_arguments(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: RawArguments::Text(arguments.into()),
        }
    }
}

/// One model reply, normalized by the integration layer
///
/// Tool results are not part of a model reply; they arrive later as tool
/// turns, so requests are recorded without a result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    /// Provider name, e.g. `openai`
    pub provider: String,

    /// Model name reported by the API
    pub model: String,

    /// Assistant text, if any
    pub text: Option<String>,

    /// Tool invocations, in the order the model emitted them
    pub tool_requests: Vec<ToolRequest>,

    /// Prompt tokens reported by the API
    pub prompt_tokens: u64,

    /// Completion tokens reported by the API
    pub completion_tokens: u64,

    /// Call latency in milliseconds
    pub latency_ms: Option<f64>,
}

impl ModelResponse {
    /// Translate into an assistant turn
    ///
    /// Requests with an empty function name are dropped. Returns `None` when
    /// the reply carries neither text nor tool requests.
    pub fn into_turn_input(self) -> Option<TurnInput> {
        let text = self.text.filter(|text| !text.is_empty());
        if text.is_none() && self.tool_requests.is_empty() {
            return None;
        }

        let entries: Vec<Value> = self
            .tool_requests
            .into_iter()
            .filter(|request| {
                if request.name.is_empty() {
                    tracing::debug!(id = %request.id, "Dropping tool request without a function name");
                }
                !request.name.is_empty()
            })
            .map(|request| {
                json!({
                    "id": request.id,
                    "function": request.name,
                    "arguments": Value::Object(request.arguments.into_arguments()),
                })
            })
            .collect();

        let mut input = TurnInput::new("assistant")
            .tool_calls(entries)
            .tokens(self.prompt_tokens, self.completion_tokens);
        input.content = text.map(Value::String);
        input.latency_ms = self.latency_ms;
        Some(input)
    }

    /// Record into a recorder, updating its model descriptor
    ///
    /// Returns whether a turn was appended.
    pub fn record(self, recorder: &mut Recorder) -> Result<bool> {
        if !self.model.is_empty() {
            let model = recorder.model_mut();
            model.model = self.model.clone();
            if !self.provider.is_empty() {
                model.provider = self.provider.clone();
            }
        }

        match self.into_turn_input() {
            Some(input) => {
                recorder.capture(input)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
