//! Target expressions: which part of a run an assertion looks at

use serde_json::Value;
use std::str::FromStr;

use crate::trajectory::Run;

/// A target expression that cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid target '{target}': {reason}")]
pub struct InvalidTarget {
    pub target: String,
    pub reason: String,
}

/// Field of a recorded tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCallField {
    Arguments,
    Result,
}

/// Parsed target expression
///
/// | expression | resolves to |
/// |---|---|
/// | `final_response` | content of the last assistant turn that has content |
/// | `full_conversation` | every turn with content as `role: content`, one per line |
/// | `turn:N` | content of turn N |
/// | `tool_call:F[:arguments]` | arguments of the first call to F |
/// | `tool_call:F:result` | result of the first call to F |
///
/// Anything else parses to [`Target::Unresolvable`] and resolves to nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    FinalResponse,
    FullConversation,
    /// Negative indices are accepted and resolve to nothing
    Turn(i64),
    ToolCall { function: String, field: ToolCallField },
    Unresolvable(String),
}

impl Target {
    pub fn parse(raw: &str) -> Result<Self, InvalidTarget> {
        match raw {
            "final_response" => return Ok(Self::FinalResponse),
            "full_conversation" => return Ok(Self::FullConversation),
            _ => {}
        }

        if let Some(index) = raw.strip_prefix("turn:") {
            return index
                .trim()
                .parse::<i64>()
                .map(Self::Turn)
                .map_err(|e| InvalidTarget {
                    target: raw.to_string(),
                    reason: format!("turn index '{}' is not an integer ({})", index, e),
                });
        }

        if let Some(rest) = raw.strip_prefix("tool_call:") {
            let (function, field) = match rest.split_once(':') {
                Some((function, field)) => (function, field),
                None => (rest, "arguments"),
            };
            let field = match field {
                "arguments" => ToolCallField::Arguments,
                "result" => ToolCallField::Result,
                _ => return Ok(Self::Unresolvable(raw.to_string())),
            };
            if function.is_empty() {
                return Ok(Self::Unresolvable(raw.to_string()));
            }
            return Ok(Self::ToolCall {
                function: function.to_string(),
                field,
            });
        }

        Ok(Self::Unresolvable(raw.to_string()))
    }

    /// Value this target points at in `run`, `None` when nothing is there
    ///
    /// A recorded JSON `null` counts as nothing.
    pub fn resolve(&self, run: &Run) -> Option<Value> {
        let resolved = match self {
            Self::FinalResponse => run.final_response().map(|s| Value::String(s.to_string())),
            Self::FullConversation => {
                let lines: Vec<String> = run
                    .turns
                    .iter()
                    .filter_map(|turn| {
                        turn.content
                            .as_ref()
                            .map(|content| format!("{}: {}", turn.role, content))
                    })
                    .collect();
                Some(Value::String(lines.join("\n")))
            }
            Self::Turn(index) => usize::try_from(*index)
                .ok()
                .and_then(|i| run.turns.get(i))
                .and_then(|turn| turn.content.clone())
                .map(Value::String),
            Self::ToolCall { function, field } => {
                run.calls_to(function).next().map(|call| match field {
                    ToolCallField::Arguments => Value::Object(call.arguments.clone()),
                    ToolCallField::Result => call.result.clone(),
                })
            }
            Self::Unresolvable(_) => None,
        };
        resolved.filter(|value| !value.is_null())
    }
}

impl FromStr for Target {
    type Err = InvalidTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Text form used for substring and pattern checks: strings as-is, other
/// values as compact JSON
pub fn text_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

