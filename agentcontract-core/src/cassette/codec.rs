//! Run <-> cassette document conversion

use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt::Debug;
use std::path::Path;

use crate::error::{ContractError, Result};
use crate::trajectory::coerce::{
    coerce_content, coerce_f64, coerce_i64, coerce_list, coerce_object, coerce_optional_f64,
    coerce_optional_i64, coerce_str, coerce_string_list, coerce_u64, coerce_usize,
};
use crate::trajectory::{
    ModelInfo, Run, RunMetadata, RunSummary, TokenUsage, Timing, ToolCall, Turn, TurnRole,
    DEFAULT_SCHEMA_VERSION, DEFAULT_SDK,
};

/// Normalize any serializable value into JSON for an opaque field
///
/// Map keys become strings, sequences stay ordered, and date/time types with
/// serde support come out as ISO text. Non-finite floats become `null`.
/// Values that refuse to serialize fall back to their `Debug` string.
pub fn to_json_value<T: Serialize + Debug + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|_| Value::String(format!("{:?}", value)))
}

/// Normalize an unordered collection into a list sorted by each item's JSON text
pub fn set_to_json<'a, T, I>(items: I) -> Value
where
    T: Serialize + Debug + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut keyed: Vec<(String, Value)> = items
        .into_iter()
        .map(|item| {
            let value = to_json_value(item);
            (value.to_string(), value)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Value::Array(keyed.into_iter().map(|(_, value)| value).collect())
}

/// Encode a run into its cassette document
pub fn encode(run: &Run) -> Value {
    json!({
        "schema_version": run.schema_version,
        "run_id": run.run_id,
        "source": {
            "recorded_at": run.recorded_at,
            "recorder_version": run.recorder_version,
            "sdk": run.sdk,
        },
        "model": {
            "provider": run.model.provider,
            "model": run.model.model,
            "temperature": run.model.temperature,
            "top_p": run.model.top_p,
            "max_tokens": run.model.max_tokens,
            "seed": run.model.seed,
        },
        "metadata": {
            "scenario": run.metadata.scenario,
            "tags": run.metadata.tags,
            "description": run.metadata.description,
        },
        "summary": {
            "total_turns": run.summary.total_turns,
            "total_duration_ms": run.summary.total_duration_ms,
            "total_tokens": encode_tokens(&run.summary.total_tokens),
            "total_tool_calls": run.summary.total_tool_calls,
            "estimated_cost_usd": run.summary.estimated_cost_usd,
        },
        "turns": run.turns.iter().map(encode_turn).collect::<Vec<_>>(),
    })
}

fn encode_tokens(tokens: &TokenUsage) -> Value {
    json!({
        "prompt": tokens.prompt,
        "completion": tokens.completion,
        "total": tokens.total,
    })
}

fn encode_turn(turn: &Turn) -> Value {
    let mut doc = Map::new();
    doc.insert("index".to_string(), json!(turn.index));
    doc.insert("role".to_string(), json!(turn.role.as_str()));

    if let Some(content) = &turn.content {
        doc.insert("content".to_string(), json!(content));
    }
    if !turn.tool_calls.is_empty() {
        let calls: Vec<Value> = turn
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "function": call.function,
                    "arguments": call.arguments,
                    "result": call.result,
                    "duration_ms": call.duration_ms,
                })
            })
            .collect();
        doc.insert("tool_calls".to_string(), Value::Array(calls));
    }
    if let Some(timing) = &turn.timing {
        doc.insert(
            "timing".to_string(),
            json!({
                "latency_ms": timing.latency_ms,
                "time_to_first_token_ms": timing.time_to_first_token_ms,
            }),
        );
    }
    if let Some(tokens) = &turn.tokens {
        doc.insert("tokens".to_string(), encode_tokens(tokens));
    }

    Value::Object(doc)
}

/// Decode a cassette document into a run
///
/// # Errors
///
/// Fails if the document is not an object, or if any turn has a missing or
/// invalid `role`.
pub fn decode(doc: &Value) -> Result<Run> {
    let data = doc.as_object().ok_or_else(|| {
        ContractError::InvalidCassette("cassette document must be a JSON object".to_string())
    })?;

    let source = coerce_object(data.get("source"));
    let model = coerce_object(data.get("model"));
    let meta = coerce_object(data.get("metadata"));
    let summary = coerce_object(data.get("summary"));
    let total_tokens = coerce_object(summary.get("total_tokens"));

    let turns = coerce_list(data.get("turns"))
        .iter()
        .filter_map(Value::as_object)
        .map(decode_turn)
        .collect::<Result<Vec<_>>>()?;

    Ok(Run {
        schema_version: coerce_str(data.get("schema_version"), DEFAULT_SCHEMA_VERSION),
        run_id: coerce_str(data.get("run_id"), ""),
        recorded_at: coerce_str(source.get("recorded_at"), ""),
        recorder_version: coerce_str(source.get("recorder_version"), ""),
        sdk: coerce_str(source.get("sdk"), DEFAULT_SDK),
        model: ModelInfo {
            provider: coerce_str(model.get("provider"), ""),
            model: coerce_str(model.get("model"), ""),
            temperature: coerce_f64(model.get("temperature"), 0.0),
            top_p: coerce_f64(model.get("top_p"), 1.0),
            max_tokens: coerce_i64(model.get("max_tokens"), 4096),
            seed: coerce_optional_i64(model.get("seed")),
        },
        metadata: RunMetadata {
            scenario: coerce_str(meta.get("scenario"), ""),
            tags: coerce_string_list(meta.get("tags")),
            description: coerce_str(meta.get("description"), ""),
        },
        summary: RunSummary {
            total_turns: coerce_usize(summary.get("total_turns"), 0),
            total_duration_ms: coerce_f64(summary.get("total_duration_ms"), 0.0),
            total_tokens: decode_tokens(&total_tokens),
            total_tool_calls: coerce_usize(summary.get("total_tool_calls"), 0),
            estimated_cost_usd: coerce_f64(summary.get("estimated_cost_usd"), 0.0),
        },
        turns,
    })
}

fn decode_tokens(data: &Map<String, Value>) -> TokenUsage {
    TokenUsage {
        prompt: coerce_u64(data.get("prompt"), 0),
        completion: coerce_u64(data.get("completion"), 0),
        total: coerce_u64(data.get("total"), 0),
    }
}

fn decode_turn(data: &Map<String, Value>) -> Result<Turn> {
    let role = TurnRole::parse(&coerce_str(data.get("role"), ""))?;

    let tool_calls = coerce_list(data.get("tool_calls"))
        .iter()
        .filter_map(Value::as_object)
        .map(|call| ToolCall {
            id: coerce_str(call.get("id"), ""),
            function: coerce_str(call.get("function"), ""),
            arguments: coerce_object(call.get("arguments")),
            result: call.get("result").cloned().unwrap_or(Value::Null),
            duration_ms: coerce_optional_f64(call.get("duration_ms")),
        })
        .collect();

    let timing = data.get("timing").and_then(Value::as_object).map(|timing| Timing {
        latency_ms: coerce_optional_f64(timing.get("latency_ms")),
        time_to_first_token_ms: coerce_optional_f64(timing.get("time_to_first_token_ms")),
    });

    let tokens = data.get("tokens").and_then(Value::as_object).map(decode_tokens);

    Ok(Turn {
        index: coerce_usize(data.get("index"), 0),
        role,
        content: coerce_content(data.get("content")),
        tool_calls,
        timing,
        tokens,
    })
}

/// Serialize a run to cassette JSON text
pub fn to_json_string(run: &Run, pretty: bool) -> Result<String> {
    let doc = encode(run);
    let text = if pretty {
        serde_json::to_string_pretty(&doc)?
    } else {
        serde_json::to_string(&doc)?
    };
    Ok(text)
}

/// Parse cassette JSON text into a run
pub fn from_json_str(text: &str) -> Result<Run> {
    let doc: Value = serde_json::from_str(text)?;
    decode(&doc)
}

/// Save a run to a cassette file, creating parent directories
pub fn save_run(run: &Run, path: impl AsRef<Path>, pretty: bool) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_json_string(run, pretty)?)?;
    tracing::debug!(path = %path.display(), scenario = %run.metadata.scenario, "Saved cassette");
    Ok(())
}

/// Load a run from a cassette file
pub fn load_run(path: impl AsRef<Path>) -> Result<Run> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let run = from_json_str(&text)?;
    tracing::debug!(path = %path.display(), turns = run.turns.len(), "Loaded cassette");
    Ok(run)
}
