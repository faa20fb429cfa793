//! Tests for the recorder

use super::*;
use crate::cassette;
use crate::error::ContractError;
use crate::trajectory::TurnRole;
use serde_json::json;

#[test]
fn test_recorder_basic() {
    let mut rec = Recorder::new("test-basic").with_tags(["unit"]);

    rec.recording(|rec| {
        rec.add_turn(TurnInput::new("user").content("Hello")).unwrap();
        rec.add_turn(
            TurnInput::new("assistant")
                .content("Let me check.")
                .tool_call(json!({
                    "id": "tc1",
                    "function": "lookup",
                    "arguments": {"key": "abc"},
                    "result": {"found": true}
                }))
                .latency_ms(150.0)
                .tokens(10, 20),
        )
        .unwrap();
        rec.add_turn(TurnInput::new("assistant").content("Done!")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
    });

    let run = rec.run();
    assert_eq!(run.metadata.scenario, "test-basic");
    assert_eq!(run.metadata.tags, vec!["unit".to_string()]);
    assert_eq!(run.summary.total_turns, 3);
    assert_eq!(run.summary.total_tool_calls, 1);
    assert_eq!(run.summary.total_tokens.prompt, 10);
    assert_eq!(run.summary.total_tokens.completion, 20);
    assert_eq!(run.summary.total_tokens.total, 30);
    assert!(run.summary.total_duration_ms > 0.0);

    assert_eq!(run.turns[0].role, TurnRole::User);
    assert_eq!(run.turns[1].tool_calls[0].function, "lookup");
    assert_eq!(run.turns[1].tool_calls[0].result, json!({"found": true}));
    assert_eq!(run.turns[1].timing.unwrap().latency_ms, Some(150.0));
    assert!(run.turns[0].tokens.is_none());
    assert!(rec.is_finished());
}

#[test]
fn test_sequential_indices() {
    let mut rec = Recorder::new("indices");
    rec.begin();
    for role in ["system", "user", "assistant", "tool"] {
        rec.add_turn(TurnInput::new(role)).unwrap();
    }
    rec.end();

    let indices: Vec<usize> = rec.run().turns.iter().map(|t| t.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

#[test]
fn test_invalid_role_is_rejected() {
    let mut rec = Recorder::new("bad-role");
    rec.begin();

    let err = rec.add_turn(TurnInput::new("narrator")).unwrap_err();
    assert!(matches!(err, ContractError::InvalidRole(ref r) if r == "narrator"));
    assert!(err.is_role_error());
    assert!(rec.run().turns.is_empty());
}

#[test]
fn test_coerces_non_object_tool_arguments() {
    let mut rec = Recorder::new("coerce-tool-args");
    rec.recording(|rec| {
        rec.add_turn(
            TurnInput::new("assistant")
                .content("Running lookup.")
                .tool_call(json!({"id": "tc1", "function": "lookup", "arguments": null}))
                .tool_call(json!({"id": "tc2", "function": "lookup", "arguments": ["bad"]})),
        )
        .unwrap();
    });

    let turn = &rec.run().turns[0];
    assert_eq!(turn.tool_calls.len(), 2);
    assert!(turn.tool_calls[0].arguments.is_empty());
    assert!(turn.tool_calls[1].arguments.is_empty());
}

#[test]
fn test_drops_non_mapping_entries_and_coerces_fields() {
    let mut rec = Recorder::new("coerce-entries");
    rec.begin();
    let turn = rec
        .add_turn(
            TurnInput::new("assistant")
                .content(42)
                .tool_call(json!("not a call"))
                .tool_call(json!(7))
                .tool_call(json!({"id": 99, "duration_ms": "12.5"}))
                .tool_call(json!({"function": "ping"})),
        )
        .unwrap()
        .clone();
    rec.end();

    assert_eq!(turn.content.as_deref(), Some("42"));
    assert_eq!(turn.tool_calls.len(), 2);

    // a missing function name is kept at this layer
    assert_eq!(turn.tool_calls[0].id, "99");
    assert_eq!(turn.tool_calls[0].function, "");
    assert_eq!(turn.tool_calls[0].duration_ms, Some(12.5));
    assert_eq!(turn.tool_calls[1].id, "");
    assert_eq!(turn.tool_calls[1].result, serde_json::Value::Null);

    assert_eq!(rec.run().summary.total_tool_calls, 2);
}

#[test]
fn test_end_without_begin() {
    let mut rec = Recorder::new("no-begin");
    rec.add_turn(TurnInput::new("user").content("hi")).unwrap();

    let summary = rec.end().clone();
    assert_eq!(summary.total_turns, 1);
    assert_eq!(summary.total_duration_ms, 0.0);
}

#[test]
fn test_end_finalizes_once() {
    let mut rec = Recorder::new("once");
    rec.begin();
    rec.add_turn(TurnInput::new("user")).unwrap();
    let first = rec.end().clone();

    rec.add_turn(TurnInput::new("assistant")).unwrap();
    let second = rec.end().clone();

    assert_eq!(first, second);
    assert_eq!(second.total_turns, 1);
}

#[test]
fn test_recording_ends_on_panic() {
    let mut rec = Recorder::new("panics");
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        rec.recording::<_, ()>(|rec| {
            rec.add_turn(TurnInput::new("user")).unwrap();
            panic!("agent crashed");
        })
    }));

    assert!(outcome.is_err());
    assert!(rec.is_finished());
    assert_eq!(rec.run().summary.total_turns, 1);
}

#[test]
fn test_recorder_metadata_and_identity() {
    let rec = Recorder::new("meta")
        .with_description("refund path")
        .with_model("openai", "gpt-4o")
        .with_temperature(0.2)
        .with_seed(7);

    let run = rec.run();
    assert_eq!(run.metadata.description, "refund path");
    assert_eq!(run.model.provider, "openai");
    assert_eq!(run.model.temperature, 0.2);
    assert_eq!(run.model.seed, Some(7));
    assert!(uuid::Uuid::parse_str(&run.run_id).is_ok());
    assert!(chrono::DateTime::parse_from_rfc3339(&run.recorded_at).is_ok());
    assert_eq!(run.recorder_version, crate::VERSION);
}

#[test]
fn test_with_config_sets_source() {
    let config = crate::config::RecorderConfig {
        sdk: "custom-sdk".to_string(),
        recorder_version: "9.9.9".to_string(),
    };
    let run = Recorder::new("cfg").with_config(&config).into_run();
    assert_eq!(run.sdk, "custom-sdk");
    assert_eq!(run.recorder_version, "9.9.9");
}

#[test]
fn test_save_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut rec = Recorder::new("save-test").with_model("openai", "gpt-4o");
    rec.recording(|rec| {
        rec.add_turn(TurnInput::new("user").content("Test input")).unwrap();
        rec.add_turn(TurnInput::new("assistant").content("Test output")).unwrap();
    });

    let path = rec.save(dir.path().join("nested").join("test")).unwrap();
    assert!(path.exists());
    assert!(path.to_string_lossy().ends_with("test.agentrun.json"));

    let loaded = cassette::load_run(&path).unwrap();
    assert_eq!(loaded.metadata.scenario, "save-test");
    assert_eq!(loaded.model.provider, "openai");
    assert_eq!(loaded.model.model, "gpt-4o");
    assert_eq!(loaded.turns.len(), 2);
    assert_eq!(loaded.turns[0].content.as_deref(), Some("Test input"));
    assert_eq!(loaded.turns[1].content.as_deref(), Some("Test output"));
}

#[test]
fn test_turn_sink() {
    fn feed(sink: &mut dyn TurnSink) -> crate::error::Result<()> {
        sink.capture(TurnInput::new("user").content("hi"))?;
        sink.capture(TurnInput::new("robot"))
    }

    let mut rec = Recorder::new("sink");
    assert!(feed(&mut rec).is_err());
    assert_eq!(rec.run().turns.len(), 1);
}

#[test]
fn test_non_finite_numbers_are_not_recorded() {
    let mut rec = Recorder::new("non-finite").with_temperature(f64::NAN);
    rec.recording(|rec| {
        rec.add_turn(TurnInput::new("user").latency_ms(f64::INFINITY)).unwrap();
        rec.add_turn(TurnInput::new("assistant").content("ok").latency_ms(f64::NAN)).unwrap();
        rec.add_turn(TurnInput::new("assistant").latency_ms(12.5)).unwrap();
    });

    let run = rec.into_run();
    assert_eq!(run.model.temperature, 0.0);
    assert!(run.turns[0].timing.is_none());
    assert!(run.turns[1].timing.is_none());
    assert_eq!(run.turns[2].timing.as_ref().and_then(|t| t.latency_ms), Some(12.5));

    let decoded = cassette::decode(&cassette::encode(&run)).unwrap();
    assert_eq!(decoded.turns, run.turns);
    assert_eq!(decoded.model, run.model);
}
