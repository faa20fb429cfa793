//! End-to-end tests: record a support conversation, persist it, replay it and
//! check it against contracts.

use agentcontract_core::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn lookup(status: &str) -> Value {
    json!({
        "id": "call_1",
        "function": "lookup_order",
        "arguments": {"order_id": "ORD-123"},
        "result": {"status": status, "total": 79.99}
    })
}

/// Scenario A: delivered order, refund confirmed and processed
fn record_refund() -> anyhow::Result<Run> {
    let mut recorder = Recorder::new("refund-delivered").with_model("openai", "gpt-4o");
    recorder.recording(|rec| -> Result<()> {
        rec.add_turn(TurnInput::new("user").content("refund ORD-123"))?;
        rec.add_turn(TurnInput::new("assistant").tool_call(lookup("delivered")).tokens(120, 18))?;
        rec.add_turn(TurnInput::new("user").content("confirm"))?;
        rec.add_turn(
            TurnInput::new("assistant")
                .content("Your refund of $79.99 has been processed.")
                .tool_call(json!({
                    "id": "call_2",
                    "function": "process_refund",
                    "arguments": {"order_id": "ORD-123", "amount": 79.99, "method": "original"},
                    "result": {"refund_id": "RF-1"}
                }))
                .tokens(160, 22),
        )?;
        Ok(())
    })?;
    Ok(recorder.into_run())
}

/// Scenario B: shipped order, no refund
fn record_ineligible() -> anyhow::Result<Run> {
    let mut recorder = Recorder::new("refund-shipped");
    recorder.recording(|rec| -> Result<()> {
        rec.add_turn(TurnInput::new("user").content("refund ORD-123"))?;
        rec.add_turn(TurnInput::new("assistant").tool_call(lookup("shipped")))?;
        rec.add_turn(
            TurnInput::new("assistant")
                .content("Sorry, ORD-123 isn't eligible for a refund until it is delivered."),
        )?;
        Ok(())
    })?;
    Ok(recorder.into_run())
}

fn refund_schema() -> Value {
    json!({
        "type": "object",
        "required": ["order_id", "amount", "method"]
    })
}

#[test]
fn test_scenario_a_refund_processed() -> anyhow::Result<()> {
    init_tracing();
    let run = record_refund()?;

    let contract = Contract::new()
        .with_assertion(&AssertionSpec::new("contains", "final_response").with_value("$79.99"))
        .with_assertion(
            &AssertionSpec::new("json_schema", "tool_call:process_refund:arguments")
                .with_schema(refund_schema()),
        );

    let result = AssertionEngine::new().check_contract(&run, &contract);
    assert!(result.passed(), "{:?}", result.failures());
    assert_eq!(result.scenario, "refund-delivered");
    Ok(())
}

#[test]
fn test_scenario_b_ineligible_order() -> anyhow::Result<()> {
    init_tracing();
    let run = record_ineligible()?;

    let contract = Contract::new()
        .with_assertion(&AssertionSpec::new("not_called", "tool:process_refund"))
        .with_assertion(&AssertionSpec::new("contains", "final_response").with_value("isn't eligible"));

    let result = AssertionEngine::new().check_contract(&run, &contract);
    assert!(result.passed(), "{:?}", result.failures());
    Ok(())
}

#[test]
fn test_scenario_c_policies() -> anyhow::Result<()> {
    init_tracing();
    let run = record_refund()?;

    let contract = Contract::new()
        .with_policy(&PolicySpec::new(
            "known_tools",
            "tool_allowlist",
            ["lookup_order", "process_refund"],
        ))
        .with_policy(&PolicySpec::new("confirm_refund", "requires_confirmation", ["process_refund"]));

    let result = AssertionEngine::new().check_contract(&run, &contract);
    assert!(result.passed(), "{:?}", result.failures());
    assert_eq!(result.results.len(), 2);
    Ok(())
}

#[test]
fn test_record_save_load_replay() -> anyhow::Result<()> {
    init_tracing();
    let dir = TempDir::new()?;
    let store = CassetteStore::new(dir.path().join("scenarios"));

    let run = record_refund()?;
    let path = store.save(&run)?;
    assert!(path.ends_with("refund-delivered.agentrun.json"));
    assert_eq!(store.list()?, vec!["refund-delivered".to_string()]);

    let loaded = store.load("refund-delivered")?;
    assert_eq!(loaded.turns, run.turns);
    assert_eq!(loaded.summary.total_tool_calls, 2);
    assert_eq!(loaded.summary.total_tokens.total, 320);

    // Drive a replay the way an agent loop would
    let mut engine = ReplayEngine::new(loaded);
    let order = engine
        .tool_stub_mut()
        .get_result("lookup_order", json!({"order_id": "ORD-123"}).as_object())?;
    assert_eq!(order["status"], json!("delivered"));

    let refund = engine.tool_stub_mut().get_result("process_refund", None)?;
    assert_eq!(refund, json!({"refund_id": "RF-1"}));

    assert!(engine.finish_without_actual().ok());
    assert!(engine.finish(&run.turns).ok());
    Ok(())
}

#[test]
fn test_replay_detects_divergence() -> anyhow::Result<()> {
    init_tracing();
    let recorded = record_refund()?;
    let actual = record_ineligible()?;

    let mut engine = ReplayEngine::new(recorded);
    engine.tool_stub_mut().get_result("lookup_order", None)?;

    let err = engine
        .tool_stub_mut()
        .get_result("lookup_order", None)
        .expect_err("only one lookup was recorded");
    assert!(matches!(err, StubError::Exhausted { requested: 2, recorded: 1, .. }));

    let unconsumed = engine.finish_without_actual();
    assert_eq!(unconsumed.missing_tools, 1);

    let diff = engine.finish(&actual.turns);
    assert!(!diff.ok());
    assert_eq!(diff.matched_tools, 1);
    assert_eq!(
        diff.errors,
        vec![
            "Turn 2: expected role=user, got role=assistant".to_string(),
            "Missing 1 turns (recorded 4, got 3)".to_string(),
        ]
    );
    Ok(())
}

#[test]
fn test_suite_from_config_document() -> anyhow::Result<()> {
    init_tracing();
    let suite: ContractSuite = serde_json::from_value(json!({
        "defaults": [
            {"type": "not_called", "target": "tool:delete_account"}
        ],
        "overrides": {
            "refund-shipped": {
                "assertions": [{"type": "called_count", "target": "tool:process_refund", "value": 0}]
            }
        },
        "policies": [
            {"name": "confirm_refund", "type": "requires_confirmation", "tools": ["process_refund"]}
        ]
    }))?;

    let engine = AssertionEngine::new();
    for run in [record_refund()?, record_ineligible()?] {
        let contract = suite.contract_for(&run.metadata.scenario);
        let result = engine.check_contract(&run, &contract);
        assert!(result.passed(), "{}: {:?}", result.scenario, result.failures());
    }
    Ok(())
}

#[test]
fn test_stub_error_converts_to_contract_error() {
    let run = Run::new("empty");
    let mut engine = ReplayEngine::new(run);
    let mut lookup = || -> Result<Value> { Ok(engine.tool_stub_mut().get_result("anything", None)?) };
    let err = lookup().unwrap_err();
    assert!(matches!(err, ContractError::Replay(StubError::Exhausted { .. })));
}
